use std::future::Future;
use std::sync::Arc;
use futures::channel::mpsc::Sender;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio_util::sync::CancellationToken;

use crate::device::clock::Clock;
use crate::device::constants::{CCCD_UUID, PRESSURE_CHARACTERISTIC_UUID, PRESSURE_SERVICE_UUID};
use crate::device::controller::LinkEvent;
use crate::device::decoder::decode;
use crate::device::radio::{GattService, NotificationStream, Radio};
use crate::device::types::{DeviceIdentity, Reading};
use crate::error::DeviceError;

/// One open connection to the sensor. Closing consumes the session, so the handle is released
/// exactly once.
pub struct GattSession<R: Radio> {
    radio: R,
    handle: R::Peripheral,
    name: String,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

/// The peripheral must expose the pressure characteristic, with a CCCD, inside the pressure
/// service. Anything else is a different device.
fn check_compatible(services: &[GattService]) -> Result<(), DeviceError> {
    let compatible = services
        .iter()
        .filter(|service| service.uuid == PRESSURE_SERVICE_UUID)
        .flat_map(|service| &service.characteristics)
        .any(|characteristic| {
            characteristic.uuid == PRESSURE_CHARACTERISTIC_UUID && characteristic.descriptors.contains(&CCCD_UUID)
        });

    if compatible {
        Ok(())
    } else {
        Err(DeviceError::CharacteristicNotFound)
    }
}

async fn subscribe<R: Radio>(radio: &R, handle: &R::Peripheral) -> Result<NotificationStream, DeviceError> {
    info!("Connected; Discovering services...");
    let services = radio.discover_services(handle).await?;
    check_compatible(&services)?;

    // listen before enabling so the first notification can not slip through
    let notifications = radio.notifications(handle, PRESSURE_CHARACTERISTIC_UUID).await?;

    info!("Subscribing to characteristic {:?} {:?}", PRESSURE_SERVICE_UUID, PRESSURE_CHARACTERISTIC_UUID);
    radio.enable_notifications(handle, PRESSURE_SERVICE_UUID, PRESSURE_CHARACTERISTIC_UUID).await?;
    Ok(notifications)
}

async fn stream_readings<R: Radio>(
    radio: &R,
    handle: &R::Peripheral,
    clock: &dyn Clock,
    attempt: u64,
    events: &mut Sender<LinkEvent<R>>,
) {
    let mut notifications = match subscribe(radio, handle).await {
        Ok(v) => v,
        Err(err) => {
            let _ = events.send(LinkEvent::Subscribed { attempt, outcome: Err(err) }).await;
            return;
        },
    };

    if events.send(LinkEvent::Subscribed { attempt, outcome: Ok(()) }).await.is_err() {
        return;
    }

    while let Some(payload) = notifications.next().await {
        match decode(&payload) {
            Ok(value) => {
                let reading = Reading::new(value, clock.now());
                if events.send(LinkEvent::Reading { attempt, reading }).await.is_err() {
                    return;
                }
            },
            Err(err) => debug!("Dropping notification {:02x?}: {}", payload, err),
        }
    }

    warn!("Notification stream ended");
    let _ = events.send(LinkEvent::LinkLost { attempt }).await;
}

impl<R: Radio> GattSession<R> {
    pub async fn open(radio: R, identity: DeviceIdentity<R::Peripheral>, clock: Arc<dyn Clock>) -> Result<Self, DeviceError> {
        let name = identity.name().to_string();

        info!("Connecting to peripheral {}...", name);
        let handle = radio.open_connection(identity).await?;

        Ok(GattSession {
            radio,
            handle,
            name,
            clock,
            cancel: CancellationToken::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Discover, subscribe and forward readings until the link drops or the session is closed.
    ///
    /// Sends exactly one `Subscribed` event, then one `Reading` per decodable notification in
    /// arrival order, and `LinkLost` if the peripheral goes away. Nothing is sent after
    /// [`GattSession::close`].
    pub fn run(&self, attempt: u64, events: Sender<LinkEvent<R>>) -> impl Future<Output = ()> + Send + 'static {
        let radio = self.radio.clone();
        let handle = self.handle.clone();
        let clock = self.clock.clone();
        let cancel = self.cancel.clone();

        async move {
            let mut lost_events = events.clone();
            let mut events = events;

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Session task stopped");
                },
                _ = radio.link_lost(&handle) => {
                    warn!("Connection lost");
                    let _ = lost_events.send(LinkEvent::LinkLost { attempt }).await;
                },
                _ = stream_readings(&radio, &handle, clock.as_ref(), attempt, &mut events) => {},
            }
        }
    }

    pub async fn close(self) {
        self.cancel.cancel();

        info!("Closing connection to {}", self.name);
        if let Err(err) = self.radio.close_connection(&self.handle).await {
            warn!("Failed to close connection: {}", err);
        }
    }
}
