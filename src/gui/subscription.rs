use std::convert::Infallible;
use std::sync::Arc;
use futures::channel::mpsc::{channel, Sender};
use futures::future::pending;
use futures::{SinkExt, StreamExt};
use iced::subscription::{self, Subscription};
use log::{error, info};

use crate::device::btle::BtleRadio;
use crate::device::clock::SystemClock;
use crate::device::controller::start;
use crate::device::types::{DeviceEvent, SessionState};
use crate::gui::types::Message;

const DEVICE_EVENT_BUFFER: usize = 64;

async fn run_controller(mut output: Sender<Message>) -> Infallible {
    let radio = match BtleRadio::new().await {
        Ok(v) => v,
        Err(err) => {
            error!("Failed to open Bluetooth adapter: {}", err);
            let event = DeviceEvent::StateChanged(SessionState::Idle, Some(err.to_string()));
            let _ = output.send(Message::DeviceEvent(event)).await;
            return pending().await;
        },
    };

    let (events_tx, mut events_rx) = channel(DEVICE_EVENT_BUFFER);
    let (handle, controller) = start(radio, Arc::new(SystemClock), events_tx);

    if output.send(Message::ControllerReady(handle)).await.is_err() {
        error!("Application stopped listening before the controller started");
        return pending().await;
    }

    let forward = async {
        while let Some(event) = events_rx.next().await {
            if output.send(Message::DeviceEvent(event)).await.is_err() {
                break;
            }
        }
    };

    futures::join!(controller, forward);
    info!("Device subscription finished");

    // note: subscription::channel expects the future to never resolve (Infallible)
    pending().await
}

/// Owns the connection controller for the lifetime of the window. Emits
/// [`Message::ControllerReady`] once, followed by every [`DeviceEvent`].
pub fn connect_device_subscription() -> Subscription<Message> {
    struct Connect;

    subscription::channel(
        std::any::TypeId::of::<Connect>(),
        DEVICE_EVENT_BUFFER,
        run_controller,
    )
}
