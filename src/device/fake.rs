//! Scripted [`Radio`] for tests. Advertisements and notifications are buffered until the code
//! under test starts consuming them, so tests can queue them up front.

use std::future::Future;
use std::sync::{Arc, Mutex};
use futures::channel::mpsc::{unbounded, UnboundedReceiver, UnboundedSender};
use futures::StreamExt;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::device::constants::{CCCD_UUID, PRESSURE_CHARACTERISTIC_UUID, PRESSURE_SERVICE_UUID};
use crate::device::radio::{GattCharacteristic, GattService, NotificationStream, Radio, ScanStream};
use crate::device::types::DeviceIdentity;
use crate::error::DeviceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakePeripheral {
    pub id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeCalls {
    pub start_scan: usize,
    pub stop_scan: usize,
    pub open_connection: usize,
    pub close_connection: usize,
    pub enable_notifications: usize,
}

struct FakeState {
    adapter_enabled: bool,
    connect_fails: bool,
    services: Vec<GattService>,
    next_id: u32,
    advertisements: Option<UnboundedReceiver<Result<DeviceIdentity<FakePeripheral>, DeviceError>>>,
    notifications: Option<UnboundedReceiver<Vec<u8>>>,
    calls: FakeCalls,
}

#[derive(Clone)]
pub struct FakeRadio {
    state: Arc<Mutex<FakeState>>,
    advertise_tx: UnboundedSender<Result<DeviceIdentity<FakePeripheral>, DeviceError>>,
    notify_tx: UnboundedSender<Vec<u8>>,
    link_lost: Arc<Notify>,
}

pub fn compatible_services() -> Vec<GattService> {
    vec![GattService {
        uuid: PRESSURE_SERVICE_UUID,
        characteristics: vec![GattCharacteristic {
            uuid: PRESSURE_CHARACTERISTIC_UUID,
            descriptors: vec![CCCD_UUID],
        }],
    }]
}

impl FakeRadio {
    pub fn new() -> Self {
        let (advertise_tx, advertise_rx) = unbounded();
        let (notify_tx, notify_rx) = unbounded();

        FakeRadio {
            state: Arc::new(Mutex::new(FakeState {
                adapter_enabled: true,
                connect_fails: false,
                services: compatible_services(),
                next_id: 0,
                advertisements: Some(advertise_rx),
                notifications: Some(notify_rx),
                calls: FakeCalls::default(),
            })),
            advertise_tx,
            notify_tx,
            link_lost: Arc::new(Notify::new()),
        }
    }

    pub fn with_services(self, services: Vec<GattService>) -> Self {
        self.state.lock().unwrap().services = services;
        self
    }

    pub fn disable_adapter(&self) {
        self.state.lock().unwrap().adapter_enabled = false;
    }

    pub fn fail_connect(&self) {
        self.state.lock().unwrap().connect_fails = true;
    }

    pub fn advertise(&self, name: &str) {
        let id = {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            state.next_id - 1
        };
        self.advertise_tx
            .unbounded_send(Ok(DeviceIdentity::new(FakePeripheral { id }, name)))
            .unwrap();
    }

    pub fn fail_scan(&self, code: i32) {
        self.advertise_tx.unbounded_send(Err(DeviceError::ScanFailed(code))).unwrap();
    }

    pub fn notify(&self, payload: &[u8]) {
        self.notify_tx.unbounded_send(payload.to_vec()).unwrap();
    }

    pub fn drop_link(&self) {
        self.link_lost.notify_one();
    }

    pub fn calls(&self) -> FakeCalls {
        self.state.lock().unwrap().calls.clone()
    }
}

impl Radio for FakeRadio {
    type Peripheral = FakePeripheral;

    fn is_adapter_enabled(&self) -> impl Future<Output = bool> + Send {
        let enabled = self.state.lock().unwrap().adapter_enabled;
        async move { enabled }
    }

    fn start_scan(&self, _name_filter: &str) -> impl Future<Output = Result<ScanStream<FakePeripheral>, DeviceError>> + Send {
        let mut state = self.state.lock().unwrap();
        state.calls.start_scan += 1;
        let stream = match state.advertisements.take() {
            Some(receiver) => receiver.boxed(),
            None => futures::stream::pending().boxed(),
        };
        async move { Ok(stream) }
    }

    fn stop_scan(&self) -> impl Future<Output = Result<(), DeviceError>> + Send {
        self.state.lock().unwrap().calls.stop_scan += 1;
        async { Ok(()) }
    }

    fn open_connection(&self, identity: DeviceIdentity<FakePeripheral>) -> impl Future<Output = Result<FakePeripheral, DeviceError>> + Send {
        let mut state = self.state.lock().unwrap();
        state.calls.open_connection += 1;
        let result = if state.connect_fails {
            Err(DeviceError::ConnectionLost)
        } else {
            Ok(identity.into_peripheral())
        };
        async move { result }
    }

    fn close_connection(&self, _handle: &FakePeripheral) -> impl Future<Output = Result<(), DeviceError>> + Send {
        self.state.lock().unwrap().calls.close_connection += 1;
        async { Ok(()) }
    }

    fn discover_services(&self, _handle: &FakePeripheral) -> impl Future<Output = Result<Vec<GattService>, DeviceError>> + Send {
        let services = self.state.lock().unwrap().services.clone();
        async move { Ok(services) }
    }

    fn enable_notifications(&self, _handle: &FakePeripheral, _service: Uuid, _characteristic: Uuid) -> impl Future<Output = Result<(), DeviceError>> + Send {
        self.state.lock().unwrap().calls.enable_notifications += 1;
        async { Ok(()) }
    }

    fn notifications(&self, _handle: &FakePeripheral, _characteristic: Uuid) -> impl Future<Output = Result<NotificationStream, DeviceError>> + Send {
        let stream = match self.state.lock().unwrap().notifications.take() {
            Some(receiver) => receiver.boxed(),
            None => futures::stream::pending().boxed(),
        };
        async move { Ok(stream) }
    }

    fn link_lost(&self, _handle: &FakePeripheral) -> impl Future<Output = ()> + Send {
        let link_lost = self.link_lost.clone();
        async move { link_lost.notified().await }
    }
}
