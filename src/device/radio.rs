//! The platform BLE stack as seen by the connection controller.
//!
//! Everything the radio reports asynchronously (advertisements, notifications, link loss) comes
//! back as a stream or future, so it can be forwarded onto the controller's channel instead of
//! running handler code on the stack's own threads.

use std::fmt::Debug;
use std::future::Future;
use futures::stream::BoxStream;
use uuid::Uuid;

use crate::device::types::DeviceIdentity;
use crate::error::DeviceError;

pub type ScanStream<P> = BoxStream<'static, Result<DeviceIdentity<P>, DeviceError>>;
pub type NotificationStream = BoxStream<'static, Vec<u8>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattCharacteristic {
    pub uuid: Uuid,
    pub descriptors: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GattService {
    pub uuid: Uuid,
    pub characteristics: Vec<GattCharacteristic>,
}

pub trait Radio: Clone + Send + Sync + 'static {
    /// Connection handle for a single peripheral.
    type Peripheral: Clone + Debug + Send + Sync + 'static;

    fn is_adapter_enabled(&self) -> impl Future<Output = bool> + Send;

    /// Start scanning. The stream yields advertisements whose local name equals `name_filter`
    /// when the platform can filter; callers must still check the name themselves.
    fn start_scan(
        &self,
        name_filter: &str,
    ) -> impl Future<Output = Result<ScanStream<Self::Peripheral>, DeviceError>> + Send;

    fn stop_scan(&self) -> impl Future<Output = Result<(), DeviceError>> + Send;

    fn open_connection(
        &self,
        identity: DeviceIdentity<Self::Peripheral>,
    ) -> impl Future<Output = Result<Self::Peripheral, DeviceError>> + Send;

    fn close_connection(
        &self,
        handle: &Self::Peripheral,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send;

    fn discover_services(
        &self,
        handle: &Self::Peripheral,
    ) -> impl Future<Output = Result<Vec<GattService>, DeviceError>> + Send;

    /// Write the CCCD of the given characteristic to enable notifications.
    fn enable_notifications(
        &self,
        handle: &Self::Peripheral,
        service: Uuid,
        characteristic: Uuid,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send;

    /// Raw payloads of notifications sent by `characteristic`, in arrival order.
    fn notifications(
        &self,
        handle: &Self::Peripheral,
        characteristic: Uuid,
    ) -> impl Future<Output = Result<NotificationStream, DeviceError>> + Send;

    /// Resolves once the platform reports that the link to `handle` dropped.
    fn link_lost(&self, handle: &Self::Peripheral) -> impl Future<Output = ()> + Send;
}
