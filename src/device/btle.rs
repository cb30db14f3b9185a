use std::future::Future;
use btleplug::api::{Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter, Service};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use futures::StreamExt;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::device::radio::{GattCharacteristic, GattService, NotificationStream, Radio, ScanStream};
use crate::device::types::DeviceIdentity;
use crate::error::DeviceError;

/// [`Radio`] backed by the first bluetooth adapter btleplug reports.
#[derive(Debug, Clone)]
pub struct BtleRadio {
    adapter: Adapter,
}

impl BtleRadio {
    pub async fn new() -> Result<Self, DeviceError> {
        let manager = Manager::new().await?;
        let adapter = manager.adapters().await?
            .into_iter()
            .next()
            .ok_or(DeviceError::AdapterUnavailable)?;

        info!("Using adapter {}", adapter.adapter_info().await.unwrap_or("UNKNOWN".to_string()));
        Ok(BtleRadio { adapter })
    }
}

async fn identify(adapter: &Adapter, id: &PeripheralId, name_filter: &str) -> Option<DeviceIdentity<Peripheral>> {
    let peripheral = match adapter.peripheral(id).await {
        Ok(v) => v,
        Err(err) => {
            warn!("Failed to query BLE adapter for peripheral: {}", err);
            return None;
        },
    };

    match peripheral.properties().await {
        Err(err) => {
            warn!("Could not query peripheral for properties: {:?}", err);
            None
        },
        Ok(None) => None,
        Ok(Some(properties)) => {
            // btleplug can only filter on services, so the name is matched here
            let name = properties.local_name?;
            if name != name_filter {
                debug!("Ignoring peripheral {} {}", properties.address, name);
                return None;
            }

            info!("Using peripheral {} {:?} {}", properties.address, properties.address_type, name);
            Some(DeviceIdentity::new(peripheral, name))
        },
    }
}

impl From<&Service> for GattService {
    fn from(service: &Service) -> Self {
        GattService {
            uuid: service.uuid,
            characteristics: service.characteristics
                .iter()
                .map(|characteristic| GattCharacteristic {
                    uuid: characteristic.uuid,
                    descriptors: characteristic.descriptors.iter().map(|d| d.uuid).collect(),
                })
                .collect(),
        }
    }
}

impl Radio for BtleRadio {
    type Peripheral = Peripheral;

    fn is_adapter_enabled(&self) -> impl Future<Output = bool> + Send {
        let adapter = self.adapter.clone();

        async move {
            match adapter.adapter_state().await {
                Ok(CentralState::PoweredOff) => false,
                Ok(_) => true,
                // not every backend reports a state, let the scan itself fail instead
                Err(err) => {
                    debug!("Failed to query adapter state: {}", err);
                    true
                },
            }
        }
    }

    fn start_scan(&self, name_filter: &str) -> impl Future<Output = Result<ScanStream<Peripheral>, DeviceError>> + Send {
        let adapter = self.adapter.clone();
        let name_filter = name_filter.to_string();

        async move {
            let events = adapter.events().await?;
            adapter.start_scan(ScanFilter::default()).await?;

            let stream = events.filter_map(move |event| {
                let adapter = adapter.clone();
                let name_filter = name_filter.clone();

                async move {
                    match event {
                        CentralEvent::DeviceDiscovered(id) | CentralEvent::DeviceUpdated(id) => {
                            identify(&adapter, &id, &name_filter).await.map(Ok::<_, DeviceError>)
                        },
                        _ => None,
                    }
                }
            });

            Ok(stream.boxed())
        }
    }

    fn stop_scan(&self) -> impl Future<Output = Result<(), DeviceError>> + Send {
        let adapter = self.adapter.clone();

        async move {
            adapter.stop_scan().await?;
            Ok(())
        }
    }

    fn open_connection(&self, identity: DeviceIdentity<Peripheral>) -> impl Future<Output = Result<Peripheral, DeviceError>> + Send {
        async move {
            let peripheral = identity.into_peripheral();
            peripheral.connect().await?;
            Ok(peripheral)
        }
    }

    fn close_connection(&self, handle: &Peripheral) -> impl Future<Output = Result<(), DeviceError>> + Send {
        let peripheral = handle.clone();

        async move {
            peripheral.disconnect().await?;
            Ok(())
        }
    }

    fn discover_services(&self, handle: &Peripheral) -> impl Future<Output = Result<Vec<GattService>, DeviceError>> + Send {
        let peripheral = handle.clone();

        async move {
            peripheral.discover_services().await?;
            Ok(peripheral.services().iter().map(GattService::from).collect())
        }
    }

    fn enable_notifications(&self, handle: &Peripheral, service: Uuid, characteristic: Uuid) -> impl Future<Output = Result<(), DeviceError>> + Send {
        let peripheral = handle.clone();

        async move {
            let target = peripheral.characteristics()
                .into_iter()
                .find(|c| c.service_uuid == service && c.uuid == characteristic)
                .ok_or(DeviceError::CharacteristicNotFound)?;

            // btleplug writes the CCCD as part of subscribe()
            peripheral.subscribe(&target).await?;
            Ok(())
        }
    }

    fn notifications(&self, handle: &Peripheral, characteristic: Uuid) -> impl Future<Output = Result<NotificationStream, DeviceError>> + Send {
        let peripheral = handle.clone();

        async move {
            let stream = peripheral.notifications().await?
                .filter_map(move |notification| async move {
                    if notification.uuid == characteristic {
                        Some(notification.value)
                    } else {
                        None
                    }
                });

            Ok(stream.boxed())
        }
    }

    fn link_lost(&self, handle: &Peripheral) -> impl Future<Output = ()> + Send {
        let adapter = self.adapter.clone();
        let id = handle.id();

        async move {
            let mut events = match adapter.events().await {
                Ok(v) => v,
                Err(err) => {
                    warn!("Failed to watch adapter events, link loss will go unnoticed: {}", err);
                    return futures::future::pending().await;
                },
            };

            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(disconnected) = event {
                    if disconnected == id {
                        return;
                    }
                }
            }

            warn!("Adapter event stream ended");
        }
    }
}
