//! Runs the connection controller without a window: connect once, log every reading, and stop
//! when the connection ends or on Ctrl-C.

use std::path::Path;
use std::sync::Arc;
use futures::channel::mpsc::channel;
use futures::StreamExt;
use log::{error, info, warn};

use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::device::btle::BtleRadio;
use crate::device::clock::SystemClock;
use crate::device::controller::start;
use crate::device::types::{DeviceEvent, SessionState};
use crate::error::AppRunError;
use crate::gui::threshold::threshold_level;

const DEVICE_EVENT_BUFFER: usize = 64;

async fn read_config(config_io: &ConfigIO) -> Config {
    match config_io.read().await {
        Ok(config) => config,
        Err(err) => {
            warn!("Failed to load config, using defaults: {}", err);
            Config::default()
        },
    }
}

async fn headless(config_io: ConfigIO) -> Result<(), AppRunError> {
    let config = read_config(&config_io).await;
    let radio = BtleRadio::new().await?;

    let (events_tx, mut events_rx) = channel(DEVICE_EVENT_BUFFER);
    let (handle, controller) = start(radio, Arc::new(SystemClock), events_tx);
    let controller = tokio::spawn(controller);

    handle.toggle_connection().await?;

    loop {
        tokio::select! {
            event = events_rx.next() => match event {
                Some(DeviceEvent::StateChanged(SessionState::Idle, reason)) => {
                    info!("Connection ended: {}", reason.unwrap_or_default());
                    break;
                },
                Some(DeviceEvent::StateChanged(state, reason)) => {
                    info!("{}{}", state, reason.map(|r| format!(" ({})", r)).unwrap_or_default());
                },
                Some(DeviceEvent::ReadingAdded(reading)) => {
                    let level = threshold_level(reading.value(), &config.thresholds);
                    info!("Pressure {:.1}% ({:?})", reading.value(), level);
                },
                Some(DeviceEvent::HistoryCleared) => {},
                None => break,
            },
            result = tokio::signal::ctrl_c() => {
                if let Err(err) = result {
                    error!("Failed to listen for Ctrl-C: {}", err);
                }
                info!("Interrupted, disconnecting");
                break;
            },
        }
    }

    // nobody reads the remaining events, so the controller must not wait on them
    drop(events_rx);

    if let Err(err) = handle.shutdown().await {
        warn!("Failed to shut down connection controller: {}", err);
    }
    if let Err(err) = controller.await {
        error!("Connection controller task failed: {}", err);
    }
    Ok(())
}

pub fn run_headless(config_path: Option<&Path>) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync(config_path)?;
    let mut config_locker = config_io.locker()?;
    let _lock_guard = config_locker.lock()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|source| AppRunError::Runtime { source })?;

    runtime.block_on(headless(config_io))
}
