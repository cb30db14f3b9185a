use std::io;
use thiserror::Error;
use msgbox::IconType;
use std::fmt::{Debug, Display};
use std::str::Utf8Error;
use btleplug;
use iced;
use serde_json;

use crate::device::constants::EXPECTED_DEVICE_NAME;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to determine path to config file")]
    NoConfigPath,

    #[error("Failed to acquire file lock on config file: {source}")]
    CanNotLock { source: io::Error },

    #[error("Failed to encode/decode config as utf-8: {source}")]
    Utf8Error { #[from] source: Utf8Error },

    #[error("Failed to read/write config file: {source}")]
    IOError { #[from] source: io::Error },

    #[error("Failed to parse/build config file: {source}")]
    JsonError { #[from] source: serde_json::Error },
}

impl ConfigError {
    pub fn is_file_not_found_error(&self) -> bool {
        match self {
            ConfigError::IOError { source } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppRunError {
    #[error("Failed to start application (iced): {source}")]
    Iced { #[from] source: iced::Error },

    #[error("Failed to start application (config): {source}")]
    ConfigError { #[from] source: ConfigError },

    #[error("Failed to start application (device): {source}")]
    Device { #[from] source: DeviceError },

    #[error("Failed to start async runtime: {source}")]
    Runtime { source: io::Error },
}

/// Errors that end a connection attempt. Every variant returns the controller to `Idle`; the
/// `Display` text is what the user gets to see as the reason.
#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("Bluetooth adapter is unavailable or disabled")]
    AdapterUnavailable,

    #[error("{} not found", EXPECTED_DEVICE_NAME)]
    ScanTimeout,

    #[error("Scan error: {0}")]
    ScanFailed(i32),

    #[error("Scan cancelled")]
    ScanCancelled,

    #[error("Disconnected")]
    ConnectionLost,

    #[error("Characteristic not found")]
    CharacteristicNotFound,

    #[error("Error communicating with device (btleplug): {source}")]
    Btle { #[from] source: btleplug::Error },

    #[error("The connection controller is no longer running")]
    ControllerStopped,
}

/// A notification payload that could not be turned into a reading.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Packet too short: expected at least 4 bytes, got {len}")]
    TooShort { len: usize },
}

pub fn error_msgbox<T: Display>(message: &'static str, error: &T) {
    let message = format!("{}: {}", message, error);
    eprintln!("{}", &message);
    if let Err(err) = msgbox::create(concat!("Pressure BLE ", env!("CARGO_PKG_VERSION")), &message, IconType::Error) {
        eprintln!("Failed to create msgbox: {:?}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_name_the_device_in_scan_timeout() {
        assert_eq!(DeviceError::ScanTimeout.to_string(), "ESP32_Pressure not found");
    }

    #[test]
    fn should_display_scan_failure_code() {
        assert_eq!(DeviceError::ScanFailed(2).to_string(), "Scan error: 2");
    }

    #[test]
    fn should_display_too_short_packet() {
        let err = DecodeError::TooShort { len: 3 };
        assert_eq!(err.to_string(), "Packet too short: expected at least 4 bytes, got 3");
    }

    #[test]
    fn should_only_treat_not_found_as_missing_config() {
        let missing = ConfigError::IOError { source: io::Error::from(io::ErrorKind::NotFound) };
        let denied = ConfigError::IOError { source: io::Error::from(io::ErrorKind::PermissionDenied) };
        assert!(missing.is_file_not_found_error());
        assert!(!denied.is_file_not_found_error());
        assert!(!ConfigError::NoConfigPath.is_file_not_found_error());
    }
}
