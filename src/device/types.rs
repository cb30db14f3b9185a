use std::fmt;
use std::time::SystemTime;

/// One decoded pressure sample. The value is a percentage and is passed through unclamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    value: f32,
    timestamp: SystemTime,
}

impl Reading {
    pub fn new(value: f32, timestamp: SystemTime) -> Self {
        Reading { value, timestamp }
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }
}

/// A peripheral found by a scan, together with the name it advertised.
///
/// Deliberately not `Clone`: an identity is consumed exactly once, by opening a connection.
#[derive(Debug)]
pub struct DeviceIdentity<P> {
    peripheral: P,
    name: String,
}

impl<P> DeviceIdentity<P> {
    pub fn new(peripheral: P, name: impl Into<String>) -> Self {
        DeviceIdentity { peripheral, name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_peripheral(self) -> P {
        self.peripheral
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Scanning,
    Connecting,
    DiscoveringServices,
    Subscribed,
    Disconnecting,
}

impl SessionState {
    /// True for every state in which a connection exists or is being set up.
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            SessionState::Connecting | SessionState::DiscoveringServices | SessionState::Subscribed
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let result = match self {
            SessionState::Idle => "Idle",
            SessionState::Scanning => "Scanning…",
            SessionState::Connecting => "Connecting…",
            SessionState::DiscoveringServices => "Discovering services…",
            SessionState::Subscribed => "Receiving data",
            SessionState::Disconnecting => "Disconnecting…",
        };

        write!(f, "{}", result)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceEvent {
    StateChanged(SessionState, Option<String>),
    ReadingAdded(Reading),
    HistoryCleared,
}
