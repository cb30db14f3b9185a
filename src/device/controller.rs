//! The connection lifecycle state machine.
//!
//! A single task owns the [`SessionState`], the [`ReadingHistory`] and the active
//! [`GattSession`]. Commands from the UI and results of radio operations both arrive on
//! channels and are handled one at a time. Radio operations run in spawned tasks and report
//! back tagged with the attempt number they were started under; a result whose attempt or
//! expected state no longer matches is stale and gets discarded.

use std::future::Future;
use std::sync::Arc;
use futures::channel::mpsc::{channel, Receiver, Sender};
use futures::channel::oneshot;
use futures::{SinkExt, StreamExt};
use log::{debug, info, warn};
use tokio::spawn;

use crate::device::clock::Clock;
use crate::device::constants::{EXPECTED_DEVICE_NAME, SCAN_TIMEOUT};
use crate::device::history::ReadingHistory;
use crate::device::link::BleLink;
use crate::device::radio::Radio;
use crate::device::session::GattSession;
use crate::device::types::{DeviceEvent, DeviceIdentity, Reading, SessionState};
use crate::error::DeviceError;

const COMMAND_BUFFER: usize = 8;
const LINK_EVENT_BUFFER: usize = 64;

#[derive(Debug)]
enum Command {
    ToggleConnection,
    Clear,
    Snapshot(oneshot::Sender<Vec<Reading>>),
    Shutdown(oneshot::Sender<()>),
}

/// Results of asynchronous radio work, marshalled back onto the controller task.
pub enum LinkEvent<R: Radio> {
    ScanFinished { attempt: u64, outcome: Result<DeviceIdentity<R::Peripheral>, DeviceError> },
    Connected { attempt: u64, outcome: Result<GattSession<R>, DeviceError> },
    Subscribed { attempt: u64, outcome: Result<(), DeviceError> },
    Reading { attempt: u64, reading: Reading },
    LinkLost { attempt: u64 },
}

impl<R: Radio> LinkEvent<R> {
    fn attempt(&self) -> u64 {
        match self {
            LinkEvent::ScanFinished { attempt, .. }
            | LinkEvent::Connected { attempt, .. }
            | LinkEvent::Subscribed { attempt, .. }
            | LinkEvent::Reading { attempt, .. }
            | LinkEvent::LinkLost { attempt } => *attempt,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            LinkEvent::ScanFinished { .. } => "scan result",
            LinkEvent::Connected { .. } => "connection result",
            LinkEvent::Subscribed { .. } => "subscription result",
            LinkEvent::Reading { .. } => "reading",
            LinkEvent::LinkLost { .. } => "link loss",
        }
    }
}

/// Cloneable handle used by the UI to drive the controller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    commands: Sender<Command>,
}

impl ControllerHandle {
    async fn send(&self, command: Command) -> Result<(), DeviceError> {
        let mut commands = self.commands.clone();
        commands.send(command).await.map_err(|_| DeviceError::ControllerStopped)
    }

    /// Connect when idle, disconnect when connected. Ignored while a scan or a disconnect is in
    /// progress.
    pub async fn toggle_connection(&self) -> Result<(), DeviceError> {
        self.send(Command::ToggleConnection).await
    }

    pub async fn clear(&self) -> Result<(), DeviceError> {
        self.send(Command::Clear).await
    }

    /// The current history, newest first.
    pub async fn snapshot(&self) -> Result<Vec<Reading>, DeviceError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| DeviceError::ControllerStopped)
    }

    /// Force a disconnect and stop the controller. Resolves once the connection is released.
    pub async fn shutdown(&self) -> Result<(), DeviceError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx)).await?;
        rx.await.map_err(|_| DeviceError::ControllerStopped)
    }
}

pub struct ConnectionController<R: Radio> {
    link: BleLink<R>,
    clock: Arc<dyn Clock>,
    state: SessionState,
    attempt: u64,
    session: Option<GattSession<R>>,
    history: ReadingHistory,
    events: Sender<DeviceEvent>,
    link_events: Sender<LinkEvent<R>>,
}

/// Create a controller for `radio`. The returned future is the controller task: it must be
/// spawned (or awaited) exactly once and completes after [`ControllerHandle::shutdown`] or once
/// every handle is dropped.
pub fn start<R: Radio>(radio: R, clock: Arc<dyn Clock>, events: Sender<DeviceEvent>) -> (ControllerHandle, impl Future<Output = ()> + Send + 'static) {
    let (command_tx, command_rx) = channel(COMMAND_BUFFER);
    let (link_tx, link_rx) = channel(LINK_EVENT_BUFFER);
    let controller = ConnectionController::new(radio, clock, events, link_tx);

    (ControllerHandle { commands: command_tx }, controller.run(command_rx, link_rx))
}

impl<R: Radio> ConnectionController<R> {
    fn new(radio: R, clock: Arc<dyn Clock>, events: Sender<DeviceEvent>, link_events: Sender<LinkEvent<R>>) -> Self {
        ConnectionController {
            link: BleLink::new(radio),
            clock,
            state: SessionState::Idle,
            attempt: 0,
            session: None,
            history: ReadingHistory::new(),
            events,
            link_events,
        }
    }

    async fn run(mut self, mut commands: Receiver<Command>, mut link_events: Receiver<LinkEvent<R>>) {
        loop {
            tokio::select! {
                command = commands.next() => match command {
                    Some(Command::ToggleConnection) => self.toggle_connection().await,
                    Some(Command::Clear) => self.clear().await,
                    Some(Command::Snapshot(reply)) => {
                        let _ = reply.send(self.history.snapshot());
                    },
                    Some(Command::Shutdown(done)) => {
                        self.shutdown().await;
                        let _ = done.send(());
                        break;
                    },
                    None => {
                        info!("All controller handles dropped");
                        self.shutdown().await;
                        break;
                    },
                },
                Some(event) = link_events.next() => self.handle_link_event(event).await,
            }
        }

        info!("Connection controller stopped");
    }

    async fn emit(&mut self, event: DeviceEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Nobody is listening for device events");
        }
    }

    async fn set_state(&mut self, state: SessionState, reason: Option<String>) {
        info!("{:?} -> {:?}{}", self.state, state, reason.as_ref().map(|r| format!(" ({})", r)).unwrap_or_default());
        self.state = state;
        self.emit(DeviceEvent::StateChanged(state, reason)).await;
    }

    /// Return to `Idle`. Bumping the attempt turns every outstanding radio result stale.
    async fn set_idle(&mut self, reason: Option<String>) {
        self.attempt += 1;
        self.set_state(SessionState::Idle, reason).await;
    }

    async fn toggle_connection(&mut self) {
        match self.state {
            SessionState::Idle => self.start_scan().await,
            SessionState::Connecting | SessionState::DiscoveringServices | SessionState::Subscribed => {
                self.disconnect().await
            },
            SessionState::Scanning | SessionState::Disconnecting => {
                debug!("Ignoring connection toggle while {:?}", self.state);
            },
        }
    }

    async fn clear(&mut self) {
        self.history.clear();
        self.emit(DeviceEvent::HistoryCleared).await;
    }

    async fn start_scan(&mut self) {
        if !self.link.is_adapter_enabled().await {
            warn!("Bluetooth adapter unavailable");
            self.set_idle(Some(DeviceError::AdapterUnavailable.to_string())).await;
            return;
        }

        self.attempt += 1;
        let attempt = self.attempt;
        self.set_state(SessionState::Scanning, None).await;

        let scan = self.link.scan(EXPECTED_DEVICE_NAME, SCAN_TIMEOUT);
        let mut link_events = self.link_events.clone();
        spawn(async move {
            let outcome = scan.await;
            let _ = link_events.send(LinkEvent::ScanFinished { attempt, outcome }).await;
        });
    }

    async fn release_session(&mut self) {
        if let Some(session) = self.session.take() {
            session.close().await;
        }
    }

    async fn disconnect(&mut self) {
        if self.session.is_some() {
            self.set_state(SessionState::Disconnecting, None).await;
            self.release_session().await;
        }
        self.set_idle(Some(DeviceError::ConnectionLost.to_string())).await;
    }

    async fn shutdown(&mut self) {
        self.link.cancel_scan();
        if self.state != SessionState::Idle {
            self.disconnect().await;
        }
    }

    async fn handle_link_event(&mut self, event: LinkEvent<R>) {
        if event.attempt() != self.attempt {
            return self.discard(event).await;
        }

        match event {
            LinkEvent::ScanFinished { outcome, .. } if self.state == SessionState::Scanning => {
                self.on_scan_finished(outcome).await
            },
            LinkEvent::Connected { outcome, .. } if self.state == SessionState::Connecting => {
                self.on_connected(outcome).await
            },
            LinkEvent::Subscribed { outcome, .. } if self.state == SessionState::DiscoveringServices => {
                self.on_subscribed(outcome).await
            },
            LinkEvent::Reading { reading, .. } if self.state == SessionState::Subscribed => {
                self.history.push(reading);
                self.emit(DeviceEvent::ReadingAdded(reading)).await;
            },
            LinkEvent::LinkLost { .. } if self.state.is_connected() => {
                warn!("Link to {} dropped", EXPECTED_DEVICE_NAME);
                self.release_session().await;
                self.set_idle(Some(DeviceError::ConnectionLost.to_string())).await;
            },
            event => self.discard(event).await,
        }
    }

    async fn discard(&mut self, event: LinkEvent<R>) {
        debug!("Discarding stale {} (attempt {}, current {} in {:?})", event.kind(), event.attempt(), self.attempt, self.state);

        if let LinkEvent::Connected { outcome: Ok(session), .. } = event {
            info!("Connection completed after it was cancelled");
            session.close().await;
        }
    }

    async fn on_scan_finished(&mut self, outcome: Result<DeviceIdentity<R::Peripheral>, DeviceError>) {
        let identity = match outcome {
            Ok(v) => v,
            Err(err) => {
                warn!("Scanning failed: {}", err);
                return self.set_idle(Some(err.to_string())).await;
            },
        };

        let reason = format!("Connecting to {}...", identity.name());
        self.set_state(SessionState::Connecting, Some(reason)).await;

        let attempt = self.attempt;
        let radio = self.link.radio().clone();
        let clock = self.clock.clone();
        let mut link_events = self.link_events.clone();
        spawn(async move {
            let outcome = GattSession::open(radio, identity, clock).await;
            let _ = link_events.send(LinkEvent::Connected { attempt, outcome }).await;
        });
    }

    async fn on_connected(&mut self, outcome: Result<GattSession<R>, DeviceError>) {
        let session = match outcome {
            Ok(v) => v,
            Err(err) => {
                warn!("Connecting to peripheral failed: {}", err);
                return self.set_idle(Some(err.to_string())).await;
            },
        };

        spawn(session.run(self.attempt, self.link_events.clone()));
        let reason = format!("Connected to {}, discovering services...", session.name());
        self.session = Some(session);
        self.set_state(SessionState::DiscoveringServices, Some(reason)).await;
    }

    async fn on_subscribed(&mut self, outcome: Result<(), DeviceError>) {
        match outcome {
            Ok(()) => self.set_state(SessionState::Subscribed, None).await,
            Err(err) => {
                warn!("Subscribing failed: {}", err);
                self.release_session().await;
                self.set_idle(Some(err.to_string())).await;
            },
        }
    }
}
