use std::fmt::Write;
use std::path::Path;
use std::time::SystemTime;
use chrono::{DateTime, Local};
use iced::{Alignment, Application, Command, Element, Length, Settings, Size, Subscription, window};
use iced::event::{self, Event};
use iced::theme::{self, Theme};
use iced::widget::{Column, button, column, container, horizontal_rule, row, scrollable, text};
use log::{error, info, warn};

use crate::config::io::ConfigIO;
use crate::config::types::Config;
use crate::device::controller::ControllerHandle;
use crate::device::history::ReadingHistory;
use crate::device::types::{DeviceEvent, Reading, SessionState};
use crate::error::AppRunError;
use crate::gui::style::{level_color, StatusCardStyleSheet};
use crate::gui::subscription::connect_device_subscription;
use crate::gui::threshold::threshold_level;
use crate::gui::types::Message;

const FALLBACK_TIME_FORMAT: &str = "%H:%M:%S";

pub struct ApplicationFlags {
    config_io: ConfigIO,
}

pub struct MyApplication {
    // messages that the user must click away
    notices: Vec<String>,

    config_io: ConfigIO,
    config: Config,

    // None until the device subscription has started the controller, and again once shutdown
    // has been requested
    controller: Option<ControllerHandle>,

    state: SessionState,
    reason: Option<String>,

    // mirrors the controller's history from DeviceEvents
    history: ReadingHistory,
}

/// Label of the connect/disconnect button, and whether it can be pressed in this state.
fn toggle_label(state: SessionState) -> (&'static str, bool) {
    match state {
        SessionState::Idle => ("Scan", true),
        SessionState::Scanning => ("Scanning…", false),
        SessionState::Connecting | SessionState::DiscoveringServices | SessionState::Subscribed => ("Disconnect", true),
        SessionState::Disconnecting => ("Disconnecting…", false),
    }
}

/// Local wall clock time of a reading. A format string chrono can not render falls back to
/// HH:MM:SS instead of panicking.
fn format_time(timestamp: SystemTime, format: &str) -> String {
    let time: DateTime<Local> = timestamp.into();
    let mut result = String::new();
    if write!(result, "{}", time.format(format)).is_err() {
        result.clear();
        let _ = write!(result, "{}", time.format(FALLBACK_TIME_FORMAT));
    }
    result
}

impl MyApplication {
    fn load_config(&self) -> Command<Message> {
        let config_io = self.config_io.clone();

        let fut = async move {
            match config_io.read().await {
                Ok(config) => (config, None),
                Err(err) => {
                    let mut error_message: Option<String> = None;

                    if err.is_file_not_found_error() {
                        info!("Config file not found, using defaults");
                    } else {
                        error!("Failed to load config: {:?}", &err);
                        error_message = Some(format!("Failed to load config: {}", &err));
                    }
                    (Config::default(), error_message)
                }
            }
        };

        Command::perform(fut, Message::ConfigLoadComplete)
    }

    fn toggle_connection(&self) -> Command<Message> {
        let Some(handle) = self.controller.clone() else {
            return Command::none();
        };

        let fut = async move {
            handle.toggle_connection().await.err().map(|err| err.to_string())
        };

        Command::perform(fut, Message::CommandSent)
    }

    fn clear_history(&self) -> Command<Message> {
        let Some(handle) = self.controller.clone() else {
            return Command::none();
        };

        let fut = async move {
            handle.clear().await.err().map(|err| err.to_string())
        };

        Command::perform(fut, Message::CommandSent)
    }

    // Disconnect from the sensor before the window goes away
    fn before_close(&mut self, id: window::Id) -> Command<Message> {
        let Some(handle) = self.controller.take() else {
            return window::close(id);
        };

        let fut = async move {
            if let Err(err) = handle.shutdown().await {
                warn!("Failed to shut down connection controller: {}", err);
            }
        };

        Command::perform(fut, move |_| Message::ShutdownComplete(id))
    }

    fn handle_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::StateChanged(state, reason) => {
                self.state = state;
                self.reason = reason;
            },
            DeviceEvent::ReadingAdded(reading) => {
                self.history.push(reading);
            },
            DeviceEvent::HistoryCleared => {
                self.history.clear();
            },
        }
    }

    fn reading_row(&self, reading: &Reading) -> Element<Message> {
        let color = level_color(threshold_level(reading.value(), &self.config.thresholds));

        row![
            text(format!("{:.1}%", reading.value())).style(color).width(80),
            text(format_time(reading.timestamp(), &self.config.time_format)),
        ]
        .spacing(20)
        .into()
    }
}

impl Application for MyApplication {
    type Executor = iced::executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = ApplicationFlags;

    fn new(flags: ApplicationFlags) -> (MyApplication, Command<Self::Message>) {
        let app = MyApplication {
            notices: Vec::new(),
            config_io: flags.config_io,
            config: Config::default(),
            controller: None,
            state: SessionState::Idle,
            reason: None,
            history: ReadingHistory::new(),
        };

        let command = app.load_config();
        (app, command)
    }

    fn title(&self) -> String {
        String::from(concat!("Pressure BLE ", env!("CARGO_PKG_VERSION")))
    }

    fn update(&mut self, message: Message) -> Command<Self::Message> {
        match message {
            Message::ConfigLoadComplete((config, error_message)) => {
                info!("Config load complete");
                self.config = config;
                if let Some(error_message) = error_message {
                    self.notices.push(error_message);
                }
            },
            Message::NoticeConfirmed => {
                if !self.notices.is_empty() {
                    self.notices.remove(0);
                }
            },
            Message::ControllerReady(handle) => {
                info!("Connection controller ready");
                self.controller = Some(handle);
            },
            Message::DeviceEvent(event) => {
                self.handle_device_event(event);
            },
            Message::ToggleConnection => {
                return self.toggle_connection();
            },
            Message::ClearHistory => {
                return self.clear_history();
            },
            Message::CommandSent(Some(error_message)) => {
                error!("Failed to send command to connection controller: {}", error_message);
                self.notices.push(error_message);
            },
            Message::EventOccurred(Event::Window(id, window::Event::CloseRequested)) => {
                info!("Close requested");
                return self.before_close(id);
            },
            Message::ShutdownComplete(id) => {
                info!("Connection controller stopped, closing window");
                return window::close(id);
            },

            _ => {}
        }

        Command::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            event::listen().map(Message::EventOccurred),
            connect_device_subscription(),
        ])
    }

    fn view(&self) -> Element<Message> {
        if let Some(notice) = self.notices.first() {
            return container(
                column![
                    text(notice),

                    button(text("Okay"))
                        .on_press(Message::NoticeConfirmed),

                ].align_items(Alignment::Center).spacing(20),
            )
            .width(Length::Fill)
            .padding(20)
            .into()
        }

        let status = match &self.reason {
            Some(reason) => format!("{}: {}", self.state, reason),
            None => self.state.to_string(),
        };

        let current_value: Element<Message> = match self.history.latest() {
            Some(reading) => {
                let color = level_color(threshold_level(reading.value(), &self.config.thresholds));
                text(format!("{:.1}%", reading.value())).size(48).style(color).into()
            },
            None => text("--").size(48).into(),
        };

        let (toggle_text, toggle_enabled) = toggle_label(self.state);
        let mut toggle_button = button(text(toggle_text)).style(theme::Button::Primary);
        if toggle_enabled && self.controller.is_some() {
            toggle_button = toggle_button.on_press(Message::ToggleConnection);
        }

        let mut clear_button = button(text("Clear")).style(theme::Button::Secondary);
        if self.controller.is_some() && !self.history.is_empty() {
            clear_button = clear_button.on_press(Message::ClearHistory);
        }

        container(
            column![
                container(
                    column![
                        text(status),
                        current_value,
                    ].align_items(Alignment::Center).spacing(10),
                )
                    .style(theme::Container::Custom(Box::new(StatusCardStyleSheet)))
                    .width(Length::Fill)
                    .padding(20),

                row![toggle_button, clear_button].spacing(20),

                horizontal_rule(10),

                scrollable(
                    Column::with_children(
                        self.history
                            .iter()
                            .map(|reading| self.reading_row(reading))
                    )
                        .spacing(4)
                        .width(Length::Fill)
                )
                    .height(Length::Fill),
            ]
                .align_items(Alignment::Center)
                .spacing(20),
        )
        .width(Length::Fill)
        .padding(20)
        .into()
    }
}

pub fn run_application(config_path: Option<&Path>) -> Result<(), AppRunError> {
    let config_io = ConfigIO::new_sync(config_path)?;
    let mut config_locker = config_io.locker()?;
    let _lock_guard = config_locker.lock()?;

    let flags = ApplicationFlags { config_io };
    let mut settings = Settings::with_flags(flags);

    // handle exits ourselves (Event::CloseRequested), the sensor must be disconnected first
    settings.id = Some("pressure-ble".to_string());
    settings.window.exit_on_close_request = false;
    settings.window.size = Size::new(420.0, 640.0);

    // this function will call process::exit() unless there was a startup error
    MyApplication::run(settings)?;
    Ok(())
}
