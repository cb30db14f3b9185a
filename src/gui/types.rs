use iced::{Event, window};

use crate::config::types::Config;
use crate::device::controller::ControllerHandle;
use crate::device::types::DeviceEvent;

#[derive(Debug, Clone)]
pub enum Message {
    EventOccurred(Event),
    ConfigLoadComplete((Config, Option<String>)),
    NoticeConfirmed,
    ControllerReady(ControllerHandle),
    DeviceEvent(DeviceEvent),
    ToggleConnection,
    ClearHistory,
    CommandSent(Option<String>), // error message if the controller could not be reached
    ShutdownComplete(window::Id),
}
