pub mod error;
pub mod player;
pub mod protocol;
pub mod schedule;

pub use error::ScheduleError;
pub use player::{PlayerEvent, StimulusPlayer, TICK_INTERVAL};
pub use protocol::Protocol;
pub use schedule::{SaccadicSchedule, ScheduleEntry};
