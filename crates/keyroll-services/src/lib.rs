//! keyroll-services: Background playback worker and clocks

pub mod clock;
pub mod player;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use player::{ChannelSink, Player, PlayerError, PlayerState};
