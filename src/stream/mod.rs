//! Loops that drive a session: offline batch conversion, pull-based
//! playback and a push-based realtime feeder.

pub mod batch;
pub mod feeder;
pub mod player;

pub use batch::{convert, ConvertStats};
pub use feeder::{spawn_feeder, FeedStats, FeederHandle, FeederOptions, RealtimeFeed};
pub use player::{PlayReport, Player};
