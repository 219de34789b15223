pub mod clock;
pub mod commands;
pub mod controller;
pub mod error;
pub mod modes;
pub mod snapshot;
pub mod state;
pub mod store;

pub use controller::{TimerController, TimerView};
pub use error::TimerError;
pub use modes::{DisplayState, StartConfig};
pub use snapshot::Snapshot;
pub use state::{
    Lap, Lifecycle, SegmentKind, SessionOutcome, TickOutcome, TimerMode, TimerSession,
};
pub use store::SnapshotStore;
