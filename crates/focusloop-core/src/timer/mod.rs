mod controller;
mod state;

pub(crate) use controller::status_of;
pub use controller::{BreakStarted, Started, Status, StopOutcome, TimerController, WorkStarted};
pub use state::{ActiveInterval, BreakKind, EngineState, IntervalKind};
