//! Per-question countdown.
//!
//! [`TimerMachine`] holds the transition rules and never touches a clock.
//! [`TimerController`] wraps it with a tokio ticker that is torn down and
//! recreated whenever the tracked question changes.

pub mod controller;
pub mod machine;

pub use controller::{TimerController, TimerObserver, TimerWatch};
pub use machine::{StartOutcome, TimerEvent, TimerMachine, TimerSnapshot};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimerError {
    #[error("time limit for question {0} must be at least one second")]
    InvalidTimeLimit(String),
}
