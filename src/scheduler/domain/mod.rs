//! Timer domain types.

mod timer;

pub use timer::{
    FiringReport, ParseTimerKindError, ScheduledTimer, TimerDisposition, TimerHandle, TimerKey,
    TimerKind,
};
