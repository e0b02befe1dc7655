//! Fixed-interval task scheduling.
//!
//! Durations are measured in scheduler ticks. Every schedule returns a
//! [`ScheduleHandle`] whose `cancel` never fails, whether the schedule is
//! running, already cancelled, or finished.

pub mod tick;

pub use tick::TickScheduler;

use tokio_util::sync::CancellationToken;

/// A callback run by the scheduler.
pub type Task = Box<dyn FnMut() + Send + 'static>;

/// Cancellable reference to one installed schedule.
#[derive(Debug, Clone, Default)]
pub struct ScheduleHandle {
    token: CancellationToken,
}

impl ScheduleHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the schedule. Safe to call any number of times.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Something that can run callbacks later, once or repeatedly.
pub trait Scheduler: Send + Sync {
    /// Run `task` after `initial_delay` ticks and then every `period` ticks.
    fn schedule_repeating(&self, task: Task, initial_delay: u64, period: u64) -> ScheduleHandle;

    /// Run `task` once after `delay` ticks.
    fn schedule_once(&self, task: Task, delay: u64) -> ScheduleHandle;
}
