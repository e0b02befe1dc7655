//! Cooperative tick-counted scheduler.

use super::{ScheduleHandle, Scheduler, Task};
use parking_lot::Mutex;
use tracing::trace;

struct Entry {
    seq: u64,
    due: u64,
    period: Option<u64>,
    handle: ScheduleHandle,
    task: Task,
}

#[derive(Default)]
struct State {
    now: u64,
    next_seq: u64,
    entries: Vec<Entry>,
}

/// Scheduler whose clock only moves when [`TickScheduler::advance`] is called.
///
/// Tasks run on the caller's thread, outside the scheduler's own lock, so a
/// task may schedule or cancel other tasks (including itself).
#[derive(Default)]
pub struct TickScheduler {
    state: Mutex<State>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick.
    pub fn now(&self) -> u64 {
        self.state.lock().now
    }

    /// Number of schedules still installed (cancelled ones are pruned lazily).
    pub fn pending(&self) -> usize {
        self.state
            .lock()
            .entries
            .iter()
            .filter(|e| !e.handle.is_cancelled())
            .count()
    }

    /// Move the clock one tick forward and run everything that became due,
    /// in the order it was scheduled.
    pub fn advance(&self) {
        let mut due = {
            let mut state = self.state.lock();
            state.now += 1;
            let now = state.now;
            state.entries.retain(|e| !e.handle.is_cancelled());
            let (ready, waiting): (Vec<Entry>, Vec<Entry>) =
                state.entries.drain(..).partition(|e| e.due <= now);
            state.entries = waiting;
            ready
        };
        due.sort_by_key(|e| e.seq);

        let mut requeue = Vec::new();
        for mut entry in due {
            // An earlier task in this tick may have cancelled this one.
            if entry.handle.is_cancelled() {
                continue;
            }
            trace!(seq = entry.seq, "running scheduled task");
            (entry.task)();
            if let Some(period) = entry.period {
                if !entry.handle.is_cancelled() {
                    entry.due += period;
                    requeue.push(entry);
                }
            } else {
                entry.handle.cancel();
            }
        }

        if !requeue.is_empty() {
            self.state.lock().entries.extend(requeue);
        }
    }

    /// Advance `ticks` times.
    pub fn advance_by(&self, ticks: u64) {
        for _ in 0..ticks {
            self.advance();
        }
    }

    fn install(&self, task: Task, delay: u64, period: Option<u64>) -> ScheduleHandle {
        let handle = ScheduleHandle::new();
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let due = state.now + delay.max(1);
        state.entries.push(Entry {
            seq,
            due,
            period: period.map(|p| p.max(1)),
            handle: handle.clone(),
            task,
        });
        handle
    }
}

impl Scheduler for TickScheduler {
    fn schedule_repeating(&self, task: Task, initial_delay: u64, period: u64) -> ScheduleHandle {
        self.install(task, initial_delay, Some(period))
    }

    fn schedule_once(&self, task: Task, delay: u64) -> ScheduleHandle {
        self.install(task, delay, None)
    }
}
