//! Background daemon that turns wall-clock time into scheduler ticks.
//!
//! Every `tick_millis` the daemon advances the shared [`TickScheduler`] by
//! one tick, which in turn runs every minion action that became due.

use crate::config::MinionsConfig;
use crate::scheduler::TickScheduler;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub struct ClockDaemon {
    scheduler: Arc<TickScheduler>,
    tick: Duration,
}

impl ClockDaemon {
    pub fn new(scheduler: Arc<TickScheduler>, tick: Duration) -> Self {
        Self { scheduler, tick }
    }

    pub fn from_config(scheduler: Arc<TickScheduler>, config: &MinionsConfig) -> Self {
        Self::new(scheduler, config.tick_duration())
    }

    /// Run the clock loop (call from a tokio::spawn).
    ///
    /// Exits cooperatively when `cancel` is triggered and returns how many
    /// ticks it drove.
    pub async fn run(&self, cancel: CancellationToken) -> u64 {
        info!("Clock daemon started ({:?} per tick)", self.tick);

        let mut interval = tokio::time::interval(self.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        interval.tick().await;

        let mut ticks = 0u64;
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Clock daemon shutting down after {} ticks", ticks);
                    return ticks;
                }
                _ = interval.tick() => {
                    self.scheduler.advance();
                    ticks += 1;
                    if ticks % 1200 == 0 {
                        debug!("Clock at tick {} ({} schedules)", self.scheduler.now(), self.scheduler.pending());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Scheduler;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[tokio::test]
    async fn test_drives_scheduler_until_cancelled() {
        let scheduler = Arc::new(TickScheduler::new());
        let runs = Arc::new(AtomicU64::new(0));
        let counter = runs.clone();
        scheduler.schedule_repeating(
            Box::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }),
            1,
            1,
        );

        let daemon = ClockDaemon::new(scheduler.clone(), Duration::from_millis(1));
        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        let handle = tokio::spawn(async move { daemon.run(stop).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();
        let ticks = handle.await.unwrap();

        assert!(ticks > 0);
        assert_eq!(scheduler.now(), ticks);
        assert_eq!(runs.load(Ordering::SeqCst), ticks);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_runs_nothing() {
        let scheduler = Arc::new(TickScheduler::new());
        let daemon = ClockDaemon::new(scheduler.clone(), Duration::from_millis(1));
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(daemon.run(cancel).await, 0);
        assert_eq!(scheduler.now(), 0);
    }
}
