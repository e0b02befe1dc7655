//! Wall-clock driver for the tick scheduler.

pub mod daemon;

pub use daemon::ClockDaemon;
