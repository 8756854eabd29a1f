//! Scheduler configuration.

use std::time::Duration;

/// Coordinator tuning knobs.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Period between ticks. The next tick is armed only after the previous
    /// one completes, so slow I/O never overlaps ticks.
    ///
    /// Keep this shorter than the smallest configured idle threshold:
    /// idle-session resets are detected by comparing idle samples across
    /// consecutive ticks, so a burst of activity that starts and ends
    /// within a single tick period is not observed.
    pub tick_interval: Duration,

    /// Idle duration required by `wait_for_idle` schedule conditions.
    pub idle_threshold: Duration,

    /// Capacity of the status-event broadcast channel.
    pub event_capacity: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            idle_threshold: Duration::from_secs(5 * 60),
            event_capacity: 64,
        }
    }
}
