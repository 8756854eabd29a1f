//! Idle gate: elapsed idle duration since the last reported user activity.

use crate::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Source of the current idle duration.
#[async_trait]
pub trait IdleSource: Send + Sync {
    /// Milliseconds-precision duration since the most recent user activity.
    async fn idle_time(&self) -> Duration;
}

/// Default idle source backed by explicit activity reports.
///
/// Host-side watchers (keyboard/mouse hooks, window focus) call
/// [`IdleGate::report_activity`] from any task; the gate is internally
/// locked.
pub struct IdleGate {
    clock: Arc<dyn Clock>,
    last_activity: Mutex<DateTime<Utc>>,
}

impl IdleGate {
    /// Create a gate that considers "now" the last activity.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        Self {
            clock,
            last_activity: Mutex::new(start),
        }
    }

    /// Record a user-activity event, resetting the idle duration to zero.
    pub fn report_activity(&self) {
        let now = self.clock.now();
        let mut last = self
            .last_activity
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        *last = now;
    }
}

#[async_trait]
impl IdleSource for IdleGate {
    async fn idle_time(&self) -> Duration {
        let last = *self
            .last_activity
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        (self.clock.now() - last).to_std().unwrap_or_default()
    }
}
