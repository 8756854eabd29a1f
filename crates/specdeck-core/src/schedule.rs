//! Schedule conditions describing when a task becomes due.

use serde::{Deserialize, Serialize};

/// When a scheduled task should fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleCondition {
    /// Fire every N hours, measured from the last execution.
    Interval {
        /// Hours between runs (>= 1).
        hours_interval: u32,
        /// Hold firing until the user is idle once the interval elapses.
        #[serde(default)]
        wait_for_idle: bool,
    },
    /// Fire at a fixed hour on selected weekdays, at most once per day.
    Weekly {
        /// Weekdays on which the task may fire (0 = Sunday .. 6 = Saturday).
        weekdays: Vec<u8>,
        /// Hour of day (0-23, UTC).
        hour_of_day: u8,
        /// Hold firing until the user is idle within the matching hour.
        #[serde(default)]
        wait_for_idle: bool,
    },
    /// Fire once per unbroken idle session after N idle minutes.
    Idle {
        /// Minutes of continuous idleness required (>= 1).
        idle_minutes: u32,
    },
}

impl std::fmt::Display for ScheduleCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Interval { hours_interval, .. } => {
                write!(f, "every {hours_interval} hours")
            }
            Self::Weekly {
                weekdays,
                hour_of_day,
                ..
            } => {
                write!(f, "weekly on {weekdays:?} at {hour_of_day:02}:00 UTC")
            }
            Self::Idle { idle_minutes } => write!(f, "after {idle_minutes} idle minutes"),
        }
    }
}

impl ScheduleCondition {
    /// Whether this condition defers firing to an idle window.
    pub fn waits_for_idle(&self) -> bool {
        match self {
            Self::Interval { wait_for_idle, .. } | Self::Weekly { wait_for_idle, .. } => {
                *wait_for_idle
            }
            Self::Idle { .. } => false,
        }
    }
}
