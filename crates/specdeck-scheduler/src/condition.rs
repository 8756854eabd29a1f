//! Pure schedule-condition evaluation.
//!
//! [`is_due`] has no side effects and touches no clocks or registries; every
//! input, including the idle-session marker the coordinator tracks, arrives
//! through [`EvalContext`].

use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use specdeck_core::ScheduleCondition;

/// Everything the evaluator needs to decide whether a condition is due.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext {
    /// Evaluation time (the current tick).
    pub now: DateTime<Utc>,
    /// When the task was created; baseline for interval conditions that
    /// have never fired.
    pub created_at: DateTime<Utc>,
    /// When the task last started executing.
    pub last_executed_at: Option<DateTime<Utc>>,
    /// Current idle duration.
    pub idle: std::time::Duration,
    /// Idle threshold applied by `wait_for_idle` conditions.
    pub idle_threshold: std::time::Duration,
    /// Whether the task already fired (or consumed a skip) during the
    /// current unbroken idle session. Only meaningful for idle conditions.
    pub fired_this_idle_session: bool,
}

/// Returns `true` when the condition is due under the given context.
pub fn is_due(condition: &ScheduleCondition, ctx: &EvalContext) -> bool {
    match condition {
        ScheduleCondition::Interval {
            hours_interval,
            wait_for_idle,
        } => {
            let baseline = ctx.last_executed_at.unwrap_or(ctx.created_at);
            let elapsed = ctx.now - baseline;
            let armed = elapsed >= Duration::hours(i64::from(*hours_interval));
            // The interval elapsing arms the task; firing is held until the
            // user goes idle when wait_for_idle is set.
            armed && (!wait_for_idle || ctx.idle >= ctx.idle_threshold)
        }
        ScheduleCondition::Weekly {
            weekdays,
            hour_of_day,
            wait_for_idle,
        } => {
            let weekday = ctx.now.weekday().num_days_from_sunday() as u8;
            if !weekdays.contains(&weekday) || ctx.now.hour() != u32::from(*hour_of_day) {
                return false;
            }
            // At most one fire per matching calendar day, so repeated ticks
            // inside the matching hour do not re-trigger.
            if fired_today(ctx) {
                return false;
            }
            !wait_for_idle || ctx.idle >= ctx.idle_threshold
        }
        ScheduleCondition::Idle { idle_minutes } => {
            let required = std::time::Duration::from_secs(u64::from(*idle_minutes) * 60);
            ctx.idle >= required && !ctx.fired_this_idle_session
        }
    }
}

fn fired_today(ctx: &EvalContext) -> bool {
    ctx.last_executed_at
        .map(|last| last.date_naive() == ctx.now.date_naive())
        .unwrap_or(false)
}
