//! Autonomous scheduler core for Specdeck.
//!
//! Drives AI coding-agent tasks on time- or idle-based conditions while
//! avoiding collisions with concurrent repository operations and
//! manually-started agent sessions. The coordinator runs a periodic tick,
//! evaluates schedule conditions, arbitrates conflicts, and dispatches at
//! most one task at a time through an injected agent runner.
//!
//! All collaborators (task store, activity registry, agent runner, idle
//! source, clock) are trait objects supplied at construction, so tests run
//! against a virtual clock and in-process fakes.

pub mod avoidance;
pub mod clock;
pub mod condition;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod idle;
pub mod queue;
pub mod registry;
pub mod runner;
pub mod store;

pub use avoidance::AvoidanceResolver;
pub use clock::{Clock, ManualClock, SystemClock};
pub use condition::{is_due, EvalContext};
pub use config::SchedulerConfig;
pub use coordinator::Coordinator;
pub use error::SchedulerError;
pub use idle::{IdleGate, IdleSource};
pub use queue::ExecutionQueue;
pub use registry::ActivityRegistry;
pub use runner::{AgentRunner, DispatchRequest};
pub use store::{JsonTaskStore, TaskStore};
