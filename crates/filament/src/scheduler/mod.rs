//! The scheduler core
//!
//! Task control blocks and their state machine, the priority-ordered
//! run queue, and the dispatch loop that drives one fiber's frame
//! stack between context switches.

mod descriptor;
mod queue;
#[allow(clippy::module_inception)]
mod scheduler;

pub use descriptor::{Descriptor, FiberState};
pub use scheduler::{ResumeHandle, Scheduler};

pub(crate) use descriptor::Pending;
pub(crate) use queue::RunQueue;
