//! Filament — a cooperative, single-threaded fiber runtime
//!
//! Many logical tasks interleave inside one thread of control; each
//! task suspends only at explicit control signals, never by
//! preemption. This crate provides:
//! - Fiber handles over per-task control blocks and their state machine
//! - A priority-ordered run queue with stable FIFO ties
//! - A dispatch loop driving stacks of nested resumable frames
//! - The sleep and join primitive operations
//! - A single-threaded event loop (deferred calls + one-shot timers)
//! - Program bootstrap wrapping an entry point in a root fiber
//!
//! A fiber that never reaches a suspension point starves every other
//! fiber and the event loop itself; there is no mechanism to interrupt
//! running computation.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod boot;
pub mod coroutine;
pub mod error;
pub mod fiber;
pub mod ops;
pub mod reactor;
pub mod scheduler;
pub mod sink;
pub mod value;

pub use boot::{boot, boot_with_args, Runtime};
pub use coroutine::{from_fn, Coroutine, Resume, Signal, Step};
pub use error::{BootError, ErrorKind, Fault, FaultKind, FiberError};
pub use fiber::{Fiber, Runnable, Target};
pub use ops::{Join, Sleep};
pub use reactor::Reactor;
pub use scheduler::{FiberState, ResumeHandle, Scheduler};
pub use sink::{DiagnosticSink, MemorySink, StderrSink};
pub use value::Value;
