//! Error types
//!
//! Two layers, never mixed: `FiberError` is raised synchronously at an
//! API call site (caller misuse or an unstartable target) and affects no
//! other task. `Fault` is the error *value* threaded through the frame
//! protocol while a task runs; an uncaught fault kills only its own
//! task and is recorded through the diagnostic sink.

use std::fmt;

use crate::value::Value;

/// Broad classification of a [`FiberError`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse of an otherwise healthy fiber.
    Usage,
    /// The fiber's target cannot produce a runnable root frame.
    Target,
}

/// Synchronous API errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FiberError {
    /// `start()` on a fiber that has left the `Created` state.
    #[error("the fiber has already been started")]
    AlreadyStarted,

    /// `set_priority()` with anything but a (non-NaN) number.
    #[error("the priority of the fiber must be a number")]
    NonNumericPriority,

    /// A resume callback invoked while the fiber is not blocked.
    #[error("the fiber is not blocked")]
    NotBlocked,

    /// A resume callback outlived its scheduler.
    #[error("the scheduler is gone")]
    SchedulerGone,

    /// `start()` on a fiber constructed without a target.
    #[error("running a fiber with an unspecified target")]
    UnspecifiedTarget,
}

impl FiberError {
    /// Which side of the taxonomy this error falls on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FiberError::AlreadyStarted
            | FiberError::NonNumericPriority
            | FiberError::NotBlocked
            | FiberError::SchedulerGone => ErrorKind::Usage,
            FiberError::UnspecifiedTarget => ErrorKind::Target,
        }
    }
}

/// Distinguishes real task errors from the benign exhaustion marker.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaultKind {
    /// An application error raised inside a frame.
    Error,
    /// A frame was advanced after it had already completed. Treated as
    /// normal termination by the dispatch loop, never reported.
    Exhausted,
}

/// The error value threaded through the frame stack.
///
/// Frames fail by returning `Step::Fail(fault)`; the frame beneath
/// receives it as `Resume::Fault(fault)` and may recover or rethrow.
/// The dispatch loop appends one trace line per frame the fault
/// unwinds through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    kind: FaultKind,
    name: String,
    message: String,
    stack: String,
}

impl Fault {
    /// A new application fault.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Error,
            name: name.into(),
            message: message.into(),
            stack: String::new(),
        }
    }

    /// The benign exhaustion marker.
    pub fn exhausted() -> Self {
        Self {
            kind: FaultKind::Exhausted,
            name: "Exhausted".to_string(),
            message: "the computation has already finished".to_string(),
            stack: String::new(),
        }
    }

    /// A fault carrying a truthy exit value from a program entry point.
    pub fn from_exit(value: &Value) -> Self {
        Self::new("ExitError", value.to_string())
    }

    /// The fault classification.
    pub fn kind(&self) -> FaultKind {
        self.kind
    }

    /// Whether this is the benign exhaustion marker.
    pub fn is_exhaustion(&self) -> bool {
        self.kind == FaultKind::Exhausted
    }

    /// The error name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The trace accumulated while unwinding, one `at` line per frame.
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Record that the fault unwound through `frame_name`.
    pub fn push_frame(&mut self, frame_name: &str) {
        if !self.stack.is_empty() {
            self.stack.push('\n');
        }
        self.stack.push_str("    at ");
        self.stack.push_str(frame_name);
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}: {}", self.name, self.message)
        }
    }
}

/// Errors surfaced by the bootstrap adapter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BootError {
    /// The root fiber could not be started.
    #[error(transparent)]
    Start(#[from] FiberError),

    /// The entry point returned a truthy value, or the root task
    /// faulted while running.
    #[error("{0}")]
    Exit(Fault),
}
