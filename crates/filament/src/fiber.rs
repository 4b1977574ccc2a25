//! The externally visible fiber handle
//!
//! A `Fiber` owns exactly one task control block, created with it. The
//! handle exposes start/join/priority/state/kill; everything else is
//! the scheduler's business.

use std::rc::Rc;

use crate::coroutine::Coroutine;
use crate::error::{Fault, FiberError};
use crate::ops::Join;
use crate::scheduler::{Descriptor, FiberState, Scheduler};
use crate::value::Value;

/// Produces a fiber's root frame when the fiber is started.
///
/// The receiver is `Rc<Self>` so the runnable can hand itself to the
/// computation it produces.
pub trait Runnable {
    /// Build the root frame.
    fn run(self: Rc<Self>) -> Box<dyn Coroutine>;
}

/// What a fiber executes, resolved once at construction.
pub enum Target {
    /// No target was supplied. Starting such a fiber is a target
    /// error; the fiber is killed on the spot.
    Unspecified,
    /// A plain function producing the root frame.
    Function(Box<dyn FnOnce() -> Box<dyn Coroutine>>),
    /// An object whose `run` method produces the root frame.
    Runnable(Rc<dyn Runnable>),
}

impl Target {
    /// A function target.
    pub fn function(f: impl FnOnce() -> Box<dyn Coroutine> + 'static) -> Self {
        Target::Function(Box::new(f))
    }

    /// A runnable-object target.
    pub fn runnable(runnable: Rc<dyn Runnable>) -> Self {
        Target::Runnable(runnable)
    }
}

/// A handle to one cooperatively scheduled task.
///
/// Clones share the same control block; there is no way to obtain a
/// second block for the same fiber.
#[derive(Clone)]
pub struct Fiber {
    scheduler: Scheduler,
    descriptor: Rc<Descriptor>,
}

impl Fiber {
    /// A new fiber in the `Created` state. Nothing runs until
    /// [`start`](Self::start).
    pub fn new(scheduler: &Scheduler, target: Target) -> Self {
        Self {
            scheduler: scheduler.clone(),
            descriptor: Rc::new(Descriptor::new(target)),
        }
    }

    pub(crate) fn from_parts(scheduler: Scheduler, descriptor: Rc<Descriptor>) -> Self {
        Self {
            scheduler,
            descriptor,
        }
    }

    pub(crate) fn descriptor(&self) -> &Rc<Descriptor> {
        &self.descriptor
    }

    /// Resolve the target into the root frame and enqueue the fiber.
    ///
    /// Allowed only once, from `Created`. A fiber without a target is
    /// killed immediately and the error is returned synchronously.
    pub fn start(&self) -> Result<(), FiberError> {
        if self.descriptor.state() != FiberState::Created {
            return Err(FiberError::AlreadyStarted);
        }

        let root = match self.descriptor.take_target() {
            Some(Target::Function(f)) => f(),
            Some(Target::Runnable(runnable)) => runnable.run(),
            Some(Target::Unspecified) | None => {
                self.descriptor.kill();
                return Err(FiberError::UnspecifiedTarget);
            }
        };

        self.descriptor.push_frame(root);
        self.scheduler.enqueue(self.descriptor.clone());
        Ok(())
    }

    /// Join-on-completion: a coroutine operation usable from inside
    /// another fiber. Resolves immediately if this fiber is already
    /// zombied; otherwise resumes the caller exactly once — when this
    /// fiber dies or when `timeout_ms` elapses, whichever is first.
    pub fn join(&self, timeout_ms: Option<u64>) -> Join {
        Join::new(
            self.scheduler.reactor().clone(),
            self.descriptor.clone(),
            timeout_ms,
        )
    }

    /// Live lifecycle state.
    pub fn state(&self) -> FiberState {
        self.descriptor.state()
    }

    /// Current priority.
    pub fn priority(&self) -> f64 {
        self.descriptor.priority()
    }

    /// Set the priority. Anything but a non-NaN number is rejected and
    /// the prior value stands. Takes effect on the next enqueue; the
    /// queue is not re-sorted retroactively.
    pub fn set_priority(&self, priority: impl Into<Value>) -> Result<(), FiberError> {
        match priority.into().as_number() {
            Some(n) if !n.is_nan() => {
                self.descriptor.set_priority(n);
                Ok(())
            }
            _ => Err(FiberError::NonNumericPriority),
        }
    }

    /// Kill the fiber: straight to `Zombied` from any non-terminal
    /// state, wait list flushed synchronously. Cannot interrupt a
    /// frame that is already mid-advance.
    pub fn kill(&self) {
        self.descriptor.kill();
    }

    /// The root frame's completion value, once the fiber finished
    /// normally.
    pub fn outcome(&self) -> Option<Value> {
        self.descriptor.outcome()
    }

    /// The uncaught fault that killed the fiber, if it died that way.
    pub fn fault(&self) -> Option<Fault> {
        self.descriptor.fault()
    }

    /// Number of joiners currently registered on this fiber's wait
    /// list. Drained to zero when the fiber dies.
    pub fn waiter_count(&self) -> usize {
        self.descriptor.waiter_count()
    }
}

impl std::fmt::Debug for Fiber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fiber")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Two handles are equal when they share the same control block.
impl PartialEq for Fiber {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.descriptor, &other.descriptor)
    }
}

impl Eq for Fiber {}
