//! Primitive coroutine operations: sleep and join
//!
//! These two are the only frames that touch control signals directly,
//! and the template for any further primitive: yield `Continuation` to
//! obtain the resume callback, hand it to an external waker, yield
//! `Suspension`, and complete when the callback's value comes back.

use std::cell::Cell;
use std::rc::Rc;

use crate::coroutine::{Coroutine, Resume, Signal, Step};
use crate::error::Fault;
use crate::reactor::Reactor;
use crate::scheduler::{Descriptor, FiberState, ResumeHandle};
use crate::value::Value;

fn protocol_fault(op: &str) -> Fault {
    Fault::new(
        "ProtocolError",
        format!("{op} expected the scheduler's resume callback"),
    )
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Phase {
    /// Not yet advanced.
    Init,
    /// Continuation yielded, waiting for the callback.
    Armed,
    /// Suspension yielded, waiting for the wakeup.
    Parked,
    /// Completed; further advances report exhaustion.
    Finished,
}

/// Timed sleep. Built by [`Scheduler::sleep`](crate::Scheduler::sleep).
///
/// Resumes the calling fiber no earlier than the requested delay
/// (subject to scheduler load), exactly once.
pub struct Sleep {
    reactor: Reactor,
    ms: u64,
    phase: Phase,
}

impl Sleep {
    pub(crate) fn new(reactor: Reactor, ms: u64) -> Self {
        Self {
            reactor,
            ms,
            phase: Phase::Init,
        }
    }
}

impl Coroutine for Sleep {
    fn advance(&mut self, input: Resume) -> Step {
        match self.phase {
            Phase::Init => {
                self.phase = Phase::Armed;
                Step::Yield(Signal::Continuation)
            }
            Phase::Armed => {
                let Some(handle) = input.into_callback() else {
                    self.phase = Phase::Finished;
                    return Step::Fail(protocol_fault("sleep"));
                };
                // A wakeup racing a kill finds the fiber no longer
                // blocked; that is the timer's problem to ignore.
                self.reactor.after(self.ms, move || {
                    let _ = handle.resume(Value::Null);
                });
                self.phase = Phase::Parked;
                Step::Yield(Signal::Suspension)
            }
            Phase::Parked => {
                self.phase = Phase::Finished;
                Step::Done(Value::Null)
            }
            Phase::Finished => Step::Fail(Fault::exhausted()),
        }
    }

    fn name(&self) -> &str {
        "sleep"
    }
}

/// Join-on-completion, optionally bounded by a timeout. Built by
/// [`Fiber::join`](crate::Fiber::join).
///
/// Resumes the caller exactly once — target death or timeout,
/// whichever fires first; the other becomes a no-op through the
/// shared single-use flag.
pub struct Join {
    reactor: Reactor,
    target: Rc<Descriptor>,
    timeout_ms: Option<u64>,
    phase: Phase,
}

impl Join {
    pub(crate) fn new(reactor: Reactor, target: Rc<Descriptor>, timeout_ms: Option<u64>) -> Self {
        Self {
            reactor,
            target,
            timeout_ms,
            phase: Phase::Init,
        }
    }

    fn notifier(handle: ResumeHandle, fired: Rc<Cell<bool>>) -> impl FnOnce() {
        move || {
            if !fired.replace(true) {
                let _ = handle.resume(Value::Null);
            }
        }
    }
}

impl Coroutine for Join {
    fn advance(&mut self, input: Resume) -> Step {
        match self.phase {
            Phase::Init => {
                if self.target.state() == FiberState::Zombied {
                    // Already dead: resolve without suspending and
                    // without touching wait list or timers.
                    self.phase = Phase::Finished;
                    return Step::Done(Value::Null);
                }
                self.phase = Phase::Armed;
                Step::Yield(Signal::Continuation)
            }
            Phase::Armed => {
                let Some(handle) = input.into_callback() else {
                    self.phase = Phase::Finished;
                    return Step::Fail(protocol_fault("join"));
                };
                let fired = Rc::new(Cell::new(false));

                if let Some(ms) = self.timeout_ms {
                    self.reactor
                        .after(ms, Self::notifier(handle.clone(), fired.clone()));
                }
                self.target
                    .push_waiter(Box::new(Self::notifier(handle, fired)));

                self.phase = Phase::Parked;
                Step::Yield(Signal::Suspension)
            }
            Phase::Parked => {
                self.phase = Phase::Finished;
                Step::Done(Value::Null)
            }
            Phase::Finished => Step::Fail(Fault::exhausted()),
        }
    }

    fn name(&self) -> &str {
        "join"
    }
}
