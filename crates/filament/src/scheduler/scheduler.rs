//! Scheduler object and the dispatch loop
//!
//! One `Scheduler` per process, constructed explicitly and injected
//! into fiber handles. Its only shared state is the run queue and the
//! currently running descriptor; everything runs on one logical
//! thread, so interior mutability stands in for locking. Every context
//! switch is deferred to a future reactor tick — dequeue included —
//! which bounds native stack depth when fibers rapidly re-enqueue each
//! other and keeps dispatch out of the call that triggered it.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::coroutine::{Resume, Signal, Step};
use crate::error::{Fault, FiberError};
use crate::fiber::Fiber;
use crate::ops::Sleep;
use crate::reactor::Reactor;
use crate::sink::{DiagnosticSink, StderrSink};
use crate::value::Value;

use super::descriptor::{Descriptor, FiberState, Pending};
use super::queue::RunQueue;

struct SchedulerInner {
    queue: RunQueue,
    current: RefCell<Option<Rc<Descriptor>>>,
    switch_pending: Cell<bool>,
    reactor: Reactor,
    sink: Rc<dyn DiagnosticSink>,
}

/// The cooperative scheduler. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    /// A scheduler reporting uncaught faults to standard error.
    pub fn new(reactor: Reactor) -> Self {
        Self::with_sink(reactor, Rc::new(StderrSink))
    }

    /// A scheduler reporting uncaught faults to `sink`.
    pub fn with_sink(reactor: Reactor, sink: Rc<dyn DiagnosticSink>) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                queue: RunQueue::new(),
                current: RefCell::new(None),
                switch_pending: Cell::new(false),
                reactor,
                sink,
            }),
        }
    }

    /// The event loop this scheduler defers through.
    pub fn reactor(&self) -> &Reactor {
        &self.inner.reactor
    }

    /// The fiber currently being driven, if any.
    pub fn current_fiber(&self) -> Option<Fiber> {
        self.inner
            .current
            .borrow()
            .as_ref()
            .map(|descriptor| Fiber::from_parts(self.clone(), descriptor.clone()))
    }

    /// Number of fibers waiting on the run queue.
    pub fn queued(&self) -> usize {
        self.inner.queue.len()
    }

    /// Timed sleep: a coroutine operation that suspends the calling
    /// fiber and resumes it, exactly once, no earlier than `ms`
    /// milliseconds from when it is first advanced.
    pub fn sleep(&self, ms: u64) -> Sleep {
        Sleep::new(self.inner.reactor.clone(), ms)
    }

    /// Put `descriptor` on the run queue and, if nothing is running,
    /// ask for a context switch on a future tick.
    pub(crate) fn enqueue(&self, descriptor: Rc<Descriptor>) {
        descriptor.set_state(FiberState::Waiting);
        self.inner.queue.push(descriptor);
        if self.inner.current.borrow().is_none() {
            self.request_switch();
        }
    }

    /// Schedule one context switch on a future reactor tick. Requests
    /// coalesce: at most one switch is ever pending.
    pub(crate) fn request_switch(&self) {
        if self.inner.switch_pending.replace(true) {
            return;
        }
        let weak = Rc::downgrade(&self.inner);
        self.inner.reactor.defer(move || {
            if let Some(inner) = weak.upgrade() {
                Scheduler { inner }.perform_switch();
            }
        });
    }

    /// The deferred half of a context switch: dequeue the front
    /// descriptor and drive it. Idles when the queue is empty or a
    /// fiber is already running.
    fn perform_switch(&self) {
        self.inner.switch_pending.set(false);
        if self.inner.current.borrow().is_some() {
            return;
        }
        // A fiber killed while queued stays in the queue; drop it here
        // instead of resurrecting it.
        let descriptor = loop {
            match self.inner.queue.pop_front() {
                None => return,
                Some(descriptor) if descriptor.state() == FiberState::Zombied => continue,
                Some(descriptor) => break descriptor,
            }
        };
        descriptor.set_state(FiberState::Running);
        *self.inner.current.borrow_mut() = Some(descriptor.clone());
        self.run_task(descriptor);
    }

    /// A resume callback for `descriptor`, handed to a frame that
    /// yielded `Signal::Continuation`.
    fn resume_handle(&self, descriptor: &Rc<Descriptor>) -> ResumeHandle {
        ResumeHandle {
            descriptor: descriptor.clone(),
            scheduler: Rc::downgrade(&self.inner),
        }
    }

    /// Drive one fiber's frame stack as far as it can go without a
    /// context switch.
    fn run_task(&self, descriptor: Rc<Descriptor>) {
        let mut input = match descriptor.take_pending() {
            Pending::Empty => Resume::Empty,
            Pending::Value(value) => Resume::Value(value),
            Pending::Cooperate => {
                // Resume phase of the cooperate toggle: flip the flag
                // back and advance with no new input.
                descriptor.set_cooperate(true);
                Resume::Empty
            }
        };

        loop {
            let Some(mut frame) = descriptor.pop_frame() else {
                self.finish(&descriptor, None);
                return;
            };

            // The frame is held out of the stack while it runs, so
            // nothing it does can alias a borrow of the frame list.
            let step = frame.advance(input);

            if descriptor.state() == FiberState::Zombied {
                // Killed from inside its own frame.
                self.clear_current(&descriptor);
                self.request_switch();
                return;
            }

            match step {
                Step::Call(inner) => {
                    descriptor.push_frame(frame);
                    descriptor.push_frame(inner);
                    input = Resume::Empty;
                }
                Step::Yield(Signal::Continuation) => {
                    descriptor.push_frame(frame);
                    input = Resume::Callback(self.resume_handle(&descriptor));
                }
                Step::Yield(Signal::Cooperation) => {
                    debug_assert!(descriptor.cooperate(), "cooperate flag out of phase");
                    descriptor.push_frame(frame);
                    descriptor.set_cooperate(false);
                    descriptor.set_pending(Pending::Cooperate);
                    self.clear_current(&descriptor);
                    // Back on the queue at its current priority; equal
                    // and higher priority fibers get a turn first.
                    self.enqueue(descriptor);
                    return;
                }
                Step::Yield(Signal::Suspension) => {
                    descriptor.push_frame(frame);
                    descriptor.set_state(FiberState::Blocked);
                    self.clear_current(&descriptor);
                    self.request_switch();
                    return;
                }
                Step::Done(value) => {
                    if descriptor.frame_count() == 0 {
                        descriptor.set_outcome(value);
                        self.finish(&descriptor, None);
                        return;
                    }
                    input = Resume::Value(value);
                }
                Step::Fail(mut fault) => {
                    fault.push_frame(frame.name());
                    if descriptor.frame_count() == 0 {
                        self.finish(&descriptor, Some(fault));
                        return;
                    }
                    input = Resume::Fault(fault);
                }
            }
        }
    }

    /// Terminal bookkeeping for a fiber leaving the dispatch loop:
    /// kill it (waiters run while it is still the current fiber, so
    /// their enqueues cannot start a nested dispatch), report a real
    /// fault to the sink, and hand the thread to the next fiber.
    fn finish(&self, descriptor: &Rc<Descriptor>, fault: Option<Fault>) {
        let report = match fault {
            Some(fault) if !fault.is_exhaustion() => {
                descriptor.set_fault(fault.clone());
                Some(fault)
            }
            _ => None,
        };
        descriptor.kill();
        self.clear_current(descriptor);
        if let Some(fault) = report {
            self.inner.sink.report(&fault);
        }
        self.request_switch();
    }

    fn clear_current(&self, descriptor: &Rc<Descriptor>) {
        let mut current = self.inner.current.borrow_mut();
        if current
            .as_ref()
            .is_some_and(|running| Rc::ptr_eq(running, descriptor))
        {
            *current = None;
        }
    }
}

/// The raw resume callback a frame obtains through
/// `Signal::Continuation`: invoking it supplies the blocked fiber's
/// next resume value and puts it back on the run queue.
#[derive(Clone)]
pub struct ResumeHandle {
    descriptor: Rc<Descriptor>,
    scheduler: Weak<SchedulerInner>,
}

impl std::fmt::Debug for ResumeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumeHandle").finish_non_exhaustive()
    }
}

impl ResumeHandle {
    /// Resume the fiber with `value`.
    ///
    /// Legal only while the fiber is blocked; anything else is caller
    /// misuse and leaves the fiber untouched.
    pub fn resume(&self, value: Value) -> Result<(), FiberError> {
        let inner = self.scheduler.upgrade().ok_or(FiberError::SchedulerGone)?;
        if self.descriptor.state() != FiberState::Blocked {
            return Err(FiberError::NotBlocked);
        }
        self.descriptor.set_pending(Pending::Value(value));
        Scheduler { inner }.enqueue(self.descriptor.clone());
        Ok(())
    }
}
