//! Resumable frames and the advance protocol
//!
//! A fiber's body is a stack of [`Coroutine`] frames. The dispatch loop
//! advances the innermost frame with a [`Resume`] input and classifies
//! the returned [`Step`]: nest a new frame, service a control signal,
//! finish with a value, or fail with a fault. Errors travel as values
//! through this protocol; nothing unwinds.

use crate::error::Fault;
use crate::scheduler::ResumeHandle;
use crate::value::Value;

/// A control signal a frame yields to request a scheduler service.
///
/// Signals carry no payload; the service is encoded in the variant.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Request the scheduler's raw resume callback. The yielding frame
    /// is advanced next with `Resume::Callback`.
    Continuation,
    /// Voluntarily hand the thread back to the scheduler and re-enqueue
    /// at the current priority. The frame resumes with no input once
    /// the fiber is dispatched again.
    Cooperation,
    /// Park the fiber until some holder of a resume callback invokes it.
    Suspension,
}

/// The input a frame is advanced with.
#[derive(Debug)]
pub enum Resume {
    /// No input: a fresh frame's first advance, or the resume phase of
    /// a cooperation yield.
    Empty,
    /// A value: the completion value of the frame above, or the payload
    /// a resume callback was invoked with.
    Value(Value),
    /// The scheduler's resume callback, answering `Signal::Continuation`.
    Callback(ResumeHandle),
    /// A fault propagating out of the frame above. Recover by returning
    /// a normal step, or rethrow by returning `Step::Fail` again.
    Fault(Fault),
}

impl Resume {
    /// The carried value, with `Empty` reading as `Null`.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Resume::Empty => Some(Value::Null),
            Resume::Value(v) => Some(v),
            Resume::Callback(_) | Resume::Fault(_) => None,
        }
    }

    /// The resume callback, if this is a `Callback` input.
    pub fn into_callback(self) -> Option<ResumeHandle> {
        match self {
            Resume::Callback(handle) => Some(handle),
            _ => None,
        }
    }

    /// The propagating fault, if this is a `Fault` input.
    pub fn into_fault(self) -> Option<Fault> {
        match self {
            Resume::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// What a frame produced when advanced.
pub enum Step {
    /// A nested resumable computation: push it as the new innermost
    /// frame and start driving it.
    Call(Box<dyn Coroutine>),
    /// A control signal for the scheduler.
    Yield(Signal),
    /// The frame completed with this value; it is popped and the value
    /// is fed to the frame beneath.
    Done(Value),
    /// The frame failed; it is popped and the fault is fed to the frame
    /// beneath (or escapes the task at the root).
    Fail(Fault),
}

impl Step {
    /// Convenience constructor boxing a nested computation.
    pub fn call(inner: impl Coroutine + 'static) -> Self {
        Step::Call(Box::new(inner))
    }
}

/// A resumable computation driven by the dispatch loop.
///
/// Contract: after returning `Done` or `Fail`, a frame must answer any
/// further `advance` with `Step::Fail(Fault::exhausted())`. The
/// dispatch loop pops completed frames and never re-advances them, so
/// the exhaustion path only fires for frames driven by hand.
pub trait Coroutine {
    /// Advance the computation with `input` until it produces the next
    /// step.
    fn advance(&mut self, input: Resume) -> Step;

    /// A short name used in fault traces.
    fn name(&self) -> &str {
        "resumable"
    }
}

/// Adapts an `FnMut(Resume) -> Step` closure into a [`Coroutine`],
/// enforcing the exhaustion contract.
pub fn from_fn<F>(f: F) -> FromFn<F>
where
    F: FnMut(Resume) -> Step,
{
    FromFn {
        f,
        finished: false,
        name: "closure",
    }
}

/// See [`from_fn`].
pub struct FromFn<F> {
    f: F,
    finished: bool,
    name: &'static str,
}

impl<F> FromFn<F> {
    /// Override the name used in fault traces.
    pub fn named(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

impl<F> Coroutine for FromFn<F>
where
    F: FnMut(Resume) -> Step,
{
    fn advance(&mut self, input: Resume) -> Step {
        if self.finished {
            return Step::Fail(Fault::exhausted());
        }
        let step = (self.f)(input);
        if matches!(step, Step::Done(_) | Step::Fail(_)) {
            self.finished = true;
        }
        step
    }

    fn name(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_fn_completes_once() {
        let mut frame = from_fn(|input| Step::Done(input.into_value().unwrap()));

        match frame.advance(Resume::Value(Value::from(9))) {
            Step::Done(v) => assert_eq!(v, Value::from(9)),
            _ => panic!("expected completion"),
        }

        // Advancing past completion reports exhaustion, not a new value.
        match frame.advance(Resume::Empty) {
            Step::Fail(fault) => assert!(fault.is_exhaustion()),
            _ => panic!("expected exhaustion"),
        }
    }

    #[test]
    fn test_from_fn_failure_is_terminal() {
        let mut frame = from_fn(|_| Step::Fail(Fault::new("E", "boom")));

        assert!(matches!(frame.advance(Resume::Empty), Step::Fail(f) if !f.is_exhaustion()));
        assert!(matches!(frame.advance(Resume::Empty), Step::Fail(f) if f.is_exhaustion()));
    }

    #[test]
    fn test_from_fn_named() {
        let frame = from_fn(|_| Step::Done(Value::Null)).named("worker");
        assert_eq!(frame.name(), "worker");
    }

    #[test]
    fn test_resume_accessors() {
        assert_eq!(Resume::Empty.into_value(), Some(Value::Null));
        assert_eq!(
            Resume::Value(Value::from(2)).into_value(),
            Some(Value::from(2))
        );
        let fault = Resume::Fault(Fault::new("E", "m")).into_fault().unwrap();
        assert_eq!(fault.name(), "E");
        assert!(Resume::Empty.into_fault().is_none());
    }
}
