//! Per-fiber control block and its state machine

use std::cell::{Cell, RefCell};

use crate::coroutine::Coroutine;
use crate::error::Fault;
use crate::fiber::Target;
use crate::value::Value;

/// Lifecycle state of a fiber.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FiberState {
    /// Constructed, not yet started.
    Created,
    /// On the run queue, awaiting dispatch.
    Waiting,
    /// Currently driven by the dispatch loop.
    Running,
    /// Parked until a resume callback fires.
    Blocked,
    /// Finished, errored, or killed. Terminal.
    Zombied,
}

/// The resume payload stored on a descriptor between dispatches.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Pending {
    /// Nothing stored: the first dispatch, or a plain redispatch.
    Empty,
    /// A value supplied through the resume callback.
    Value(Value),
    /// Marker for the resume phase of a cooperation yield.
    Cooperate,
}

/// The task control block: one per fiber handle, same lifetime.
///
/// Mutated only by the scheduler and by the owning handle's operations.
/// Holds no external resources; dropping a zombied descriptor is the
/// whole teardown.
pub struct Descriptor {
    state: Cell<FiberState>,
    priority: Cell<f64>,
    cooperate: Cell<bool>,
    pending: RefCell<Pending>,
    target: RefCell<Option<Target>>,
    frames: RefCell<Vec<Box<dyn Coroutine>>>,
    waiters: RefCell<Vec<Box<dyn FnOnce()>>>,
    outcome: RefCell<Option<Value>>,
    fault: RefCell<Option<Fault>>,
}

impl Descriptor {
    /// A fresh control block in the `Created` state with priority 0.
    pub(crate) fn new(target: Target) -> Self {
        Self {
            state: Cell::new(FiberState::Created),
            priority: Cell::new(0.0),
            cooperate: Cell::new(true),
            pending: RefCell::new(Pending::Empty),
            target: RefCell::new(Some(target)),
            frames: RefCell::new(Vec::new()),
            waiters: RefCell::new(Vec::new()),
            outcome: RefCell::new(None),
            fault: RefCell::new(None),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FiberState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: FiberState) {
        debug_assert!(
            self.state.get() != FiberState::Zombied,
            "zombied is terminal"
        );
        self.state.set(state);
    }

    /// Current priority.
    pub fn priority(&self) -> f64 {
        self.priority.get()
    }

    pub(crate) fn set_priority(&self, priority: f64) {
        self.priority.set(priority);
    }

    pub(crate) fn cooperate(&self) -> bool {
        self.cooperate.get()
    }

    pub(crate) fn set_cooperate(&self, flag: bool) {
        self.cooperate.set(flag);
    }

    pub(crate) fn take_target(&self) -> Option<Target> {
        self.target.borrow_mut().take()
    }

    pub(crate) fn set_pending(&self, pending: Pending) {
        *self.pending.borrow_mut() = pending;
    }

    pub(crate) fn take_pending(&self) -> Pending {
        std::mem::replace(&mut *self.pending.borrow_mut(), Pending::Empty)
    }

    pub(crate) fn push_frame(&self, frame: Box<dyn Coroutine>) {
        self.frames.borrow_mut().push(frame);
    }

    pub(crate) fn pop_frame(&self) -> Option<Box<dyn Coroutine>> {
        self.frames.borrow_mut().pop()
    }

    /// Depth of the frame stack. Non-zero exactly while the fiber has
    /// unfinished work.
    pub fn frame_count(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Register a notify callback invoked once when this fiber dies.
    pub(crate) fn push_waiter(&self, notify: Box<dyn FnOnce()>) {
        self.waiters.borrow_mut().push(notify);
    }

    /// Number of registered waiters.
    pub fn waiter_count(&self) -> usize {
        self.waiters.borrow().len()
    }

    /// Transition straight to `Zombied`, drop all frames, and invoke
    /// every waiter in registration order.
    ///
    /// Safe to call from any state; a second kill is a no-op. Waiters
    /// are drained before being invoked so a notify that re-enters the
    /// descriptor observes the final state.
    pub(crate) fn kill(&self) {
        if self.state.get() == FiberState::Zombied {
            return;
        }
        self.state.set(FiberState::Zombied);
        self.frames.borrow_mut().clear();
        *self.pending.borrow_mut() = Pending::Empty;

        let waiters = std::mem::take(&mut *self.waiters.borrow_mut());
        for notify in waiters {
            notify();
        }
    }

    /// The root frame's completion value, once the fiber finished
    /// normally.
    pub fn outcome(&self) -> Option<Value> {
        self.outcome.borrow().clone()
    }

    pub(crate) fn set_outcome(&self, value: Value) {
        *self.outcome.borrow_mut() = Some(value);
    }

    /// The uncaught fault that killed the fiber, if any.
    pub fn fault(&self) -> Option<Fault> {
        self.fault.borrow().clone()
    }

    pub(crate) fn set_fault(&self, fault: Fault) {
        *self.fault.borrow_mut() = Some(fault);
    }
}
