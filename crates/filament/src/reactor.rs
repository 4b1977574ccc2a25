//! Single-threaded event loop: deferred calls and one-shot timers
//!
//! The reactor is the host side of the scheduler's world: `defer` runs
//! a callback on a future tick (never synchronously), `after` runs one
//! after at least the requested delay, and `run` drives both until
//! nothing remains. The scheduler defers every context switch through
//! it, which bounds native stack depth across chained switches and
//! lets timers fire between them.

use std::cell::{Cell, RefCell};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, VecDeque};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// One-shot timer entry, min-heap by deadline with FIFO ties.
struct TimerEntry {
    deadline: Instant,
    seq: u64,
    callback: Box<dyn FnOnce()>,
}

// Reverse ordering for min-heap (earliest deadline first).
impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

struct ReactorInner {
    deferred: RefCell<VecDeque<Box<dyn FnOnce()>>>,
    timers: RefCell<BinaryHeap<TimerEntry>>,
    next_seq: Cell<u64>,
}

/// The event loop. Cheap to clone; clones share the same loop.
#[derive(Clone)]
pub struct Reactor {
    inner: Rc<ReactorInner>,
}

impl Reactor {
    /// A fresh, idle reactor.
    pub fn new() -> Self {
        Self {
            inner: Rc::new(ReactorInner {
                deferred: RefCell::new(VecDeque::new()),
                timers: RefCell::new(BinaryHeap::new()),
                next_seq: Cell::new(0),
            }),
        }
    }

    /// Run `callback` on a future tick, after all previously deferred
    /// calls. Never invokes it synchronously.
    pub fn defer(&self, callback: impl FnOnce() + 'static) {
        self.inner.deferred.borrow_mut().push_back(Box::new(callback));
    }

    /// Run `callback` once, no earlier than `ms` milliseconds from now.
    pub fn after(&self, ms: u64, callback: impl FnOnce() + 'static) {
        let seq = self.inner.next_seq.get();
        self.inner.next_seq.set(seq + 1);
        self.inner.timers.borrow_mut().push(TimerEntry {
            deadline: Instant::now() + Duration::from_millis(ms),
            seq,
            callback: Box::new(callback),
        });
    }

    /// Whether neither deferred calls nor timers remain.
    pub fn is_idle(&self) -> bool {
        self.inner.deferred.borrow().is_empty() && self.inner.timers.borrow().is_empty()
    }

    /// Number of armed timers.
    pub fn timer_count(&self) -> usize {
        self.inner.timers.borrow().len()
    }

    /// Drive the loop until it is idle.
    ///
    /// Deferred calls run in FIFO order and drain before timers are
    /// considered; when only future timers remain the thread sleeps
    /// until the earliest deadline. Callbacks may defer further calls
    /// and arm further timers.
    pub fn run(&self) {
        loop {
            // Pop outside the call so a callback can defer more work.
            let job = self.inner.deferred.borrow_mut().pop_front();
            if let Some(job) = job {
                job();
                continue;
            }

            let now = Instant::now();
            let due = {
                let mut timers = self.inner.timers.borrow_mut();
                match timers.peek() {
                    Some(entry) if entry.deadline <= now => Some(timers.pop().unwrap().callback),
                    _ => None,
                }
            };
            if let Some(callback) = due {
                callback();
                continue;
            }

            let next_deadline = self.inner.timers.borrow().peek().map(|e| e.deadline);
            match next_deadline {
                Some(deadline) => thread::sleep(deadline.saturating_duration_since(now)),
                None => break,
            }
        }
    }
}

impl Default for Reactor {
    fn default() -> Self {
        Self::new()
    }
}
