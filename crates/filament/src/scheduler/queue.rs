//! Priority-ordered run queue
//!
//! Descending priority, stable among equals. The ordering invariant is
//! restored after every append by a single bubble pass: the appended
//! entry is compared against each earlier entry in index order and
//! swapped whenever the trailing entry's priority strictly exceeds the
//! leading one's. Given an already-sorted queue the pass yields a
//! sorted queue, and ties never swap, so arrival order is preserved.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use super::descriptor::Descriptor;

/// The scheduler's ready list.
#[derive(Default)]
pub(crate) struct RunQueue {
    entries: RefCell<VecDeque<Rc<Descriptor>>>,
}

impl RunQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append a descriptor and restore the sort invariant.
    ///
    /// A descriptor must not already be queued; the state machine only
    /// admits `Created`, `Blocked`, or cooperating `Running` fibers,
    /// none of which can be on the queue.
    pub(crate) fn push(&self, descriptor: Rc<Descriptor>) {
        let mut entries = self.entries.borrow_mut();
        debug_assert!(
            !entries.iter().any(|queued| Rc::ptr_eq(queued, &descriptor)),
            "descriptor enqueued twice"
        );

        entries.push_back(descriptor);
        let last = entries.len() - 1;
        for lead in 0..last {
            if entries[last].priority() > entries[lead].priority() {
                entries.swap(last, lead);
            }
        }
    }

    /// Remove and return the highest-priority descriptor.
    pub(crate) fn pop_front(&self) -> Option<Rc<Descriptor>> {
        self.entries.borrow_mut().pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Snapshot of queued priorities, front to back.
    #[cfg(test)]
    pub(crate) fn priorities(&self) -> Vec<f64> {
        self.entries.borrow().iter().map(|d| d.priority()).collect()
    }
}
