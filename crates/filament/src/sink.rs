//! Diagnostic sink for uncaught task faults
//!
//! An uncaught fault kills its task and goes nowhere else; the sink is
//! the one place it is recorded. The scheduler takes the sink as an
//! injected trait object so embedders can route diagnostics wherever
//! they want; tests capture them in memory.

use std::cell::RefCell;

use crate::error::Fault;

/// Receives every uncaught fault, one call per dead task.
pub trait DiagnosticSink {
    /// Record `fault`. The task is already dead when this runs.
    fn report(&self, fault: &Fault);
}

/// Default sink: writes `name: message` plus the accumulated trace to
/// standard error.
#[derive(Debug, Default)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&self, fault: &Fault) {
        if fault.stack().is_empty() {
            eprintln!("{}", fault);
        } else {
            eprintln!("{}\n{}", fault, fault.stack());
        }
    }
}

/// Test sink that keeps every reported fault.
#[derive(Debug, Default)]
pub struct MemorySink {
    reports: RefCell<Vec<Fault>>,
}

impl MemorySink {
    /// A fresh, empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All faults reported so far, in order.
    pub fn reports(&self) -> Vec<Fault> {
        self.reports.borrow().clone()
    }

    /// Number of faults reported so far.
    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    /// Whether nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }
}

impl DiagnosticSink for MemorySink {
    fn report(&self, fault: &Fault) {
        self.reports.borrow_mut().push(fault.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_records_in_order() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.report(&Fault::new("A", "first"));
        sink.report(&Fault::new("B", "second"));

        let reports = sink.reports();
        assert_eq!(sink.len(), 2);
        assert_eq!(reports[0].name(), "A");
        assert_eq!(reports[1].name(), "B");
    }
}
