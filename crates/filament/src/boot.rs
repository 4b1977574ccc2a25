//! Runtime bundle and program bootstrap
//!
//! `Runtime` wires a reactor and a scheduler together; `boot` wraps a
//! program entry point in a root fiber, runs the loop to quiescence,
//! and maps a truthy return value from the entry point to a
//! process-exit error raised inside the root task.

use std::rc::Rc;

use crate::coroutine::{Coroutine, Resume, Step};
use crate::error::{BootError, Fault};
use crate::fiber::{Fiber, Target};
use crate::reactor::Reactor;
use crate::scheduler::Scheduler;
use crate::sink::DiagnosticSink;
use crate::value::Value;

/// A reactor and a scheduler wired together, one per process.
pub struct Runtime {
    reactor: Reactor,
    scheduler: Scheduler,
}

impl Runtime {
    /// A runtime reporting uncaught faults to standard error.
    pub fn new() -> Self {
        let reactor = Reactor::new();
        let scheduler = Scheduler::new(reactor.clone());
        Self { reactor, scheduler }
    }

    /// A runtime reporting uncaught faults to `sink`.
    pub fn with_sink(sink: Rc<dyn DiagnosticSink>) -> Self {
        let reactor = Reactor::new();
        let scheduler = Scheduler::with_sink(reactor.clone(), sink);
        Self { reactor, scheduler }
    }

    /// The scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// The event loop.
    pub fn reactor(&self) -> &Reactor {
        &self.reactor
    }

    /// Construct a fiber on this runtime's scheduler.
    pub fn spawn(&self, target: Target) -> Fiber {
        Fiber::new(&self.scheduler, target)
    }

    /// Drive the event loop until nothing remains to run.
    pub fn run(&self) {
        self.reactor.run();
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// The root fiber's single frame: invoke the entry point once and
/// raise its truthy return value as a fault.
struct RootFrame<F> {
    entry: Option<F>,
    scheduler: Scheduler,
    args: Vec<String>,
}

impl<F> Coroutine for RootFrame<F>
where
    F: FnOnce(&Scheduler, &[String]) -> Value,
{
    fn advance(&mut self, _input: Resume) -> Step {
        let Some(entry) = self.entry.take() else {
            return Step::Fail(Fault::exhausted());
        };
        let exit = entry(&self.scheduler, &self.args);
        if exit.is_truthy() {
            Step::Fail(Fault::from_exit(&exit))
        } else {
            Step::Done(Value::Null)
        }
    }

    fn name(&self) -> &str {
        "main"
    }
}

/// Boot with the process's own argument vector.
pub fn boot<F>(entry: F) -> Result<(), BootError>
where
    F: FnOnce(&Scheduler, &[String]) -> Value + 'static,
{
    boot_with_args(entry, std::env::args().collect())
}

/// Wrap `entry` in a freshly created root fiber and run to quiescence.
///
/// The entry point runs inside the root task with the scheduler and
/// the argument vector; fibers it spawns keep running after it
/// returns. A truthy return value — or any fault escaping the root
/// task — comes back as [`BootError::Exit`].
pub fn boot_with_args<F>(entry: F, args: Vec<String>) -> Result<(), BootError>
where
    F: FnOnce(&Scheduler, &[String]) -> Value + 'static,
{
    let runtime = Runtime::new();
    let scheduler = runtime.scheduler().clone();

    let root = runtime.spawn(Target::function(move || {
        Box::new(RootFrame {
            entry: Some(entry),
            scheduler,
            args,
        })
    }));
    root.start()?;
    runtime.run();

    match root.fault() {
        Some(fault) => Err(BootError::Exit(fault)),
        None => Ok(()),
    }
}
