//! Integration tests for the sleep and join operations, driven through
//! real fibers on a live reactor.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::{Duration, Instant};

use filament::{
    from_fn, Fiber, FiberState, Reactor, Scheduler, Signal, Step, Target, Value,
};

fn scheduler() -> Scheduler {
    Scheduler::new(Reactor::new())
}

/// A fiber that parks itself forever: it obtains a resume callback,
/// drops it, and suspends.
fn parked_forever(scheduler: &Scheduler) -> Fiber {
    Fiber::new(
        scheduler,
        Target::function(|| {
            let mut phase = 0;
            Box::new(from_fn(move |_| {
                phase += 1;
                if phase == 1 {
                    Step::Yield(Signal::Continuation)
                } else {
                    // The callback arrived as input and is dropped here;
                    // nothing can ever wake this fiber again.
                    Step::Yield(Signal::Suspension)
                }
            }))
        }),
    )
}

/// A fiber that runs `op` as a nested frame and then records completion.
fn driving_fiber(
    scheduler: &Scheduler,
    op: impl FnOnce() -> Step + 'static,
    done: &Rc<Cell<u32>>,
) -> Fiber {
    let done = done.clone();
    let mut op = Some(op);
    Fiber::new(
        scheduler,
        Target::function(move || {
            Box::new(from_fn(move |_| match op.take() {
                Some(op) => op(),
                None => {
                    done.set(done.get() + 1);
                    Step::Done(Value::Null)
                }
            }))
        }),
    )
}

#[test]
fn test_sleep_resumes_once_after_the_delay() {
    let scheduler = scheduler();
    let woke = Rc::new(Cell::new(0u32));

    let sleeper = {
        let scheduler_op = scheduler.clone();
        driving_fiber(
            &scheduler,
            move || Step::call(scheduler_op.sleep(20)),
            &woke,
        )
    };
    sleeper.start().unwrap();

    let begun = Instant::now();
    scheduler.reactor().run();

    assert!(begun.elapsed() >= Duration::from_millis(20));
    assert_eq!(woke.get(), 1);
    assert_eq!(sleeper.state(), FiberState::Zombied);
}

#[test]
fn test_sleep_does_not_hold_up_other_fibers() {
    let scheduler = scheduler();
    let order: Rc<RefCell<Vec<&'static str>>> = Rc::new(RefCell::new(Vec::new()));

    let sleeper = {
        let scheduler_op = scheduler.clone();
        let order = order.clone();
        let mut slept = false;
        Fiber::new(
            &scheduler,
            Target::function(move || {
                Box::new(from_fn(move |_| {
                    if !slept {
                        slept = true;
                        Step::call(scheduler_op.sleep(15))
                    } else {
                        order.borrow_mut().push("sleeper");
                        Step::Done(Value::Null)
                    }
                }))
            }),
        )
    };
    let quick = {
        let order = order.clone();
        Fiber::new(
            &scheduler,
            Target::function(move || {
                Box::new(from_fn(move |_| {
                    order.borrow_mut().push("quick");
                    Step::Done(Value::Null)
                }))
            }),
        )
    };

    sleeper.start().unwrap();
    quick.start().unwrap();
    scheduler.reactor().run();

    // The later-started fiber finishes while the first one is parked.
    assert_eq!(*order.borrow(), vec!["quick", "sleeper"]);
}

#[test]
fn test_join_resumes_when_the_target_completes() {
    let scheduler = scheduler();
    let joined = Rc::new(Cell::new(0u32));

    let worker = Fiber::new(
        &scheduler,
        Target::function(|| {
            let mut phase = 0;
            Box::new(from_fn(move |_| {
                phase += 1;
                if phase < 3 {
                    Step::Yield(Signal::Cooperation)
                } else {
                    Step::Done(Value::from(7))
                }
            }))
        }),
    );
    let waiter = {
        let target = worker.clone();
        driving_fiber(&scheduler, move || Step::call(target.join(None)), &joined)
    };

    worker.start().unwrap();
    waiter.start().unwrap();
    scheduler.reactor().run();

    assert_eq!(joined.get(), 1);
    assert_eq!(worker.state(), FiberState::Zombied);
    assert_eq!(worker.outcome(), Some(Value::from(7)));
    assert_eq!(waiter.state(), FiberState::Zombied);
    // The wait list drained when the worker died.
    assert_eq!(worker.waiter_count(), 0);
}

#[test]
fn test_join_on_dead_target_resolves_immediately() {
    let scheduler = scheduler();
    let joined = Rc::new(Cell::new(0u32));

    let corpse = Fiber::new(
        &scheduler,
        Target::function(|| Box::new(from_fn(|_| Step::Done(Value::Null)))),
    );
    corpse.start().unwrap();
    scheduler.reactor().run();
    assert_eq!(corpse.state(), FiberState::Zombied);

    let waiter = {
        let target = corpse.clone();
        driving_fiber(
            &scheduler,
            move || Step::call(target.join(Some(1000))),
            &joined,
        )
    };
    waiter.start().unwrap();

    let begun = Instant::now();
    scheduler.reactor().run();

    // Resolved without the timeout timer ever being armed.
    assert_eq!(joined.get(), 1);
    assert!(begun.elapsed() < Duration::from_millis(500));
    assert_eq!(scheduler.reactor().timer_count(), 0);
}

#[test]
fn test_join_timeout_fires_when_the_target_never_dies() {
    let scheduler = scheduler();
    let joined = Rc::new(Cell::new(0u32));

    let stuck = parked_forever(&scheduler);
    let waiter = {
        let target = stuck.clone();
        driving_fiber(
            &scheduler,
            move || Step::call(target.join(Some(20))),
            &joined,
        )
    };

    stuck.start().unwrap();
    waiter.start().unwrap();

    let begun = Instant::now();
    scheduler.reactor().run();

    assert!(begun.elapsed() >= Duration::from_millis(20));
    assert_eq!(joined.get(), 1);
    assert_eq!(waiter.state(), FiberState::Zombied);
    // The target is still parked; only the joiner moved on.
    assert_eq!(stuck.state(), FiberState::Blocked);
    assert_eq!(stuck.waiter_count(), 1);
}

#[test]
fn test_join_resumes_once_when_death_beats_the_timeout() {
    let scheduler = scheduler();
    let joined = Rc::new(Cell::new(0u32));

    let brief = Fiber::new(
        &scheduler,
        Target::function(|| Box::new(from_fn(|_| Step::Done(Value::Null)))),
    );
    let waiter = {
        let target = brief.clone();
        driving_fiber(
            &scheduler,
            move || Step::call(target.join(Some(10))),
            &joined,
        )
    };

    // Start the joiner first so it parks before the target dies.
    waiter.start().unwrap();
    brief.start().unwrap();
    scheduler.reactor().run();

    // Completion won; the later timeout found the flag already set.
    assert_eq!(joined.get(), 1);
    assert_eq!(waiter.state(), FiberState::Zombied);
}

#[test]
fn test_join_resumes_when_the_target_is_killed() {
    let scheduler = scheduler();
    let joined = Rc::new(Cell::new(0u32));

    let victim = parked_forever(&scheduler);
    let waiter = {
        let target = victim.clone();
        driving_fiber(&scheduler, move || Step::call(target.join(None)), &joined)
    };
    let killer = {
        let target = victim.clone();
        Fiber::new(
            &scheduler,
            Target::function(move || {
                let mut phase = 0;
                Box::new(from_fn(move |_| {
                    phase += 1;
                    if phase == 1 {
                        // Give the victim and the joiner a turn to park.
                        Step::Yield(Signal::Cooperation)
                    } else {
                        target.kill();
                        Step::Done(Value::Null)
                    }
                }))
            }),
        )
    };

    victim.start().unwrap();
    waiter.start().unwrap();
    killer.start().unwrap();
    scheduler.reactor().run();

    assert_eq!(victim.state(), FiberState::Zombied);
    assert_eq!(joined.get(), 1);
    assert_eq!(waiter.state(), FiberState::Zombied);
    assert_eq!(victim.waiter_count(), 0);
}

#[test]
fn test_many_joiners_all_resume() {
    let scheduler = scheduler();
    let joined = Rc::new(Cell::new(0u32));

    let worker = Fiber::new(
        &scheduler,
        Target::function(|| {
            let mut phase = 0;
            Box::new(from_fn(move |_| {
                phase += 1;
                if phase == 1 {
                    Step::Yield(Signal::Cooperation)
                } else {
                    Step::Done(Value::Null)
                }
            }))
        }),
    );
    worker.start().unwrap();

    let waiters: Vec<Fiber> = (0..4)
        .map(|_| {
            let target = worker.clone();
            let fiber =
                driving_fiber(&scheduler, move || Step::call(target.join(None)), &joined);
            fiber.start().unwrap();
            fiber
        })
        .collect();

    scheduler.reactor().run();

    assert_eq!(joined.get(), 4);
    assert!(waiters.iter().all(|w| w.state() == FiberState::Zombied));
    assert_eq!(worker.waiter_count(), 0);
}
