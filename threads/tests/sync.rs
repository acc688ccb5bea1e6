mod common;

use common::{boot, noop};
use threads::Policy;

#[test]
fn semaphore_wakes_the_highest_priority_waiter_first() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let main = sched.current();
    let sema = sched.sema_create(0);

    let mut waiters = Vec::new();
    for (name, priority) in [("t1", 35), ("t2", 45), ("t3", 40), ("t4", 40)] {
        let tid = sched.create(name, priority, noop, 0).unwrap();
        assert_eq!(sched.current(), tid);
        sched.sema_down(sema);
        assert_eq!(sched.current(), main);
        waiters.push(tid);
    }

    let mut woken = Vec::new();
    for _ in 0..4 {
        sched.sema_up(sema);
        woken.push(sched.current());
        sched.validate();
        sched.exit(0);
        assert_eq!(sched.current(), main);
    }
    assert_eq!(woken, [waiters[1], waiters[2], waiters[3], waiters[0]]);
    assert_eq!(sched.sema_value(sema), 0);
    sched.sema_destroy(sema);
}

#[test]
fn semaphore_counts_units_without_waiters() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let sema = sched.sema_create(1);
    assert!(sched.sema_try_down(sema));
    assert!(!sched.sema_try_down(sema));
    assert_eq!(sched.sema_value(sema), 0);

    sched.sema_up(sema);
    sched.sema_up(sema);
    assert_eq!(sched.sema_value(sema), 2);
    sched.sema_down(sema);
    assert_eq!(sched.sema_value(sema), 1);
    sched.sema_destroy(sema);
}

#[test]
fn woken_waiter_below_the_waker_does_not_preempt() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let main = sched.current();
    let sema = sched.sema_create(0);
    let low = sched.create("low", 10, noop, 0).unwrap();
    sched.set_priority(5);
    assert_eq!(sched.current(), low);
    sched.sema_down(sema);
    assert_eq!(sched.current(), main);

    sched.set_priority(20);
    sched.sema_up(sema);
    assert_eq!(sched.current(), main);
    assert_eq!(sched.ready_threads().collect::<Vec<_>>(), [low]);
    sched.validate();
}

#[test]
#[should_panic(expected = "destroyed with waiters")]
fn destroying_a_semaphore_with_waiters_is_fatal() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let sema = sched.sema_create(0);
    sched.create("waiter", 40, noop, 0).unwrap();
    sched.sema_down(sema);
    sched.sema_destroy(sema);
}
