mod common;

use common::{block, boot, noop, ticks};
use threads::{thread::PRI_MAX, Fixed, Policy};

#[test]
fn one_busy_second_on_an_idle_system() {
    let (mut sched, _machine) = boot(Policy::Mlfqs);
    assert_eq!(sched.priority(), PRI_MAX);
    assert_eq!(sched.load_avg(), 0);

    ticks(&mut sched, 100);
    assert_eq!(sched.load_avg(), 1);
    assert_eq!(sched.recent_cpu(), 322);
    assert_eq!(sched.current_thread().recent_cpu(), Fixed::from_raw(52_800));
    assert_eq!(sched.priority(), 62);
    sched.validate();
}

#[test]
fn load_average_counts_queued_and_running_threads() {
    let (mut sched, _machine) = boot(Policy::Mlfqs);
    sched.create("a", 0, noop, 0).unwrap();
    sched.create("b", 0, noop, 0).unwrap();
    assert_eq!(sched.ready_len(), 2);

    ticks(&mut sched, 100);
    // 3 / 60 in 17.14 is 819, which reports as 4.
    assert_eq!(sched.ready_len(), 2);
    assert_eq!(sched.load_avg(), 4);
    sched.validate();
}

#[test]
fn idle_thread_adds_nothing_to_the_load_average() {
    let (mut sched, _machine) = boot(Policy::Mlfqs);
    let main = sched.current();
    block(&mut sched);
    assert_eq!(Some(sched.current()), sched.idle_thread());

    ticks(&mut sched, 100);
    assert_eq!(Some(sched.current()), sched.idle_thread());
    assert_eq!(sched.load_avg(), 0);
    assert_eq!(sched.stats().idle, 100);
    assert_eq!(sched.thread(main).unwrap().recent_cpu(), Fixed::ZERO);
    sched.validate();
}

#[test]
fn recalculation_hands_the_cpu_to_a_fresher_thread() {
    let (mut sched, _machine) = boot(Policy::Mlfqs);
    let main = sched.current();
    let peer = sched.create("peer", 0, noop, 0).unwrap();
    assert_eq!(sched.current(), main);

    ticks(&mut sched, 3);
    assert_eq!(sched.current(), main);
    ticks(&mut sched, 1);
    assert_eq!(sched.current(), peer);
    assert_eq!(sched.thread(main).unwrap().priority(), 62);
    assert_eq!(sched.priority(), PRI_MAX);
    assert_eq!(sched.ready_threads().collect::<Vec<_>>(), [main]);
    sched.validate();
}

#[test]
fn priority_follows_cpu_usage_between_seconds() {
    let (mut sched, _machine) = boot(Policy::Mlfqs);
    ticks(&mut sched, 3);
    assert_eq!(sched.priority(), PRI_MAX);
    ticks(&mut sched, 1);
    // recent_cpu = 4, so round(4 / 4) = 1.
    assert_eq!(sched.priority(), 62);
    ticks(&mut sched, 4);
    assert_eq!(sched.priority(), 61);
}

#[test]
fn set_priority_is_ignored() {
    let (mut sched, _machine) = boot(Policy::Mlfqs);
    sched.set_priority(10);
    assert_eq!(sched.priority(), PRI_MAX);
    assert_eq!(sched.current_thread().base_priority(), PRI_MAX);
}

#[test]
fn nice_lowers_priority_and_is_inherited() {
    let (mut sched, _machine) = boot(Policy::Mlfqs);
    ticks(&mut sched, 100);
    sched.set_nice(5);
    assert_eq!(sched.nice(), 5);
    assert_eq!(sched.priority(), 52);

    // The requested priority is ignored in favor of the computed one.
    let child = sched.create("child", 10, noop, 0).unwrap();
    let th = sched.thread(child).unwrap();
    assert_eq!(th.nice(), 5);
    assert_eq!(th.recent_cpu(), sched.current_thread().recent_cpu());
    assert_eq!(th.priority(), 52);
    sched.validate();
}

#[test]
fn raising_nice_yields_to_a_fresher_thread() {
    let (mut sched, _machine) = boot(Policy::Mlfqs);
    let main = sched.current();
    let peer = sched.create("peer", 0, noop, 0).unwrap();
    assert_eq!(sched.current(), main);
    sched.set_nice(1);
    assert_eq!(sched.priority(), 61);
    assert_eq!(sched.current(), peer);
    sched.validate();
}

#[test]
fn waiting_on_a_lock_donates_nothing() {
    let (mut sched, _machine) = boot(Policy::Mlfqs);
    let main = sched.current();
    let lock = sched.lock_create();
    sched.lock_acquire(lock);
    sched.set_nice(10);
    assert_eq!(sched.priority(), 43);

    let waiter = sched.create("waiter", 0, noop, 0).unwrap();
    sched.yield_now();
    assert_eq!(sched.current(), waiter);
    sched.set_nice(-10);
    assert_eq!(sched.priority(), PRI_MAX);
    sched.lock_acquire(lock);

    assert_eq!(sched.current(), main);
    assert_eq!(sched.priority(), 43);
    assert_eq!(sched.lock_priority(lock), None);
    sched.validate();

    sched.lock_release(lock);
    assert_eq!(sched.current(), waiter);
    assert_eq!(sched.lock_holder(lock), Some(waiter));
}
