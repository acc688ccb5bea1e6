mod common;

use abyss::interrupt::{ExternalContext, InterruptGuard};
use common::{block, boot, idle_turn, noop, ticks};
use threads::{
    thread::{PRI_DEFAULT, PRI_MAX, TIME_SLICE},
    CreateError, Policy, ThreadBuilder, ThreadFlags, ThreadState, TickStats,
};

#[test]
fn boots_into_main() {
    let (sched, machine) = boot(Policy::Priority);
    let main = sched.current_thread();
    assert_eq!(main.tid().as_u32(), 1);
    assert_eq!(main.name(), "main");
    assert!(main.flags().contains(ThreadFlags::INITIAL));
    assert_eq!(sched.priority(), PRI_DEFAULT);

    let idle = sched.idle_thread().unwrap();
    assert_eq!(idle.as_u32(), 2);
    assert_eq!(sched.thread(idle).unwrap().state(), ThreadState::Blocked);
    assert_eq!(sched.ready_len(), 0);
    assert_eq!(machine.switches(), [(0, 1), (1, 0)]);
    sched.validate();
}

#[test]
fn higher_priority_thread_preempts_its_creator() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let main = sched.current();
    let high = sched.create("high", 40, noop, 0).unwrap();
    assert_eq!(sched.current(), high);
    assert_eq!(sched.thread(main).unwrap().state(), ThreadState::Ready);
    assert_eq!(sched.ready_threads().collect::<Vec<_>>(), [main]);
    sched.validate();

    let low = sched.create("low", 10, noop, 0).unwrap();
    assert_eq!(sched.current(), high);
    assert_eq!(sched.ready_threads().collect::<Vec<_>>(), [main, low]);
    sched.validate();
}

#[test]
fn ready_threads_run_by_priority_then_fifo() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let main = sched.current();
    sched.set_priority(PRI_MAX);
    let a = sched.create("a", 20, noop, 0).unwrap();
    let b = sched.create("b", 40, noop, 0).unwrap();
    let c = sched.create("c", 20, noop, 0).unwrap();
    let d = sched.create("d", 40, noop, 0).unwrap();
    assert_eq!(sched.ready_threads().collect::<Vec<_>>(), [b, d, a, c]);
    sched.validate();

    block(&mut sched);
    let mut order = vec![sched.current()];
    for _ in 0..3 {
        sched.exit(0);
        sched.validate();
        order.push(sched.current());
    }
    assert_eq!(order, [b, d, a, c]);

    // Nothing is ready once `c` exits: the idle thread takes over.
    sched.exit(0);
    assert_eq!(Some(sched.current()), sched.idle_thread());
    sched.validate();

    sched.unblock(main);
    assert_eq!(Some(sched.current()), sched.idle_thread());
    idle_turn(&mut sched);
    assert_eq!(sched.current(), main);
    sched.validate();
}

#[test]
fn yielding_alone_keeps_the_cpu() {
    let (mut sched, machine) = boot(Policy::Priority);
    let main = sched.current();
    let switches = machine.switches().len();
    sched.yield_now();
    assert_eq!(sched.current(), main);
    assert_eq!(machine.switches().len(), switches);

    let peer = sched.create("peer", PRI_DEFAULT, noop, 0).unwrap();
    assert_eq!(sched.current(), main);
    sched.yield_now();
    assert_eq!(sched.current(), peer);
    assert_eq!(sched.ready_threads().collect::<Vec<_>>(), [main]);
    sched.validate();
}

#[test]
fn lowering_priority_yields_to_a_higher_thread() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let main = sched.current();
    let other = sched.create("other", 20, noop, 0).unwrap();
    assert_eq!(sched.current(), main);

    sched.set_priority(10);
    assert_eq!(sched.current(), other);
    assert_eq!(sched.thread(main).unwrap().priority(), 10);
    sched.validate();
}

#[test]
fn running_thread_is_preempted_after_its_time_slice() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let main = sched.current();
    let peer = sched.create("peer", PRI_DEFAULT, noop, 0).unwrap();

    ticks(&mut sched, (TIME_SLICE - 1) as u64);
    assert_eq!(sched.current(), main);
    ticks(&mut sched, 1);
    assert_eq!(sched.current(), peer);
    sched.validate();

    ticks(&mut sched, TIME_SLICE as u64);
    assert_eq!(sched.current(), main);
    sched.validate();
}

#[test]
fn wakeup_from_interrupt_waits_for_the_handler_to_return() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let main = sched.current();
    let event = sched.sema_create(0);
    let waiter = sched.create("waiter", 50, noop, 0).unwrap();
    assert_eq!(sched.current(), waiter);
    sched.sema_down(event);
    assert_eq!(sched.current(), main);

    {
        let _frame = ExternalContext::enter();
        sched.sema_up(event);
        assert_eq!(sched.current(), main);
        assert_eq!(sched.thread(waiter).unwrap().state(), ThreadState::Ready);
    }
    assert_eq!(sched.current(), main);

    sched.timer_interrupt();
    assert_eq!(sched.current(), waiter);
    sched.validate();
}

#[test]
fn exited_thread_is_reclaimed_by_its_successor() {
    let (mut sched, machine) = boot(Policy::Priority);
    let main = sched.current();
    assert_eq!(machine.live_contexts(), 2);

    let worker = sched.create("worker", 40, noop, 0).unwrap();
    assert_eq!(machine.live_contexts(), 3);
    assert_eq!(sched.current(), worker);

    sched.exit(0);
    assert_eq!(sched.current(), main);
    assert!(sched.thread(worker).is_none());
    assert_eq!(machine.live_contexts(), 2);
    sched.validate();

    // Identifiers are never reused.
    let next = sched.create("next", 10, noop, 0).unwrap();
    assert_eq!(next.as_u32(), worker.as_u32() + 1);
}

#[test]
fn bootstrap_thread_is_never_reclaimed() {
    let (mut sched, machine) = boot(Policy::Priority);
    let main = sched.current();
    let heir = sched.create("heir", 20, noop, 0).unwrap();

    sched.exit(0);
    assert_eq!(sched.current(), heir);
    assert_eq!(sched.thread(main).unwrap().state(), ThreadState::Dying);
    assert_eq!(machine.live_contexts(), 3);

    let guard = InterruptGuard::new();
    let mut names = Vec::new();
    sched.for_each(&guard.token(), |th| names.push(th.name().to_string()));
    drop(guard);
    assert_eq!(names, ["idle", "heir"]);
    sched.validate();
}

#[test]
fn allocation_failure_changes_nothing() {
    let (mut sched, machine) = boot(Policy::Priority);
    let main = sched.current();
    machine.fail_next_prepare();

    let err = sched.create("doomed", 40, noop, 0).unwrap_err();
    assert_eq!(err, CreateError::OutOfMemory);
    assert_eq!(i32::from(err), -1);
    assert_eq!(sched.current(), main);
    assert_eq!(sched.ready_len(), 0);
    assert_eq!(machine.live_contexts(), 2);

    let next = sched.create("next", 10, noop, 0).unwrap();
    assert_eq!(next.as_u32(), 3);
    sched.validate();
}

#[test]
fn ticks_are_accounted_by_thread_kind() {
    let (mut sched, _machine) = boot(Policy::Priority);
    ticks(&mut sched, 3);

    let user = ThreadBuilder::new("user")
        .priority(40)
        .user()
        .spawn(&mut sched, noop, 0)
        .unwrap();
    assert_eq!(sched.current(), user);
    assert!(sched.current_thread().flags().contains(ThreadFlags::USER));
    ticks(&mut sched, 2);

    block(&mut sched);
    block(&mut sched);
    assert_eq!(Some(sched.current()), sched.idle_thread());
    ticks(&mut sched, 1);

    assert_eq!(
        sched.stats(),
        TickStats {
            idle: 1,
            kernel: 3,
            user: 2
        }
    );
    assert_eq!(sched.ticks(), 6);
    sched.print_stats();
}

#[test]
#[should_panic(expected = "not blocked")]
fn unblocking_a_ready_thread_is_fatal() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let low = sched.create("low", 10, noop, 0).unwrap();
    sched.unblock(low);
}

#[test]
#[should_panic(expected = "cannot block in an external interrupt handler")]
fn blocking_in_an_interrupt_handler_is_fatal() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let frame = ExternalContext::enter();
    sched.block(&frame.token());
}

#[test]
#[should_panic(expected = "out of range")]
fn priority_out_of_range_is_fatal() {
    let (mut sched, _machine) = boot(Policy::Priority);
    let _ = sched.create("bad", PRI_MAX + 1, noop, 0);
}
