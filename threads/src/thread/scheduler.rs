//! Thread scheduler
//!
//! The [`Scheduler`] owns every thread control block and decides which
//! ready thread runs next. It is a plain value: the kernel keeps one
//! instance for the whole system (see [`crate::kernel`]), while tests build
//! as many as they like on top of a simulated [`Arch`].
//!
//! Scheduler state is only ever touched with interrupts masked. Entry points
//! that may be called with interrupts enabled mask them with an
//! [`InterruptGuard`]; internal steps that must already run masked take an
//! [`IntrOff`] token instead.
use super::{
    context::Arch, queue::ReadyQueue, registry::Registry, CreateError, Thread, ThreadBuilder,
    ThreadFlags, ThreadFunc, ThreadState, Tid, PRI_MAX, PRI_MIN, TIME_SLICE,
};
use crate::{
    arena::Arena,
    config::{Config, Policy},
    fixed_point::Fixed,
    sync::{lock::Lock, semaphore::Semaphore, SemaId},
    timer::Timer,
};
use abyss::interrupt::{self, InterruptGuard, IntrOff};
use alloc::{boxed::Box, string::String, vec::Vec};

/// Timer ticks, split by what the cpu was doing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Ticks spent in the idle thread.
    pub idle: u64,
    /// Ticks spent in kernel threads.
    pub kernel: u64,
    /// Ticks spent in threads running user programs.
    pub user: u64,
}

/// The thread scheduler.
pub struct Scheduler<A: Arch> {
    pub(crate) arch: A,
    pub(crate) config: Config,
    pub(crate) threads: Registry<A::Context>,
    pub(crate) ready: ReadyQueue,
    pub(crate) current: Tid,
    pub(crate) initial: Tid,
    pub(crate) idle: Option<Tid>,
    pub(crate) idle_started: Option<SemaId>,
    /// Thread that ran before the last switch, until `schedule_tail` sees it.
    pub(crate) switched_from: Option<Tid>,
    /// Ticks since the running thread was scheduled.
    pub(crate) thread_ticks: u32,
    pub(crate) yield_on_return: bool,
    pub(crate) load_avg: Fixed,
    pub(crate) stats: TickStats,
    pub(crate) timer: Timer,
    pub(crate) semas: Arena<Semaphore>,
    pub(crate) locks: Arena<Lock>,
}

impl<A: Arch> Scheduler<A> {
    /// The running thread.
    pub fn current(&self) -> Tid {
        self.current
    }

    /// Look up a thread that has not been reclaimed yet.
    pub fn thread(&self, tid: Tid) -> Option<&Thread<A::Context>> {
        self.threads.get(tid)
    }

    /// Control block of the running thread.
    pub fn current_thread(&self) -> &Thread<A::Context> {
        &self.threads[self.current]
    }

    /// The idle thread, once [`start`](Self::start) has created it.
    pub fn idle_thread(&self) -> Option<Tid> {
        self.idle
    }

    /// Active scheduling policy.
    pub fn policy(&self) -> Policy {
        self.config.policy
    }

    /// Configuration fixed at [`init`](Self::init).
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The machine layer.
    pub fn arch(&self) -> &A {
        &self.arch
    }

    /// Number of ready threads.
    pub fn ready_len(&self) -> usize {
        self.ready.len()
    }

    /// Ready threads in the order they will run.
    pub fn ready_threads(&self) -> impl Iterator<Item = Tid> + '_ {
        self.ready.iter()
    }

    /// Create a kernel thread `name` running `func(aux)` at `priority`.
    ///
    /// Shorthand for [`ThreadBuilder`]. If the new thread outranks the
    /// caller, the caller is preempted before this returns.
    ///
    /// # Errors
    /// [`CreateError::OutOfMemory`] if no stack can be allocated. Nothing is
    /// changed in that case, not even the next thread id.
    pub fn create(
        &mut self,
        name: &str,
        priority: i32,
        func: ThreadFunc,
        aux: usize,
    ) -> Result<Tid, CreateError> {
        ThreadBuilder::new(name)
            .priority(priority)
            .spawn(self, func, aux)
    }

    /// Build a control block in the Blocked state and register it.
    pub(crate) fn register(
        &mut self,
        name: String,
        priority: i32,
        flags: ThreadFlags,
        func: ThreadFunc,
        aux: usize,
        _: &IntrOff<'_>,
    ) -> Result<Tid, CreateError> {
        assert!(
            (PRI_MIN..=PRI_MAX).contains(&priority),
            "priority {} out of range",
            priority
        );
        let context = self.arch.prepare(func, aux)?;
        let tid = self.threads.allocate_tid();
        let creator = &self.threads[self.current];
        let (nice, recent_cpu) = (creator.nice, creator.recent_cpu);
        let priority = if self.policy() == Policy::Mlfqs && !flags.contains(ThreadFlags::IDLE) {
            super::mlfqs::priority_for(recent_cpu, nice)
        } else {
            priority
        };
        log::debug!("create thread {} `{}` at priority {}", tid, name, priority);
        self.threads.insert(Box::new(Thread {
            tid,
            name,
            state: ThreadState::Blocked,
            flags,
            base_priority: priority,
            priority,
            nice,
            recent_cpu,
            held_locks: Vec::new(),
            waiting_on: None,
            context,
        }));
        Ok(tid)
    }

    /// Put the running thread to sleep until [`unblock`](Self::unblock).
    ///
    /// # Panics
    /// Panics inside an external interrupt handler.
    pub fn block(&mut self, token: &IntrOff<'_>) {
        assert!(
            !interrupt::in_external(),
            "cannot block in an external interrupt handler"
        );
        let cur = self.current;
        self.threads[cur].state = ThreadState::Blocked;
        self.dispatch(token);
    }

    /// Make the blocked thread `tid` ready to run.
    ///
    /// Runs the preemption check afterwards, so the caller may be switched
    /// out if `tid` outranks it. Inside an interrupt handler the switch is
    /// deferred until the handler returns.
    ///
    /// # Panics
    /// Panics if `tid` is not blocked.
    pub fn unblock(&mut self, tid: Tid) {
        let guard = InterruptGuard::new();
        let token = guard.token();
        self.make_ready(tid, &token);
        self.preempt_check(&token);
    }

    /// Blocked to Ready, without the preemption check.
    pub(crate) fn make_ready(&mut self, tid: Tid, _: &IntrOff<'_>) {
        let th = &mut self.threads[tid];
        assert!(
            th.state == ThreadState::Blocked,
            "thread {} `{}` is not blocked ({:?})",
            tid,
            th.name,
            th.state
        );
        assert!(!th.is_idle(), "the idle thread is never made ready");
        th.state = ThreadState::Ready;
        let priority = th.priority;
        self.ready.push(tid, priority);
    }

    /// Give up the cpu. The running thread stays ready and may be picked
    /// again immediately.
    pub fn yield_now(&mut self) {
        let guard = InterruptGuard::new();
        self.yield_current(&guard.token());
    }

    pub(crate) fn yield_current(&mut self, token: &IntrOff<'_>) {
        assert!(
            !interrupt::in_external(),
            "cannot yield in an external interrupt handler"
        );
        let cur = self.current;
        let th = &mut self.threads[cur];
        th.state = ThreadState::Ready;
        if !th.is_idle() {
            let priority = th.priority;
            self.ready.push(cur, priority);
        }
        self.dispatch(token);
    }

    /// Terminate the running thread.
    ///
    /// The control block and its stack are reclaimed by the thread that
    /// runs next. On real hardware this never returns.
    ///
    /// # Panics
    /// Panics if the thread still holds a lock.
    pub fn exit(&mut self, status: i32) {
        assert!(
            !interrupt::in_external(),
            "cannot exit in an external interrupt handler"
        );
        let guard = InterruptGuard::new();
        let cur = self.current;
        let th = &mut self.threads[cur];
        assert!(!th.is_idle(), "the idle thread cannot exit");
        assert!(
            th.held_locks.is_empty(),
            "thread {} `{}` exits holding {} lock(s)",
            cur,
            th.name,
            th.held_locks.len()
        );
        log::debug!("thread {} `{}` exits with {}", cur, th.name, status);
        th.state = ThreadState::Dying;
        self.threads.unlink(cur);
        self.dispatch(&guard.token());
    }

    /// Switch to the next thread to run.
    fn dispatch(&mut self, token: &IntrOff<'_>) {
        let prev = self.current;
        assert!(
            self.threads[prev].state != ThreadState::Running,
            "dispatch while thread {} is still running",
            prev
        );
        let next = match self.ready.pop().or(self.idle) {
            Some(next) => next,
            None => panic!("no thread to run before the idle thread exists"),
        };
        if next != prev {
            log::trace!("switch {} -> {}", prev, next);
            self.switched_from = Some(prev);
            self.current = next;
            let prev_ctx = &mut self.threads[prev].context as *mut A::Context;
            let next_ctx = &self.threads[next].context as *const A::Context;
            unsafe { self.arch.switch(prev_ctx, next_ctx) };
        }
        self.schedule_tail(token);
    }

    /// Finish a switch on behalf of the thread that now runs.
    ///
    /// Runs right after [`Arch::switch`] returns, or as the first step of a
    /// brand new thread.
    pub(crate) fn schedule_tail(&mut self, _: &IntrOff<'_>) {
        let cur = self.current;
        self.threads[cur].state = ThreadState::Running;
        self.thread_ticks = 0;
        if let Some(prev) = self.switched_from.take() {
            if self.threads[prev].state == ThreadState::Dying && prev != self.initial {
                drop(self.threads.reap(prev));
                log::trace!("reclaimed thread {}", prev);
            }
        }
    }

    /// Yield if a ready thread outranks the running one.
    ///
    /// Inside an interrupt handler the yield is deferred until the handler
    /// returns. Any ready thread outranks the idle thread.
    pub(crate) fn preempt_check(&mut self, token: &IntrOff<'_>) {
        let cur = &self.threads[self.current];
        let running_idle = cur.is_idle();
        let outranked = match self.ready.peek_priority() {
            Some(head) => running_idle || head > cur.priority,
            None => false,
        };
        if !outranked {
            return;
        }
        if interrupt::in_external() {
            self.yield_on_return = true;
        } else if !running_idle {
            self.yield_current(token);
        }
    }

    /// Set the base priority of the running thread.
    ///
    /// The effective priority stays raised while donations are in effect.
    /// Yields if the running thread no longer has the highest priority.
    /// Ignored under MLFQS, where priorities are computed.
    pub fn set_priority(&mut self, priority: i32) {
        if self.policy() == Policy::Mlfqs {
            log::warn!("set_priority({}) ignored under MLFQS", priority);
            return;
        }
        assert!(
            (PRI_MIN..=PRI_MAX).contains(&priority),
            "priority {} out of range",
            priority
        );
        let guard = InterruptGuard::new();
        let token = guard.token();
        let cur = self.current;
        self.threads[cur].base_priority = priority;
        self.refresh_priority(cur, &token);
        self.preempt_check(&token);
    }

    /// Effective priority of the running thread.
    pub fn priority(&self) -> i32 {
        self.threads[self.current].priority
    }

    /// Visit every live thread in creation order.
    pub fn for_each(&self, _: &IntrOff<'_>, mut visitor: impl FnMut(&Thread<A::Context>)) {
        for tid in self.threads.live() {
            visitor(&self.threads[*tid]);
        }
    }

    /// Per-tick bookkeeping, called by the timer interrupt handler.
    pub fn tick(&mut self, token: &IntrOff<'_>) {
        if self.policy() == Policy::Mlfqs {
            self.mlfqs_tick(token);
        }
        let cur = &self.threads[self.current];
        if cur.is_idle() {
            self.stats.idle += 1;
        } else if cur.flags.contains(ThreadFlags::USER) {
            self.stats.user += 1;
        } else {
            self.stats.kernel += 1;
        }
        self.thread_ticks += 1;
        if self.thread_ticks >= TIME_SLICE {
            self.yield_on_return = true;
        }
    }

    /// Tick statistics so far.
    pub fn stats(&self) -> TickStats {
        self.stats
    }

    /// Print the tick statistics.
    pub fn print_stats(&self) {
        abyss::println!(
            "Thread: {} idle ticks, {} kernel ticks, {} user ticks",
            self.stats.idle,
            self.stats.kernel,
            self.stats.user
        );
    }

    /// Check the scheduler invariants, panicking on the first violation.
    pub fn validate(&self) {
        let running: Vec<Tid> = self
            .threads
            .iter_all()
            .filter(|th| th.state == ThreadState::Running)
            .map(|th| th.tid)
            .collect();
        assert_eq!(running, [self.current], "exactly one thread must be running");
        for (tid, level) in self.ready.entries() {
            let th = &self.threads[tid];
            assert_eq!(th.state, ThreadState::Ready, "thread {} queued while not ready", tid);
            assert!(!th.is_idle(), "the idle thread is queued");
            assert_eq!(th.priority, level, "thread {} queued at a stale priority", tid);
        }
        for th in self.threads.iter_all() {
            assert!(
                th.priority >= th.base_priority,
                "thread {} runs below its base priority",
                th.tid
            );
            if th.state == ThreadState::Ready && !th.is_idle() {
                assert!(self.ready.contains(th.tid), "ready thread {} is not queued", th.tid);
            }
        }
    }
}
