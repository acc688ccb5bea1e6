//! Bootstrap and the idle thread.
//!
//! The code that runs before the scheduler exists becomes the thread
//! `main` in [`Scheduler::init`]. [`Scheduler::start`] then creates the idle
//! thread, enables interrupts, and waits until the idle thread has run
//! once.
//!
//! The idle thread is never on the ready queue. Dispatch falls back to it
//! when nothing else is ready, and it immediately blocks again. Its loop
//! looks like this:
//!
//! ```text
//! loop {
//!     interrupt::disable();
//!     sched.idle_once(&token);
//!     interrupt::wait_for_interrupt(); // sti; hlt
//! }
//! ```
use super::{
    context::Arch, mlfqs, queue::ReadyQueue, registry::Registry, CreateError, Thread,
    ThreadFlags, ThreadState, NICE_DEFAULT, PRI_DEFAULT, PRI_MIN,
};
use crate::{
    arena::Arena,
    config::{Config, Policy},
    fixed_point::Fixed,
    timer::Timer,
    Scheduler, TickStats,
};
use abyss::interrupt::{self, InterruptGuard, InterruptState, IntrOff};
use alloc::{boxed::Box, string::String, vec::Vec};

impl<A: Arch> Scheduler<A> {
    /// Turn the running code into the thread `main` and build the
    /// scheduler around it.
    ///
    /// # Panics
    /// Panics if interrupts are enabled.
    pub fn init(arch: A, config: Config) -> Self {
        assert_eq!(
            InterruptState::current(),
            InterruptState::Off,
            "scheduler initialized with interrupts enabled"
        );
        let mut threads = Registry::new();
        let tid = threads.allocate_tid();
        let priority = match config.policy {
            Policy::Priority => PRI_DEFAULT,
            Policy::Mlfqs => mlfqs::priority_for(Fixed::ZERO, NICE_DEFAULT),
        };
        threads.insert(Box::new(Thread {
            tid,
            name: String::from("main"),
            state: ThreadState::Running,
            flags: ThreadFlags::INITIAL,
            base_priority: priority,
            priority,
            nice: NICE_DEFAULT,
            recent_cpu: Fixed::ZERO,
            held_locks: Vec::new(),
            waiting_on: None,
            context: arch.bootstrap(),
        }));
        log::info!(
            "threads: {:?} scheduling, timer at {} Hz",
            config.policy,
            config.timer_freq
        );
        Self {
            arch,
            config,
            threads,
            ready: ReadyQueue::new(),
            current: tid,
            initial: tid,
            idle: None,
            idle_started: None,
            switched_from: None,
            thread_ticks: 0,
            yield_on_return: false,
            load_avg: Fixed::ZERO,
            stats: TickStats::default(),
            timer: Timer::new(),
            semas: Arena::new(),
            locks: Arena::new(),
        }
    }

    /// Create the idle thread and start preemptive scheduling.
    ///
    /// Returns once the idle thread has run.
    ///
    /// # Errors
    /// [`CreateError::OutOfMemory`] if the idle thread cannot be created.
    pub fn start(&mut self) -> Result<(), CreateError> {
        assert!(self.idle.is_none(), "scheduler already started");
        let entry = self.arch.idle_entry();
        let idle = {
            let guard = InterruptGuard::new();
            self.register(
                String::from("idle"),
                PRI_MIN,
                ThreadFlags::IDLE,
                entry,
                0,
                &guard.token(),
            )?
        };
        let started = self.sema_create(0);
        self.idle = Some(idle);
        self.idle_started = Some(started);
        log::debug!("idle thread is {}", idle);

        interrupt::enable();
        self.sema_down(started);
        Ok(())
    }

    /// One turn of the idle thread: block until some other thread is ready.
    ///
    /// The first turn also releases the thread waiting in
    /// [`start`](Self::start).
    pub fn idle_once(&mut self, token: &IntrOff<'_>) {
        assert!(
            Some(self.current) == self.idle,
            "idle_once outside the idle thread"
        );
        if let Some(started) = self.idle_started.take() {
            self.sema_up(started);
            self.sema_destroy(started);
        }
        self.block(token);
    }
}
