//! A thread, the unit of schedulable execution.
//!
//! ## The threading model
//!
//! An executing kernel consists of a collection of threads, each with its
//! own stack and register context. Exactly one thread is running at any
//! time; the others are ready, blocked, or dying.
//!
//! ```text
//!                 create
//!                   |
//!                   v      unblock           dispatch
//!  Blocked <------------------------> Ready ----------> Running
//!     ^                                 ^                  |
//!     |            block                |      yield       |
//!     +---------------------------------+------------------+
//!                                                          | exit
//!                                                          v
//!                                                        Dying
//! ```
//!
//! A dying thread cannot free the stack it is still running on, so its
//! control block is reclaimed by the next thread to run. The bootstrap
//! thread is never reclaimed.
pub mod context;
pub mod donation;
pub mod idle;
pub mod mlfqs;
pub mod queue;
pub mod registry;
pub mod scheduler;

use crate::{fixed_point::Fixed, sync::LockId, Arch, Scheduler};
use abyss::interrupt::InterruptGuard;
use alloc::{string::String, vec::Vec};
use core::fmt;
use num_enum::IntoPrimitive;

/// Lowest priority.
pub const PRI_MIN: i32 = 0;
/// Default priority.
pub const PRI_DEFAULT: i32 = 31;
/// Highest priority.
pub const PRI_MAX: i32 = 63;

/// Lowest nice value.
pub const NICE_MIN: i32 = -20;
/// Default nice value.
pub const NICE_DEFAULT: i32 = 0;
/// Highest nice value.
pub const NICE_MAX: i32 = 20;

/// Number of timer ticks a thread may run before it is preempted.
pub const TIME_SLICE: u32 = 4;

/// Entry point of a kernel thread. It receives the auxiliary word given at
/// creation.
pub type ThreadFunc = fn(usize);

/// Thread identifier.
///
/// Identifiers are handed out in increasing order from 1 and never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Tid(u32);

impl Tid {
    pub(crate) const fn new(raw: u32) -> Self {
        Tid(raw)
    }

    /// The raw identifier.
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for Tid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A possible state of the thread.
#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum ThreadState {
    /// Waiting for an event; not on the ready queue.
    Blocked,
    /// On the ready queue, waiting for the cpu.
    Ready,
    /// Executing.
    Running,
    /// Exited; waiting to be reclaimed by its successor.
    Dying,
}

bitflags::bitflags! {
    /// Attributes fixed at thread creation.
    pub struct ThreadFlags: u8 {
        /// The thread that was executing before the scheduler existed.
        const INITIAL = 1 << 0;
        /// The idle thread.
        const IDLE = 1 << 1;
        /// Runs a user program. Only affects tick statistics.
        const USER = 1 << 2;
    }
}

/// Error returned when a thread cannot be created.
#[derive(Clone, Copy, Debug, PartialEq, Eq, IntoPrimitive)]
#[repr(i32)]
pub enum CreateError {
    /// The execution context could not be allocated.
    ///
    /// Converts to the kernel's `TID_ERROR` value, -1.
    OutOfMemory = -1,
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory => write!(f, "out of memory for a new thread"),
        }
    }
}

/// A thread control block.
pub struct Thread<C> {
    pub(crate) tid: Tid,
    pub(crate) name: String,
    pub(crate) state: ThreadState,
    pub(crate) flags: ThreadFlags,
    pub(crate) base_priority: i32,
    pub(crate) priority: i32,
    pub(crate) nice: i32,
    pub(crate) recent_cpu: Fixed,
    pub(crate) held_locks: Vec<LockId>,
    pub(crate) waiting_on: Option<LockId>,
    pub(crate) context: C,
}

impl<C> Thread<C> {
    /// Thread identifier.
    pub fn tid(&self) -> Tid {
        self.tid
    }

    /// Thread name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> ThreadState {
        self.state
    }

    /// Creation attributes.
    pub fn flags(&self) -> ThreadFlags {
        self.flags
    }

    /// Priority set at creation or by `set_priority`.
    pub fn base_priority(&self) -> i32 {
        self.base_priority
    }

    /// Priority used for scheduling, raised above the base by donation.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Nice value.
    pub fn nice(&self) -> i32 {
        self.nice
    }

    /// Recent CPU usage estimate.
    pub fn recent_cpu(&self) -> Fixed {
        self.recent_cpu
    }

    /// Locks currently held.
    pub fn held_locks(&self) -> &[LockId] {
        &self.held_locks
    }

    /// The lock this thread is blocked on, if any.
    pub fn waiting_on(&self) -> Option<LockId> {
        self.waiting_on
    }

    /// Returns true for the idle thread.
    pub fn is_idle(&self) -> bool {
        self.flags.contains(ThreadFlags::IDLE)
    }
}

impl<C> fmt::Debug for Thread<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("tid", &self.tid)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("flags", &self.flags)
            .field("base_priority", &self.base_priority)
            .field("priority", &self.priority)
            .field("nice", &self.nice)
            .field("recent_cpu", &self.recent_cpu)
            .field("held_locks", &self.held_locks)
            .field("waiting_on", &self.waiting_on)
            .finish()
    }
}

/// A struct to build a new thread.
pub struct ThreadBuilder {
    name: String,
    priority: i32,
    flags: ThreadFlags,
}

impl ThreadBuilder {
    /// Create a new thread builder for thread `name`.
    pub fn new<I>(name: I) -> Self
    where
        String: From<I>,
    {
        Self {
            name: String::from(name),
            priority: PRI_DEFAULT,
            flags: ThreadFlags::empty(),
        }
    }

    /// Initial priority. Ignored under MLFQS, where the priority is
    /// computed from the inherited nice value.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Mark the thread as running a user program.
    pub fn user(mut self) -> Self {
        self.flags |= ThreadFlags::USER;
        self
    }

    /// Spawn the thread running `func(aux)`.
    ///
    /// The new thread is ready on return. If it outranks the caller, the
    /// caller is preempted before this returns.
    pub fn spawn<A: Arch>(
        self,
        sched: &mut Scheduler<A>,
        func: ThreadFunc,
        aux: usize,
    ) -> Result<Tid, CreateError> {
        let guard = InterruptGuard::new();
        let token = guard.token();
        let tid = sched.register(self.name, self.priority, self.flags, func, aux, &token)?;
        sched.make_ready(tid, &token);
        sched.preempt_check(&token);
        Ok(tid)
    }
}
