//! Priority donation.
//!
//! A thread that blocks on a lock lends its priority to the lock holder,
//! and through the holder to whatever the holder is itself blocked on. Each
//! lock records the highest priority donated to it; a thread's effective
//! priority is the maximum of its base priority and the priorities of the
//! locks it holds.
//!
//! The walk up the holder chain only ever raises priorities, so it cannot
//! loop forever; it is still cut off after [`DONATION_DEPTH_LIMIT`] locks.
use super::{context::Arch, ThreadState, Tid};
use crate::{sync::LockId, Scheduler};
use abyss::interrupt::IntrOff;

/// Maximum number of locks a single donation walks through.
pub const DONATION_DEPTH_LIMIT: usize = 8;

impl<A: Arch> Scheduler<A> {
    /// Change the effective priority of `tid`, keeping the ready queue
    /// ordered.
    pub(crate) fn set_effective(&mut self, tid: Tid, priority: i32, _: &IntrOff<'_>) {
        let th = &mut self.threads[tid];
        let old = th.priority;
        th.priority = priority;
        if th.state == ThreadState::Ready && !th.is_idle() {
            self.ready.reposition(tid, old, priority);
        }
    }

    /// Highest priority donated to any lock `tid` holds.
    pub(crate) fn held_priority(&self, tid: Tid) -> Option<i32> {
        self.threads[tid]
            .held_locks
            .iter()
            .filter_map(|lock| self.locks[lock.index()].priority)
            .max()
    }

    /// Recompute the effective priority of `tid` from its base priority and
    /// the locks it holds.
    pub(crate) fn refresh_priority(&mut self, tid: Tid, token: &IntrOff<'_>) {
        let base = self.threads[tid].base_priority;
        let priority = self.held_priority(tid).map_or(base, |held| held.max(base));
        self.set_effective(tid, priority, token);
    }

    /// Donate `priority` to `lock` and up its chain of holders.
    pub(crate) fn donate(&mut self, lock: LockId, priority: i32, token: &IntrOff<'_>) {
        let mut lock = lock;
        for _ in 0..DONATION_DEPTH_LIMIT {
            let record = &mut self.locks[lock.index()];
            if record.priority.map_or(false, |p| p >= priority) {
                return;
            }
            record.priority = Some(priority);
            let holder = match record.holder {
                Some(holder) => holder,
                None => return,
            };
            if self.threads[holder].priority < priority {
                self.set_effective(holder, priority, token);
            }
            match self.threads[holder].waiting_on {
                Some(next) => lock = next,
                None => return,
            }
        }
        log::warn!(
            "donation of priority {} cut off after {} locks",
            priority,
            DONATION_DEPTH_LIMIT
        );
    }

    /// Priority donated to `lock`, if any thread waits on it.
    pub fn lock_priority(&self, lock: LockId) -> Option<i32> {
        self.locks[lock.index()].priority
    }
}
