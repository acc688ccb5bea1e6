//! Sleeping synchronization primitives.
//!
//! Semaphores and locks are records in arenas owned by the [`Scheduler`],
//! addressed by [`SemaId`] and [`LockId`]. A thread that has to wait is
//! blocked; the thread that releases the resource hands it over to the
//! highest-priority waiter directly, so a woken thread never has to retry.
//!
//! [`Scheduler`]: crate::Scheduler
pub mod lock;
pub mod semaphore;

use crate::thread::{registry::Registry, Tid};
use alloc::vec::Vec;

/// Handle to a semaphore.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct SemaId(usize);

impl SemaId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Handle to a lock.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct LockId(usize);

impl LockId {
    pub(crate) fn index(self) -> usize {
        self.0
    }
}

/// Remove the waiter with the highest effective priority, the earliest one
/// among equals.
pub(crate) fn take_highest<C>(waiters: &mut Vec<Tid>, threads: &Registry<C>) -> Option<Tid> {
    let mut best: Option<(usize, i32)> = None;
    for (pos, tid) in waiters.iter().enumerate() {
        let priority = threads[*tid].priority;
        if best.map_or(true, |(_, top)| priority > top) {
            best = Some((pos, priority));
        }
    }
    best.map(|(pos, _)| waiters.remove(pos))
}
