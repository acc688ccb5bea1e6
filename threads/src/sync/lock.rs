//! Locks with priority donation.
//!
//! A lock is a binary semaphore with an owner. Under the priority policy a
//! thread that waits for a lock donates its priority to the holder, see
//! [`crate::thread::donation`].
use super::{take_highest, LockId};
use crate::{config::Policy, thread::Tid, Arch, Scheduler};
use abyss::interrupt::{self, InterruptGuard};
use alloc::vec::Vec;

pub(crate) struct Lock {
    pub(crate) holder: Option<Tid>,
    /// Highest priority donated by a waiter.
    pub(crate) priority: Option<i32>,
    waiters: Vec<Tid>,
}

impl<A: Arch> Scheduler<A> {
    /// Create an unheld lock.
    pub fn lock_create(&mut self) -> LockId {
        LockId(self.locks.insert(Lock {
            holder: None,
            priority: None,
            waiters: Vec::new(),
        }))
    }

    /// Destroy a lock.
    ///
    /// # Panics
    /// Panics if the lock is held.
    pub fn lock_destroy(&mut self, lock: LockId) {
        let record = match self.locks.remove(lock.index()) {
            Some(record) => record,
            None => panic!("unknown lock {:?}", lock),
        };
        assert!(record.holder.is_none(), "lock {:?} destroyed while held", lock);
    }

    /// Acquire `lock`, blocking until it is free.
    ///
    /// # Panics
    /// Panics if the running thread already holds `lock`, or inside an
    /// external interrupt handler.
    pub fn lock_acquire(&mut self, lock: LockId) {
        assert!(
            !interrupt::in_external(),
            "lock_acquire in an external interrupt handler"
        );
        let guard = InterruptGuard::new();
        let token = guard.token();
        let cur = self.current;
        let record = &mut self.locks[lock.index()];
        match record.holder {
            None => {
                record.holder = Some(cur);
                self.threads[cur].held_locks.push(lock);
            }
            Some(holder) => {
                assert!(holder != cur, "thread {} already holds lock {:?}", cur, lock);
                record.waiters.push(cur);
                self.threads[cur].waiting_on = Some(lock);
                if self.policy() == Policy::Priority {
                    let priority = self.threads[cur].priority;
                    self.donate(lock, priority, &token);
                }
                // Ownership is handed over by `lock_release`.
                self.block(&token);
            }
        }
    }

    /// Acquire `lock` if it is free, without blocking.
    pub fn lock_try_acquire(&mut self, lock: LockId) -> bool {
        let _guard = InterruptGuard::new();
        let cur = self.current;
        let record = &mut self.locks[lock.index()];
        if record.holder.is_some() {
            return false;
        }
        record.holder = Some(cur);
        self.threads[cur].held_locks.push(lock);
        true
    }

    /// Release `lock`, which the running thread must hold.
    ///
    /// The lock goes to the waiter with the highest priority, and the
    /// releasing thread falls back to the priority it would have without
    /// the donations made through this lock.
    pub fn lock_release(&mut self, lock: LockId) {
        let guard = InterruptGuard::new();
        let token = guard.token();
        let cur = self.current;
        assert!(
            self.locks[lock.index()].holder == Some(cur),
            "thread {} releases lock {:?} it does not hold",
            cur,
            lock
        );
        self.threads[cur].held_locks.retain(|held| *held != lock);

        match take_highest(&mut self.locks[lock.index()].waiters, &self.threads) {
            Some(next) => {
                let donated = match self.policy() {
                    Policy::Priority => self.locks[lock.index()]
                        .waiters
                        .iter()
                        .map(|tid| self.threads[*tid].priority)
                        .max(),
                    Policy::Mlfqs => None,
                };
                let record = &mut self.locks[lock.index()];
                record.holder = Some(next);
                record.priority = donated;
                let th = &mut self.threads[next];
                th.waiting_on = None;
                th.held_locks.push(lock);
                self.refresh_priority(next, &token);
                self.refresh_priority(cur, &token);
                self.make_ready(next, &token);
            }
            None => {
                let record = &mut self.locks[lock.index()];
                record.holder = None;
                record.priority = None;
                self.refresh_priority(cur, &token);
            }
        }
        self.preempt_check(&token);
    }

    /// Thread holding `lock`, if any.
    pub fn lock_holder(&self, lock: LockId) -> Option<Tid> {
        self.locks[lock.index()].holder
    }

    /// Returns true if the running thread holds `lock`.
    pub fn lock_held_by_current(&self, lock: LockId) -> bool {
        self.lock_holder(lock) == Some(self.current)
    }
}
