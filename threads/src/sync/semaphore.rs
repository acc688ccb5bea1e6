//! Counting semaphores.
use super::{take_highest, SemaId};
use crate::{thread::Tid, Arch, Scheduler};
use abyss::interrupt::{self, InterruptGuard};
use alloc::vec::Vec;

pub(crate) struct Semaphore {
    value: u32,
    waiters: Vec<Tid>,
}

impl<A: Arch> Scheduler<A> {
    /// Create a semaphore holding `value` units.
    pub fn sema_create(&mut self, value: u32) -> SemaId {
        SemaId(self.semas.insert(Semaphore {
            value,
            waiters: Vec::new(),
        }))
    }

    /// Destroy a semaphore.
    ///
    /// # Panics
    /// Panics if a thread still waits on it.
    pub fn sema_destroy(&mut self, sema: SemaId) {
        let record = match self.semas.remove(sema.index()) {
            Some(record) => record,
            None => panic!("unknown semaphore {:?}", sema),
        };
        assert!(
            record.waiters.is_empty(),
            "semaphore {:?} destroyed with waiters",
            sema
        );
    }

    /// Units currently available.
    pub fn sema_value(&self, sema: SemaId) -> u32 {
        self.semas[sema.index()].value
    }

    /// Take one unit, blocking until one is available.
    pub fn sema_down(&mut self, sema: SemaId) {
        assert!(
            !interrupt::in_external(),
            "sema_down in an external interrupt handler"
        );
        let guard = InterruptGuard::new();
        let token = guard.token();
        let cur = self.current;
        let record = &mut self.semas[sema.index()];
        if record.value > 0 {
            record.value -= 1;
        } else {
            // The unit is handed over by `sema_up`.
            record.waiters.push(cur);
            self.block(&token);
        }
    }

    /// Take one unit if available, without blocking.
    pub fn sema_try_down(&mut self, sema: SemaId) -> bool {
        let _guard = InterruptGuard::new();
        let record = &mut self.semas[sema.index()];
        if record.value > 0 {
            record.value -= 1;
            true
        } else {
            false
        }
    }

    /// Release one unit.
    ///
    /// If threads are waiting, the unit goes straight to the one with the
    /// highest priority. May be called from an interrupt handler.
    pub fn sema_up(&mut self, sema: SemaId) {
        let guard = InterruptGuard::new();
        let token = guard.token();
        match take_highest(&mut self.semas[sema.index()].waiters, &self.threads) {
            Some(tid) => self.make_ready(tid, &token),
            None => self.semas[sema.index()].value += 1,
        }
        self.preempt_check(&token);
    }
}
