//! Timer ticks and sleeping threads.
//!
//! The timer interrupt is the only asynchronous event the scheduler sees.
//! Each interrupt advances the tick counter, wakes the threads whose sleep
//! is over, runs the per-tick scheduler bookkeeping, and yields once the
//! handler is done if a yield was requested along the way.
use crate::{thread::Tid, Arch, Scheduler};
use abyss::interrupt::{self, ExternalContext, InterruptGuard};
use alloc::vec::Vec;

struct Sleeper {
    wake_at: u64,
    tid: Tid,
}

/// Tick counter and sleep list.
pub struct Timer {
    ticks: u64,
    /// Ordered by wake-up tick, FIFO among equal ticks.
    sleepers: Vec<Sleeper>,
}

impl Timer {
    pub(crate) const fn new() -> Self {
        Self {
            ticks: 0,
            sleepers: Vec::new(),
        }
    }

    /// Ticks since boot.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    fn insert(&mut self, wake_at: u64, tid: Tid) {
        let pos = self.sleepers.partition_point(|s| s.wake_at <= wake_at);
        self.sleepers.insert(pos, Sleeper { wake_at, tid });
    }

    fn take_due(&mut self) -> Vec<Tid> {
        let due = self.sleepers.partition_point(|s| s.wake_at <= self.ticks);
        self.sleepers.drain(..due).map(|s| s.tid).collect()
    }
}

impl<A: Arch> Scheduler<A> {
    /// Ticks since boot.
    pub fn ticks(&self) -> u64 {
        let _guard = InterruptGuard::new();
        self.timer.ticks()
    }

    /// Ticks elapsed since `then`, a value returned by [`ticks`](Self::ticks).
    /// A `then` in the future counts as no time at all.
    pub fn elapsed(&self, then: u64) -> u64 {
        self.ticks().saturating_sub(then)
    }

    /// Block the running thread for about `ticks` timer ticks.
    ///
    /// Returns immediately if `ticks` is not positive.
    pub fn sleep(&mut self, ticks: i64) {
        if ticks <= 0 {
            return;
        }
        assert!(
            !interrupt::in_external(),
            "sleep in an external interrupt handler"
        );
        let guard = InterruptGuard::new();
        let token = guard.token();
        let wake_at = self.timer.ticks + ticks as u64;
        self.timer.insert(wake_at, self.current);
        self.block(&token);
    }

    /// Timer interrupt handler.
    pub fn timer_interrupt(&mut self) {
        {
            let frame = ExternalContext::enter();
            let token = frame.token();
            self.timer.ticks += 1;
            for tid in self.timer.take_due() {
                self.make_ready(tid, &token);
            }
            self.preempt_check(&token);
            self.tick(&token);
        }
        if core::mem::take(&mut self.yield_on_return) {
            self.yield_now();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sleepers_wake_in_tick_order() {
        let mut timer = Timer::new();
        timer.insert(10, Tid::new(1));
        timer.insert(5, Tid::new(2));
        timer.insert(10, Tid::new(3));
        timer.insert(7, Tid::new(4));
        timer.ticks = 7;
        assert_eq!(timer.take_due(), [Tid::new(2), Tid::new(4)]);
        assert!(timer.take_due().is_empty());
        timer.ticks = 12;
        assert_eq!(timer.take_due(), [Tid::new(1), Tid::new(3)]);
    }
}
