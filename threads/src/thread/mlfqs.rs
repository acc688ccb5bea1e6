//! Multi-level feedback queue scheduling.
//!
//! Under MLFQS priorities are not chosen by threads. Every thread's
//! priority is recomputed from its recent CPU usage and nice value every
//! [`RECALC_INTERVAL`] ticks, and recent CPU usage decays once a second at a
//! rate set by the system load average:
//!
//! ```text
//! priority   = PRI_MAX - round(recent_cpu / 4) - nice * 2
//! recent_cpu = (2 * load_avg) / (2 * load_avg + 1) * recent_cpu + nice
//! load_avg   = (59 / 60) * load_avg + (1 / 60) * ready_threads
//! ```
//!
//! All arithmetic is 17.14 fixed point.
use super::{context::Arch, NICE_MAX, NICE_MIN, PRI_MAX, PRI_MIN};
use crate::{config::Policy, fixed_point::Fixed, Scheduler};
use abyss::interrupt::{InterruptGuard, IntrOff};

/// Ticks between two priority recomputations.
pub const RECALC_INTERVAL: u64 = 4;

/// Priority of a thread with the given recent CPU usage and nice value.
pub fn priority_for(recent_cpu: Fixed, nice: i32) -> i32 {
    (PRI_MAX - (recent_cpu / 4).to_int_nearest() - nice * 2).clamp(PRI_MIN, PRI_MAX)
}

/// Decayed recent CPU usage.
pub fn recent_cpu_next(recent_cpu: Fixed, load_avg: Fixed, nice: i32) -> Fixed {
    let twice_load = load_avg * 2;
    (twice_load / twice_load.add_int(1) * recent_cpu).add_int(nice)
}

/// Next load average given the number of threads ready or running.
pub fn load_avg_next(load_avg: Fixed, ready_threads: i32) -> Fixed {
    Fixed::from_ratio(59, 60) * load_avg + Fixed::from_ratio(1, 60) * ready_threads
}

impl<A: Arch> Scheduler<A> {
    pub(crate) fn mlfqs_tick(&mut self, _: &IntrOff<'_>) {
        let ticks = self.timer.ticks();
        let cur = self.current;
        let running_idle = self.threads[cur].is_idle();
        if !running_idle {
            let th = &mut self.threads[cur];
            th.recent_cpu = th.recent_cpu.add_int(1);
        }

        if ticks % self.config.timer_freq == 0 {
            let ready = self.ready.len() as i32 + if running_idle { 0 } else { 1 };
            self.load_avg = load_avg_next(self.load_avg, ready);
            let load_avg = self.load_avg;
            self.threads.for_each_live_mut(|th| {
                if !th.is_idle() {
                    th.recent_cpu = recent_cpu_next(th.recent_cpu, load_avg, th.nice);
                }
            });
        }

        if ticks % RECALC_INTERVAL == 0 {
            self.threads.for_each_live_mut(|th| {
                if !th.is_idle() {
                    let priority = priority_for(th.recent_cpu, th.nice);
                    th.base_priority = priority;
                    th.priority = priority;
                }
            });
            let threads = &self.threads;
            self.ready.resort(|tid| threads[tid].priority);
            self.yield_on_return = true;
        }
    }

    /// Set the nice value of the running thread.
    ///
    /// Under MLFQS the thread's priority is recomputed right away, and the
    /// thread yields if it no longer has the highest priority.
    pub fn set_nice(&mut self, nice: i32) {
        assert!(
            (NICE_MIN..=NICE_MAX).contains(&nice),
            "nice {} out of range",
            nice
        );
        let mlfqs = self.policy() == Policy::Mlfqs;
        let guard = InterruptGuard::new();
        let token = guard.token();
        let th = &mut self.threads[self.current];
        th.nice = nice;
        if mlfqs {
            let priority = priority_for(th.recent_cpu, nice);
            th.base_priority = priority;
            th.priority = priority;
            self.preempt_check(&token);
        }
    }

    /// Nice value of the running thread.
    pub fn nice(&self) -> i32 {
        self.threads[self.current].nice
    }

    /// System load average times 100, truncated.
    pub fn load_avg(&self) -> i32 {
        (self.load_avg * 100).to_int()
    }

    /// Recent CPU usage of the running thread times 100, truncated.
    pub fn recent_cpu(&self) -> i32 {
        (self.threads[self.current].recent_cpu * 100).to_int()
    }
}
