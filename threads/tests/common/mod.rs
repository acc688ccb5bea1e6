#![allow(dead_code)]

use abyss::interrupt::InterruptGuard;
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};
use threads::{thread::ThreadFunc, Arch, Config, CreateError, Policy, Scheduler};

/// Bookkeeping of the simulated machine.
#[derive(Default)]
pub struct Machine {
    next_id: Cell<usize>,
    live: Cell<usize>,
    switches: RefCell<Vec<(usize, usize)>>,
    fail_next: Cell<bool>,
}

impl Machine {
    /// Contexts allocated and not yet dropped.
    pub fn live_contexts(&self) -> usize {
        self.live.get()
    }

    /// Every switch so far, as pairs of context ids.
    pub fn switches(&self) -> Vec<(usize, usize)> {
        self.switches.borrow().clone()
    }

    /// Make the next `prepare` fail.
    pub fn fail_next_prepare(&self) {
        self.fail_next.set(true);
    }
}

/// A context that owns nothing but an id.
pub struct SimContext {
    pub id: usize,
    machine: Rc<Machine>,
}

impl Drop for SimContext {
    fn drop(&mut self) {
        self.machine.live.set(self.machine.live.get() - 1);
    }
}

/// An `Arch` that records switches instead of performing them.
///
/// After a call that switches threads returns, the test goes on as the
/// thread that was switched to.
pub struct SimArch {
    machine: Rc<Machine>,
}

impl SimArch {
    fn context(&self) -> SimContext {
        let id = self.machine.next_id.get();
        self.machine.next_id.set(id + 1);
        self.machine.live.set(self.machine.live.get() + 1);
        SimContext {
            id,
            machine: self.machine.clone(),
        }
    }
}

impl Arch for SimArch {
    type Context = SimContext;

    fn bootstrap(&self) -> SimContext {
        self.context()
    }

    fn prepare(&self, _func: ThreadFunc, _aux: usize) -> Result<SimContext, CreateError> {
        if self.machine.fail_next.replace(false) {
            return Err(CreateError::OutOfMemory);
        }
        Ok(self.context())
    }

    unsafe fn switch(&self, prev: *mut SimContext, next: *const SimContext) {
        self.machine
            .switches
            .borrow_mut()
            .push(((*prev).id, (*next).id));
    }

    fn idle_entry(&self) -> ThreadFunc {
        noop
    }
}

pub fn noop(_: usize) {}

pub type Sched = Scheduler<SimArch>;

/// Boot a scheduler with `policy` and return once `main` runs again.
pub fn boot(policy: Policy) -> (Sched, Rc<Machine>) {
    boot_with(Config {
        policy,
        ..Config::default()
    })
}

pub fn boot_with(config: Config) -> (Sched, Rc<Machine>) {
    let machine = Rc::new(Machine::default());
    let mut sched = Scheduler::init(
        SimArch {
            machine: machine.clone(),
        },
        config,
    );
    sched.start().unwrap();
    // `main` waits for the idle thread; give the idle thread its first turn.
    idle_turn(&mut sched);
    (sched, machine)
}

/// Run one turn of the idle thread, which must be running.
pub fn idle_turn(sched: &mut Sched) {
    let guard = InterruptGuard::new();
    sched.idle_once(&guard.token());
}

/// Block the running thread.
pub fn block(sched: &mut Sched) {
    let guard = InterruptGuard::new();
    sched.block(&guard.token());
}

/// Deliver `n` timer interrupts.
pub fn ticks(sched: &mut Sched, n: u64) {
    for _ in 0..n {
        sched.timer_interrupt();
    }
}
