//! The kernel's scheduler instance and its entry points.
//!
//! There is one [`Scheduler`] for the whole machine. It is created by
//! [`init`] while the boot code still runs with interrupts masked, and is
//! only ever touched with interrupts masked afterwards.
use crate::{
    thread::{context::StackSwitch, ThreadFunc, Tid},
    Config, CreateError, Scheduler,
};
use abyss::{
    interrupt::{self, IntrOff},
    x86_64::serial::Serial,
};
use core::ptr::addr_of_mut;

static mut SCHEDULER: Option<Scheduler<StackSwitch>> = None;

/// Bring up the serial console, install the logger, and build the
/// scheduler around the boot thread.
///
/// # Safety
/// Must be called once, on the boot thread, with interrupts masked.
pub unsafe fn init(config: Config) {
    Serial::com1().init();
    abyss::kprint::init_logger(config.log_level);
    *addr_of_mut!(SCHEDULER) = Some(Scheduler::init(StackSwitch, config));
}

/// The scheduler.
///
/// # Panics
/// Panics before [`init`].
pub fn scheduler() -> &'static mut Scheduler<StackSwitch> {
    match unsafe { (*addr_of_mut!(SCHEDULER)).as_mut() } {
        Some(sched) => sched,
        None => panic!("scheduler used before threads::kernel::init"),
    }
}

/// Start preemptive scheduling.
pub fn start() -> Result<(), CreateError> {
    scheduler().start()
}

/// Create a kernel thread.
pub fn thread_create(
    name: &str,
    priority: i32,
    func: ThreadFunc,
    aux: usize,
) -> Result<Tid, CreateError> {
    scheduler().create(name, priority, func, aux)
}

/// Terminate the running thread.
pub fn thread_exit(status: i32) -> ! {
    scheduler().exit(status);
    unreachable!("dying thread was scheduled again")
}

/// Entry of the timer interrupt vector.
pub fn timer_interrupt() {
    scheduler().timer_interrupt()
}

/// First code a new thread runs, entered from the stack switch trampoline.
pub(crate) extern "C" fn kernel_thread(func: usize, aux: usize) -> ! {
    let func = unsafe { core::mem::transmute::<usize, ThreadFunc>(func) };
    // Interrupts are still masked from the switch that got us here.
    scheduler().schedule_tail(unsafe { &IntrOff::assume() });
    interrupt::enable();
    func(aux);
    thread_exit(0)
}

/// Body of the idle thread.
pub(crate) fn idle(_: usize) {
    loop {
        interrupt::disable();
        let token = unsafe { IntrOff::assume() };
        scheduler().idle_once(&token);
        interrupt::wait_for_interrupt();
    }
}
