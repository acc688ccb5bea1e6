//! Kernel stack switch.
//!
//! A suspended thread is fully described by its saved stack pointer: the
//! callee-saved registers and the return address sit on top of its stack
//! in the layout of [`SwitchFrame`]. rflags is not saved because every
//! switch happens with interrupts masked.
use core::arch::global_asm;

global_asm!(
    ".global abyss_switch_stacks",
    "abyss_switch_stacks:",
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    // RDI: where to save the current stack pointer. RSI: next stack pointer.
    "mov [rdi], rsp",
    "mov rsp, rsi",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "pop rbp",
    "ret",
    "",
    ".global abyss_thread_trampoline",
    "abyss_thread_trampoline:",
    "mov rdi, r12",
    "mov rsi, r13",
    "and rsp, -16",
    "call r14",
    "ud2",
);

extern "C" {
    fn abyss_switch_stacks(prev_sp: *mut usize, next_sp: usize);
    fn abyss_thread_trampoline();
}

/// A struct to mimic a stack state on context switch.
#[repr(C)]
pub struct SwitchFrame {
    r15: usize,
    r14: usize,
    r13: usize,
    r12: usize,
    rbx: usize,
    rbp: usize,
    ret_addr: usize,
    end_of_stack: usize,
}

impl SwitchFrame {
    /// Frame that makes the first switch to a thread call
    /// `entry(arg0, arg1)` on its own stack.
    pub fn first_run(entry: extern "C" fn(usize, usize) -> !, arg0: usize, arg1: usize) -> Self {
        Self {
            r15: 0,
            r14: entry as usize,
            r13: arg1,
            r12: arg0,
            rbx: 0,
            rbp: 0,
            ret_addr: abyss_thread_trampoline as usize,
            end_of_stack: 0,
        }
    }
}

/// Save the current callee-saved registers on the current stack, store the
/// stack pointer to `prev_sp`, and resume the thread suspended at `next_sp`.
///
/// Returns when some later switch resumes the thread that called it.
///
/// # Safety
/// Interrupts must be masked. `next_sp` must point at a [`SwitchFrame`]
/// produced by [`SwitchFrame::first_run`] or saved by an earlier switch.
pub unsafe fn switch_stacks(prev_sp: *mut usize, next_sp: usize) {
    abyss_switch_stacks(prev_sp, next_sp)
}
