//! intrinsics of x86_64 not included in [`core::arch::x86_64`].
//!
//! [`core::arch::x86_64`]: https://doc.rust-lang.org/beta/core/arch/x86_64/index.html
use core::arch::asm;

/// Clear the interrupt flag.
///
/// # Safety
/// Must run at ring 0.
#[inline(always)]
pub unsafe fn cli() {
    asm!("cli", options(nostack));
}

/// Set the interrupt flag.
///
/// # Safety
/// Must run at ring 0.
#[inline(always)]
pub unsafe fn sti() {
    asm!("sti", options(nostack));
}

/// Set the interrupt flag and halt until the next interrupt.
///
/// `sti` takes effect after the following instruction, so no interrupt can
/// slip in between the two.
///
/// # Safety
/// Must run at ring 0.
#[inline(always)]
pub unsafe fn sti_hlt() {
    asm!("sti", "hlt", options(nostack));
}
