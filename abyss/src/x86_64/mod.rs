//! x86_64 specific

pub mod intrinsics;
pub mod pio;
pub mod serial;
pub mod switch;

use core::arch::asm;

bitflags::bitflags! {
    /// rflags.
    ///
    /// Only the bits the kernel inspects are named.
    #[repr(transparent)]
    pub struct Rflags: u64 {
        /// Carry Flag
        const CF = 1 << 0;
        /// Must be 1.
        const _1 = 1 << 1;
        /// Zero Flag
        const ZF = 1 << 6;
        /// Trap Flag
        const TF = 1 << 8;
        /// Interrupt enable.
        ///
        /// The flag is set to respond to maskable hardware interrupts;
        /// cleared to inhibit maskable hardware interrupts. The IF flag does
        /// not affect the generation of exceptions or nonmaskable interrupts.
        const IF = 1 << 9;
        /// Direction Flag
        const DF = 1 << 10;
    }
}

impl Rflags {
    /// Read the current value.
    #[inline(always)]
    pub fn read() -> Self {
        let ret: u64;
        unsafe {
            asm!(
                "pushf",
                "pop {0}",
                lateout(reg) ret,
            );
        }
        Self::from_bits_truncate(ret)
    }
}
