//! The abyss of kernel that operates hardwares.
//!
//! This crate contains the few pieces of the thread subsystem that talk to
//! the machine: the interrupt level, the console, and on bare metal the
//! stack switch. You can treat these codes as a some kind of "magic".
//!
//! Hosted builds (`cargo test` on a development machine) replace the
//! privileged instructions with a per-thread software model of the
//! interrupt flag, so the kernel crates above can be exercised without
//! booting.

#![cfg_attr(target_os = "none", no_std)]

#[cfg(all(target_os = "none", not(target_arch = "x86_64")))]
compile_error!("abyss only supports x86_64 on bare metal");

#[macro_use]
pub mod kprint;
pub mod interrupt;
pub mod spin_lock;
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod x86_64;
