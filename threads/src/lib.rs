//! Thread subsystem of a single-core teaching kernel.
//!
//! The crate is built around one [`Scheduler`] value that owns every thread
//! control block, the ready queue and the synchronization records. Two
//! policies are available, chosen once at boot through [`Config`]:
//!
//! * strict priority scheduling with priority donation through locks, and
//! * the multi-level feedback queue scheduler (MLFQS), where priorities are
//!   recomputed from recent CPU usage on the timer tick.
//!
//! All scheduler state is guarded by the interrupt level alone. Operations
//! that require interrupts to be masked take an [`IntrOff`] token from
//! [`abyss::interrupt`], so the locking discipline is checked by the type
//! system rather than by convention.
//!
//! Saving and restoring registers is hidden behind the [`Arch`] trait; the
//! bare-metal implementation lives in [`kernel`] while the test suite
//! supplies a simulated one.
//!
//! [`IntrOff`]: abyss::interrupt::IntrOff

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

mod arena;
pub mod config;
pub mod fixed_point;
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub mod kernel;
pub mod sync;
pub mod thread;
pub mod timer;

pub use config::{Config, ConfigError, Policy};
pub use fixed_point::Fixed;
pub use sync::{LockId, SemaId};
pub use thread::context::Arch;
pub use thread::scheduler::{Scheduler, TickStats};
pub use thread::{CreateError, Thread, ThreadBuilder, ThreadFlags, ThreadState, Tid};
