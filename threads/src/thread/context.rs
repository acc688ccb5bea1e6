//! Saved execution contexts and the switch between them.
//!
//! The scheduler never looks inside a context. It asks the [`Arch`] to
//! build one for a new thread, hands pairs of them to [`Arch::switch`], and
//! drops them when the thread is reclaimed.
use super::{CreateError, ThreadFunc};

/// Machine-dependent half of the scheduler.
pub trait Arch {
    /// Saved state of a suspended thread. Dropping it releases the thread's
    /// stack.
    type Context;

    /// Context describing the code that is already running at boot. It owns
    /// no stack.
    fn bootstrap(&self) -> Self::Context;

    /// Allocate a fresh context whose first switch calls `func(aux)`.
    ///
    /// # Errors
    /// [`CreateError::OutOfMemory`] if the stack cannot be allocated.
    fn prepare(&self, func: ThreadFunc, aux: usize) -> Result<Self::Context, CreateError>;

    /// Save the running thread into `prev` and resume `next`.
    ///
    /// Returns when `prev` is switched back to.
    ///
    /// # Safety
    /// Interrupts must be masked. Both pointers must be valid for the whole
    /// call, and `next` must not be the context currently executing.
    unsafe fn switch(&self, prev: *mut Self::Context, next: *const Self::Context);

    /// Body of the idle thread.
    fn idle_entry(&self) -> ThreadFunc;
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
pub use self::stack::{KernelStack, StackContext, StackSwitch, STACK_SIZE};

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod stack {
    use super::{Arch, CreateError, ThreadFunc};
    use abyss::x86_64::switch::{switch_stacks, SwitchFrame};
    use alloc::alloc::{alloc_zeroed, dealloc, Layout};
    use core::ptr::NonNull;

    /// Size of each thread's stack.
    pub const STACK_SIZE: usize = 0x4000;
    const STACK_ALIGN: usize = 0x1000;

    /// A zeroed, page-aligned kernel stack.
    pub struct KernelStack {
        base: NonNull<u8>,
    }

    impl KernelStack {
        fn layout() -> Layout {
            // Both values are non-zero powers of two.
            unsafe { Layout::from_size_align_unchecked(STACK_SIZE, STACK_ALIGN) }
        }

        /// Allocate a new stack.
        pub fn new() -> Result<Self, CreateError> {
            let base = unsafe { alloc_zeroed(Self::layout()) };
            NonNull::new(base)
                .map(|base| Self { base })
                .ok_or(CreateError::OutOfMemory)
        }

        /// One past the highest address of the stack.
        pub fn top(&self) -> usize {
            self.base.as_ptr() as usize + STACK_SIZE
        }
    }

    impl Drop for KernelStack {
        fn drop(&mut self) {
            unsafe { dealloc(self.base.as_ptr(), Self::layout()) }
        }
    }

    /// A stack pointer, and the stack it points into.
    pub struct StackContext {
        sp: usize,
        _stack: Option<KernelStack>,
    }

    /// The x86_64 kernel stack switch.
    pub struct StackSwitch;

    impl Arch for StackSwitch {
        type Context = StackContext;

        fn bootstrap(&self) -> StackContext {
            StackContext { sp: 0, _stack: None }
        }

        fn prepare(&self, func: ThreadFunc, aux: usize) -> Result<StackContext, CreateError> {
            let stack = KernelStack::new()?;
            let frame_at = stack.top() - core::mem::size_of::<SwitchFrame>();
            unsafe {
                (frame_at as *mut SwitchFrame).write(SwitchFrame::first_run(
                    crate::kernel::kernel_thread,
                    func as usize,
                    aux,
                ));
            }
            Ok(StackContext {
                sp: frame_at,
                _stack: Some(stack),
            })
        }

        unsafe fn switch(&self, prev: *mut StackContext, next: *const StackContext) {
            switch_stacks(core::ptr::addr_of_mut!((*prev).sp), (*next).sp)
        }

        fn idle_entry(&self) -> ThreadFunc {
            crate::kernel::idle
        }
    }
}
