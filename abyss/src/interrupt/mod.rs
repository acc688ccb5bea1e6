//! Interrupt
//!
//! The kernel runs on a single core, so masking interrupts is the only
//! mutual exclusion the thread subsystem needs. Code that touches scheduler
//! state asks for an [`IntrOff`] token, which can only be obtained while
//! interrupts are masked.
use core::marker::PhantomData;

#[cfg(not(target_os = "none"))]
mod hosted;
#[cfg(not(target_os = "none"))]
use hosted as imp;

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
mod metal;
#[cfg(all(target_arch = "x86_64", target_os = "none"))]
use metal as imp;

/// Enumeration for representing interrupt state
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum InterruptState {
    /// Interrupt is on.
    On,
    /// Interrupt is off.
    Off,
}

impl InterruptState {
    /// Read the current interrupt state.
    pub fn current() -> Self {
        if imp::enabled() {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// Enable interrupts and return the previous state.
pub fn enable() -> InterruptState {
    let prev = InterruptState::current();
    imp::enable();
    prev
}

/// Disable interrupts and return the previous state.
pub fn disable() -> InterruptState {
    let prev = InterruptState::current();
    imp::disable();
    prev
}

/// Set the interrupt state to `state` and return the previous one.
pub fn set(state: InterruptState) -> InterruptState {
    match state {
        InterruptState::On => enable(),
        InterruptState::Off => disable(),
    }
}

/// Re-enable interrupts and wait for the next one as a single step.
///
/// Enabling and halting separately could lose a whole tick to an interrupt
/// that arrives in between.
pub fn wait_for_interrupt() {
    imp::enable_and_halt()
}

/// Returns true while an external interrupt handler is running.
pub fn in_external() -> bool {
    imp::in_external()
}

/// An RAII implementation of an interrupt disable. When this structure is
/// dropped (falls out of scope), the interrupt will be recovered into state on creation of this struct.
/// Therefore, you must dropped the this struct in reverse of creation order.
///
/// This structure is created by the [`new`].
///
/// [`new`]: InterruptGuard::new
pub struct InterruptGuard {
    state: InterruptState,
    _not_send: PhantomData<*const ()>,
}

impl InterruptGuard {
    /// Create a new InterruptGuard.
    pub fn new() -> Self {
        Self {
            state: disable(),
            _not_send: PhantomData,
        }
    }

    /// A token proving that interrupts stay masked while the guard lives.
    pub fn token(&self) -> IntrOff<'_> {
        IntrOff { _p: PhantomData }
    }
}

impl Default for InterruptGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        if self.state == InterruptState::On {
            imp::enable();
        }
    }
}

/// Zero-sized capability proving that interrupts are masked.
#[derive(Clone, Copy)]
pub struct IntrOff<'a> {
    _p: PhantomData<&'a ()>,
}

impl IntrOff<'_> {
    /// Mint a token without a guard.
    ///
    /// # Safety
    /// Interrupts must be masked, and must stay masked for as long as the
    /// token is used. This is the case on the first run of a thread and in
    /// the idle loop, where the level is managed by hand.
    pub unsafe fn assume() -> IntrOff<'static> {
        debug_assert_eq!(InterruptState::current(), InterruptState::Off);
        IntrOff { _p: PhantomData }
    }
}

/// Marks the execution of an external interrupt handler.
///
/// Interrupts are masked for the whole lifetime of the context. Threads
/// must not block or yield while it is alive; preemption is deferred to
/// the point where the handler returns.
pub struct ExternalContext {
    guard: InterruptGuard,
}

impl ExternalContext {
    /// Enter the external interrupt context.
    pub fn enter() -> Self {
        let guard = InterruptGuard::new();
        assert!(!imp::in_external(), "nested external interrupt");
        imp::set_external(true);
        Self { guard }
    }

    /// A token proving that interrupts are masked inside the handler.
    pub fn token(&self) -> IntrOff<'_> {
        self.guard.token()
    }
}

impl Drop for ExternalContext {
    fn drop(&mut self) {
        imp::set_external(false);
    }
}
