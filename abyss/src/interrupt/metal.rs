use crate::x86_64::{intrinsics, Rflags};
use core::sync::atomic::{AtomicBool, Ordering};

static EXTERNAL: AtomicBool = AtomicBool::new(false);

pub(super) fn enabled() -> bool {
    Rflags::read().contains(Rflags::IF)
}

pub(super) fn enable() {
    unsafe { intrinsics::sti() }
}

pub(super) fn disable() {
    unsafe { intrinsics::cli() }
}

pub(super) fn enable_and_halt() {
    unsafe { intrinsics::sti_hlt() }
}

pub(super) fn in_external() -> bool {
    EXTERNAL.load(Ordering::SeqCst)
}

pub(super) fn set_external(value: bool) {
    EXTERNAL.store(value, Ordering::SeqCst)
}
