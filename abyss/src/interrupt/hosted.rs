//! Software interrupt flag for hosted builds.
//!
//! Each OS thread models one machine, so concurrently running tests never
//! observe each other's interrupt level. Like a freshly booted core, the
//! flag starts cleared.
use std::cell::Cell;

std::thread_local! {
    static ENABLED: Cell<bool> = const { Cell::new(false) };
    static EXTERNAL: Cell<bool> = const { Cell::new(false) };
}

pub(super) fn enabled() -> bool {
    ENABLED.with(Cell::get)
}

pub(super) fn enable() {
    ENABLED.with(|flag| flag.set(true))
}

pub(super) fn disable() {
    ENABLED.with(|flag| flag.set(false))
}

pub(super) fn enable_and_halt() {
    enable();
    std::thread::yield_now();
}

pub(super) fn in_external() -> bool {
    EXTERNAL.with(Cell::get)
}

pub(super) fn set_external(value: bool) {
    EXTERNAL.with(|flag| flag.set(value))
}
