//! Kernel print utilities.
//!
//! Output goes to the installed console, or to the platform default when
//! none is installed (COM1 on bare metal, stderr on a hosted build).
//! [`KernelLogger`] routes the `log` facade through the same path.

use crate::spin_lock::SpinLock;
use core::fmt::Write;

type Console = &'static mut (dyn Write + Send);

static CONSOLE: SpinLock<Option<Console>> = SpinLock::new(None);

/// Install `console` as the destination of every kernel print.
pub fn set_console(console: Console) {
    *CONSOLE.lock() = Some(console);
}

#[doc(hidden)]
pub fn _print(fmt: core::fmt::Arguments<'_>) {
    let mut console = CONSOLE.lock();
    match console.as_mut() {
        Some(console) => {
            let _ = console.write_fmt(fmt);
        }
        None => fallback(fmt),
    }
}

#[cfg(not(target_os = "none"))]
fn fallback(fmt: core::fmt::Arguments<'_>) {
    std::eprint!("{}", fmt);
}

#[cfg(all(target_arch = "x86_64", target_os = "none"))]
fn fallback(fmt: core::fmt::Arguments<'_>) {
    let _ = crate::x86_64::serial::Serial::com1().write_fmt(fmt);
}

/// Prints out the message.
///
/// Use the format! syntax to write data to the standard output.
/// This first holds the lock for console device.
#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::kprint::_print(format_args!($($arg)*)));
}

/// Prints out the message with a newline.
///
/// Use the format! syntax to write data to the standard output.
/// This first holds the lock for console device.
#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

/// `log` backend printing `[LEVEL] message` lines to the kernel console.
pub struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            log::Level::Error => "ERROR",
            log::Level::Warn => "WARNING",
            log::Level::Info => "INFO",
            log::Level::Debug => "DEBUG",
            log::Level::Trace => "TRACE",
        };
        _print(format_args!("[{}] {}\n", tag, record.args()));
    }

    fn flush(&self) {}
}

/// Install [`KernelLogger`] as the global logger and cap it at `level`.
///
/// A logger installed earlier stays in place; only the level is updated.
pub fn init_logger(level: log::LevelFilter) {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(level);
}
