//! Boot-time configuration of the thread subsystem.
//!
//! The configuration is read from the kernel command line once and is
//! fixed after it is handed to [`Scheduler::init`].
//!
//! [`Scheduler::init`]: crate::Scheduler::init
use alloc::string::{String, ToString};
use core::fmt;

/// Scheduling policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Policy {
    /// Strict priority scheduling with priority donation.
    #[default]
    Priority,
    /// Multi-level feedback queue scheduling.
    Mlfqs,
}

/// Configuration of the thread subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Scheduling policy.
    pub policy: Policy,
    /// Timer interrupts per second.
    pub timer_freq: u64,
    /// Maximum level printed by the kernel logger.
    pub log_level: log::LevelFilter,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            policy: Policy::Priority,
            timer_freq: 100,
            log_level: log::LevelFilter::Info,
        }
    }
}

/// Lowest accepted timer frequency.
pub const TIMER_FREQ_MIN: u64 = 19;
/// Highest accepted timer frequency.
pub const TIMER_FREQ_MAX: u64 = 1000;

/// A malformed kernel command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// `-o` with an option that is not known.
    UnknownOption(String),
    /// A flag was given without its argument.
    MissingValue(&'static str),
    /// Timer frequency outside `TIMER_FREQ_MIN..=TIMER_FREQ_MAX`.
    InvalidFrequency(String),
    /// `-l` with a level that is not a log level.
    UnknownLevel(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOption(o) => write!(f, "unknown option `{}`", o),
            Self::MissingValue(flag) => write!(f, "`{}` requires an argument", flag),
            Self::InvalidFrequency(v) => write!(
                f,
                "timer frequency `{}` is not in {}..={}",
                v, TIMER_FREQ_MIN, TIMER_FREQ_MAX
            ),
            Self::UnknownLevel(l) => write!(f, "unknown log level `{}`", l),
        }
    }
}

impl Config {
    /// Parse the option prefix of a kernel command line.
    ///
    /// Recognized options are `-o mlfqs`, `-o freq=N` and `-l LEVEL`.
    /// Parsing stops at the first word that does not start with `-`; the
    /// remainder is the action list, which is not interpreted here.
    pub fn from_cmdline(cmdline: &str) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        let mut words = cmdline.split_whitespace();
        while let Some(word) = words.next() {
            match word {
                "-o" => {
                    let option = words.next().ok_or(ConfigError::MissingValue("-o"))?;
                    config.apply_option(option)?;
                }
                "-l" => {
                    let level = words.next().ok_or(ConfigError::MissingValue("-l"))?;
                    config.log_level = level
                        .parse()
                        .map_err(|_| ConfigError::UnknownLevel(level.to_string()))?;
                }
                w if w.starts_with('-') => return Err(ConfigError::UnknownOption(w.to_string())),
                _ => break,
            }
        }
        Ok(config)
    }

    fn apply_option(&mut self, option: &str) -> Result<(), ConfigError> {
        if option == "mlfqs" {
            self.policy = Policy::Mlfqs;
        } else if let Some(freq) = option.strip_prefix("freq=") {
            self.timer_freq = freq
                .parse()
                .ok()
                .filter(|f| (TIMER_FREQ_MIN..=TIMER_FREQ_MAX).contains(f))
                .ok_or_else(|| ConfigError::InvalidFrequency(freq.to_string()))?;
        } else {
            return Err(ConfigError::UnknownOption(option.to_string()));
        }
        Ok(())
    }
}
