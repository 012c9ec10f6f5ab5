//! POSIX signal resolution for remote commands.
//!
//! Remote nodes run Linux, so the numbering below is the Linux one rather
//! than whatever the local platform uses.

use crate::error::{NodectlError, Result};

/// Signal name to number table (Linux numbering)
pub const SIGNALS: &[(&str, i32)] = &[
    ("SIGHUP", 1),
    ("SIGINT", 2),
    ("SIGQUIT", 3),
    ("SIGILL", 4),
    ("SIGTRAP", 5),
    ("SIGABRT", 6),
    ("SIGIOT", 6),
    ("SIGBUS", 7),
    ("SIGFPE", 8),
    ("SIGKILL", 9),
    ("SIGUSR1", 10),
    ("SIGSEGV", 11),
    ("SIGUSR2", 12),
    ("SIGPIPE", 13),
    ("SIGALRM", 14),
    ("SIGTERM", 15),
    ("SIGSTKFLT", 16),
    ("SIGCHLD", 17),
    ("SIGCONT", 18),
    ("SIGSTOP", 19),
    ("SIGTSTP", 20),
    ("SIGTTIN", 21),
    ("SIGTTOU", 22),
    ("SIGURG", 23),
    ("SIGXCPU", 24),
    ("SIGXFSZ", 25),
    ("SIGVTALRM", 26),
    ("SIGPROF", 27),
    ("SIGWINCH", 28),
    ("SIGIO", 29),
    ("SIGPOLL", 29),
    ("SIGPWR", 30),
    ("SIGSYS", 31),
];

/// A signal given either by number or by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalSpec {
    Number(i32),
    Name(String),
}

impl SignalSpec {
    /// Resolve to the number sent over the wire
    ///
    /// Names are case-insensitive and the `SIG` prefix is optional. A name
    /// made only of digits is treated as a number.
    pub fn resolve(&self) -> Result<i32> {
        match self {
            SignalSpec::Number(number) => Ok(*number),
            SignalSpec::Name(name) => resolve_name(name),
        }
    }
}

impl From<i32> for SignalSpec {
    fn from(number: i32) -> Self {
        SignalSpec::Number(number)
    }
}

impl From<&str> for SignalSpec {
    fn from(name: &str) -> Self {
        SignalSpec::Name(name.to_string())
    }
}

impl From<String> for SignalSpec {
    fn from(name: String) -> Self {
        SignalSpec::Name(name)
    }
}

fn resolve_name(name: &str) -> Result<i32> {
    let trimmed = name.trim();
    if let Ok(number) = trimmed.parse::<i32>() {
        return Ok(number);
    }

    let upper = trimmed.to_ascii_uppercase();
    let canonical = if upper.starts_with("SIG") {
        upper
    } else {
        format!("SIG{}", upper)
    };

    SIGNALS
        .iter()
        .find(|(known, _)| *known == canonical)
        .map(|(_, number)| *number)
        .ok_or_else(|| NodectlError::UnknownSignal(name.to_string()))
}

/// Reverse lookup, first name wins for aliased numbers
pub fn signal_name(number: i32) -> Option<&'static str> {
    SIGNALS
        .iter()
        .find(|(_, known)| *known == number)
        .map(|(name, _)| *name)
}
