//! CLI-level errors.

use std::fmt;

/// Errors surfaced to the terminal as a one-line message and exit code 1.
#[derive(Debug)]
pub enum CliError {
    /// No provider is registered under this code.
    NoSuchCdn(String),

    /// Anything the library reports, passed through verbatim.
    Core(cdnget::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSuchCdn(code) => write!(f, "{}: no such CDN.", code),
            Self::Core(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Core(err) => Some(err),
            Self::NoSuchCdn(_) => None,
        }
    }
}

impl From<cdnget::Error> for CliError {
    fn from(err: cdnget::Error) -> Self {
        Self::Core(err)
    }
}
