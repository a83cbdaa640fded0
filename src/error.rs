//! Unified error types for the DuoGroup firmware.
//!
//! A single `Error` enum that every subsystem can convert into.  All
//! variants are `Copy` so they can be passed through the control loop
//! without allocation.
//!
//! Nothing in the brewing path is fatal: storage faults degrade to
//! built-in doses, and the machine keeps running.

use core::fmt;

use crate::app::ports::StorageError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Persistent storage could not be read or written.
    Storage(StorageError),
    /// A stored dose record failed to decode.
    CorruptRecord,
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::CorruptRecord => write!(f, "dose record corrupt"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<postcard::Error> for Error {
    fn from(_: postcard::Error) -> Self {
        Self::CorruptRecord
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
