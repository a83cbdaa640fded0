//! Port traits: the hexagonal boundary between the brewing core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Machine (domain)
//! ```
//!
//! Driven adapters (GPIO, storage, event sinks) implement these traits.
//! The [`Machine`](crate::machine::Machine) consumes them via generics, so
//! the core never touches hardware directly and runs unchanged against
//! the mock board in the integration tests.
//!
//! Ports speak raw logic levels.  Whether a HIGH energises the pump or
//! releases it is decided by the core's [`Polarity`](crate::config::Polarity)
//! table, never by an adapter.

use embedded_hal::digital::PinState;

use crate::brew::GroupId;
use crate::pins::Pin;

// ───────────────────────────────────────────────────────────────
// GPIO port (driven adapter: domain ↔ pins)
// ───────────────────────────────────────────────────────────────

/// Electrical configuration of a pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    /// Input with the internal pull-up enabled.
    InputPullUp,
    /// Push-pull output.
    Output,
}

/// Digital I/O on numbered pins.
pub trait GpioPort {
    /// Reconfigure a pin.
    fn set_mode(&mut self, pin: Pin, mode: PinMode);

    /// Drive an output pin.
    fn write(&mut self, pin: Pin, state: PinState);

    /// Sample a pin.
    fn read(&mut self, pin: Pin) -> PinState;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`MachineEvent`](super::events::MachineEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::MachineEvent);
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// One persistent slot per brew group holding its encoded dose record.
///
/// Where the slot lives (NVS namespace, key naming) is the adapter's
/// business.  A write MUST replace the previous record atomically, so a
/// power cut mid-save leaves the old record readable.
pub trait StoragePort {
    /// Copy the stored record of `group` into `buf`.  Returns its length.
    fn read_record(&self, group: GroupId, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Replace the stored record of `group`.
    fn write_record(&mut self, group: GroupId, data: &[u8]) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// No record stored for the group.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
