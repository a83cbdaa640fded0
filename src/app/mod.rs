//! Application boundary: the port traits the brewing core is written
//! against and the events it emits.
//!
//! The core itself lives in [`crate::brew`] and [`crate::machine`]; it
//! never touches hardware, keeping it fully testable on the host.

pub mod events;
pub mod ports;
