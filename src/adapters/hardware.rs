//! Hardware adapter. Bridges the ESP32 pins and NVS to the port traits.
//!
//! This is the only type the control loop hands to the
//! [`Machine`](crate::machine::Machine).  On non-espidf targets the
//! underlying helpers are simulation stubs.

use embedded_hal::digital::PinState;

use crate::adapters::nvs::NvsAdapter;
use crate::app::ports::{GpioPort, PinMode, StorageError, StoragePort};
use crate::brew::GroupId;
use crate::drivers::hw_init;
use crate::pins::Pin;

/// Concrete adapter combining raw GPIO and NVS behind the ports.
pub struct HardwareAdapter {
    nvs: NvsAdapter,
}

impl HardwareAdapter {
    pub fn new(nvs: NvsAdapter) -> Self {
        Self { nvs }
    }
}

// ── GpioPort implementation ───────────────────────────────────

impl GpioPort for HardwareAdapter {
    fn set_mode(&mut self, pin: Pin, mode: PinMode) {
        hw_init::gpio_set_mode(pin, mode);
    }

    fn write(&mut self, pin: Pin, state: PinState) {
        hw_init::gpio_write(pin, state == PinState::High);
    }

    fn read(&mut self, pin: Pin) -> PinState {
        PinState::from(hw_init::gpio_read(pin))
    }
}

// ── StoragePort implementation ────────────────────────────────

impl StoragePort for HardwareAdapter {
    fn read_record(&self, group: GroupId, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.nvs.read_record(group, buf)
    }

    fn write_record(&mut self, group: GroupId, data: &[u8]) -> Result<(), StorageError> {
        self.nvs.write_record(group, data)
    }
}
