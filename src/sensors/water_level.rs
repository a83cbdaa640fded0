//! Boiler water-level probe.
//!
//! A single digital input.  Which level means "low water" is a wiring
//! parameter; the probe on the reference board reads HIGH when dry.

use crate::app::ports::{GpioPort, PinMode};
use crate::config::PinWiring;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaterLevel {
    Low,
    Ok,
}

pub struct WaterLevelSensor {
    wiring: PinWiring,
}

impl WaterLevelSensor {
    pub fn new(wiring: PinWiring) -> Self {
        Self { wiring }
    }

    pub fn setup(&mut self, io: &mut impl GpioPort) {
        io.set_mode(self.wiring.pin, PinMode::InputPullUp);
    }

    pub fn read(&self, io: &mut impl GpioPort) -> WaterLevel {
        let high = io.read(self.wiring.pin) == embedded_hal::digital::PinState::High;
        if self.wiring.polarity.is_asserted(high) {
            WaterLevel::Low
        } else {
            WaterLevel::Ok
        }
    }
}
