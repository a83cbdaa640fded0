//! Relay-driven actuator (pump, boiler solenoid, group solenoids).
//!
//! ## Safety contract
//!
//! A relay is constructed de-energised and `setup` drives the pin to the
//! de-energised level before anything else runs.  Arbitration (who may
//! switch the shared pump off) is the machine's job; this driver is a
//! dumb actuator.
//!
//! ## Polarity
//!
//! The energise ↔ logic-level mapping comes from the wiring table, so an
//! active-low relay board and an active-high one run the same core.

use embedded_hal::digital::PinState;
use log::debug;

use crate::app::ports::{GpioPort, PinMode};
use crate::config::PinWiring;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Released,
    Energised,
}

#[derive(Debug)]
pub struct Relay {
    name: &'static str,
    wiring: PinWiring,
    state: RelayState,
}

impl Relay {
    pub const fn new(name: &'static str, wiring: PinWiring) -> Self {
        Self {
            name,
            wiring,
            state: RelayState::Released,
        }
    }

    /// Configure the pin as an output at the de-energised level.
    pub fn setup(&mut self, io: &mut impl GpioPort) {
        self.write_hw(io, false);
        io.set_mode(self.wiring.pin, PinMode::Output);
        self.state = RelayState::Released;
    }

    pub fn energise(&mut self, io: &mut impl GpioPort) {
        if self.state != RelayState::Energised {
            debug!("relay {}: energise", self.name);
        }
        self.write_hw(io, true);
        self.state = RelayState::Energised;
    }

    pub fn release(&mut self, io: &mut impl GpioPort) {
        if self.state != RelayState::Released {
            debug!("relay {}: release", self.name);
        }
        self.write_hw(io, false);
        self.state = RelayState::Released;
    }

    fn write_hw(&self, io: &mut impl GpioPort, energised: bool) {
        let level = self.wiring.polarity.level(energised);
        io.write(self.wiring.pin, PinState::from(level));
    }

    pub fn is_energised(&self) -> bool {
        self.state == RelayState::Energised
    }
}
