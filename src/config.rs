//! System configuration parameters
//!
//! All tunable parameters for the DuoGroup controller, plus the
//! per-deployment [`Wiring`] (pin map and the energise/logic-level mapping
//! of every pin).

use serde::{Deserialize, Serialize};

use crate::brew::{GROUP_COUNT, OPTIONS_PER_GROUP};
use crate::error::Error;
use crate::pins::{self, Pin};

// ---------------------------------------------------------------------------
// Polarity
// ---------------------------------------------------------------------------

/// Which logic level means "asserted" for a pin.
///
/// Several board revisions drive the pump and solenoid relays active-low,
/// others active-high; the core never assumes one or the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Logic level (`true` = HIGH) that asserts the signal.
    pub const fn level(self, asserted: bool) -> bool {
        match self {
            Self::ActiveHigh => asserted,
            Self::ActiveLow => !asserted,
        }
    }

    /// Decode a sampled logic level back into "asserted".
    pub const fn is_asserted(self, high: bool) -> bool {
        match self {
            Self::ActiveHigh => high,
            Self::ActiveLow => !high,
        }
    }
}

/// A pin together with its polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinWiring {
    pub pin: Pin,
    pub polarity: Polarity,
}

impl PinWiring {
    pub const fn new(pin: Pin, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

/// Per-group pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWiring {
    pub solenoid: PinWiring,
    pub flow_meter: Pin,
    /// Shared button/LED pins, continuous option last.
    pub options: [Pin; OPTIONS_PER_GROUP],
}

/// Complete pin map of one machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wiring {
    pub pump: PinWiring,
    pub boiler_solenoid: PinWiring,
    /// Asserted level = boiler water level is LOW (needs refill).
    pub water_level_low: PinWiring,
    pub groups: [GroupWiring; GROUP_COUNT],
    /// LED drive level on the shared option pins.
    pub led: Polarity,
    /// Pressed level on the shared option pins.
    pub button: Polarity,
}

impl Default for Wiring {
    fn default() -> Self {
        Self {
            pump: PinWiring::new(pins::PUMP_GPIO, Polarity::ActiveLow),
            boiler_solenoid: PinWiring::new(pins::SOLENOID_BOILER_GPIO, Polarity::ActiveLow),
            water_level_low: PinWiring::new(pins::WATER_LEVEL_GPIO, Polarity::ActiveHigh),
            groups: [
                GroupWiring {
                    solenoid: PinWiring::new(pins::SOLENOID_GROUP1_GPIO, Polarity::ActiveLow),
                    flow_meter: pins::FLOWMETER_GROUP1_GPIO,
                    options: pins::GROUP1_OPTION_GPIOS,
                },
                GroupWiring {
                    solenoid: PinWiring::new(pins::SOLENOID_GROUP2_GPIO, Polarity::ActiveLow),
                    flow_meter: pins::FLOWMETER_GROUP2_GPIO,
                    options: pins::GROUP2_OPTION_GPIOS,
                },
            ],
            led: Polarity::ActiveLow,
            button: Polarity::ActiveLow,
        }
    }
}

impl Wiring {
    /// Every pin in the map, in a fixed order.
    pub fn all_pins(&self) -> heapless::Vec<Pin, 32> {
        let mut out = heapless::Vec::new();
        // Capacity covers 3 shared pins + 2 × (solenoid + flow + 5 options).
        let _ = out.push(self.pump.pin);
        let _ = out.push(self.boiler_solenoid.pin);
        let _ = out.push(self.water_level_low.pin);
        for g in &self.groups {
            let _ = out.push(g.solenoid.pin);
            let _ = out.push(g.flow_meter);
            for &p in &g.options {
                let _ = out.push(p);
            }
        }
        out
    }
}

// ---------------------------------------------------------------------------
// MachineConfig
// ---------------------------------------------------------------------------

/// Core machine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineConfig {
    // --- Buttons ---
    /// Debounce window of the option buttons (milliseconds)
    pub button_debounce_ms: u32,
    /// Hold time on the continuous button to enter programming mode
    pub hold_to_program_ms: u32,
    /// Minimum spacing between two accepted presses of the same option
    pub min_action_spacing_ms: u32,

    // --- LEDs ---
    /// Blink half-period for unprogrammed options in programming mode
    pub blink_interval_ms: u32,

    // --- Dosing ---
    /// Smallest pulse target a dose may hold
    pub min_dose_pulses: u16,
    /// Smallest duration a dose may hold (seconds)
    pub min_dose_secs: u16,
    /// Pulse count at or below which the flow meter is considered silent
    pub no_flow_pulse_threshold: u32,
    /// Brewing always stops after `factor × dose duration`
    pub safety_timeout_factor: u32,
    /// Pulses closer than this are treated as bounce (0 disables)
    pub flow_debounce_ms: u32,

    // --- Boiler ---
    /// Level must read OK continuously this long before a fill stops
    pub boiler_fill_hysteresis_ms: u32,

    // --- Hardware ---
    pub wiring: Wiring,
}

impl Default for MachineConfig {
    fn default() -> Self {
        Self {
            // Buttons
            button_debounce_ms: 25,
            hold_to_program_ms: 3000,
            min_action_spacing_ms: 400,

            // LEDs
            blink_interval_ms: 800,

            // Dosing
            min_dose_pulses: 10,
            min_dose_secs: 5,
            no_flow_pulse_threshold: 3,
            safety_timeout_factor: 2,
            flow_debounce_ms: 2,

            // Boiler
            boiler_fill_hysteresis_ms: 2000,

            wiring: Wiring::default(),
        }
    }
}

impl MachineConfig {
    /// Range-check every field.  Degenerate values are rejected here;
    /// dose values are clamped elsewhere, never rejected.
    pub fn validate(&self) -> Result<(), Error> {
        if self.hold_to_program_ms == 0 {
            return Err(Error::Config("hold_to_program_ms must be > 0"));
        }
        if self.hold_to_program_ms <= self.button_debounce_ms {
            return Err(Error::Config(
                "hold_to_program_ms must exceed button_debounce_ms",
            ));
        }
        if self.blink_interval_ms == 0 {
            return Err(Error::Config("blink_interval_ms must be > 0"));
        }
        if self.boiler_fill_hysteresis_ms == 0 {
            return Err(Error::Config("boiler_fill_hysteresis_ms must be > 0"));
        }
        if self.safety_timeout_factor < 1 {
            return Err(Error::Config("safety_timeout_factor must be >= 1"));
        }
        if self.min_dose_pulses as u32 <= self.no_flow_pulse_threshold {
            return Err(Error::Config(
                "min_dose_pulses must exceed no_flow_pulse_threshold",
            ));
        }
        if self.min_dose_secs == 0 {
            return Err(Error::Config("min_dose_secs must be > 0"));
        }

        let pins = self.wiring.all_pins();
        for (i, a) in pins.iter().enumerate() {
            if pins[i + 1..].contains(a) {
                return Err(Error::Config("wiring assigns the same pin twice"));
            }
        }
        Ok(())
    }
}
