//! GPIO pin assignments for the DuoGroup controller board.
//!
//! Single source of truth for the default [`Wiring`](crate::config::Wiring).
//! A deployment with different wiring overrides the `Wiring`, not these
//! constants.
//!
//! Every option pin is shared between the push-button (input, pulled up,
//! pressed = LOW) and its LED (output, lit = LOW).  The option driver owns
//! the switching between the two roles.

/// GPIO number as understood by the ESP-IDF `gpio_*` API.
pub type Pin = i32;

// ---------------------------------------------------------------------------
// Shared hydraulics (relay board, active-low inputs)
// ---------------------------------------------------------------------------

/// Relay: vibratory pump.
pub const PUMP_GPIO: Pin = 14;
/// Relay: boiler fill solenoid.
pub const SOLENOID_BOILER_GPIO: Pin = 13;
/// Boiler water-level probe. Reads HIGH when the probe is dry.
pub const WATER_LEVEL_GPIO: Pin = 10;

// ---------------------------------------------------------------------------
// Group 1
// ---------------------------------------------------------------------------

/// Relay: group 1 brew solenoid.
pub const SOLENOID_GROUP1_GPIO: Pin = 11;
/// Group 1 flow meter pulse output (rising edge interrupt).
pub const FLOWMETER_GROUP1_GPIO: Pin = 1;
/// Short single, long single, short double, long double, continuous.
pub const GROUP1_OPTION_GPIOS: [Pin; 5] = [4, 5, 6, 7, 15];

// ---------------------------------------------------------------------------
// Group 2
// ---------------------------------------------------------------------------

/// Relay: group 2 brew solenoid.
pub const SOLENOID_GROUP2_GPIO: Pin = 12;
/// Group 2 flow meter pulse output (rising edge interrupt).
pub const FLOWMETER_GROUP2_GPIO: Pin = 2;
/// Short single, long single, short double, long double, continuous.
pub const GROUP2_OPTION_GPIOS: [Pin; 5] = [16, 17, 18, 8, 9];
