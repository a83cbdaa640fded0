//! Polled push-button debouncer with edge and hold detection.
//!
//! ## Hardware
//!
//! Active-low momentary switches with the internal pull-up enabled.  The
//! option pins double as LED outputs, so there is no edge interrupt to
//! hang a debouncer on: the option driver samples the pin each tick and
//! feeds the level in here.
//!
//! ## Semantics
//!
//! | Query          | True when                                          |
//! |----------------|----------------------------------------------------|
//! | `update`       | returns the debounced "pressed" level              |
//! | `is_released`  | debounced level is "released"                      |
//! | `was_released` | the last `update` observed a press → release edge  |
//! | `pressed_for`  | pressed and unchanged for at least `ms`            |
//!
//! A level change is accepted only when the previous accepted change is at
//! least `debounce_ms` old; anything faster is bounce.

/// Debounced state of one button.
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    debounce_ms: u32,
    pressed: bool,
    changed: bool,
    /// Time of the last `update`.
    now_ms: u32,
    /// Time of the last accepted level change.
    last_change_ms: u32,
}

impl Debouncer {
    pub const fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            pressed: false,
            changed: false,
            now_ms: 0,
            last_change_ms: 0,
        }
    }

    /// Feed one raw sample.  Returns the debounced "pressed" level.
    pub fn update(&mut self, now_ms: u32, raw_pressed: bool) -> bool {
        if now_ms.wrapping_sub(self.last_change_ms) < self.debounce_ms {
            self.changed = false;
        } else {
            self.changed = raw_pressed != self.pressed;
            self.pressed = raw_pressed;
            if self.changed {
                self.last_change_ms = now_ms;
            }
        }
        self.now_ms = now_ms;
        self.pressed
    }

    pub fn is_released(&self) -> bool {
        !self.pressed
    }

    pub fn was_released(&self) -> bool {
        !self.pressed && self.changed
    }

    /// Held down for at least `ms` as of the last `update`.
    pub fn pressed_for(&self, ms: u32) -> bool {
        self.pressed && self.now_ms.wrapping_sub(self.last_change_ms) >= ms
    }
}
