//! One brew option: a button and an LED on the same pin, plus its dose.
//!
//! ## Pin sharing
//!
//! The option pin is the button input *and* the LED drive.  Every poll
//! switches the pin to pulled-up input before sampling, and the LED is
//! only driven again once the debounced button reads released.  The pin is
//! never sampled while it is an output, so the option cannot read back its
//! own LED drive as a press.
//!
//! ## Button semantics
//!
//! | Variant    | Gesture                    | Action                          |
//! |------------|----------------------------|---------------------------------|
//! | Timed      | press + release            | `PressedForBrewing`             |
//! | Continuous | press + release            | `PressedForContinuousBrewing`   |
//! | Continuous | hold ≥ `hold_to_program_ms`| `PressedForProgram` (once)      |
//!
//! A long hold is reported once; the release that ends it is swallowed, and
//! the next long hold is only reported after that release.

use embedded_hal::digital::PinState;

use super::dosage::{Dose, DosageRecord};
use super::CONTINUOUS_INDEX;
use crate::app::events::StopReason;
use crate::app::ports::{GpioPort, PinMode};
use crate::config::MachineConfig;
use crate::drivers::button::Debouncer;
use crate::pins::Pin;

/// What a poll of the button decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    NotPressed,
    PressedForBrewing,
    PressedForProgram,
    PressedForContinuousBrewing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedStatus {
    Off,
    On,
}

/// Timed options stop on their own; the continuous one never does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionKind {
    Timed(Dose),
    Continuous,
}

#[derive(Debug)]
pub struct BrewOption {
    index: usize,
    pin: Pin,
    kind: OptionKind,
    button: Debouncer,
    programmed: bool,
    led: LedStatus,
    last_action_ms: Option<u32>,
    /// Last mode written to the pin; `None` until first configured.
    pin_mode: Option<PinMode>,
    released_after_long_press: bool,
}

impl BrewOption {
    pub fn new(index: usize, pin: Pin, kind: OptionKind, debounce_ms: u32) -> Self {
        Self {
            index,
            pin,
            kind,
            button: Debouncer::new(debounce_ms),
            programmed: false,
            led: LedStatus::Off,
            last_action_ms: None,
            pin_mode: None,
            released_after_long_press: true,
        }
    }

    /// Build the five options of a group from its pins and dose table.
    pub fn for_group(
        pins: &[Pin; super::OPTIONS_PER_GROUP],
        record: &DosageRecord,
        debounce_ms: u32,
    ) -> [BrewOption; super::OPTIONS_PER_GROUP] {
        core::array::from_fn(|i| {
            let kind = match record.dose(i) {
                Some(d) if i != CONTINUOUS_INDEX => OptionKind::Timed(d),
                _ => OptionKind::Continuous,
            };
            BrewOption::new(i, pins[i], kind, debounce_ms)
        })
    }

    pub fn setup(&mut self, io: &mut impl GpioPort) {
        self.pin_mode = None;
        self.set_pin_mode(io, PinMode::InputPullUp);
    }

    /// Sample the button and decide what the operator asked for.
    pub fn poll(&mut self, now_ms: u32, io: &mut impl GpioPort, cfg: &MachineConfig) -> ButtonAction {
        self.set_pin_mode(io, PinMode::InputPullUp);
        let high = io.read(self.pin) == PinState::High;
        self.button.update(now_ms, cfg.wiring.button.is_asserted(high));

        let action = match self.kind {
            OptionKind::Continuous => self.continuous_action(now_ms, cfg),
            OptionKind::Timed(_) => {
                if self.button.was_released() && self.spacing_ok(now_ms, cfg) {
                    self.last_action_ms = Some(now_ms);
                    ButtonAction::PressedForBrewing
                } else {
                    ButtonAction::NotPressed
                }
            }
        };

        self.drive_led(io, cfg);
        action
    }

    fn continuous_action(&mut self, now_ms: u32, cfg: &MachineConfig) -> ButtonAction {
        if self.button.pressed_for(cfg.hold_to_program_ms) {
            if self.released_after_long_press {
                self.released_after_long_press = false;
                self.last_action_ms = Some(now_ms);
                return ButtonAction::PressedForProgram;
            }
            return ButtonAction::NotPressed;
        }

        if self.button.was_released() {
            if !self.released_after_long_press {
                // end of the hold that was already reported
                self.released_after_long_press = true;
                return ButtonAction::NotPressed;
            }
            if self.spacing_ok(now_ms, cfg) {
                self.last_action_ms = Some(now_ms);
                return ButtonAction::PressedForContinuousBrewing;
            }
        }
        ButtonAction::NotPressed
    }

    fn spacing_ok(&self, now_ms: u32, cfg: &MachineConfig) -> bool {
        self.last_action_ms
            .is_none_or(|t| now_ms.wrapping_sub(t) >= cfg.min_action_spacing_ms)
    }

    fn set_pin_mode(&mut self, io: &mut impl GpioPort, mode: PinMode) {
        if self.pin_mode != Some(mode) {
            io.set_mode(self.pin, mode);
            self.pin_mode = Some(mode);
        }
    }

    /// Light the LED if it should be on and the button is not held.
    fn drive_led(&mut self, io: &mut impl GpioPort, cfg: &MachineConfig) {
        if self.led == LedStatus::On && self.button.is_released() {
            io.write(self.pin, PinState::from(cfg.wiring.led.level(true)));
            self.set_pin_mode(io, PinMode::Output);
        }
    }

    /// Change the LED and apply it to the pin right away.
    pub fn set_led(&mut self, io: &mut impl GpioPort, cfg: &MachineConfig, status: LedStatus) {
        self.led = status;
        match status {
            LedStatus::On => self.drive_led(io, cfg),
            LedStatus::Off => self.set_pin_mode(io, PinMode::InputPullUp),
        }
    }

    /// Why a brew of this option should end now, if it should.
    pub fn can_finish_brewing(
        &self,
        elapsed_ms: u32,
        pulses: u32,
        cfg: &MachineConfig,
    ) -> Option<StopReason> {
        let OptionKind::Timed(dose) = self.kind else {
            return None;
        };
        if pulses >= dose.pulses {
            Some(StopReason::FlowTarget)
        } else if pulses <= cfg.no_flow_pulse_threshold && elapsed_ms >= dose.duration_ms {
            Some(StopReason::NoFlowTimeout)
        } else if elapsed_ms >= dose.duration_ms.saturating_mul(cfg.safety_timeout_factor) {
            Some(StopReason::SafetyTimeout)
        } else {
            None
        }
    }

    /// Brew finished.  In programming mode a timed option learns the
    /// measured dose into `record` and returns it.
    pub fn on_end_brewing(
        &mut self,
        elapsed_ms: u32,
        pulses: u32,
        programming: bool,
        record: &mut DosageRecord,
        cfg: &MachineConfig,
    ) -> Option<Dose> {
        if !programming || self.kind == OptionKind::Continuous {
            return None;
        }
        let dose = record.learn(
            self.index,
            pulses,
            elapsed_ms,
            cfg.min_dose_pulses,
            cfg.min_dose_secs,
        )?;
        self.kind = OptionKind::Timed(dose);
        self.programmed = true;
        Some(dose)
    }

    /// Reload the dose from a (possibly copied) record.
    pub fn apply_record(&mut self, record: &DosageRecord) {
        if let (OptionKind::Timed(_), Some(d)) = (self.kind, record.dose(self.index)) {
            self.kind = OptionKind::Timed(d);
        }
    }

    /// Target pulse count armed on the flow meter for this brew.
    pub fn flow_target(&self, programming: bool) -> u32 {
        match self.kind {
            OptionKind::Timed(d) if !programming => d.pulses,
            _ => 0,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn pin(&self) -> Pin {
        self.pin
    }

    pub fn dose(&self) -> Option<Dose> {
        match self.kind {
            OptionKind::Timed(d) => Some(d),
            OptionKind::Continuous => None,
        }
    }

    pub fn is_continuous(&self) -> bool {
        self.kind == OptionKind::Continuous
    }

    pub fn is_programmed(&self) -> bool {
        self.programmed
    }

    pub fn set_programmed(&mut self, programmed: bool) {
        self.programmed = programmed;
    }

    pub fn led(&self) -> LedStatus {
        self.led
    }
}
