//! Raw GPIO helpers and the flow-meter interrupt service.
//!
//! Everything here uses ESP-IDF sys calls directly.  Pin configuration of
//! relays and option pins is done by the core through
//! [`GpioPort`](crate::app::ports::GpioPort); this module only provides the
//! primitives behind it and wires the flow-meter edges to
//! [`FLOW_METERS`](crate::sensors::flow::FLOW_METERS).

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

use crate::app::ports::PinMode;
use crate::config::Wiring;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAddFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAddFailed(rc) => write!(f, "GPIO ISR handler add failed (rc={})", rc),
        }
    }
}

impl core::error::Error for HwInitError {}

// ── GPIO primitives ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_set_mode(pin: i32, mode: PinMode) {
    // SAFETY: direction / pull register writes on a valid pin number from
    // the wiring table.  Main-loop only.
    unsafe {
        match mode {
            PinMode::InputPullUp => {
                gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT);
                gpio_set_pull_mode(pin, gpio_pull_mode_t_GPIO_PULLUP_ONLY);
            }
            PinMode::Output => {
                gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_OUTPUT);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_set_mode(_pin: i32, _mode: PinMode) {}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: gpio_get_level is a read-only register access.
    (unsafe { gpio_get_level(pin) }) != 0
}

/// Pulled-up idle level: buttons released, level probe dry on host.
#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level latches the output register; harmless while
    // the pin is still an input.  Main-loop only.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Flow-meter ISR service ────────────────────────────────────

/// ISR: `arg` carries the group index.
#[cfg(target_os = "espidf")]
unsafe extern "C" fn flow_gpio_isr(arg: *mut core::ffi::c_void) {
    let group = arg as usize;
    if let Some(meter) = crate::sensors::flow::FLOW_METERS.get(group) {
        meter.record_pulse(crate::adapters::time::isr_now_ms());
    }
}

/// Configure the flow inputs and attach their rising-edge handlers.
#[cfg(target_os = "espidf")]
pub fn init_flow_interrupts(wiring: &Wiring) -> Result<(), HwInitError> {
    // SAFETY: called once from main() before the control loop; the handlers
    // only touch the lock-free FLOW_METERS statics.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(HwInitError::IsrInstallFailed(ret));
        }

        for (i, group) in wiring.groups.iter().enumerate() {
            let pin = group.flow_meter;
            let cfg = gpio_config_t {
                pin_bit_mask: 1u64 << pin,
                mode: gpio_mode_t_GPIO_MODE_INPUT,
                pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
                pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
                intr_type: gpio_int_type_t_GPIO_INTR_POSEDGE,
            };
            let ret = gpio_config(&cfg);
            if ret != ESP_OK as i32 {
                return Err(HwInitError::GpioConfigFailed(ret));
            }
            let ret = gpio_isr_handler_add(pin, Some(flow_gpio_isr), i as *mut core::ffi::c_void);
            if ret != ESP_OK as i32 {
                return Err(HwInitError::IsrAddFailed(ret));
            }
            gpio_intr_enable(pin);
        }
    }
    info!("hw_init: flow interrupts attached ({} groups)", wiring.groups.len());
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_flow_interrupts(_wiring: &Wiring) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): flow interrupts skipped");
    Ok(())
}
