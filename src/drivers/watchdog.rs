//! Task Watchdog Timer (TWDT) for the control loop.
//!
//! The loop task subscribes once at boot and calls [`Watchdog::feed`] every
//! tick.  A stalled loop would leave the pump and a group solenoid open, so
//! the TWDT panics and the chip reboots into the safe power-on state.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// Default stall limit for the brewing loop.
pub const DEFAULT_TIMEOUT_MS: u32 = 5_000;

pub struct Watchdog {
    timeout_ms: u32,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl Watchdog {
    /// Reconfigure the TWDT and subscribe the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: TWDT calls from the loop task before it starts ticking.
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!("TWDT reconfigure returned {} (may already be configured)", ret);
                }

                let subscribed = esp_task_wdt_add(core::ptr::null_mut()) == ESP_OK;
                if subscribed {
                    info!("Watchdog: subscribed ({} ms, panic on trigger)", timeout_ms);
                } else {
                    log::warn!("Watchdog: failed to subscribe");
                }
                Self { timeout_ms, subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("Watchdog(sim): {} ms, no-op", timeout_ms);
            Self { timeout_ms }
        }
    }

    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the calling task's TWDT entry.
            unsafe {
                esp_task_wdt_reset();
            }
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }
}
