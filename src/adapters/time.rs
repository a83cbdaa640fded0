//! Monotonic time source for the control loop.
//!
//! - **`target_os = "espidf"`**: wraps `esp_timer_get_time()` from the
//!   ESP-IDF high-resolution timer (microsecond precision, monotonic).
//! - **`not(target_os = "espidf")`**: uses `std::time::Instant` for
//!   host-side simulation.
//!
//! The core works in wrapping `u32` milliseconds (≈ 49.7 days per wrap);
//! every comparison it makes is a `wrapping_sub`.

pub struct Esp32TimeAdapter {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for Esp32TimeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32TimeAdapter {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }

    /// Microseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_us(&self) -> u64 {
        // SAFETY: esp_timer_get_time reads a free-running counter.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64
    }

    /// Microseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_us(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }

    /// Milliseconds since boot, truncated to the wrapping tick clock.
    pub fn now_ms(&self) -> u32 {
        (self.uptime_us() / 1_000) as u32
    }
}

/// Millisecond clock usable from interrupt context.
#[cfg(target_os = "espidf")]
pub fn isr_now_ms() -> u32 {
    // SAFETY: esp_timer_get_time is a RTC counter read; safe in ISR context.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() } / 1_000) as u32
}
