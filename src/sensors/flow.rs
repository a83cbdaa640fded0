//! Group flow-meter pulse counter.
//!
//! The meter's output fires a rising-edge interrupt per pulse.  The ISR
//! calls [`FlowMeter::record_pulse`], which is lock-free: it only touches
//! atomics that the main loop never read-modify-writes outside a critical
//! section.
//!
//! ## Access rules
//!
//! | Operation           | Context        | Protection                      |
//! |---------------------|----------------|---------------------------------|
//! | `record_pulse`      | ISR (producer) | single producer, plain atomics  |
//! | `arm` / `disarm`    | main loop      | `critical_section::with`        |
//! | `pulse_count`       | main loop      | single atomic load              |
//! | `take_target_reached` | main loop    | atomic swap                     |
//!
//! `arm` and `disarm` touch several fields that must change together
//! (count, timestamp, target, flags), so they mask interrupts for the few
//! stores involved.  Everything else is a single atomic access.
//!
//! Meters live in `static`s because ESP-IDF ISR callbacks cannot capture
//! state; the owning group holds a `&'static FlowMeter`.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::brew::GROUP_COUNT;

/// One meter per group, indexed by `GroupId::index()`.
pub static FLOW_METERS: [FlowMeter; GROUP_COUNT] = [FlowMeter::new(), FlowMeter::new()];

/// What a single pulse did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseOutcome {
    /// Meter not armed (group idle) or pulse inside the debounce window.
    Ignored,
    Counted,
    /// This pulse made the count reach the armed target.
    TargetReached,
}

/// Pulse counter shared between one group and its ISR.
pub struct FlowMeter {
    count: AtomicU32,
    last_pulse_ms: AtomicU32,
    /// Pulse count that requests a stop; 0 = never.
    target: AtomicU32,
    debounce_ms: AtomicU32,
    armed: AtomicBool,
    target_reached: AtomicBool,
}

impl Default for FlowMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowMeter {
    pub const fn new() -> Self {
        Self {
            count: AtomicU32::new(0),
            last_pulse_ms: AtomicU32::new(0),
            target: AtomicU32::new(0),
            debounce_ms: AtomicU32::new(0),
            armed: AtomicBool::new(false),
            target_reached: AtomicBool::new(false),
        }
    }

    /// Pulses closer together than `ms` are dropped (0 disables).
    pub fn set_debounce_ms(&self, ms: u32) {
        self.debounce_ms.store(ms, Ordering::Relaxed);
    }

    /// Reset for a fresh brew and start counting.
    ///
    /// `target` is the pulse count that latches a stop request, or 0 to
    /// count without ever requesting a stop (continuous option,
    /// programming mode).
    pub fn arm(&self, target: u32) {
        critical_section::with(|_| {
            self.count.store(0, Ordering::Relaxed);
            self.last_pulse_ms.store(0, Ordering::Relaxed);
            self.target.store(target, Ordering::Relaxed);
            self.target_reached.store(false, Ordering::Relaxed);
            self.armed.store(true, Ordering::Release);
        });
    }

    /// Stop counting and return the final pulse count.
    pub fn disarm(&self) -> u32 {
        critical_section::with(|_| {
            self.armed.store(false, Ordering::Release);
            self.target.store(0, Ordering::Relaxed);
            self.target_reached.store(false, Ordering::Relaxed);
            self.count.load(Ordering::Relaxed)
        })
    }

    /// Interrupt entry point: count one rising edge.
    pub fn record_pulse(&self, now_ms: u32) -> PulseOutcome {
        if !self.armed.load(Ordering::Acquire) {
            return PulseOutcome::Ignored;
        }

        let debounce = self.debounce_ms.load(Ordering::Relaxed);
        let counted = self.count.load(Ordering::Relaxed);
        if debounce > 0
            && counted > 0
            && now_ms.wrapping_sub(self.last_pulse_ms.load(Ordering::Relaxed)) < debounce
        {
            return PulseOutcome::Ignored;
        }
        self.last_pulse_ms.store(now_ms, Ordering::Relaxed);

        let n = self.count.fetch_add(1, Ordering::AcqRel) + 1;
        let target = self.target.load(Ordering::Relaxed);
        if target != 0 && n == target {
            self.target_reached.store(true, Ordering::Release);
            PulseOutcome::TargetReached
        } else {
            PulseOutcome::Counted
        }
    }

    /// Consume a latched "target reached" stop request.
    pub fn take_target_reached(&self) -> bool {
        self.target_reached.swap(false, Ordering::AcqRel)
    }

    pub fn pulse_count(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}
