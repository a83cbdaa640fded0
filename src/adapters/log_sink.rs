//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every machine event as one
//! structured line to the ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::MachineEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`MachineEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &MachineEvent) {
        match event {
            MachineEvent::Started => info!("START | outputs safe"),
            MachineEvent::BrewStarted { group, option } => {
                info!("BREW | group={} option={}", group, option + 1);
            }
            MachineEvent::BrewStopped {
                group,
                option,
                reason,
                elapsed_ms,
                pulses,
            } => {
                info!(
                    "STOP | group={} option={} reason={:?} elapsed={}ms pulses={}",
                    group,
                    option + 1,
                    reason,
                    elapsed_ms,
                    pulses
                );
            }
            MachineEvent::ProgrammingEntered { by } => info!("PROG | entered by group={}", by),
            MachineEvent::ProgrammingExited { group } => info!("PROG | exited group={}", group),
            MachineEvent::DoseLearned { group, option, dose } => {
                info!(
                    "DOSE | group={} option={} pulses={} duration={}ms",
                    group,
                    option + 1,
                    dose.pulses,
                    dose.duration_ms
                );
            }
            MachineEvent::DosesCopied { from, to } => info!("DOSE | copied group={} -> group={}", from, to),
            MachineEvent::BoilerFillStarted => info!("BOILER | fill started"),
            MachineEvent::BoilerFillStopped { duration_ms } => {
                info!("BOILER | fill stopped after {}ms", duration_ms);
            }
            MachineEvent::StorageFault { group } => warn!("NVS | dose record fault group={}", group),
        }
    }
}
