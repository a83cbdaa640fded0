//! Fuzz target: persisted dose records
//!
//! Plants arbitrary bytes as group 1's stored record and boots a machine on
//! top of them, verifying:
//! - No panics while decoding or loading
//! - Every loaded dose respects the configured minimums
//! - Undecodable blobs leave the built-in defaults in place
//!
//! cargo fuzz run fuzz_dose_record

#![no_main]

use libfuzzer_sys::fuzz_target;
use duogroup::app::events::MachineEvent;
use duogroup::app::ports::{EventSink, GpioPort, PinMode, StorageError, StoragePort};
use duogroup::brew::dosage::{DosageRecord, RECORD_BUF_LEN};
use duogroup::brew::GroupId;
use duogroup::config::MachineConfig;
use duogroup::machine::Machine;
use duogroup::pins::Pin;
use duogroup::sensors::flow::FLOW_METERS;
use embedded_hal::digital::PinState;
use std::collections::HashMap;

// ── In-memory board for fuzz testing ──────────────────────────

#[derive(Default)]
struct MemBoard {
    data: HashMap<GroupId, Vec<u8>>,
}

impl GpioPort for MemBoard {
    fn set_mode(&mut self, _pin: Pin, _mode: PinMode) {}
    fn write(&mut self, _pin: Pin, _state: PinState) {}
    fn read(&mut self, _pin: Pin) -> PinState {
        PinState::High
    }
}

impl StoragePort for MemBoard {
    fn read_record(&self, group: GroupId, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.data.get(&group) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write_record(&mut self, group: GroupId, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert(group, data.to_vec());
        Ok(())
    }
}

#[derive(Default)]
struct Faults(usize);

impl EventSink for Faults {
    fn emit(&mut self, event: &MachineEvent) {
        if matches!(event, MachineEvent::StorageFault { .. }) {
            self.0 += 1;
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let mut board = MemBoard::default();
    board.data.insert(GroupId::One, data.to_vec());

    // the loader reads at most one record buffer
    let decodes = DosageRecord::decode(&data[..data.len().min(RECORD_BUF_LEN)]).is_ok();

    let [m1, m2] = &FLOW_METERS;
    let meters = [m1, m2];
    let cfg = MachineConfig::default();
    let (min_pulses, min_secs) = (cfg.min_dose_pulses, cfg.min_dose_secs);
    let mut machine = Machine::new(cfg, meters);
    let mut faults = Faults::default();
    machine.setup(0, &mut board, &mut faults);

    let rec = machine.group(GroupId::One).record();
    assert!(rec.flow_pulses.iter().all(|&p| p >= min_pulses));
    assert!(rec.duration_secs.iter().all(|&s| s >= min_secs));

    if decodes {
        assert_eq!(faults.0, 0, "decodable record reported as a fault");
    } else {
        assert_eq!(*rec, DosageRecord::default());
        assert_eq!(faults.0, 1);
    }
    assert_eq!(*machine.group(GroupId::Two).record(), DosageRecord::default());
});
