//! Power-on behaviour: safe output levels, the lamp test and loading the
//! persisted dose tables.

use duogroup::app::events::MachineEvent;
use duogroup::app::ports::PinMode;
use duogroup::brew::dosage::{self, Dose, DosageRecord};
use duogroup::brew::{GroupId, CONTINUOUS_INDEX};
use duogroup::config::MachineConfig;
use embedded_hal::digital::PinState;

use crate::mock_hw::MockBoard;
use crate::rig::Rig;

// ── Safe state ────────────────────────────────────────────────

#[test]
fn setup_leaves_every_output_released() {
    let rig = Rig::powered_on(MockBoard::new());
    let w = rig.hw.wiring;

    for relay in [w.pump, w.boiler_solenoid, w.groups[0].solenoid, w.groups[1].solenoid] {
        assert_eq!(rig.hw.modes.get(&relay.pin), Some(&PinMode::Output));
        // active-low relay board: released = HIGH
        assert_eq!(rig.hw.driven.get(&relay.pin), Some(&PinState::High));
    }
    for g in &w.groups {
        for pin in g.options {
            assert_eq!(rig.hw.modes.get(&pin), Some(&PinMode::InputPullUp));
        }
    }
    assert_eq!(rig.sink.events.last(), Some(&MachineEvent::Started));
}

// ── Lamp test ─────────────────────────────────────────────────

#[test]
fn lamp_test_walks_groups_then_goes_dark() {
    let mut rig = Rig::powered_on(MockBoard::new());
    let lit = |rig: &Rig, g: GroupId, o: usize| rig.hw.led_lit(rig.pin(g, o));

    rig.run_for(500);
    for o in 0..CONTINUOUS_INDEX {
        assert!(lit(&rig, GroupId::One, o));
        assert!(!lit(&rig, GroupId::Two, o));
    }
    assert!(lit(&rig, GroupId::One, CONTINUOUS_INDEX));
    assert!(lit(&rig, GroupId::Two, CONTINUOUS_INDEX));

    rig.run_for(1_000);
    for o in 0..CONTINUOUS_INDEX {
        assert!(!lit(&rig, GroupId::One, o));
        assert!(lit(&rig, GroupId::Two, o));
    }

    rig.run_for(600);
    for g in GroupId::ALL {
        for o in 0..CONTINUOUS_INDEX {
            assert!(!lit(&rig, g, o));
        }
        assert!(lit(&rig, g, CONTINUOUS_INDEX));
    }

    rig.run_for(400);
    assert!(!rig.machine.lamp_test_running());
    for g in GroupId::ALL {
        for o in 0..=CONTINUOUS_INDEX {
            assert!(!lit(&rig, g, o));
        }
    }
}

#[test]
fn presses_during_lamp_test_are_dropped() {
    let mut rig = Rig::powered_on(MockBoard::new());
    rig.click(GroupId::One, 0);
    assert!(!rig.machine.is_brewing());

    rig.run_for(3_000);
    assert!(!rig.machine.is_brewing());
    assert!(!rig.hw.pump_on());
}

#[test]
fn boiler_waits_for_lamp_test() {
    let mut hw = MockBoard::new();
    hw.water_low = true;
    let mut rig = Rig::powered_on(hw);

    rig.run_for(1_000);
    assert!(!rig.hw.boiler_solenoid_open());
    assert!(!rig.hw.pump_on());

    rig.run_for(1_500);
    assert!(rig.hw.boiler_solenoid_open());
    assert!(rig.hw.pump_on());
}

// ── Dose records ──────────────────────────────────────────────

#[test]
fn defaults_used_without_stored_record() {
    let rig = Rig::new();
    for g in GroupId::ALL {
        assert_eq!(rig.machine.group(g).record(), &DosageRecord::default());
    }
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, MachineEvent::StorageFault { .. })),
        0
    );
}

#[test]
fn stored_record_is_loaded() {
    let stored = DosageRecord {
        flow_pulses: [40, 70, 90, 150],
        duration_secs: [25, 35, 40, 50],
    };
    let mut hw = MockBoard::new();
    dosage::save(&mut hw, GroupId::Two, &stored).unwrap();

    let rig = Rig::powered_on(hw);
    let g2 = rig.machine.group(GroupId::Two);
    assert_eq!(g2.record(), &stored);
    assert_eq!(
        g2.option(3).unwrap().dose(),
        Some(Dose { pulses: 150, duration_ms: 50_000 })
    );
    assert_eq!(rig.machine.group(GroupId::One).record(), &DosageRecord::default());
}

#[test]
fn stored_record_below_minimums_is_raised() {
    let mut hw = MockBoard::new();
    let tiny = DosageRecord {
        flow_pulses: [1, 2, 3, 500],
        duration_secs: [0, 1, 2, 60],
    };
    dosage::save(&mut hw, GroupId::One, &tiny).unwrap();

    let rig = Rig::powered_on(hw);
    let rec = rig.machine.group(GroupId::One).record();
    assert_eq!(rec.flow_pulses, [10, 10, 10, 500]);
    assert_eq!(rec.duration_secs, [5, 5, 5, 60]);
}

#[test]
fn defaults_are_raised_to_configured_minimums() {
    let config = MachineConfig {
        min_dose_pulses: 50,
        min_dose_secs: 35,
        ..MachineConfig::default()
    };
    let mut hw = MockBoard::new();
    hw.store.insert(GroupId::Two, vec![0xEE]);

    let rig = Rig::powered_on_with(hw, config);
    for g in GroupId::ALL {
        let rec = rig.machine.group(g).record();
        assert_eq!(rec.flow_pulses, [50, 60, 60, 120], "group {}", g);
        assert_eq!(rec.duration_secs, [35; 4], "group {}", g);
    }
    assert_eq!(
        rig.machine.group(GroupId::One).option(0).unwrap().dose(),
        Some(Dose { pulses: 50, duration_ms: 35_000 })
    );
}

#[test]
fn corrupt_record_falls_back_to_defaults() {
    let mut hw = MockBoard::new();
    hw.store.insert(GroupId::One, vec![0xEE, 0x01, 0x02]);

    let rig = Rig::powered_on(hw);
    assert_eq!(rig.machine.group(GroupId::One).record(), &DosageRecord::default());
    assert_eq!(
        rig.sink
            .count(|e| *e == MachineEvent::StorageFault { group: GroupId::One }),
        1
    );
}
