//! Programming mode: teaching doses, the LED feedback, donor copies and
//! leaving the session.

use duogroup::app::events::{MachineEvent, StopReason};
use duogroup::brew::dosage::{self, Dose, DosageRecord};
use duogroup::brew::option::LedStatus;
use duogroup::brew::{GroupId, CONTINUOUS_INDEX, TIMED_OPTIONS};

use crate::mock_hw::MockBoard;
use crate::rig::Rig;

fn learned(rig: &Rig) -> Vec<(GroupId, usize, Dose)> {
    rig.sink
        .events
        .iter()
        .filter_map(|e| match e {
            MachineEvent::DoseLearned { group, option, dose } => Some((*group, *option, *dose)),
            _ => None,
        })
        .collect()
}

// ── Entering ──────────────────────────────────────────────────

#[test]
fn long_hold_enters_programming_for_every_group() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);

    assert_eq!(
        rig.sink
            .count(|e| *e == MachineEvent::ProgrammingEntered { by: GroupId::One }),
        1
    );
    for g in GroupId::ALL {
        let group = rig.machine.group(g);
        assert!(group.is_programming());
        assert!(!group.is_brewing(), "the release ending the hold is swallowed");
        assert_eq!(group.programmed_count(), 0);
        assert!(rig.hw.led_lit(rig.pin(g, CONTINUOUS_INDEX)));
    }
    assert!(!rig.hw.pump_on());
}

#[test]
fn short_hold_on_continuous_brews_instead() {
    let mut rig = Rig::new();
    rig.hold(GroupId::One, CONTINUOUS_INDEX, 1_000);

    assert!(!rig.machine.is_programming());
    assert_eq!(
        rig.machine.group(GroupId::One).current_option(),
        Some(CONTINUOUS_INDEX)
    );
}

#[test]
fn untaught_options_blink() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::Two);
    let led = |rig: &Rig| rig.machine.group(GroupId::Two).option(1).unwrap().led();

    let first = led(&rig);
    rig.run_for(800);
    let second = led(&rig);
    rig.run_for(800);
    let third = led(&rig);

    assert_ne!(first, second);
    assert_eq!(first, third);
}

// ── Teaching ──────────────────────────────────────────────────

#[test]
fn brew_in_programming_teaches_and_persists_dose() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);
    rig.teach(GroupId::One, 0, 80, 45);

    let expected = Dose { pulses: 80, duration_ms: 45_000 };
    assert_eq!(learned(&rig), vec![(GroupId::One, 0, expected)]);
    assert!(matches!(
        rig.sink.last_stop(),
        Some(MachineEvent::BrewStopped { reason: StopReason::Operator, pulses: 80, .. })
    ));

    let group = rig.machine.group(GroupId::One);
    assert_eq!(group.option(0).unwrap().dose(), Some(expected));
    assert!(group.option(0).unwrap().is_programmed());
    assert_eq!(group.programmed_count(), 1);

    let stored = dosage::load(&rig.hw, GroupId::One).unwrap();
    assert_eq!(stored.dose(0), Some(expected));
    assert_eq!(stored.dose(1), DosageRecord::default().dose(1));
}

#[test]
fn taught_option_stays_lit_while_others_blink() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);
    rig.teach(GroupId::One, 2, 40, 10);

    for _ in 0..3 {
        rig.run_for(800);
        assert!(rig.hw.led_lit(rig.pin(GroupId::One, 2)));
        assert!(rig.hw.led_lit(rig.pin(GroupId::One, CONTINUOUS_INDEX)));
    }
    let g = rig.machine.group(GroupId::One);
    assert_eq!(g.option(2).unwrap().led(), LedStatus::On);
}

#[test]
fn flow_target_does_not_stop_a_teaching_brew() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);
    rig.click(GroupId::One, 0);

    // default target for option 1 is 30 pulses
    rig.pulses(GroupId::One, 40, 50);
    rig.run_for(40_000);
    assert!(rig.machine.group(GroupId::One).is_brewing());
}

#[test]
fn tiny_dose_is_raised_to_minimums() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);
    rig.teach(GroupId::One, 1, 2, 2);

    assert_eq!(
        learned(&rig),
        vec![(GroupId::One, 1, Dose { pulses: 10, duration_ms: 5_000 })]
    );
}

#[test]
fn learned_dose_survives_reboot_and_drives_next_brew() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);
    rig.teach(GroupId::One, 0, 80, 45);
    rig.click(GroupId::One, CONTINUOUS_INDEX);
    rig.click(GroupId::Two, CONTINUOUS_INDEX);
    assert!(!rig.machine.is_programming());

    let mut hw = MockBoard::new();
    hw.store = rig.hw.store.clone();
    let mut rebooted = Rig::powered_on(hw);
    rebooted.run_for(2_500);

    let dose = rebooted.machine.group(GroupId::One).option(0).unwrap().dose();
    assert_eq!(dose, Some(Dose { pulses: 80, duration_ms: 45_000 }));

    rebooted.click(GroupId::One, 0);
    rebooted.pulses(GroupId::One, 79, 50);
    assert!(rebooted.machine.group(GroupId::One).is_brewing());
    rebooted.pulses(GroupId::One, 1, 50);
    assert!(matches!(
        rebooted.sink.last_stop(),
        Some(MachineEvent::BrewStopped { reason: StopReason::FlowTarget, pulses: 80, .. })
    ));
}

#[test]
fn save_failure_keeps_dose_in_ram() {
    let mut rig = Rig::new();
    rig.hw.fail_writes = true;
    rig.enter_programming(GroupId::Two);
    rig.teach(GroupId::Two, 3, 90, 20);

    assert_eq!(
        rig.sink
            .count(|e| *e == MachineEvent::StorageFault { group: GroupId::Two }),
        1
    );
    assert_eq!(
        rig.machine.group(GroupId::Two).option(3).unwrap().dose(),
        Some(Dose { pulses: 90, duration_ms: 20_000 })
    );
    assert!(!rig.hw.has_record(GroupId::Two));
}

// ── Leaving ───────────────────────────────────────────────────

#[test]
fn session_ends_when_every_group_leaves() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);

    rig.click(GroupId::One, CONTINUOUS_INDEX);
    assert!(!rig.machine.group(GroupId::One).is_programming());
    assert!(rig.machine.group(GroupId::Two).is_programming());
    assert!(rig.machine.is_programming());
    assert!(!rig.machine.group(GroupId::One).is_brewing());

    rig.click(GroupId::Two, CONTINUOUS_INDEX);
    assert!(!rig.machine.is_programming());
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, MachineEvent::ProgrammingExited { .. })),
        2
    );
    for g in GroupId::ALL {
        for o in 0..=CONTINUOUS_INDEX {
            assert!(!rig.hw.led_lit(rig.pin(g, o)));
        }
    }
}

#[test]
fn leaving_mid_brew_drops_the_dose() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);
    rig.click(GroupId::One, 0);
    rig.pulses(GroupId::One, 20, 100);
    rig.run_for(5_000);

    rig.click(GroupId::One, CONTINUOUS_INDEX);
    assert!(!rig.machine.group(GroupId::One).is_brewing());
    assert!(!rig.machine.group(GroupId::One).is_programming());
    assert!(!rig.hw.pump_on());
    assert!(matches!(
        rig.sink.last_stop(),
        Some(MachineEvent::BrewStopped { reason: StopReason::ProgrammingAborted, .. })
    ));
    assert!(learned(&rig).is_empty());
    assert_eq!(rig.machine.group(GroupId::One).record(), &DosageRecord::default());
}

// ── Donor copy ────────────────────────────────────────────────

#[test]
fn fully_programmed_group_donates_its_doses() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);

    for (option, (pulses, secs)) in [(20, 6), (30, 7), (40, 8), (50, 9)].into_iter().enumerate() {
        assert_eq!(rig.machine.donor(), None);
        rig.teach(GroupId::One, option, pulses, secs);
    }
    assert!(rig.machine.group(GroupId::One).is_fully_programmed());
    assert_eq!(rig.machine.donor(), Some(GroupId::One));

    let taught = *rig.machine.group(GroupId::One).record();
    assert_eq!(taught.flow_pulses, [20, 30, 40, 50]);
    assert_eq!(taught.duration_secs, [6, 7, 8, 9]);

    rig.click(GroupId::Two, CONTINUOUS_INDEX);
    assert_eq!(
        rig.sink.count(|e| *e
            == MachineEvent::DosesCopied { from: GroupId::One, to: GroupId::Two }),
        1
    );
    let g2 = rig.machine.group(GroupId::Two);
    assert_eq!(g2.record(), &taught);
    assert!(g2.is_fully_programmed());
    assert!(g2.is_programming(), "copying does not leave programming");
    assert_eq!(dosage::load(&rig.hw, GroupId::Two).unwrap(), taught);
    for o in 0..TIMED_OPTIONS {
        assert!(rig.hw.led_lit(rig.pin(GroupId::Two, o)));
    }

    // a second continuous press leaves, as does the donor's own
    rig.run_for(500);
    rig.click(GroupId::Two, CONTINUOUS_INDEX);
    assert!(!rig.machine.group(GroupId::Two).is_programming());
    rig.click(GroupId::One, CONTINUOUS_INDEX);
    assert!(!rig.machine.is_programming());
    assert_eq!(rig.machine.donor(), None);
}

#[test]
fn new_session_clears_previous_donor() {
    let mut rig = Rig::new();
    rig.enter_programming(GroupId::One);
    for option in 0..TIMED_OPTIONS {
        rig.teach(GroupId::One, option, 20, 6);
    }
    assert_eq!(rig.machine.donor(), Some(GroupId::One));
    rig.click(GroupId::One, CONTINUOUS_INDEX);
    rig.click(GroupId::Two, CONTINUOUS_INDEX);
    rig.run_for(500);
    rig.click(GroupId::Two, CONTINUOUS_INDEX);
    assert!(!rig.machine.is_programming());
    let copies = |rig: &Rig| {
        rig.sink
            .count(|e| matches!(e, MachineEvent::DosesCopied { .. }))
    };
    assert_eq!(copies(&rig), 1);

    rig.enter_programming(GroupId::Two);
    assert_eq!(rig.machine.donor(), None);
    assert_eq!(rig.machine.group(GroupId::One).programmed_count(), 0);

    // no donor yet: group 1's continuous press just leaves
    rig.click(GroupId::One, CONTINUOUS_INDEX);
    assert_eq!(copies(&rig), 1);
    assert!(!rig.machine.group(GroupId::One).is_programming());
}
