//! Test rig: a [`Machine`] wired to a [`MockBoard`] with a simulated clock.
//!
//! Every rig gets its own leaked flow meters, so tests running in
//! parallel never share pulse counters.

use duogroup::brew::GroupId;
use duogroup::config::MachineConfig;
use duogroup::drivers::lamp_test::LampTest;
use duogroup::machine::Machine;
use duogroup::pins::Pin;
use duogroup::sensors::flow::FlowMeter;

use crate::mock_hw::{MockBoard, RecordingSink};

/// Control loop period used by the rig.
pub const TICK: u32 = 10;

pub struct Rig {
    pub machine: Machine,
    pub hw: MockBoard,
    pub sink: RecordingSink,
    pub now: u32,
}

#[allow(dead_code)]
impl Rig {
    /// Power on, then run until the lamp test is over.
    pub fn new() -> Self {
        let mut rig = Self::powered_on(MockBoard::new());
        rig.run_for(LampTest::total_ms() + 200);
        assert!(!rig.machine.lamp_test_running());
        rig
    }

    /// Power on with a prepared board; the lamp test is still running.
    pub fn powered_on(hw: MockBoard) -> Self {
        Self::powered_on_with(hw, MachineConfig::default())
    }

    pub fn powered_on_with(hw: MockBoard, config: MachineConfig) -> Self {
        let meters: [&'static FlowMeter; 2] = [
            Box::leak(Box::new(FlowMeter::new())),
            Box::leak(Box::new(FlowMeter::new())),
        ];
        let mut rig = Self {
            machine: Machine::new(config, meters),
            hw,
            sink: RecordingSink::new(),
            now: 0,
        };
        rig.machine.setup(rig.now, &mut rig.hw, &mut rig.sink);
        rig
    }

    pub fn tick(&mut self) {
        self.machine.tick(self.now, &mut self.hw, &mut self.sink);
    }

    /// Advance the clock by `ms`, ticking every [`TICK`].
    pub fn run_for(&mut self, ms: u32) {
        let end = self.now + ms;
        while self.now < end {
            self.now += TICK;
            self.tick();
        }
    }

    pub fn pin(&self, group: GroupId, option: usize) -> Pin {
        self.hw.option_pin(group.index(), option)
    }

    /// Short press: 100 ms down, then 100 ms up.  The action fires on the
    /// first tick after the release.
    pub fn click(&mut self, group: GroupId, option: usize) {
        let pin = self.pin(group, option);
        self.hw.press(pin);
        self.run_for(100);
        self.hw.release(pin);
        self.run_for(100);
    }

    /// Hold a button down for `ms`, then release it.
    pub fn hold(&mut self, group: GroupId, option: usize, ms: u32) {
        let pin = self.pin(group, option);
        self.hw.press(pin);
        self.run_for(ms);
        self.hw.release(pin);
        self.run_for(100);
    }

    /// Deliver `n` flow pulses through the synchronous entry point,
    /// `spacing` ms apart, ticking in between.
    pub fn pulses(&mut self, group: GroupId, n: u32, spacing: u32) {
        for _ in 0..n {
            self.machine
                .on_flow_pulse(group, self.now, &mut self.hw, &mut self.sink);
            self.run_for(spacing);
        }
    }

    /// Deliver `n` pulses straight to the meter, as the interrupt does.
    pub fn isr_pulses(&mut self, group: GroupId, n: u32, spacing: u32) {
        let meter = self.machine.group(group).meter();
        for _ in 0..n {
            meter.record_pulse(self.now);
            self.now += spacing;
        }
    }

    /// Enter programming mode from `group`'s continuous option.
    pub fn enter_programming(&mut self, group: GroupId) {
        let hold = self.machine.config().hold_to_program_ms + 500;
        self.hold(group, duogroup::brew::CONTINUOUS_INDEX, hold);
        assert!(self.machine.is_programming());
    }

    /// Teach one timed option: start, flow for `secs`, stop.
    pub fn teach(&mut self, group: GroupId, option: usize, pulses: u32, secs: u32) {
        self.click(group, option);
        assert_eq!(self.machine.group(group).current_option(), Some(option));
        let spacing = 100;
        self.pulses(group, pulses, spacing);
        let spent = pulses * spacing;
        // click() adds 200 ms between the start and stop releases
        let rest = (secs * 1000).saturating_sub(spent + 200);
        self.run_for(rest + 300);
        self.click(group, option);
        assert!(!self.machine.group(group).is_brewing());
    }
}
