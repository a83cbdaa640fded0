//! The machine: two brew groups sharing one pump and one boiler.
//!
//! A single [`Machine`] value is built in `main()` and driven by the
//! control loop.  Nothing is global except the flow meters, which the
//! pulse interrupts need to reach.
//!
//! ## Tick
//!
//! ```text
//!   lamp test running? ─▶ show frame, poll buttons (actions ignored)
//!   group 1 tick ─▶ group 2 tick ─▶ programming requests / donor
//!   no group brewing and lamp test over ─▶ boiler regulation
//! ```
//!
//! ## Programming session
//!
//! A long press on a continuous option, while idle and no session is
//! active, puts *every* group in programming mode and clears the donor.
//! The first group to teach all its timed options becomes the donor; any
//! other group can then copy its table with a continuous press.  The
//! session ends once no group is programming.

pub mod plant;

use log::info;

use crate::app::events::MachineEvent;
use crate::app::ports::{EventSink, GpioPort, StoragePort};
use crate::brew::group::{BrewGroup, GroupEnv, GroupTick};
use crate::brew::{GroupId, GROUP_COUNT};
use crate::config::MachineConfig;
use crate::drivers::lamp_test::{LampFrame, LampTest};
use crate::sensors::flow::{FlowMeter, PulseOutcome};

use plant::Plant;

pub struct Machine {
    config: MachineConfig,
    groups: [BrewGroup; GROUP_COUNT],
    plant: Plant,
    programming: bool,
    donor: Option<GroupId>,
    lamp_test: Option<LampTest>,
    lamp_frame: Option<LampFrame>,
}

impl Machine {
    /// `meters[i]` is the flow meter of group `i + 1`.
    pub fn new(config: MachineConfig, meters: [&'static FlowMeter; GROUP_COUNT]) -> Self {
        let groups = core::array::from_fn(|i| {
            let id = GroupId::ALL[i];
            BrewGroup::new(id, &config.wiring.groups[i], meters[i], &config)
        });
        Self {
            plant: Plant::new(&config.wiring),
            groups,
            config,
            programming: false,
            donor: None,
            lamp_test: None,
            lamp_frame: None,
        }
    }

    /// Safe power-on state, dose records, then the lamp test.
    pub fn setup(
        &mut self,
        now_ms: u32,
        hw: &mut (impl GpioPort + StoragePort),
        sink: &mut impl EventSink,
    ) {
        self.plant.setup(hw);
        for g in &mut self.groups {
            g.setup(hw, &self.config);
        }
        for g in &mut self.groups {
            g.load_doses(hw, sink, &self.config);
        }
        self.programming = false;
        self.donor = None;
        self.lamp_test = Some(LampTest::start(now_ms));
        self.lamp_frame = None;

        info!("machine: ready ({} groups)", GROUP_COUNT);
        sink.emit(&MachineEvent::Started);
    }

    /// One pass of the control loop.
    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl GpioPort + StoragePort),
        sink: &mut impl EventSink,
    ) {
        let accept_actions = self.run_lamp_test(now_ms, hw);

        for i in 0..GROUP_COUNT {
            let donor = self
                .donor
                .map(|d| (d, *self.groups[d.index()].record()));
            let mut env = GroupEnv {
                cfg: &self.config,
                plant: &mut self.plant,
                donor,
                session_active: self.programming,
                accept_actions,
            };
            let outcome = self.groups[i].tick(now_ms, hw, &mut env, sink);
            self.apply(now_ms, GroupId::ALL[i], outcome, hw, sink);
        }

        if self.lamp_test.is_none() && !self.plant.any_brewing() {
            self.plant
                .regulate_boiler(now_ms, self.config.boiler_fill_hysteresis_ms, hw, sink);
        }
    }

    /// Synchronous flow-pulse entry, for platforms that serialise the
    /// pulse interrupt with the control loop.
    pub fn on_flow_pulse(
        &mut self,
        group: GroupId,
        now_ms: u32,
        hw: &mut (impl GpioPort + StoragePort),
        sink: &mut impl EventSink,
    ) {
        let g = &mut self.groups[group.index()];
        if g.meter().record_pulse(now_ms) == PulseOutcome::TargetReached {
            g.on_flow_target(now_ms, hw, &mut self.plant, sink, &self.config);
        }
    }

    fn apply(
        &mut self,
        now_ms: u32,
        id: GroupId,
        outcome: GroupTick,
        hw: &mut (impl GpioPort + StoragePort),
        sink: &mut impl EventSink,
    ) {
        if outcome.program_requested {
            self.enter_programming(now_ms, id, hw, sink);
        }
        if outcome.fully_programmed && self.donor.is_none() {
            info!("machine: group {} is the dose donor", id);
            self.donor = Some(id);
        }
        if outcome.left_programming && !self.groups.iter().any(BrewGroup::is_programming) {
            info!("machine: programming session over");
            self.programming = false;
            self.donor = None;
        }
    }

    fn enter_programming(
        &mut self,
        now_ms: u32,
        by: GroupId,
        hw: &mut impl GpioPort,
        sink: &mut impl EventSink,
    ) {
        if self.programming || self.plant.any_brewing() {
            return;
        }
        self.programming = true;
        self.donor = None;
        for g in &mut self.groups {
            g.enter_programming(now_ms, hw, &self.config);
        }
        info!("machine: programming session started by group {}", by);
        sink.emit(&MachineEvent::ProgrammingEntered { by });
    }

    /// Show the lamp-test frame.  Returns whether button actions count.
    fn run_lamp_test(&mut self, now_ms: u32, io: &mut impl GpioPort) -> bool {
        let Some(test) = self.lamp_test else {
            return true;
        };
        let frame = test.frame(now_ms);
        if frame != self.lamp_frame {
            let shown = frame.unwrap_or(LampFrame::DARK);
            for (i, g) in self.groups.iter_mut().enumerate() {
                g.show_lamps(io, &self.config, shown.timed[i], shown.continuous);
            }
            self.lamp_frame = frame;
        }
        if frame.is_none() {
            self.lamp_test = None;
            info!("machine: lamp test done");
        }
        false
    }

    // -- queries ----------------------------------------------------------

    pub fn config(&self) -> &MachineConfig {
        &self.config
    }

    pub fn group(&self, id: GroupId) -> &BrewGroup {
        &self.groups[id.index()]
    }

    pub fn plant(&self) -> &Plant {
        &self.plant
    }

    pub fn is_programming(&self) -> bool {
        self.programming
    }

    pub fn is_brewing(&self) -> bool {
        self.groups.iter().any(BrewGroup::is_brewing)
    }

    pub fn is_pump_on(&self) -> bool {
        self.plant.is_pump_on()
    }

    pub fn donor(&self) -> Option<GroupId> {
        self.donor
    }

    pub fn lamp_test_running(&self) -> bool {
        self.lamp_test.is_some()
    }
}
