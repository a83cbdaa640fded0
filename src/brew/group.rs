//! Per-group brewing state machine.
//!
//! ## States
//!
//! ```text
//!             press option i                    press i again / dose done
//!   Idle ─────────────────────────▶ Brewing(i) ───────────────────────────▶ Idle
//!
//!   Programming is an orthogonal flag: Idle+Programming blinks the LEDs of
//!   options not yet taught; Brewing(i)+Programming teaches option i.
//! ```
//!
//! ## Tick order
//!
//! 1. A flow target latched by the pulse interrupt stops the brew.
//! 2. Every option is polled (index order, continuous last).  Only the
//!    first relevant action is handled; while brewing, only the brewing
//!    option and the continuous option are relevant.
//! 3. A timed brew outside programming mode is checked for completion.
//! 4. Idle in programming mode: blink the untaught options.
//!
//! Every stop goes through [`BrewGroup::stop_brewing`], which takes the
//! current option out of `current` first.  A second stop request for the
//! same brew (tick and interrupt racing) finds `None` and does nothing.

use log::{info, warn};

use super::dosage::{self, DosageRecord};
use super::option::{BrewOption, ButtonAction, LedStatus};
use super::{GroupId, CONTINUOUS_INDEX, OPTIONS_PER_GROUP, TIMED_OPTIONS};
use crate::app::events::{MachineEvent, StopReason};
use crate::app::ports::{EventSink, GpioPort, StoragePort};
use crate::app::ports::StorageError;
use crate::config::{GroupWiring, MachineConfig};
use crate::drivers::relay::Relay;
use crate::error::Error;
use crate::machine::plant::Plant;
use crate::sensors::flow::FlowMeter;

/// Which timed options a status-LED update applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedFilter {
    All,
    OnlyProgrammed,
    OnlyNotProgrammed,
}

/// Machine-level state a group needs during one tick.
pub struct GroupEnv<'a> {
    pub cfg: &'a MachineConfig,
    pub plant: &'a mut Plant,
    /// First group to finish a programming cycle, with its doses.
    pub donor: Option<(GroupId, DosageRecord)>,
    pub session_active: bool,
    /// False while the startup lamp test runs.
    pub accept_actions: bool,
}

/// What a tick asks of the machine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct GroupTick {
    /// Long press on the continuous option: start a programming session.
    pub program_requested: bool,
    /// This group taught its last untaught option during this tick.
    pub fully_programmed: bool,
    /// This group left the programming session.
    pub left_programming: bool,
}

pub struct BrewGroup {
    id: GroupId,
    solenoid: Relay,
    options: [BrewOption; OPTIONS_PER_GROUP],
    meter: &'static FlowMeter,
    record: DosageRecord,
    current: Option<usize>,
    brewing_started_ms: u32,
    programming: bool,
    programmed_count: usize,
    blink_on: bool,
    last_blink_ms: u32,
}

impl BrewGroup {
    pub fn new(
        id: GroupId,
        wiring: &GroupWiring,
        meter: &'static FlowMeter,
        cfg: &MachineConfig,
    ) -> Self {
        let record = DosageRecord::default().clamped(cfg.min_dose_pulses, cfg.min_dose_secs);
        Self {
            id,
            solenoid: Relay::new(
                match id {
                    GroupId::One => "group1",
                    GroupId::Two => "group2",
                },
                wiring.solenoid,
            ),
            options: BrewOption::for_group(&wiring.options, &record, cfg.button_debounce_ms),
            meter,
            record,
            current: None,
            brewing_started_ms: 0,
            programming: false,
            programmed_count: 0,
            blink_on: false,
            last_blink_ms: 0,
        }
    }

    /// Close the solenoid and put every option pin in input mode.
    pub fn setup(&mut self, io: &mut impl GpioPort, cfg: &MachineConfig) {
        self.solenoid.setup(io);
        for opt in &mut self.options {
            opt.setup(io);
        }
        self.meter.disarm();
        self.meter.set_debounce_ms(cfg.flow_debounce_ms);
    }

    /// Load the persisted dose table, falling back to defaults.  Either
    /// way the table is raised to the configured minimums.
    pub fn load_doses(
        &mut self,
        storage: &impl StoragePort,
        sink: &mut impl EventSink,
        cfg: &MachineConfig,
    ) {
        let record = match dosage::load(storage, self.id) {
            Ok(r) => r,
            Err(Error::Storage(StorageError::NotFound)) => {
                info!("group {}: no stored doses, using defaults", self.id);
                DosageRecord::default()
            }
            Err(e) => {
                warn!("group {}: dose record unreadable ({}), using defaults", self.id, e);
                sink.emit(&MachineEvent::StorageFault { group: self.id });
                DosageRecord::default()
            }
        };
        self.record = record.clamped(cfg.min_dose_pulses, cfg.min_dose_secs);
        for opt in &mut self.options {
            opt.apply_record(&self.record);
        }
    }

    pub fn tick(
        &mut self,
        now_ms: u32,
        hw: &mut (impl GpioPort + StoragePort),
        env: &mut GroupEnv<'_>,
        sink: &mut impl EventSink,
    ) -> GroupTick {
        let mut out = GroupTick::default();
        let cfg = env.cfg;

        if self.meter.take_target_reached() && self.auto_stop_allowed() {
            self.stop_brewing(now_ms, hw, env.plant, sink, cfg, StopReason::FlowTarget);
        }

        let mut action = None;
        for (i, opt) in self.options.iter_mut().enumerate() {
            let a = opt.poll(now_ms, hw, cfg);
            if a == ButtonAction::NotPressed || action.is_some() {
                continue;
            }
            let relevant = match self.current {
                None => true,
                Some(brewing) => i == brewing || i == CONTINUOUS_INDEX,
            };
            if relevant {
                action = Some((i, a));
            }
        }

        if env.accept_actions {
            if let Some((i, a)) = action {
                self.handle_action(now_ms, i, a, hw, env, sink, &mut out);
            }
        }

        if let Some(i) = self.current {
            if !self.programming {
                let elapsed = now_ms.wrapping_sub(self.brewing_started_ms);
                let pulses = self.meter.pulse_count();
                if let Some(reason) = self.options[i].can_finish_brewing(elapsed, pulses, cfg) {
                    self.stop_brewing(now_ms, hw, env.plant, sink, cfg, reason);
                }
            }
        }

        if self.programming && self.current.is_none() {
            self.blink(now_ms, hw, cfg);
        }

        out
    }

    #[allow(clippy::too_many_arguments)]
    fn handle_action(
        &mut self,
        now_ms: u32,
        index: usize,
        action: ButtonAction,
        hw: &mut (impl GpioPort + StoragePort),
        env: &mut GroupEnv<'_>,
        sink: &mut impl EventSink,
        out: &mut GroupTick,
    ) {
        let cfg = env.cfg;
        match action {
            ButtonAction::NotPressed => {}
            ButtonAction::PressedForProgram => {
                if !env.session_active && !env.plant.any_brewing() {
                    out.program_requested = true;
                } else {
                    info!("group {}: programming request ignored", self.id);
                }
            }
            ButtonAction::PressedForBrewing | ButtonAction::PressedForContinuousBrewing => {
                if index == CONTINUOUS_INDEX && self.programming {
                    let donor = env.donor.filter(|(d, _)| *d != self.id);
                    match donor {
                        Some((from, record))
                            if self.current.is_none() && !self.is_fully_programmed() =>
                        {
                            self.copy_doses(from, &record, hw, sink, cfg);
                        }
                        _ => {
                            self.exit_programming(now_ms, hw, env.plant, sink, cfg);
                            out.left_programming = true;
                        }
                    }
                } else if self.current == Some(index) {
                    let became_full =
                        self.stop_brewing(now_ms, hw, env.plant, sink, cfg, StopReason::Operator);
                    out.fully_programmed |= became_full;
                } else if self.current.is_none() {
                    self.start_brewing(now_ms, index, hw, env.plant, sink, cfg);
                }
            }
        }
    }

    /// Start brewing option `index`.  No-op if the group is already brewing.
    pub fn start_brewing(
        &mut self,
        now_ms: u32,
        index: usize,
        io: &mut impl GpioPort,
        plant: &mut Plant,
        sink: &mut impl EventSink,
        cfg: &MachineConfig,
    ) {
        if self.current.is_some() || index >= OPTIONS_PER_GROUP {
            return;
        }
        self.current = Some(index);
        self.brewing_started_ms = now_ms;

        for (i, opt) in self.options.iter_mut().enumerate() {
            let status = if i == index { LedStatus::On } else { LedStatus::Off };
            opt.set_led(io, cfg, status);
        }

        self.meter.arm(self.options[index].flow_target(self.programming));
        plant.close_boiler_solenoid(now_ms, io, sink);
        self.solenoid.energise(io);
        plant.acquire_pump(io, self.id);

        info!("group {}: brewing option {}", self.id, index + 1);
        sink.emit(&MachineEvent::BrewStarted { group: self.id, option: index });
    }

    /// Stop the current brew.  Returns true when this stop taught the
    /// group's last untaught option.
    pub fn stop_brewing(
        &mut self,
        now_ms: u32,
        hw: &mut (impl GpioPort + StoragePort),
        plant: &mut Plant,
        sink: &mut impl EventSink,
        cfg: &MachineConfig,
        reason: StopReason,
    ) -> bool {
        let Some(index) = self.current.take() else {
            return false;
        };
        let elapsed_ms = now_ms.wrapping_sub(self.brewing_started_ms);

        plant.release_pump(hw, self.id);
        self.solenoid.release(hw);
        let pulses = self.meter.disarm();

        info!(
            "group {}: option {} stopped ({:?}) after {} ms, {} pulses",
            self.id,
            index + 1,
            reason,
            elapsed_ms,
            pulses
        );
        sink.emit(&MachineEvent::BrewStopped {
            group: self.id,
            option: index,
            reason,
            elapsed_ms,
            pulses,
        });

        if !self.programming {
            self.set_status_leds(hw, cfg, LedStatus::Off, LedFilter::All);
            self.options[CONTINUOUS_INDEX].set_led(hw, cfg, LedStatus::Off);
            return false;
        }
        if reason == StopReason::ProgrammingAborted {
            return false;
        }

        let was_full = self.is_fully_programmed();
        let learned =
            self.options[index].on_end_brewing(elapsed_ms, pulses, true, &mut self.record, cfg);
        if let Some(dose) = learned {
            info!(
                "group {}: option {} learned {} pulses / {} ms",
                self.id,
                index + 1,
                dose.pulses,
                dose.duration_ms
            );
            sink.emit(&MachineEvent::DoseLearned { group: self.id, option: index, dose });
            self.persist(hw, sink);
        }
        self.recount();
        self.set_status_leds(hw, cfg, LedStatus::On, LedFilter::OnlyProgrammed);
        self.options[CONTINUOUS_INDEX].set_led(hw, cfg, LedStatus::On);

        !was_full && self.is_fully_programmed()
    }

    /// Handle a flow-target latch outside the tick (synchronous pulse path).
    pub fn on_flow_target(
        &mut self,
        now_ms: u32,
        hw: &mut (impl GpioPort + StoragePort),
        plant: &mut Plant,
        sink: &mut impl EventSink,
        cfg: &MachineConfig,
    ) {
        if self.meter.take_target_reached() && self.auto_stop_allowed() {
            self.stop_brewing(now_ms, hw, plant, sink, cfg, StopReason::FlowTarget);
        }
    }

    fn auto_stop_allowed(&self) -> bool {
        !self.programming
            && self
                .current
                .is_some_and(|i| !self.options[i].is_continuous())
    }

    // -- programming ------------------------------------------------------

    pub fn enter_programming(&mut self, now_ms: u32, io: &mut impl GpioPort, cfg: &MachineConfig) {
        self.programming = true;
        for opt in &mut self.options {
            opt.set_programmed(false);
        }
        self.programmed_count = 0;
        self.blink_on = true;
        self.last_blink_ms = now_ms;
        self.set_status_leds(io, cfg, LedStatus::On, LedFilter::All);
        self.options[CONTINUOUS_INDEX].set_led(io, cfg, LedStatus::On);
        info!("group {}: programming mode", self.id);
    }

    /// Leave programming mode.  A dose being taught is dropped.
    pub fn exit_programming(
        &mut self,
        now_ms: u32,
        hw: &mut (impl GpioPort + StoragePort),
        plant: &mut Plant,
        sink: &mut impl EventSink,
        cfg: &MachineConfig,
    ) {
        if !self.programming {
            return;
        }
        self.stop_brewing(now_ms, hw, plant, sink, cfg, StopReason::ProgrammingAborted);
        self.programming = false;
        self.set_status_leds(hw, cfg, LedStatus::Off, LedFilter::All);
        self.options[CONTINUOUS_INDEX].set_led(hw, cfg, LedStatus::Off);
        info!("group {}: left programming mode", self.id);
        sink.emit(&MachineEvent::ProgrammingExited { group: self.id });
    }

    fn copy_doses(
        &mut self,
        from: GroupId,
        record: &DosageRecord,
        hw: &mut (impl GpioPort + StoragePort),
        sink: &mut impl EventSink,
        cfg: &MachineConfig,
    ) {
        self.record = record.clamped(cfg.min_dose_pulses, cfg.min_dose_secs);
        for opt in self.options.iter_mut().take(TIMED_OPTIONS) {
            opt.apply_record(&self.record);
            opt.set_programmed(true);
        }
        self.recount();
        self.persist(hw, sink);
        self.set_status_leds(hw, cfg, LedStatus::On, LedFilter::All);
        info!("group {}: doses copied from group {}", self.id, from);
        sink.emit(&MachineEvent::DosesCopied { from, to: self.id });
    }

    fn persist(&mut self, storage: &mut impl StoragePort, sink: &mut impl EventSink) {
        if let Err(e) = dosage::save(storage, self.id, &self.record) {
            warn!("group {}: saving doses failed: {}", self.id, e);
            sink.emit(&MachineEvent::StorageFault { group: self.id });
        }
    }

    fn recount(&mut self) {
        self.programmed_count = self
            .options
            .iter()
            .filter(|o| !o.is_continuous() && o.is_programmed())
            .count();
    }

    fn blink(&mut self, now_ms: u32, io: &mut impl GpioPort, cfg: &MachineConfig) {
        if now_ms.wrapping_sub(self.last_blink_ms) < cfg.blink_interval_ms {
            return;
        }
        self.last_blink_ms = now_ms;
        self.blink_on = !self.blink_on;
        let status = if self.blink_on { LedStatus::On } else { LedStatus::Off };
        self.set_status_leds(io, cfg, status, LedFilter::OnlyNotProgrammed);
    }

    // -- LEDs -------------------------------------------------------------

    /// Set the LED of every timed option matching `filter`.
    pub fn set_status_leds(
        &mut self,
        io: &mut impl GpioPort,
        cfg: &MachineConfig,
        status: LedStatus,
        filter: LedFilter,
    ) {
        for opt in self.options.iter_mut().filter(|o| !o.is_continuous()) {
            let selected = match filter {
                LedFilter::All => true,
                LedFilter::OnlyProgrammed => opt.is_programmed(),
                LedFilter::OnlyNotProgrammed => !opt.is_programmed(),
            };
            if selected {
                opt.set_led(io, cfg, status);
            }
        }
    }

    /// Lamp-test frame: timed LEDs and continuous LED independently.
    pub fn show_lamps(&mut self, io: &mut impl GpioPort, cfg: &MachineConfig, timed: bool, continuous: bool) {
        let on = |b: bool| if b { LedStatus::On } else { LedStatus::Off };
        self.set_status_leds(io, cfg, on(timed), LedFilter::All);
        self.options[CONTINUOUS_INDEX].set_led(io, cfg, on(continuous));
    }

    // -- queries ----------------------------------------------------------

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn is_brewing(&self) -> bool {
        self.current.is_some()
    }

    pub fn current_option(&self) -> Option<usize> {
        self.current
    }

    pub fn is_programming(&self) -> bool {
        self.programming
    }

    pub fn programmed_count(&self) -> usize {
        self.programmed_count
    }

    pub fn is_fully_programmed(&self) -> bool {
        self.programmed_count == TIMED_OPTIONS
    }

    pub fn record(&self) -> &DosageRecord {
        &self.record
    }

    pub fn option(&self, index: usize) -> Option<&BrewOption> {
        self.options.get(index)
    }

    pub fn is_solenoid_open(&self) -> bool {
        self.solenoid.is_energised()
    }

    pub fn meter(&self) -> &'static FlowMeter {
        self.meter
    }
}
