//! Shared plant: the one pump, the boiler solenoid and the level probe.
//!
//! ## Pump arbitration
//!
//! Each brewing group holds a bit in `holders`.  `acquire_pump` is
//! unconditional; `release_pump` clears the caller's bit and only switches
//! the pump off once no group holds it.  A boiler fill runs the pump
//! without a holder bit, and only while `holders == 0`.
//!
//! ## Boiler fill
//!
//! ```text
//!   level LOW ──▶ filling ──(level OK for hysteresis_ms)──▶ idle
//!                    ▲                │
//!                    └── level LOW ◀──┘ (window restarts)
//! ```
//!
//! A group starting to brew closes the boiler solenoid and ends any fill;
//! the pump stays on because the group acquires it right after.

use log::{debug, info};

use crate::app::events::MachineEvent;
use crate::app::ports::{EventSink, GpioPort};
use crate::brew::GroupId;
use crate::config::Wiring;
use crate::drivers::relay::Relay;
use crate::sensors::water_level::{WaterLevel, WaterLevelSensor};

pub struct Plant {
    pump: Relay,
    boiler_solenoid: Relay,
    level: WaterLevelSensor,
    /// Bitmask of groups currently brewing.
    holders: u8,
    filling: bool,
    fill_started_ms: u32,
    level_ok_since: Option<u32>,
}

impl Plant {
    pub fn new(wiring: &Wiring) -> Self {
        Self {
            pump: Relay::new("pump", wiring.pump),
            boiler_solenoid: Relay::new("boiler", wiring.boiler_solenoid),
            level: WaterLevelSensor::new(wiring.water_level_low),
            holders: 0,
            filling: false,
            fill_started_ms: 0,
            level_ok_since: None,
        }
    }

    /// Drive every shared output to its safe (released) level.
    pub fn setup(&mut self, io: &mut impl GpioPort) {
        self.pump.setup(io);
        self.boiler_solenoid.setup(io);
        self.level.setup(io);
        self.holders = 0;
        self.filling = false;
        self.level_ok_since = None;
    }

    pub fn acquire_pump(&mut self, io: &mut impl GpioPort, group: GroupId) {
        self.holders |= group.bit();
        self.pump.energise(io);
    }

    /// Give up `group`'s claim; the pump stops only if nobody else holds it.
    pub fn release_pump(&mut self, io: &mut impl GpioPort, group: GroupId) {
        self.holders &= !group.bit();
        if self.holders == 0 && !self.filling {
            self.pump.release(io);
        } else {
            debug!("pump kept on for another holder ({:#04b})", self.holders);
        }
    }

    /// Close the boiler solenoid, ending a fill in progress.
    ///
    /// The pump is left as is; the caller is about to acquire it.
    pub fn close_boiler_solenoid(
        &mut self,
        now_ms: u32,
        io: &mut impl GpioPort,
        sink: &mut impl EventSink,
    ) {
        self.boiler_solenoid.release(io);
        if self.filling {
            self.end_fill(now_ms, sink);
        }
    }

    /// One pass of the level loop.  Does nothing while any group brews.
    pub fn regulate_boiler(
        &mut self,
        now_ms: u32,
        hysteresis_ms: u32,
        io: &mut impl GpioPort,
        sink: &mut impl EventSink,
    ) {
        if self.holders != 0 {
            return;
        }

        match (self.filling, self.level.read(io)) {
            (false, WaterLevel::Low) => {
                self.boiler_solenoid.energise(io);
                self.pump.energise(io);
                self.filling = true;
                self.fill_started_ms = now_ms;
                self.level_ok_since = None;
                info!("boiler: level low, filling");
                sink.emit(&MachineEvent::BoilerFillStarted);
            }
            (true, WaterLevel::Low) => self.level_ok_since = None,
            (true, WaterLevel::Ok) => match self.level_ok_since {
                None => self.level_ok_since = Some(now_ms),
                Some(since) if now_ms.wrapping_sub(since) >= hysteresis_ms => {
                    self.boiler_solenoid.release(io);
                    self.pump.release(io);
                    self.end_fill(now_ms, sink);
                }
                Some(_) => {}
            },
            (false, WaterLevel::Ok) => {}
        }
    }

    fn end_fill(&mut self, now_ms: u32, sink: &mut impl EventSink) {
        let duration_ms = now_ms.wrapping_sub(self.fill_started_ms);
        self.filling = false;
        self.level_ok_since = None;
        info!("boiler: fill done after {} ms", duration_ms);
        sink.emit(&MachineEvent::BoilerFillStopped { duration_ms });
    }

    pub fn is_pump_on(&self) -> bool {
        self.pump.is_energised()
    }

    pub fn is_boiler_solenoid_open(&self) -> bool {
        self.boiler_solenoid.is_energised()
    }

    pub fn is_filling(&self) -> bool {
        self.filling
    }

    pub fn any_brewing(&self) -> bool {
        self.holders != 0
    }
}
