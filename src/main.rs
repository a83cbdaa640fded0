//! DuoGroup firmware entry point.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink     Esp32TimeAdapter        │
//! │  (Gpio + Storage)     (EventSink)      (tick clock)            │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │                 Machine (pure logic)                   │    │
//! │  │  BrewGroup ×2 · BrewOption ×5 · Plant (pump, boiler)   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  flow ISRs ──▶ FLOW_METERS (lock-free) ──▶ next tick           │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use duogroup::adapters::hardware::HardwareAdapter;
use duogroup::adapters::log_sink::LogEventSink;
use duogroup::adapters::nvs::NvsAdapter;
use duogroup::adapters::time::Esp32TimeAdapter;
use duogroup::config::MachineConfig;
use duogroup::drivers::{hw_init, watchdog::Watchdog};
use duogroup::machine::Machine;
use duogroup::sensors::flow::FLOW_METERS;

/// Control loop period.  Short enough for 25 ms button debouncing.
const TICK_MS: u32 = 5;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  DuoGroup v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = MachineConfig::default();
    config.validate()?;

    // ── 3. Storage ────────────────────────────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow::anyhow!("NVS init failed: {e}"))?;
    let mut hw = HardwareAdapter::new(nvs);
    let mut sink = LogEventSink::new();
    let clock = Esp32TimeAdapter::new();

    // ── 4. Machine: outputs safe before interrupts run ────────
    let [m1, m2] = &FLOW_METERS;
    let mut machine = Machine::new(config, [m1, m2]);
    machine.setup(clock.now_ms(), &mut hw, &mut sink);

    if let Err(e) = hw_init::init_flow_interrupts(&machine.config().wiring) {
        // Brewing still stops on the no-flow and safety timeouts.
        warn!("flow interrupts unavailable ({}), dosing by time only", e);
    }

    let watchdog = Watchdog::default();
    info!("System ready. Entering control loop.");

    // ── 5. Control loop ───────────────────────────────────────
    loop {
        machine.tick(clock.now_ms(), &mut hw, &mut sink);
        watchdog.feed();
        esp_idf_svc::hal::delay::FreeRtos::delay_ms(TICK_MS);
    }
}
