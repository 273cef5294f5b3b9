//! StillCtl Firmware: Main Entry Point
//!
//! Hexagonal architecture driven by one cooperative loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter    LogEventSink   NvsAdapter   MonotonicClock │
//! │  (Sensor+Actuator)  (EventSink)    (Config)     (uptime)       │
//! │  Buzzer (AlertSink) Console (commands)                         │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  Temps · Safety · FSM · Flow · Valve · Save            │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::io::BufRead;
use std::sync::mpsc;

use anyhow::{Result, anyhow};
use esp_idf_hal::delay::FreeRtos;
use esp_idf_hal::gpio::{AnyIOPin, AnyOutputPin, InterruptType, PinDriver, Pull};
use esp_idf_hal::ledc::{LedcDriver, LedcTimerDriver, Resolution, config::TimerConfig};
use esp_idf_hal::onewire::OWDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::units::Hertz;
use log::{error, info, warn};

use stillctl::adapters::console::parse_command;
use stillctl::adapters::hardware::{HardwareAdapter, RelayBank};
use stillctl::adapters::log_sink::LogEventSink;
use stillctl::adapters::nvs::NvsAdapter;
use stillctl::adapters::onewire::RmtOneWire;
use stillctl::adapters::time::MonotonicClock;
use stillctl::app::commands::AppCommand;
use stillctl::app::service::AppService;
use stillctl::config::load_or_init;
use stillctl::drivers::buzzer::Buzzer;
use stillctl::drivers::pump::PumpDriver;
use stillctl::drivers::relay::{Polarity, Relay};
use stillctl::error::Error;
use stillctl::pins;
use stillctl::sensors::ds18b20::{Ds18b20Bus, RESOLUTION_12_BIT, enroll};
use stillctl::sensors::flow::{PUMP_PULSES, flow_isr_handler};

/// Yield to FreeRTOS between passes so the idle-task watchdog is fed.
const LOOP_YIELD_MS: u32 = 2;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("StillCtl v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let clock = MonotonicClock::new();

    // ── 2. Outputs, released before anything else runs ───────
    // SAFETY: each GPIO number below is claimed exactly once.
    let relays = RelayBank {
        heater_one: Relay::new(
            PinDriver::output(unsafe { AnyOutputPin::new(pins::HEATER_ONE_GPIO) })?,
            Polarity::ActiveLow,
        )
        .map_err(Error::from)?,
        heater_two: Relay::new(
            PinDriver::output(unsafe { AnyOutputPin::new(pins::HEATER_TWO_GPIO) })?,
            Polarity::ActiveLow,
        )
        .map_err(Error::from)?,
        valve: Relay::new(
            PinDriver::output(unsafe { AnyOutputPin::new(pins::VALVE_GPIO) })?,
            Polarity::ActiveHigh,
        )
        .map_err(Error::from)?,
        cooler: Relay::new(
            PinDriver::output(unsafe { AnyOutputPin::new(pins::COOLER_GPIO) })?,
            Polarity::ActiveHigh,
        )
        .map_err(Error::from)?,
    };

    let timer = LedcTimerDriver::new(
        peripherals.ledc.timer0,
        &TimerConfig::default()
            .frequency(Hertz(pins::PUMP_PWM_FREQ_HZ))
            .resolution(Resolution::Bits10),
    )?;
    let pwm = LedcDriver::new(
        peripherals.ledc.channel0,
        &timer,
        unsafe { AnyOutputPin::new(pins::PUMP_PWM_GPIO) },
    )?;
    let mut pump = PumpDriver::new(pwm);
    pump.stop().map_err(Error::from)?;

    let mut buzzer = Buzzer::new(PinDriver::output(unsafe {
        AnyOutputPin::new(pins::BUZZER_GPIO)
    })?);

    // ── 3. Sensors ────────────────────────────────────────────
    let ow = OWDriver::new(
        unsafe { AnyIOPin::new(pins::ONEWIRE_GPIO) },
        peripherals.rmt.channel0,
    )?;
    let mut wire = RmtOneWire::new(ow);
    let found = wire.discover();
    info!("onewire: {} device(s) on the bus", found.len());
    let roms = enroll(&pins::PROBE_ROMS, &found).unwrap_or(pins::PROBE_ROMS);
    let mut bus = Ds18b20Bus::new(wire, roms);
    if let Err(e) = bus.set_resolution(RESOLUTION_12_BIT) {
        warn!("ds18b20: resolution broadcast failed: {}", e);
    }

    let mut flow_pin = PinDriver::input(unsafe { AnyIOPin::new(pins::FLOW_PULSE_GPIO) })?;
    flow_pin.set_pull(Pull::Up)?;
    flow_pin.set_interrupt_type(InterruptType::PosEdge)?;
    // SAFETY: the handler only touches an atomic counter.
    unsafe { flow_pin.subscribe(flow_isr_handler)? };
    flow_pin.enable_interrupt()?;

    let mut hw = HardwareAdapter::new(bus, &PUMP_PULSES, relays, pump);

    // ── 4. Config + application core ──────────────────────────
    let nvs = NvsAdapter::new().map_err(|e| anyhow!("NVS init failed: {}", e))?;
    let loaded = load_or_init(&nvs);
    let mut sink = LogEventSink::new();
    let mut app = AppService::new(loaded);
    app.start(clock.uptime_ms(), &mut sink);

    // ── 5. Console command reader ─────────────────────────────
    let (tx, rx) = mpsc::channel::<AppCommand>();
    std::thread::Builder::new()
        .stack_size(4096)
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match parse_command(&line) {
                    Ok(cmd) => {
                        if tx.send(cmd).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("console: {:?}: {}", line.trim(), e),
                }
            }
        })?;

    // ── 6. Main loop ──────────────────────────────────────────
    info!("Entering control loop");
    loop {
        let now = clock.uptime_ms();

        while let Ok(cmd) = rx.try_recv() {
            info!("console: {:?}", cmd);
            app.handle_command(cmd, now, &mut buzzer, &mut sink);
        }

        app.poll(now, &mut hw, &mut buzzer, &mut sink);
        buzzer.poll(now);
        app.auto_save_if_needed(now, &nvs);

        // The GPIO driver disarms the interrupt after every edge.
        if let Err(e) = flow_pin.enable_interrupt() {
            error!("flow ISR re-arm failed: {}", e);
        }

        FreeRtos::delay_ms(LOOP_YIELD_MS);
    }
}
