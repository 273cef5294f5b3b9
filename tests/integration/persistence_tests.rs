//! Setpoint persistence: boot-time load, debounced saves, explicit saves
//! and calibration results reaching storage.

use crate::mock_hw::{MockNvs, RecordingAlerts, RecordingSink};
use stillctl::adapters::nvs::NvsAdapter;
use stillctl::app::commands::{AppCommand, Setpoint, Step};
use stillctl::app::ports::ConfigPort;
use stillctl::app::service::{AppService, SAVE_DEBOUNCE_MS};
use stillctl::config::{CONFIG_SCHEMA_VERSION, ProcessConfig, load_or_init};

fn boot(store: &impl ConfigPort) -> AppService {
    let mut app = AppService::new(load_or_init(store));
    app.start(0, &mut RecordingSink::new());
    app
}

fn send(app: &mut AppService, cmd: AppCommand, now_ms: u64) {
    app.handle_command(
        cmd,
        now_ms,
        &mut RecordingAlerts::default(),
        &mut RecordingSink::new(),
    );
}

#[test]
fn first_boot_writes_defaults_after_debounce() {
    let nvs = MockNvs::new();
    let mut app = boot(&nvs);
    assert!(app.is_config_dirty());
    assert!(!app.auto_save_if_needed(SAVE_DEBOUNCE_MS - 1, &nvs));
    assert!(app.auto_save_if_needed(SAVE_DEBOUNCE_MS, &nvs));
    assert_eq!(nvs.stored.borrow().as_ref(), Some(&ProcessConfig::default()));
}

#[test]
fn stored_config_is_used_without_rewrite() {
    let stored = ProcessConfig {
        ext_boiler_target_c: 97.5,
        ..Default::default()
    };
    let nvs = MockNvs::with(stored);
    let mut app = boot(&nvs);
    assert_eq!(app.config().ext_boiler_target_c, 97.5);
    assert!(!app.auto_save_if_needed(60_000, &nvs));
    assert_eq!(nvs.saves.get(), 0);
}

#[test]
fn schema_mismatch_reinitialises_defaults() {
    let nvs = MockNvs::with(ProcessConfig {
        version: CONFIG_SCHEMA_VERSION.wrapping_add(1),
        ext_boiler_target_c: 50.0,
        ..Default::default()
    });
    let mut app = boot(&nvs);
    assert_eq!(app.config(), &ProcessConfig::default());
    assert!(app.auto_save_if_needed(SAVE_DEBOUNCE_MS, &nvs));
    assert_eq!(
        nvs.stored.borrow().as_ref().map(|c| c.version),
        Some(CONFIG_SCHEMA_VERSION)
    );
}

#[test]
fn burst_of_edits_saves_once_after_the_last() {
    let nvs = MockNvs::with(ProcessConfig::default());
    let mut app = boot(&nvs);
    for i in 0..5 {
        send(
            &mut app,
            AppCommand::Adjust {
                setpoint: Setpoint::HeadSpeed,
                up: true,
                step: Step::Fine,
            },
            i * 1_000,
        );
    }
    assert!(!app.auto_save_if_needed(4_000 + SAVE_DEBOUNCE_MS - 1, &nvs));
    assert!(app.auto_save_if_needed(4_000 + SAVE_DEBOUNCE_MS, &nvs));
    assert_eq!(nvs.saves.get(), 1);
    assert_eq!(nvs.stored.borrow().as_ref().map(|c| c.rect_head_speed), Some(155));
}

#[test]
fn explicit_save_skips_the_debounce() {
    let nvs = MockNvs::with(ProcessConfig::default());
    let mut app = boot(&nvs);
    send(&mut app, AppCommand::SaveConfig, 5_000);
    assert!(app.auto_save_if_needed(5_000, &nvs));
    assert_eq!(nvs.saves.get(), 1);
}

#[test]
fn runtime_only_edit_is_not_saved() {
    let nvs = MockNvs::with(ProcessConfig::default());
    let mut app = boot(&nvs);
    send(
        &mut app,
        AppCommand::Adjust {
            setpoint: Setpoint::RealOfftakeSpeed,
            up: true,
            step: Step::Coarse,
        },
        0,
    );
    assert!(!app.is_config_dirty());
    assert!(!app.auto_save_if_needed(60_000, &nvs));
}

#[test]
fn calibration_coefficient_reaches_storage() {
    let nvs = MockNvs::with(ProcessConfig::default());
    let mut app = boot(&nvs);
    send(&mut app, AppCommand::StartCalibration, 0);
    send(&mut app, AppCommand::StopCalibration, 30_000);
    assert_eq!(app.config().pump_coefficient, 1.0);
    assert!(app.auto_save_if_needed(30_000 + SAVE_DEBOUNCE_MS, &nvs));
    assert_eq!(
        nvs.stored.borrow().as_ref().map(|c| c.pump_coefficient),
        Some(1.0)
    );
}

#[test]
fn postcard_store_survives_a_reboot() {
    let nvs = NvsAdapter::new().expect("host store");
    let mut app = boot(&nvs);
    send(
        &mut app,
        AppCommand::Adjust {
            setpoint: Setpoint::ReferenceMax,
            up: false,
            step: Step::Coarse,
        },
        0,
    );
    app.force_save_if_dirty(&nvs);
    assert!(!app.is_config_dirty());

    let rebooted = boot(&nvs);
    assert_eq!(rebooted.config().reference_max_c, 41.5);
}

#[test]
fn failed_write_keeps_config_dirty() {
    let nvs = NvsAdapter::new().expect("host store");
    nvs.simulate_write_failure(true);
    let mut app = boot(&nvs);
    assert!(!app.auto_save_if_needed(SAVE_DEBOUNCE_MS, &nvs));
    assert!(app.is_config_dirty());

    nvs.simulate_write_failure(false);
    assert!(!app.auto_save_if_needed(SAVE_DEBOUNCE_MS + 1, &nvs), "re-armed");
    assert!(app.auto_save_if_needed(2 * SAVE_DEBOUNCE_MS, &nvs));
}
