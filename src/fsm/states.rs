//! Concrete status handlers and table builder.
//!
//! ```text
//!  extraction
//!    OVERCLOCK ──[output > target, 5]──▶ STAB ──[deadline]──▶ PROCESS
//!    PROCESS ──[flow < 5 L/h, 30]──▶ END
//!    PROCESS ──[boiler < target−7 | output > target+7, 30]──▶ ERR_BOIL
//!
//!  rectification
//!    OVERCLOCK ──[output > target, 10]──▶ STAB ──[deadline]──▶ HEAD
//!    HEAD: valve metered at head speed (operator advances)
//!    BODY/TAIL: valve metered at body speed, pause/resume on output rise,
//!               tail alert [20], END on cube end [5]
//! ```

use log::{debug, info, warn};

use super::context::ProcessContext;
use super::{IntentRow, Mode, Status, StatusDescriptor};
use crate::app::ports::AlertKind;
use crate::control::valve::open_time_for_speed;
use crate::sensors::temperature::SENSOR_FAULT_SENTINEL;

/// Flow below this in PROCESS means the wash is exhausted.
pub const FLOW_LOSS_FLOOR_LPH: f32 = 5.0;
/// Allowed excursion around the extraction setpoints before faulting.
pub const EXTRACTION_FAULT_MARGIN_C: f32 = 7.0;
/// Flow target applied when extraction leaves stabilization.
pub const POST_STABILIZATION_FLOW_LPH: f32 = 10.0;
pub const FLOW_NUDGE_LPH: f32 = 0.01;
pub const FLOW_TARGET_MIN_LPH: f32 = 10.0;
pub const FLOW_TARGET_MAX_LPH: f32 = 30.0;
/// Minimum time an offtake pause lasts.
pub const PAUSE_COOLDOWN_MS: u64 = 180_000;
/// Cooler hysteresis point.
pub const COOLER_THRESHOLD_C: f32 = 70.0;

const STOP: IntentRow = IntentRow {
    heaters: Some((false, false)),
    pump_sleep: Some(true),
};
const FULL_HEAT: IntentRow = IntentRow {
    heaters: Some((true, true)),
    pump_sleep: Some(true),
};
const HOLD_HEAT: IntentRow = IntentRow {
    heaters: Some((true, false)),
    pump_sleep: Some(true),
};
const HOLD_HEAT_PUMPING: IntentRow = IntentRow {
    heaters: Some((true, false)),
    pump_sleep: Some(false),
};
const UNCHANGED: IntentRow = IntentRow {
    heaters: None,
    pump_sleep: None,
};
const PUMP_ONLY: IntentRow = IntentRow {
    heaters: None,
    pump_sleep: Some(false),
};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_status_table() -> [StatusDescriptor; Status::COUNT] {
    [
        StatusDescriptor {
            id: Status::Off,
            on_enter: Some(stopped_enter),
            extraction: None,
            rectification: None,
            intents: STOP,
        },
        StatusDescriptor {
            id: Status::Overclock,
            on_enter: Some(overclock_enter),
            extraction: Some(overclock_extraction),
            rectification: Some(overclock_rectification),
            intents: FULL_HEAT,
        },
        StatusDescriptor {
            id: Status::Stabilization,
            on_enter: Some(stabilization_enter),
            extraction: Some(stabilization_update),
            rectification: Some(stabilization_update),
            intents: HOLD_HEAT,
        },
        StatusDescriptor {
            id: Status::Head,
            on_enter: Some(head_enter),
            extraction: None,
            rectification: Some(head_update),
            intents: HOLD_HEAT,
        },
        StatusDescriptor {
            id: Status::Body,
            on_enter: Some(offtake_enter),
            extraction: None,
            rectification: Some(body_update),
            intents: HOLD_HEAT,
        },
        StatusDescriptor {
            id: Status::Process,
            on_enter: Some(process_enter),
            extraction: Some(process_update),
            rectification: None,
            intents: HOLD_HEAT_PUMPING,
        },
        StatusDescriptor {
            id: Status::Tail,
            on_enter: Some(offtake_enter),
            extraction: None,
            rectification: Some(tail_update),
            intents: UNCHANGED,
        },
        StatusDescriptor {
            id: Status::End,
            on_enter: Some(stopped_enter),
            extraction: None,
            rectification: None,
            intents: STOP,
        },
        StatusDescriptor {
            id: Status::Manual,
            on_enter: Some(manual_enter),
            extraction: None,
            rectification: None,
            intents: PUMP_ONLY,
        },
        StatusDescriptor {
            id: Status::ErrorReference,
            on_enter: Some(stopped_enter),
            extraction: None,
            rectification: None,
            intents: STOP,
        },
        StatusDescriptor {
            id: Status::ErrorBoiler,
            on_enter: Some(stopped_enter),
            extraction: None,
            rectification: None,
            intents: STOP,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  Entry hooks
// ═══════════════════════════════════════════════════════════════════════════

/// OFF, END and both error states.
fn stopped_enter(ctx: &mut ProcessContext) {
    ctx.stop_ms = ctx.now_ms;
    ctx.offtake.valve_open_time_ms = 0;
}

fn overclock_enter(ctx: &mut ProcessContext) {
    ctx.start_ms = ctx.now_ms;
    ctx.stabilization.cancel();
    ctx.offtake.valve_open_time_ms = 0;
}

fn stabilization_enter(ctx: &mut ProcessContext) {
    let minutes = ctx.config.settle_minutes(ctx.mode);
    ctx.stabilization.arm(ctx.now_ms, u64::from(minutes) * 60_000);
    ctx.offtake.valve_open_time_ms = 0;
    info!("Stabilizing for {} min", minutes);
}

fn head_enter(ctx: &mut ProcessContext) {
    ctx.start_ms = ctx.now_ms;
    ctx.stabilization.cancel();
}

/// BODY and TAIL: a fresh offtake run computes its valve timing and
/// temperature snapshot on the next tick.
fn offtake_enter(ctx: &mut ProcessContext) {
    ctx.offtake.valve_open_time_ms = 0;
    ctx.offtake.paused = false;
    ctx.offtake.tail_hold = false;
}

fn process_enter(ctx: &mut ProcessContext) {
    ctx.stabilization.cancel();
    ctx.offtake.valve_open_time_ms = 0;
}

fn manual_enter(ctx: &mut ProcessContext) {
    ctx.start_ms = ctx.now_ms;
    ctx.offtake.valve_open_time_ms = 0;
}

// ═══════════════════════════════════════════════════════════════════════════
//  Shared
// ═══════════════════════════════════════════════════════════════════════════

fn stabilization_update(ctx: &mut ProcessContext) -> Option<Status> {
    if !ctx.stabilization.expired(ctx.now_ms) {
        return None;
    }
    ctx.alert(AlertKind::Chime);
    match ctx.mode {
        Mode::Extraction => {
            ctx.config.pump_target_speed_lph = POST_STABILIZATION_FLOW_LPH;
            Some(Status::Process)
        }
        Mode::Rectification => Some(Status::Head),
    }
}

/// Cooler follows the hotter of output and boiler, independent of status.
pub fn cooler_hysteresis(ctx: &mut ProcessContext) {
    let hottest = ctx.readings.output_c.max(ctx.readings.boiler_c);
    if !ctx.intents.cooler && hottest > COOLER_THRESHOLD_C {
        ctx.intents.cooler = true;
    } else if ctx.intents.cooler && hottest < COOLER_THRESHOLD_C {
        ctx.intents.cooler = false;
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Extraction
// ═══════════════════════════════════════════════════════════════════════════

fn overclock_extraction(ctx: &mut ProcessContext) -> Option<Status> {
    let hot = ctx.readings.output_c > ctx.config.ext_output_target_c;
    if ctx.counters.overclock_extraction.update(hot) {
        ctx.alert(AlertKind::Chime);
        return Some(Status::Stabilization);
    }
    None
}

fn process_update(ctx: &mut ProcessContext) -> Option<Status> {
    let cfg = &ctx.config;
    let boiler = ctx.readings.boiler_c;
    let output = ctx.readings.output_c;

    let flow_lost = ctx.measured_flow_lph < FLOW_LOSS_FLOOR_LPH;
    let boiler_cold = boiler < cfg.ext_boiler_target_c - EXTRACTION_FAULT_MARGIN_C;
    let output_hot = output > cfg.ext_output_target_c + EXTRACTION_FAULT_MARGIN_C;

    let mut next = None;
    if ctx.counters.flow_loss.update(flow_lost) {
        warn!("Flow below {} L/h, run finished", FLOW_LOSS_FLOOR_LPH);
        ctx.alert(AlertKind::EndTone);
        next = Some(Status::End);
    }
    if ctx.counters.boiler_under.update(boiler_cold) {
        warn!("Boiler {:.1} C under target", boiler);
        ctx.alert(AlertKind::ErrorTone);
        next = Some(Status::ErrorBoiler);
    }
    if ctx.counters.output_over.update(output_hot) {
        warn!("Output {:.1} C over target", output);
        ctx.alert(AlertKind::ErrorTone);
        next = Some(Status::ErrorBoiler);
    }

    nudge_flow_target(ctx);
    next
}

/// Slow setpoint tracking: a hot boiler or condenser asks for more coolant.
fn nudge_flow_target(ctx: &mut ProcessContext) {
    let boiler = ctx.readings.boiler_c;
    let output = ctx.readings.output_c;
    let cfg = &mut ctx.config;
    let band_high = cfg.ext_boiler_target_c + cfg.ext_boiler_delta_c;
    let band_low = cfg.ext_boiler_target_c - cfg.ext_boiler_delta_c;
    let output_target = cfg.ext_output_target_c;
    let target = &mut cfg.pump_target_speed_lph;

    if boiler > band_high || output > output_target {
        if *target < FLOW_TARGET_MAX_LPH {
            *target = (*target + FLOW_NUDGE_LPH).min(FLOW_TARGET_MAX_LPH);
        }
    } else if boiler < band_low && *target > FLOW_TARGET_MIN_LPH {
        *target = (*target - FLOW_NUDGE_LPH).max(FLOW_TARGET_MIN_LPH);
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  Rectification
// ═══════════════════════════════════════════════════════════════════════════

fn overclock_rectification(ctx: &mut ProcessContext) -> Option<Status> {
    let hot = ctx.readings.output_c > ctx.config.rect_output_target_c;
    if ctx.counters.overclock_rectification.update(hot) {
        ctx.alert(AlertKind::Chime);
        return Some(Status::Stabilization);
    }
    None
}

fn head_update(ctx: &mut ProcessContext) -> Option<Status> {
    ctx.offtake.valve_open_time_ms = open_time_for_speed(ctx.config.rect_head_speed);
    None
}

fn body_update(ctx: &mut ProcessContext) -> Option<Status> {
    offtake_update(ctx, false)
}

fn tail_update(ctx: &mut ProcessContext) -> Option<Status> {
    offtake_update(ctx, true)
}

fn offtake_update(ctx: &mut ProcessContext, in_tail: bool) -> Option<Status> {
    let chime = !ctx.offtake.tail_hold && meter_offtake(ctx, in_tail);

    // Cube thresholds are watched even while the offtake is held.
    let boiler = ctx.readings.boiler_c;
    let mut next = None;
    if ctx.counters.tail_reached.update(!in_tail && boiler > ctx.config.rect_cube_tail_c) {
        ctx.offtake.valve_open_time_ms = 0;
        if !ctx.offtake.tail_hold {
            ctx.offtake.tail_hold = true;
            warn!("Cube {:.1} C reached tail threshold, holding offtake", boiler);
            ctx.alert(AlertKind::EndTone);
        }
    }
    if ctx.counters.end_reached.update(boiler > ctx.config.rect_cube_end_c) {
        ctx.offtake.valve_open_time_ms = 0;
        warn!("Cube {:.1} C reached end threshold", boiler);
        ctx.alert(AlertKind::EndTone);
        next = Some(Status::End);
    }

    if chime {
        ctx.alert(AlertKind::Chime);
    }
    debug!(
        "offtake: out={:.1} valve={} paused={} hold={}",
        ctx.readings.output_c,
        ctx.offtake.valve_open_time_ms,
        ctx.offtake.paused,
        ctx.offtake.tail_hold
    );
    next
}

/// Start, pause and resume the metered offtake.  Returns `true` when the
/// offtake paused or resumed this tick.
fn meter_offtake(ctx: &mut ProcessContext, in_tail: bool) -> bool {
    let cfg = &ctx.config;
    let delta = if in_tail {
        cfg.rect_tail_delta_c
    } else {
        cfg.rect_body_delta_c
    };
    let body_speed = cfg.rect_body_speed;
    let reduction_pct = cfg.rect_speed_reduction_pct.min(100);
    let output = ctx.readings.output_c;
    let off = &mut ctx.offtake;

    if off.valve_open_time_ms == 0 && !off.paused {
        off.valve_open_time_ms = open_time_for_speed(body_speed);
        off.real_speed = body_speed;
        off.start_body_temp_c = output;
        info!(
            "Offtake started at {} (valve {} ms), snapshot {:.1} C",
            off.real_speed, off.valve_open_time_ms, output
        );
    }

    let limit = off.start_body_temp_c + delta;
    let rising = !off.paused && output != SENSOR_FAULT_SENTINEL && output > limit;
    let mut changed = false;
    if ctx.counters.offtake_pause.update(rising) {
        let keep = u32::from(100 - reduction_pct);
        off.real_speed = (u32::from(off.real_speed) * keep / 100) as u16;
        off.valve_open_time_ms = 0;
        off.paused = true;
        off.pause_started_ms = ctx.now_ms;
        changed = true;
        info!("Offtake paused at {:.1} C, speed reduced to {}", output, off.real_speed);
    }

    let settled = off.paused
        && ctx.now_ms > off.pause_started_ms + PAUSE_COOLDOWN_MS
        && output <= limit;
    if ctx.counters.offtake_resume.update(settled) {
        off.paused = false;
        off.valve_open_time_ms = open_time_for_speed(off.real_speed);
        changed = true;
        info!("Offtake resumed at {} (valve {} ms)", off.real_speed, off.valve_open_time_ms);
    }
    changed
}
