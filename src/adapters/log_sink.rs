//! Log-based event and alert sinks.
//!
//! [`LogEventSink`] writes every [`AppEvent`] to the ESP-IDF logger (UART /
//! USB-CDC in production).  Telemetry is rendered as one JSON object per
//! line so a host script can tail the port.  [`LogAlertSink`] stands in for
//! the buzzer where none is fitted.

use log::{error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{AlertKind, AlertSink, EventSink};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u64,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events rendered so far.
    pub fn emitted(&self) -> u64 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted += 1;
        match event {
            AppEvent::Telemetry(t) => match serde_json::to_string(t) {
                Ok(json) => info!("TELEM | {}", json),
                Err(e) => warn!("TELEM | encode failed: {}", e),
            },
            AppEvent::StatusChanged { from, to } => {
                info!("STATUS | {} -> {}", from.label(), to.label());
            }
            AppEvent::ModeChanged(mode) => {
                info!("MODE | {}", mode.label());
            }
            AppEvent::Fault(fault) => {
                error!("FAULT | {}", fault);
            }
            AppEvent::FlowCalibrated(coefficient) => {
                info!("CALIB | coefficient={:.2}", coefficient);
            }
            AppEvent::Started { status, mode } => {
                info!("START | status={} mode={}", status.label(), mode.label());
            }
        }
    }
}

/// Alert sink that only logs.  Tracks whether a latched tone is "sounding".
#[derive(Debug, Default)]
pub struct LogAlertSink {
    latched: Option<AlertKind>,
}

impl LogAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn latched(&self) -> Option<AlertKind> {
        self.latched
    }
}

impl AlertSink for LogAlertSink {
    fn alert(&mut self, kind: AlertKind) {
        if kind.is_latched() {
            warn!("ALERT | {:?} (latched)", kind);
            self.latched = Some(kind);
        } else {
            info!("ALERT | {:?}", kind);
        }
    }

    fn silence(&mut self) {
        if let Some(kind) = self.latched.take() {
            info!("ALERT | {:?} silenced", kind);
        }
    }
}
