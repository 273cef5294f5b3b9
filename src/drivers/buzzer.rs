//! Piezo buzzer.
//!
//! A chime is a single short beep timed by [`Buzzer::poll`]; the error and
//! end tones hold the line until [`AlertSink::silence`].

use embedded_hal::digital::OutputPin;
use log::warn;

use crate::app::ports::{AlertKind, AlertSink};
use crate::scheduler::Deadline;

pub const CHIME_MS: u64 = 150;

pub struct Buzzer<P> {
    pin: P,
    sounding: bool,
    latched: bool,
    chime_requested: bool,
    chime_end: Deadline,
}

impl<P: OutputPin> Buzzer<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            sounding: false,
            latched: false,
            chime_requested: false,
            chime_end: Deadline::new(),
        }
    }

    /// Start pending chimes and end expired ones.  Call every loop pass.
    pub fn poll(&mut self, now_ms: u64) {
        if self.chime_requested {
            self.chime_requested = false;
            self.chime_end.arm(now_ms, CHIME_MS);
            self.drive(true);
        } else if self.chime_end.expired(now_ms) {
            self.chime_end.cancel();
            if !self.latched {
                self.drive(false);
            }
        }
    }

    pub fn is_sounding(&self) -> bool {
        self.sounding
    }

    fn drive(&mut self, on: bool) {
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        match res {
            Ok(()) => self.sounding = on,
            Err(_) => warn!("buzzer: GPIO write failed"),
        }
    }
}

impl<P: OutputPin> AlertSink for Buzzer<P> {
    fn alert(&mut self, kind: AlertKind) {
        if kind.is_latched() {
            self.latched = true;
            self.drive(true);
        } else if !self.latched {
            self.chime_requested = true;
        }
    }

    fn silence(&mut self) {
        self.latched = false;
        self.chime_requested = false;
        self.chime_end.cancel();
        self.drive(false);
    }
}
