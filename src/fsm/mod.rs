//! Function-pointer process state machine.
//!
//! Same shape as a classic embedded C FSM, with the distillation stages as
//! rows and one update handler per operating mode:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │  StatusTable                                                       │
//! │  ┌───────────┬──────────┬────────────┬───────────────┬──────────┐  │
//! │  │ Status    │ on_enter │ extraction │ rectification │ intents  │  │
//! │  ├───────────┼──────────┼────────────┼───────────────┼──────────┤  │
//! │  │ Off       │ fn(ctx)  │ -          │ -             │ stop     │  │
//! │  │ Overclock │ fn(ctx)  │ fn(ctx)->  │ fn(ctx)->     │ 1+2      │  │
//! │  │ ...       │          │            │               │          │  │
//! │  └───────────┴──────────┴────────────┴───────────────┴──────────┘  │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each control tick the engine calls the current row's update handler for
//! the active [`Mode`].  A handler returning `Some(next)` moves the machine
//! and runs the next row's `on_enter`.  Operator navigation goes through the
//! declarative [`TRANSITIONS`] table instead of the handlers, so forward
//! and backward stepping stay symmetric and testable in isolation.

pub mod context;
pub mod states;

use context::ProcessContext;
use log::info;

// ---------------------------------------------------------------------------
// Mode and status identity
// ---------------------------------------------------------------------------

/// Operating mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Mode {
    /// Slow-boil extraction with a flow-controlled condenser.
    #[default]
    Extraction,
    /// Fractional rectification with a metered offtake valve.
    Rectification,
}

impl Mode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Extraction => "EXTR",
            Self::Rectification => "RECT",
        }
    }

    /// There are two modes, so "next" and "previous" both flip.
    pub fn toggled(self) -> Self {
        match self {
            Self::Extraction => Self::Rectification,
            Self::Rectification => Self::Extraction,
        }
    }
}

/// Process status.  Must stay in sync with [`states::build_status_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Status {
    Off = 0,
    Overclock = 1,
    Stabilization = 2,
    Head = 3,
    Body = 4,
    Process = 5,
    Tail = 6,
    End = 7,
    Manual = 8,
    ErrorReference = 9,
    ErrorBoiler = 10,
}

impl Status {
    pub const COUNT: usize = 11;

    pub const ALL: [Status; Self::COUNT] = [
        Self::Off,
        Self::Overclock,
        Self::Stabilization,
        Self::Head,
        Self::Body,
        Self::Process,
        Self::Tail,
        Self::End,
        Self::Manual,
        Self::ErrorReference,
        Self::ErrorBoiler,
    ];

    /// Convert an index back to `Status`.  Out-of-range indices map to
    /// `Off` in release builds.
    pub fn from_index(idx: usize) -> Self {
        match Self::ALL.get(idx) {
            Some(s) => *s,
            None => {
                debug_assert!(false, "invalid status index: {idx}");
                Self::Off
            }
        }
    }

    /// Short label shown on the operator display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "Off",
            Self::Overclock => "Overclock",
            Self::Stabilization => "Stabiliz",
            Self::Head => "Head",
            Self::Body => "Body",
            Self::Process => "Process",
            Self::Tail => "Tail",
            Self::End => "END",
            Self::Manual => "Manual",
            Self::ErrorReference => "ERR_REF",
            Self::ErrorBoiler => "ERR_BOIL",
        }
    }

    pub fn is_error(self) -> bool {
        matches!(self, Self::ErrorReference | Self::ErrorBoiler)
    }

    /// Stages where the offtake valve may be open.
    pub fn is_offtake(self) -> bool {
        matches!(self, Self::Head | Self::Body | Self::Tail)
    }
}

// ---------------------------------------------------------------------------
// Operator navigation table
// ---------------------------------------------------------------------------

/// Operator stage navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageEvent {
    Advance,
    Retreat,
}

/// Extra work attached to a specific edge (beyond the target's `on_enter`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    None,
    /// Forget the offtake run: effective speed and valve open time to zero.
    ClearOfftake,
}

/// One edge of the navigation graph.
#[derive(Debug, Clone, Copy)]
pub struct Transition {
    pub from: Status,
    pub event: StageEvent,
    /// `None` = valid in both modes.
    pub mode: Option<Mode>,
    pub to: Status,
    pub action: TransitionAction,
}

const fn edge(from: Status, event: StageEvent, to: Status) -> Transition {
    Transition {
        from,
        event,
        mode: None,
        to,
        action: TransitionAction::None,
    }
}

const fn edge_in(mode: Mode, from: Status, event: StageEvent, to: Status) -> Transition {
    Transition {
        from,
        event,
        mode: Some(mode),
        to,
        action: TransitionAction::None,
    }
}

const fn edge_clearing(from: Status, event: StageEvent, to: Status) -> Transition {
    Transition {
        from,
        event,
        mode: None,
        to,
        action: TransitionAction::ClearOfftake,
    }
}

use Mode::{Extraction as EXT, Rectification as RECT};
use StageEvent::{Advance as FWD, Retreat as BACK};

/// Operator navigation graph.
///
/// ```text
///  extraction    : OFF → OVERCLOCK → STAB → PROCESS → MANUAL → OFF
///  rectification : OFF → OVERCLOCK → STAB → HEAD → BODY → TAIL → OFF
///  END → OVERCLOCK, error states → OFF
/// ```
pub const TRANSITIONS: &[Transition] = &[
    // Forward
    edge(Status::Off, FWD, Status::Overclock),
    edge(Status::End, FWD, Status::Overclock),
    edge(Status::Overclock, FWD, Status::Stabilization),
    edge_in(EXT, Status::Stabilization, FWD, Status::Process),
    edge_in(RECT, Status::Stabilization, FWD, Status::Head),
    edge(Status::Head, FWD, Status::Body),
    edge(Status::Body, FWD, Status::Tail),
    edge_clearing(Status::Tail, FWD, Status::Off),
    edge(Status::Process, FWD, Status::Manual),
    edge(Status::Manual, FWD, Status::Off),
    edge(Status::ErrorReference, FWD, Status::Off),
    edge(Status::ErrorBoiler, FWD, Status::Off),
    // Backward
    edge_in(EXT, Status::Off, BACK, Status::Manual),
    edge_in(RECT, Status::Off, BACK, Status::Tail),
    edge(Status::End, BACK, Status::Process),
    edge(Status::Overclock, BACK, Status::Off),
    edge(Status::Stabilization, BACK, Status::Overclock),
    edge(Status::Head, BACK, Status::Stabilization),
    edge_clearing(Status::Body, BACK, Status::Head),
    edge_clearing(Status::Tail, BACK, Status::Body),
    edge(Status::Process, BACK, Status::Stabilization),
    edge(Status::Manual, BACK, Status::Process),
    edge(Status::ErrorReference, BACK, Status::Off),
    edge(Status::ErrorBoiler, BACK, Status::Off),
];

/// Resolve an operator event.  Anything not in the table lands in `Off`.
pub fn navigate(from: Status, event: StageEvent, mode: Mode) -> (Status, TransitionAction) {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.event == event && t.mode.is_none_or(|m| m == mode))
        .map_or((Status::Off, TransitionAction::None), |t| (t.to, t.action))
}

// ---------------------------------------------------------------------------
// Function-pointer type aliases
// ---------------------------------------------------------------------------

/// Entry action, run exactly once on every transition into a status.
pub type StatusActionFn = fn(&mut ProcessContext);

/// Per-tick update handler.  Returns `Some(next)` to trigger a transition.
pub type StatusUpdateFn = fn(&mut ProcessContext) -> Option<Status>;

// ---------------------------------------------------------------------------
// Status descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Heater and pump targets while sitting in a status.
/// `None` leaves the previous intent untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentRow {
    pub heaters: Option<(bool, bool)>,
    pub pump_sleep: Option<bool>,
}

/// Static descriptor for a single status.
pub struct StatusDescriptor {
    pub id: Status,
    pub on_enter: Option<StatusActionFn>,
    pub extraction: Option<StatusUpdateFn>,
    pub rectification: Option<StatusUpdateFn>,
    pub intents: IntentRow,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The process state machine engine.
pub struct Fsm {
    /// Fixed-size table indexed by `Status as usize`.
    table: [StatusDescriptor; Status::COUNT],
    current: usize,
    tick_count: u64,
    status_entry_tick: u64,
}

impl Fsm {
    pub fn new(table: [StatusDescriptor; Status::COUNT], initial: Status) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            status_entry_tick: 0,
        }
    }

    /// Run the initial `on_enter`.  Call once before the first `tick()`.
    pub fn start(&mut self, ctx: &mut ProcessContext) {
        info!("FSM starting in {} ({})", self.current_status().label(), ctx.mode.label());
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
        self.resolve_intents(ctx);
    }

    /// One control tick: mode-specific update, then intent resolution.
    pub fn tick(&mut self, ctx: &mut ProcessContext) {
        self.tick_count += 1;
        ctx.ticks_in_status = self.tick_count - self.status_entry_tick;

        let row = &self.table[self.current];
        let update = match ctx.mode {
            Mode::Extraction => row.extraction,
            Mode::Rectification => row.rectification,
        };
        if let Some(next) = update.and_then(|f| f(ctx)) {
            self.transition(next, ctx);
        }

        self.resolve_intents(ctx);
    }

    /// Operator stage navigation through [`TRANSITIONS`].
    pub fn navigate(&mut self, event: StageEvent, ctx: &mut ProcessContext) -> Status {
        let (next, action) = navigate(self.current_status(), event, ctx.mode);
        self.transition(next, ctx);
        if action == TransitionAction::ClearOfftake {
            ctx.offtake.real_speed = 0;
            ctx.offtake.valve_open_time_ms = 0;
        }
        self.resolve_intents(ctx);
        next
    }

    /// Immediate transition (supervisor faults).  No-op when already there.
    pub fn force_transition(&mut self, next: Status, ctx: &mut ProcessContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
            self.resolve_intents(ctx);
        }
    }

    pub fn current_status(&self) -> Status {
        Status::from_index(self.current)
    }

    pub fn ticks_in_current_status(&self) -> u64 {
        self.tick_count - self.status_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: Status, ctx: &mut ProcessContext) {
        let next_idx = next as usize;
        info!(
            "Status {} -> {}",
            self.current_status().label(),
            next.label()
        );

        self.current = next_idx;
        self.status_entry_tick = self.tick_count;
        ctx.ticks_in_status = 0;
        ctx.counters.reset_stage();

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    fn resolve_intents(&self, ctx: &mut ProcessContext) {
        let row = self.table[self.current].intents;
        if let Some((one, two)) = row.heaters {
            ctx.intents.heater_one = one;
            ctx.intents.heater_two = two;
        }
        if let Some(sleep) = row.pump_sleep {
            ctx.intents.pump_sleep = sleep;
        }
        states::cooler_hysteresis(ctx);
    }
}
