//! Escape-sequence detection.  An escape is made by holding TCKC high and toggling TMSC; the
//! number of toggles seen before TCKC falls again selects the requested mode change.
use log::trace;

use crate::signal::Sampled;

/// Both window counters are 5 bits wide and stick at this value instead of wrapping.
pub const COUNTER_MAX: u8 = 31;

/// Mode-change request decoded from one TCKC-high window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EscapeKind {
    /// 4 or 5 toggles
    Deselect,
    /// 6 or 7 toggles
    Select,
    /// 8 or more toggles
    Reset,
    /// Anything outside the bands above.  Not an error, the window was an ordinary clock.
    NoEvent,
}

/// Classify a toggle count.  The bands are the nominal 4, 6 and 8 toggles with one toggle of
/// tolerance above each; counts outside every band are a no-op.
pub fn classify(toggles: u8) -> EscapeKind {
    match toggles {
        4..=5 => EscapeKind::Deselect,
        6..=7 => EscapeKind::Select,
        8.. => EscapeKind::Reset,
        _ => EscapeKind::NoEvent,
    }
}

/// Counters for the TCKC-high window currently being observed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EscapeWindow {
    pub high_duration: u8,
    pub toggle_count: u8,
}

pub struct EscapeDetector {
    window: EscapeWindow,
    open: bool,
    min_high_ticks: u8,
}

impl EscapeDetector {
    /// `min_high_ticks` is the shortest TCKC-high window that may classify as anything other
    /// than `NoEvent`; zero disables the check.
    pub fn new(min_high_ticks: u8) -> Self {
        Self {
            window: EscapeWindow::default(),
            open: false,
            min_high_ticks: min_high_ticks.min(COUNTER_MAX),
        }
    }

    /// Advance one tick.  Returns the classification on the tick TCKC falls and `None` on every
    /// other tick; the result is not latched, so it must be acted upon immediately.
    ///
    /// A TMSC change on the rising tick itself is not a toggle.  That is the only tick on which
    /// the bridge turns TMSC around, so every toggle counted comes from the probe.
    pub fn sample(&mut self, sampled: &Sampled) -> Option<EscapeKind> {
        let tckc = sampled.tckc();

        if tckc.rising {
            self.window = EscapeWindow { high_duration: 1, toggle_count: 0 };
            self.open = true;
        } else if self.open && tckc.level {
            self.window.high_duration = saturating_step(self.window.high_duration);
            if sampled.tmsc().changed() {
                self.window.toggle_count = saturating_step(self.window.toggle_count);
            }
        }

        if !tckc.falling {
            return None;
        }

        let was_open = core::mem::replace(&mut self.open, false);
        let kind = if was_open && self.window.high_duration >= self.min_high_ticks {
            classify(self.window.toggle_count)
        } else {
            EscapeKind::NoEvent
        };
        if kind != EscapeKind::NoEvent {
            trace!("escape window closed: {:?} -> {:?}", self.window, kind);
        }
        Some(kind)
    }

    /// Counters of the most recent window.  Stale once the window has been classified.
    pub fn window(&self) -> EscapeWindow {
        self.window
    }

    pub fn reset(&mut self) {
        self.window = EscapeWindow::default();
        self.open = false;
    }
}

fn saturating_step(count: u8) -> u8 {
    if count < COUNTER_MAX {
        count + 1
    } else {
        count
    }
}
