//! Capture of the two asynchronous compact-interface pins (TCKC and TMSC) into the bridge's tick
//! domain.  Every other part of the bridge sees the outside world only through a `Sampled`
//! produced here, so nothing can read a raw pin level by accident.

/// Level TCKC is assumed to rest at after a hard reset.
pub const TCKC_IDLE: bool = false;
/// Level TMSC is assumed to rest at after a hard reset (pulled up).
pub const TMSC_IDLE: bool = true;

/// Raw levels on the two compact-interface pins, as presented by the probe for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinLevels {
    pub tckc: bool,
    pub tmsc: bool,
}

impl PinLevels {
    pub const fn new(tckc: bool, tmsc: bool) -> Self {
        Self { tckc, tmsc }
    }
}

impl Default for PinLevels {
    fn default() -> Self {
        Self::new(TCKC_IDLE, TMSC_IDLE)
    }
}

/// Stabilized level of one line plus the edge events seen on this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Edges {
    pub level: bool,
    pub rising: bool,
    pub falling: bool,
}

impl Edges {
    /// True when the stabilized level differs from the previous tick.
    pub fn changed(&self) -> bool {
        self.rising || self.falling
    }
}

/// Synchronized view of both lines for a single tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Sampled {
    tckc: Edges,
    tmsc: Edges,
}

impl Sampled {
    pub(crate) const fn new(tckc: Edges, tmsc: Edges) -> Self {
        Self { tckc, tmsc }
    }

    pub fn tckc(&self) -> Edges {
        self.tckc
    }

    pub fn tmsc(&self) -> Edges {
        self.tmsc
    }
}

// capture -> stable is the 2-stage synchronizer, `previous` is the edge detector's history
#[derive(Clone, Copy, Debug)]
struct SyncLine {
    capture: bool,
    stable: bool,
    previous: bool,
}

impl SyncLine {
    const fn new(level: bool) -> Self {
        Self { capture: level, stable: level, previous: level }
    }

    fn shift(&mut self, raw: bool) -> Edges {
        self.previous = self.stable;
        self.stable = self.capture;
        self.capture = raw;

        Edges {
            level: self.stable,
            rising: self.stable && !self.previous,
            falling: !self.stable && self.previous,
        }
    }
}

/// Two-stage synchronizer and edge detector for TCKC and TMSC.
///
/// A level presented to `sample` becomes visible in the returned `Sampled` on the following
/// call, i.e. two ticks after it was captured.  Both lines go through identical stages, so a
/// TMSC level that was stable across a TCKC edge is still stable on the tick that edge is
/// reported.
#[derive(Clone, Debug)]
pub struct Synchronizer {
    tckc: SyncLine,
    tmsc: SyncLine,
}

impl Synchronizer {
    pub const fn new() -> Self {
        Self {
            tckc: SyncLine::new(TCKC_IDLE),
            tmsc: SyncLine::new(TMSC_IDLE),
        }
    }

    /// Advance one tick with the current raw pin levels.
    pub fn sample(&mut self, pins: PinLevels) -> Sampled {
        let tckc = self.tckc.shift(pins.tckc);
        let tmsc = self.tmsc.shift(pins.tmsc);
        Sampled::new(tckc, tmsc)
    }

    /// Reload the idle levels, discarding anything in flight.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_tick_latency() {
        let mut sync = Synchronizer::new();
        sync.sample(PinLevels::default());
        sync.sample(PinLevels::default());

        let first = sync.sample(PinLevels::new(true, TMSC_IDLE));
        assert!(!first.tckc().level);
        assert!(!first.tckc().rising);

        let second = sync.sample(PinLevels::new(true, TMSC_IDLE));
        assert!(second.tckc().level);
        assert!(second.tckc().rising);

        let third = sync.sample(PinLevels::new(true, TMSC_IDLE));
        assert!(third.tckc().level);
        assert!(!third.tckc().rising);
    }

    #[test]
    fn falling_edge_and_change() {
        let mut sync = Synchronizer::new();
        let mut seen = None;
        for tick in 0..6 {
            let s = sync.sample(PinLevels::new(false, tick < 2));
            if s.tmsc().changed() {
                assert!(s.tmsc().falling);
                assert!(seen.is_none());
                seen = Some(tick);
            }
        }
        assert_eq!(seen, Some(3));
    }

    #[test]
    fn every_level_change_is_reported() {
        // a single-tick pulse must not be lost
        let mut sync = Synchronizer::new();
        let raw = [false, true, false, true, true, false, false, false];
        let mut rising = 0;
        let mut falling = 0;
        for level in raw {
            let s = sync.sample(PinLevels::new(level, TMSC_IDLE));
            rising += s.tckc().rising as u32;
            falling += s.tckc().falling as u32;
        }
        assert_eq!(rising, 2);
        assert_eq!(falling, 2);
    }

    #[test]
    fn reset_restores_idle_levels() {
        let mut sync = Synchronizer::new();
        for _ in 0..4 {
            sync.sample(PinLevels::new(true, false));
        }
        sync.reset();
        let s = sync.sample(PinLevels::default());
        assert_eq!(s.tckc(), Edges { level: TCKC_IDLE, rising: false, falling: false });
        assert_eq!(s.tmsc(), Edges { level: TMSC_IDLE, rising: false, falling: false });
    }
}
