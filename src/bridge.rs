//! The bridge orchestrator.  `Bridge` owns the synchronizer, the escape detector and whichever
//! of the activation packet or the OScan1 codec belongs to the current state, and advances all
//! of them in lock-step once per tick.
//!
//! ```text
//!   Offline --select escape--> ActivationPending --valid packet--> Active
//!      ^                              |                              |
//!      +--- reset/deselect escape ----+                              |
//!      +--- invalid packet -----------+                              |
//!      +--------------------- hard reset only ----------------------+
//! ```
use log::{debug, info, warn};

use crate::activation::ActivationPacket;
use crate::escape::{EscapeDetector, EscapeKind};
use crate::oscan1::{JtagPins, Oscan1Codec, SharedLine};
use crate::signal::{PinLevels, Sampled, Synchronizer};

/// Bridge tuning knobs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Shortest TCKC-high window, in ticks, that may be classified as an escape.  Zero accepts
    /// any window.
    pub min_escape_high_ticks: u8,
    /// Recognize reset and deselect escapes while online.  When off, the online state is only
    /// left through a hard reset.
    pub online_escapes: bool,
}

/// Which state the bridge is in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BridgeState {
    Offline,
    ActivationPending,
    Active,
}

// State plus the transient record that is live in it.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Link {
    Offline,
    ActivationPending(ActivationPacket),
    Active(Oscan1Codec),
}

impl Link {
    fn state(&self) -> BridgeState {
        match self {
            Link::Offline => BridgeState::Offline,
            Link::ActivationPending(_) => BridgeState::ActivationPending,
            Link::Active(_) => BridgeState::Active,
        }
    }

    /// The transition function.  `escape` is the detector's verdict for this tick, present only
    /// on TCKC falling edges.
    fn next(self, sampled: &Sampled, escape: Option<EscapeKind>, tdo: bool, config: &BridgeConfig) -> Self {
        match self {
            Link::Offline => match escape {
                Some(EscapeKind::Select) => Link::ActivationPending(ActivationPacket::new()),
                _ => Link::Offline,
            },
            Link::ActivationPending(mut packet) => match escape {
                None => Link::ActivationPending(packet),
                Some(EscapeKind::Reset) | Some(EscapeKind::Deselect) => Link::Offline,
                Some(EscapeKind::Select) => Link::ActivationPending(ActivationPacket::new()),
                Some(EscapeKind::NoEvent) => match packet.push(sampled.tmsc().level) {
                    None => Link::ActivationPending(packet),
                    Some(Ok(fields)) => {
                        info!("activation packet accepted: {:?}", fields);
                        Link::Active(Oscan1Codec::new())
                    }
                    Some(Err(rejection)) => {
                        warn!("activation packet rejected: {}", rejection);
                        Link::Offline
                    }
                },
            },
            Link::Active(mut codec) => match escape {
                Some(EscapeKind::Reset) | Some(EscapeKind::Deselect) if config.online_escapes => Link::Offline,
                _ => {
                    codec.sample(sampled, tdo);
                    // TMSC moved under a high TCKC, so the probe is sending an escape
                    let tckc = sampled.tckc();
                    if config.online_escapes && tckc.level && !tckc.rising && sampled.tmsc().changed() {
                        codec.release();
                    }
                    Link::Active(codec)
                }
            },
        }
    }
}

/// What the bridge presents to the outside world after a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BridgeOutputs {
    pub jtag: JtagPins,
    pub tmsc: SharedLine,
    /// True only while online.
    pub online: bool,
    /// True while the standard four-wire protocol is in effect, i.e. whenever not online.
    pub standard_protocol: bool,
}

/// Two-wire to four-wire protocol engine.
///
/// The engine is a synchronous sequential machine: call `tick` once per local clock with the
/// raw TCKC/TMSC levels and the downstream TDO.  It never blocks and never fails; anything it
/// does not understand leaves it offline.
pub struct Bridge {
    config: BridgeConfig,
    sync: Synchronizer,
    escape: EscapeDetector,
    link: Link,
}

impl Bridge {
    pub fn new(config: BridgeConfig) -> Self {
        Self {
            config,
            sync: Synchronizer::new(),
            escape: EscapeDetector::new(config.min_escape_high_ticks),
            link: Link::Offline,
        }
    }

    /// Advance one tick.
    pub fn tick(&mut self, pins: PinLevels, tdo: bool) -> BridgeOutputs {
        let sampled = self.sync.sample(pins);
        let escape = self.escape.sample(&sampled);

        let before = self.link.state();
        let link = core::mem::replace(&mut self.link, Link::Offline);
        self.link = link.next(&sampled, escape, tdo, &self.config);

        let after = self.link.state();
        if before != after {
            debug!("bridge {:?} -> {:?} ({:?})", before, after, escape);
        }
        self.outputs()
    }

    /// Asynchronous reset: back to offline with every transient record cleared.
    pub fn hard_reset(&mut self) {
        if self.link.state() != BridgeState::Offline {
            debug!("bridge {:?} -> Offline (hard reset)", self.link.state());
        }
        self.sync.reset();
        self.escape.reset();
        self.link = Link::Offline;
    }

    pub fn state(&self) -> BridgeState {
        self.link.state()
    }

    pub fn online(&self) -> bool {
        self.state() == BridgeState::Active
    }

    pub fn standard_protocol(&self) -> bool {
        !self.online()
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Four-wire pins; idle unless online.
    pub fn jtag(&self) -> JtagPins {
        match &self.link {
            Link::Active(codec) => codec.pins(),
            _ => JtagPins::IDLE,
        }
    }

    pub fn tmsc(&self) -> SharedLine {
        match &self.link {
            Link::Active(codec) => codec.tmsc(),
            _ => SharedLine::RELEASED,
        }
    }

    /// Bits received of an activation packet in progress, if one is.
    pub fn activation_progress(&self) -> Option<u8> {
        match &self.link {
            Link::ActivationPending(packet) => Some(packet.len()),
            _ => None,
        }
    }

    /// The codec, while online.
    pub fn codec(&self) -> Option<&Oscan1Codec> {
        match &self.link {
            Link::Active(codec) => Some(codec),
            _ => None,
        }
    }

    pub fn outputs(&self) -> BridgeOutputs {
        BridgeOutputs {
            jtag: self.jtag(),
            tmsc: self.tmsc(),
            online: self.online(),
            standard_protocol: self.standard_protocol(),
        }
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Self::new(BridgeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::ActivationFields;
    use crate::oscan1::{Direction, PacketSlot};

    const HOLD: usize = 4;

    struct Drive {
        bridge: Bridge,
        tmsc: bool,
    }

    impl Drive {
        fn new(config: BridgeConfig) -> Self {
            let mut drive = Self { bridge: Bridge::new(config), tmsc: true };
            drive.hold(false, true);
            drive
        }

        fn hold(&mut self, tckc: bool, tmsc: bool) -> BridgeOutputs {
            self.tmsc = tmsc;
            let mut out = self.bridge.outputs();
            for _ in 0..HOLD {
                out = self.bridge.tick(PinLevels::new(tckc, tmsc), false);
            }
            out
        }

        fn clock(&mut self, tmsc: bool) {
            self.hold(true, tmsc);
            self.hold(false, tmsc);
        }

        fn escape(&mut self, toggles: usize) {
            let tmsc = self.tmsc;
            self.hold(false, tmsc);
            self.hold(true, tmsc);
            for _ in 0..toggles {
                let tmsc = !self.tmsc;
                self.hold(true, tmsc);
            }
            let tmsc = self.tmsc;
            self.hold(false, tmsc);
        }

        fn activation(&mut self, raw: u16) {
            for bit in 0..12 {
                self.clock((raw >> bit) & 1 == 1);
            }
        }

        fn packet(&mut self, tdi: bool, tms: bool) {
            self.clock(!tdi);
            self.clock(tms);
            self.clock(false);
        }
    }

    #[test]
    fn starts_offline_and_idle() {
        let bridge = Bridge::default();
        let out = bridge.outputs();
        assert_eq!(bridge.state(), BridgeState::Offline);
        assert!(!out.online);
        assert!(out.standard_protocol);
        assert_eq!(out.jtag, JtagPins::IDLE);
        assert_eq!(out.tmsc.direction, Direction::Input);
    }

    #[test]
    fn select_then_activation_goes_online() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(6);
        assert_eq!(drive.bridge.state(), BridgeState::ActivationPending);
        assert_eq!(drive.bridge.activation_progress(), Some(0));
        assert_eq!(drive.bridge.jtag(), JtagPins::IDLE);

        drive.activation(ActivationFields::OSCAN1.to_raw());
        assert_eq!(drive.bridge.state(), BridgeState::Active);
        assert!(drive.bridge.online());
        assert!(!drive.bridge.standard_protocol());
        assert_eq!(drive.bridge.codec().map(|c| c.slot()), Some(PacketSlot::InvertedDataIn));
    }

    #[test]
    fn seven_toggles_also_select() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(7);
        assert_eq!(drive.bridge.state(), BridgeState::ActivationPending);
    }

    #[test]
    fn bad_check_field_returns_offline() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(6);
        let bad = ActivationFields { check: 0, ..ActivationFields::OSCAN1 };
        drive.activation(bad.to_raw());
        assert_eq!(drive.bridge.state(), BridgeState::Offline);
        assert_eq!(drive.bridge.activation_progress(), None);
    }

    #[test]
    fn deselect_from_offline_is_noop() {
        for toggles in [4, 5] {
            let mut drive = Drive::new(BridgeConfig::default());
            drive.escape(toggles);
            assert_eq!(drive.bridge.state(), BridgeState::Offline);
        }
    }

    #[test]
    fn reset_is_idempotent_offline() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(8);
        assert_eq!(drive.bridge.state(), BridgeState::Offline);
        drive.escape(9);
        assert_eq!(drive.bridge.state(), BridgeState::Offline);
    }

    #[test]
    fn reset_escape_abandons_activation() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(6);
        drive.clock(false);
        drive.clock(false);
        assert_eq!(drive.bridge.activation_progress(), Some(2));
        drive.escape(8);
        assert_eq!(drive.bridge.state(), BridgeState::Offline);
    }

    #[test]
    fn repeated_select_restarts_activation() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(6);
        drive.clock(true);
        drive.escape(6);
        assert_eq!(drive.bridge.activation_progress(), Some(0));
        drive.activation(ActivationFields::OSCAN1.to_raw());
        assert!(drive.bridge.online());
    }

    #[test]
    fn escapes_ignored_while_active() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(6);
        drive.activation(ActivationFields::OSCAN1.to_raw());
        for toggles in [4, 5, 8, 12] {
            drive.escape(toggles);
            assert_eq!(drive.bridge.state(), BridgeState::Active, "toggles {}", toggles);
        }

        drive.bridge.hard_reset();
        assert_eq!(drive.bridge.state(), BridgeState::Offline);
        assert_eq!(drive.bridge.jtag(), JtagPins::IDLE);
    }

    #[test]
    fn online_escapes_extension() {
        let config = BridgeConfig { online_escapes: true, ..BridgeConfig::default() };
        let mut drive = Drive::new(config);
        drive.escape(6);
        drive.activation(ActivationFields::OSCAN1.to_raw());
        drive.packet(true, false);
        drive.escape(8);
        assert_eq!(drive.bridge.state(), BridgeState::Offline);

        drive.escape(6);
        drive.activation(ActivationFields::OSCAN1.to_raw());
        drive.escape(5);
        assert_eq!(drive.bridge.state(), BridgeState::Offline);
    }

    #[test]
    fn online_escape_lands_in_any_slot() {
        let config = BridgeConfig { online_escapes: true, ..BridgeConfig::default() };
        for toggles in [8, 10] {
            for slot in 0..3 {
                let mut drive = Drive::new(config);
                drive.escape(6);
                drive.activation(ActivationFields::OSCAN1.to_raw());
                for _ in 0..slot {
                    drive.clock(false);
                }
                drive.escape(toggles);
                assert_eq!(drive.bridge.state(), BridgeState::Offline, "slot {} toggles {}", slot, toggles);
            }
        }
    }

    #[test]
    fn toggle_during_data_out_releases_tmsc() {
        let config = BridgeConfig { online_escapes: true, ..BridgeConfig::default() };
        let mut drive = Drive::new(config);
        drive.escape(6);
        drive.activation(ActivationFields::OSCAN1.to_raw());
        drive.clock(false);
        drive.clock(false);

        let level = drive.tmsc;
        assert!(drive.hold(true, level).tmsc.driven());
        assert!(!drive.hold(true, !level).tmsc.driven());
        drive.hold(false, !level);
        assert!(drive.bridge.online());
        assert_eq!(drive.bridge.codec().map(|c| c.slot()), Some(PacketSlot::InvertedDataIn));
    }

    #[test]
    fn bridge_keeps_driving_without_online_escapes() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(6);
        drive.activation(ActivationFields::OSCAN1.to_raw());
        drive.clock(false);
        drive.clock(false);

        let level = drive.tmsc;
        drive.hold(true, level);
        assert!(drive.hold(true, !level).tmsc.driven());
    }

    #[test]
    fn deselect_escape_abandons_activation() {
        for toggles in [4, 5] {
            let mut drive = Drive::new(BridgeConfig::default());
            drive.escape(6);
            drive.clock(true);
            assert_eq!(drive.bridge.activation_progress(), Some(1));
            drive.escape(toggles);
            assert_eq!(drive.bridge.state(), BridgeState::Offline, "toggles {}", toggles);
        }
    }

    #[test]
    fn hard_reset_mid_activation_discards_bits() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(6);
        let raw = ActivationFields::OSCAN1.to_raw();
        for bit in 0..5 {
            drive.clock((raw >> bit) & 1 == 1);
        }
        assert_eq!(drive.bridge.activation_progress(), Some(5));

        drive.bridge.hard_reset();
        assert_eq!(drive.bridge.state(), BridgeState::Offline);
        assert_eq!(drive.bridge.activation_progress(), None);

        drive.escape(6);
        assert_eq!(drive.bridge.activation_progress(), Some(0));
        drive.activation(raw);
        assert_eq!(drive.bridge.state(), BridgeState::Active);
    }

    #[test]
    fn hard_reset_clears_open_escape_window() {
        let mut drive = Drive::new(BridgeConfig::default());
        let tmsc = drive.tmsc;
        drive.hold(false, tmsc);
        drive.hold(true, tmsc);
        for _ in 0..5 {
            let tmsc = !drive.tmsc;
            drive.hold(true, tmsc);
        }
        assert_eq!(drive.bridge.escape.window().toggle_count, 5);

        drive.bridge.hard_reset();
        assert_eq!(drive.bridge.escape.window().toggle_count, 0);

        // TCKC is still high; the synchronizer restarts from idle and sees a fresh rising edge
        drive.hold(true, true);
        assert_eq!(drive.bridge.escape.window().toggle_count, 0);
        for _ in 0..6 {
            let tmsc = !drive.tmsc;
            drive.hold(true, tmsc);
        }
        assert_eq!(drive.bridge.escape.window().toggle_count, 6);
        let tmsc = drive.tmsc;
        drive.hold(false, tmsc);
        assert_eq!(drive.bridge.state(), BridgeState::ActivationPending);
    }

    #[test]
    fn online_escapes_do_not_fire_on_select() {
        let config = BridgeConfig { online_escapes: true, ..BridgeConfig::default() };
        let mut drive = Drive::new(config);
        drive.escape(6);
        drive.activation(ActivationFields::OSCAN1.to_raw());
        drive.escape(6);
        assert!(drive.bridge.online());
    }

    #[test]
    fn packets_drive_four_wire_side() {
        let mut drive = Drive::new(BridgeConfig::default());
        drive.escape(6);
        drive.activation(ActivationFields::OSCAN1.to_raw());

        drive.clock(false); // nTDI = 0 -> TDI = 1
        drive.clock(true); // TMS = 1
        let out = drive.hold(true, false);
        assert_eq!(out.jtag, JtagPins { tck: true, tms: true, tdi: true });
        assert!(out.tmsc.driven());
        let out = drive.hold(false, false);
        assert!(!out.jtag.tck);
        assert_eq!(drive.bridge.codec().map(|c| c.packets()), Some(1));
    }
}
