//! OScan1 packet codec.  Once the bridge is online every JTAG clock is carried by a packet of
//! three TCKC periods on the shared TMSC line:
//!
//! ```text
//! slot 0: nTDI   probe -> bridge   sampled on TCKC fall
//! slot 1: TMS    probe -> bridge   sampled on TCKC fall
//! slot 2: TDO    bridge -> probe   TCK pulses high while TCKC is high
//! ```
use log::trace;

use crate::signal::Sampled;

/// Levels driven onto the four-wire side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JtagPins {
    pub tck: bool,
    pub tms: bool,
    pub tdi: bool,
}

impl JtagPins {
    /// Driven whenever the bridge is not online: TCK low, TMS high, TDI low.
    pub const IDLE: Self = Self { tck: false, tms: true, tdi: false };
}

impl Default for JtagPins {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Who drives TMSC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// The probe drives, the bridge listens.
    Input,
    /// The bridge drives `SharedLine::value`.
    Output,
}

/// The bridge's side of the bidirectional TMSC pad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SharedLine {
    pub direction: Direction,
    pub value: bool,
}

impl SharedLine {
    pub const RELEASED: Self = Self { direction: Direction::Input, value: false };

    pub fn driven(&self) -> bool {
        self.direction == Direction::Output
    }
}

impl Default for SharedLine {
    fn default() -> Self {
        Self::RELEASED
    }
}

/// Position within the current packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketSlot {
    InvertedDataIn = 0,
    ModeSelect = 1,
    DataOut = 2,
}

impl PacketSlot {
    pub fn next(self) -> Self {
        match self {
            PacketSlot::InvertedDataIn => PacketSlot::ModeSelect,
            PacketSlot::ModeSelect => PacketSlot::DataOut,
            PacketSlot::DataOut => PacketSlot::InvertedDataIn,
        }
    }
}

/// Demultiplexes TMSC into TCK/TMS/TDI and returns TDO, one slot per TCKC period.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Oscan1Codec {
    slot: PacketSlot,
    sampled: bool,
    pins: JtagPins,
    tmsc: SharedLine,
    packets: u64,
}

impl Oscan1Codec {
    /// Start at slot 0 with the four-wire side idle.
    pub fn new() -> Self {
        Self {
            slot: PacketSlot::InvertedDataIn,
            sampled: false,
            pins: JtagPins::IDLE,
            tmsc: SharedLine::RELEASED,
            packets: 0,
        }
    }

    /// Advance one tick.  `tdo` is the downstream TDO level on this tick; it is only looked at
    /// on the rising edge that opens the data-out slot, where it is registered onto TMSC.
    pub fn sample(&mut self, sampled: &Sampled, tdo: bool) {
        let tckc = sampled.tckc();

        if tckc.rising {
            match self.slot {
                PacketSlot::InvertedDataIn => {
                    self.pins.tck = false;
                    self.tmsc.direction = Direction::Input;
                }
                PacketSlot::ModeSelect => {
                    self.pins.tdi = !self.sampled;
                }
                PacketSlot::DataOut => {
                    self.pins.tms = self.sampled;
                    self.pins.tck = true;
                    self.tmsc = SharedLine { direction: Direction::Output, value: tdo };
                }
            }
        }

        if tckc.falling {
            match self.slot {
                PacketSlot::InvertedDataIn | PacketSlot::ModeSelect => {
                    self.sampled = sampled.tmsc().level;
                }
                PacketSlot::DataOut => {
                    self.pins.tck = false;
                    self.packets += 1;
                    trace!("oscan1 packet {}: tdi={} tms={} tdo={}",
                           self.packets, self.pins.tdi, self.pins.tms, self.tmsc.value);
                }
            }
            self.slot = self.slot.next();
        }
    }

    pub fn slot(&self) -> PacketSlot {
        self.slot
    }

    pub fn pins(&self) -> JtagPins {
        self.pins
    }

    pub fn tmsc(&self) -> SharedLine {
        self.tmsc
    }

    /// Stop driving TMSC until the next data-out slot.
    pub fn release(&mut self) {
        if self.tmsc.driven() {
            trace!("oscan1 releasing tmsc in slot {:?}", self.slot);
            self.tmsc.direction = Direction::Input;
        }
    }

    /// Bit last sampled from TMSC.
    pub fn sampled(&self) -> bool {
        self.sampled
    }

    /// Completed packets since activation.
    pub fn packets(&self) -> u64 {
        self.packets
    }
}

impl Default for Oscan1Codec {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Edges;

    fn edge(rising: bool, falling: bool, tmsc: bool) -> Sampled {
        Sampled::new(
            Edges { level: rising, rising, falling },
            Edges { level: tmsc, rising: false, falling: false },
        )
    }

    fn rise(codec: &mut Oscan1Codec, tmsc: bool, tdo: bool) {
        codec.sample(&edge(true, false, tmsc), tdo);
    }

    fn fall(codec: &mut Oscan1Codec, tmsc: bool) {
        codec.sample(&edge(false, true, tmsc), false);
    }

    // Returns the TMSC value the bridge presents during slot 2.
    fn packet(codec: &mut Oscan1Codec, tdi: bool, tms: bool, tdo: bool) -> SharedLine {
        rise(codec, !tdi, false);
        fall(codec, !tdi);
        rise(codec, tms, false);
        fall(codec, tms);
        rise(codec, false, tdo);
        let line = codec.tmsc();
        fall(codec, false);
        line
    }

    #[test]
    fn slot_wraps() {
        assert_eq!(PacketSlot::InvertedDataIn.next(), PacketSlot::ModeSelect);
        assert_eq!(PacketSlot::ModeSelect.next(), PacketSlot::DataOut);
        assert_eq!(PacketSlot::DataOut.next(), PacketSlot::InvertedDataIn);
    }

    #[test]
    fn slot_outputs() {
        let mut codec = Oscan1Codec::new();
        assert_eq!(codec.pins(), JtagPins::IDLE);

        rise(&mut codec, false, false);
        assert!(!codec.pins().tck);
        assert_eq!(codec.tmsc().direction, Direction::Input);
        fall(&mut codec, false);
        assert_eq!(codec.slot(), PacketSlot::ModeSelect);

        rise(&mut codec, true, false);
        assert!(codec.pins().tdi, "tdi is the complement of the slot 0 bit");
        assert!(!codec.pins().tck);
        assert_eq!(codec.tmsc().direction, Direction::Input);
        fall(&mut codec, false);
        assert_eq!(codec.slot(), PacketSlot::DataOut);

        rise(&mut codec, false, true);
        assert_eq!(codec.pins(), JtagPins { tck: true, tms: false, tdi: true });
        assert_eq!(codec.tmsc(), SharedLine { direction: Direction::Output, value: true });
        fall(&mut codec, false);
        assert!(!codec.pins().tck);
        assert_eq!(codec.slot(), PacketSlot::InvertedDataIn);
        // the line stays driven until the next packet starts
        assert!(codec.tmsc().driven());

        rise(&mut codec, true, false);
        assert_eq!(codec.tmsc().direction, Direction::Input);
        assert_eq!(codec.packets(), 1);
    }

    #[test]
    fn tdo_is_registered_on_slot_2_rise() {
        let mut codec = Oscan1Codec::new();
        rise(&mut codec, true, false);
        fall(&mut codec, true);
        rise(&mut codec, false, false);
        fall(&mut codec, false);
        rise(&mut codec, false, true);
        // TDO changing after the rising edge does not reach TMSC
        codec.sample(&edge(false, false, false), false);
        assert!(codec.tmsc().value);
    }

    #[test]
    fn thousand_identical_packets() {
        let mut codec = Oscan1Codec::new();
        for n in 0..1000u32 {
            let tdo = n % 3 == 0;
            let line = packet(&mut codec, true, false, tdo);
            assert_eq!(line, SharedLine { direction: Direction::Output, value: tdo });
            assert_eq!(codec.pins(), JtagPins { tck: false, tms: false, tdi: true });
        }
        assert_eq!(codec.packets(), 1000);
        assert_eq!(codec.slot(), PacketSlot::InvertedDataIn);
    }

    #[test]
    fn pins_hold_between_packets() {
        let mut codec = Oscan1Codec::new();
        packet(&mut codec, true, true, false);
        for _ in 0..100 {
            codec.sample(&edge(false, false, true), false);
        }
        assert_eq!(codec.pins(), JtagPins { tck: false, tms: true, tdi: true });
    }
}
