//! The 12-bit activation packet that arms the bridge after a selection escape.
//!
//! The packet carries three 4-bit fields, least significant bit first: the OScan1 activation
//! code (`identifier`), the scan format code (`format`) and a check field that must equal the
//! bitwise XOR of the other two.
use core::fmt;

/// Identifier field accepted by this bridge.
pub const OAC_IDENTIFIER: u8 = 0b1100;
/// Scan format field accepted by this bridge (OScan1).
pub const OAC_FORMAT: u8 = 0b1000;
/// Number of bits in an activation packet.
pub const PACKET_BITS: u8 = 12;

/// The three fields of an activation packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActivationFields {
    pub identifier: u8,
    pub format: u8,
    pub check: u8,
}

impl ActivationFields {
    /// The only packet the bridge accepts.
    pub const OSCAN1: Self = Self {
        identifier: OAC_IDENTIFIER,
        format: OAC_FORMAT,
        check: OAC_IDENTIFIER ^ OAC_FORMAT,
    };

    /// Split a raw packet into fields in reception order.
    pub fn from_raw(raw: u16) -> Self {
        Self {
            identifier: (raw & 0xf) as u8,
            format: ((raw >> 4) & 0xf) as u8,
            check: ((raw >> 8) & 0xf) as u8,
        }
    }

    /// Raw packet value; bit 0 is transmitted first.
    pub fn to_raw(&self) -> u16 {
        (self.identifier & 0xf) as u16
            | ((self.format & 0xf) as u16) << 4
            | ((self.check & 0xf) as u16) << 8
    }

    pub fn expected_check(&self) -> u8 {
        (self.identifier ^ self.format) & 0xf
    }

    pub fn validate(&self) -> Result<(), Rejection> {
        if self.identifier != OAC_IDENTIFIER {
            return Err(Rejection::Identifier(self.identifier));
        }
        if self.format != OAC_FORMAT {
            return Err(Rejection::Format(self.format));
        }
        let expected = self.expected_check();
        if self.check != expected {
            return Err(Rejection::Check { expected, received: self.check });
        }
        Ok(())
    }
}

/// Why an activation packet was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    Identifier(u8),
    Format(u8),
    Check { expected: u8, received: u8 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Identifier(id) => write!(f, "identifier {:#06b} is not {:#06b}", id, OAC_IDENTIFIER),
            Rejection::Format(format) => write!(f, "format {:#06b} is not {:#06b}", format, OAC_FORMAT),
            Rejection::Check { expected, received } => {
                write!(f, "check field {:#06b} does not match {:#06b}", received, expected)
            }
        }
    }
}

/// Accumulator for an activation packet being received.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActivationPacket {
    bits: u16,
    index: u8,
}

impl ActivationPacket {
    pub const fn new() -> Self {
        Self { bits: 0, index: 0 }
    }

    /// Number of bits received so far.
    pub fn len(&self) -> u8 {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.index == 0
    }

    /// Shift in the next bit.  Once the 12th bit arrives the packet is judged and the
    /// accumulator is cleared whatever the outcome; before that `None` is returned.
    pub fn push(&mut self, bit: bool) -> Option<Result<ActivationFields, Rejection>> {
        self.bits |= (bit as u16) << self.index;
        self.index += 1;
        if self.index < PACKET_BITS {
            return None;
        }

        let fields = ActivationFields::from_raw(self.bits);
        *self = Self::new();
        Some(fields.validate().map(|()| fields))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(raw: u16) -> Result<ActivationFields, Rejection> {
        let mut packet = ActivationPacket::new();
        for i in 0..PACKET_BITS - 1 {
            assert_eq!(packet.push((raw >> i) & 1 == 1), None);
        }
        let verdict = packet.push((raw >> (PACKET_BITS - 1)) & 1 == 1).expect("12th bit decides");
        assert!(packet.is_empty());
        verdict
    }

    #[test]
    fn accepts_oscan1_packet() {
        assert_eq!(ActivationFields::OSCAN1.check, 0b0100);
        assert_eq!(ActivationFields::OSCAN1.to_raw(), 0x48c);
        assert_eq!(feed(0x48c), Ok(ActivationFields::OSCAN1));
    }

    #[test]
    fn rejects_every_single_bit_error() {
        for bit in 0..PACKET_BITS {
            assert!(feed(0x48c ^ (1 << bit)).is_err(), "bit {} flipped", bit);
        }
    }

    #[test]
    fn rejects_all_zero_and_all_one() {
        assert_eq!(feed(0x000), Err(Rejection::Identifier(0)));
        assert_eq!(feed(0xfff), Err(Rejection::Identifier(0xf)));
    }

    #[test]
    fn reports_failing_field() {
        let bad_format = ActivationFields { identifier: OAC_IDENTIFIER, format: 0b0001, check: 0b1101 };
        assert_eq!(feed(bad_format.to_raw()), Err(Rejection::Format(0b0001)));

        let bad_check = ActivationFields { check: 0, ..ActivationFields::OSCAN1 };
        assert_eq!(feed(bad_check.to_raw()), Err(Rejection::Check { expected: 0b0100, received: 0 }));
    }

    #[test]
    fn only_one_packet_is_accepted() {
        let accepted = (0..0x1000u16).filter(|raw| feed(*raw).is_ok()).count();
        assert_eq!(accepted, 1);
    }

    #[test]
    fn field_order_is_reception_order() {
        let fields = ActivationFields::from_raw(0b0100_1000_1100);
        assert_eq!(fields, ActivationFields { identifier: 0b1100, format: 0b1000, check: 0b0100 });
    }
}
