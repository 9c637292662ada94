//! A convenience wrapper for the single TAP behind the bridge.  `Target` remembers the length of
//! the instruction register and the last instruction written, so that registers can be read and
//! written by value without the caller dealing with shift states and byte buffers.
use alloc::vec::Vec;
use core::ops::DerefMut;

use log::{debug, info};

use crate::cable::Cable;
use crate::device::registers::{dmi_fields, dmi_request, Instruction, DMI_BITS, DMI_OP_NOP, DMI_OP_READ, DMI_OP_WRITE};
use crate::statemachine::{JtagSM, JtagState, Register};
use crate::Error;

/// Give up looking for the end of the instruction register after this many bits.
const MAX_IR_SCAN: usize = 256;

// `bits` low bits of `value`, packed LSB first, and the number of bits used in the last byte
fn to_bytes(value: u64, bits: usize) -> (Vec<u8>, u8) {
    let bytes = (bits + 7) / 8;
    let buf: Vec<u8> = (0..bytes).map(|i| value.checked_shr(8 * i as u32).unwrap_or(0) as u8).collect();
    let last = match bits % 8 {
        0 => 8,
        n => n as u8,
    };
    (buf, last)
}

fn from_bytes(buf: &[u8], bits: usize) -> u64 {
    let value = buf.iter().take(8).enumerate().fold(0u64, |acc, (i, b)| acc | (*b as u64) << (8 * i));
    if bits >= 64 {
        value
    } else {
        value & ((1 << bits) - 1)
    }
}

pub struct Target<T> {
    pub sm: JtagSM<T>,
    irlen: usize,
    ir: Option<u64>,
}

impl<T, U> Target<T>
    where T: DerefMut<Target=U>,
          U: Cable + ?Sized
{
    /// Wrap a state machine for a TAP with a known instruction register length.
    pub fn new(sm: JtagSM<T>, irlen: usize) -> Self {
        Self { sm, irlen, ir: None }
    }

    /// Wrap a state machine and find the instruction register length by scanning.
    pub fn detect(sm: JtagSM<T>) -> Result<Self, Error> {
        let mut target = Self::new(sm, 0);
        target.irlen = target.detect_irlen()?;
        Ok(target)
    }

    pub fn irlen(&self) -> usize {
        self.irlen
    }

    /// Find the instruction register length.  Capture-IR loads a value ending in `01`, and the
    /// ones clocked in behind it mark the end of the register.
    pub fn detect_irlen(&mut self) -> Result<usize, Error> {
        self.sm.mode_reset()?;
        self.ir = None;

        let mut count: i32 = -1;
        let mut irlen = None;
        for _ in 0..MAX_IR_SCAN {
            let bit = self.sm.read_reg(Register::Instruction, 1)?;
            if bit[0] != 0 {
                if count > 0 && irlen.is_none() {
                    debug!("found IR len {}", count + 1);
                    irlen = Some((count + 1) as usize);
                }
                if count == 0 {
                    break;
                }
                count = 0;
            } else {
                count += 1;
            }
        }

        // Leaving through Update-IR loads BYPASS; reset puts IDCODE back
        self.sm.mode_reset()?;
        let irlen = irlen.ok_or(Error::NoTap)?;
        self.irlen = irlen;
        Ok(irlen)
    }

    /// IDCODE as loaded by Test-Logic-Reset.
    pub fn idcode(&mut self) -> Result<u32, Error> {
        self.sm.mode_reset()?;
        self.ir = None;
        let bits = self.sm.read_reg(Register::Data, 32)?;
        self.sm.change_mode(JtagState::Idle)?;

        let idcode = from_bytes(&bits, 32) as u32;
        if idcode & 1 == 0 {
            return Err(Error::NoTap);
        }
        info!("idcode {:#010x}", idcode);
        Ok(idcode)
    }

    /// Shift `ir` into the instruction register and update it.
    pub fn write_ir(&mut self, ir: u64) -> Result<(), Error> {
        if self.irlen == 0 {
            return Err(Error::NoTap);
        }
        let (buf, last) = to_bytes(ir, self.irlen);
        self.sm.write_reg(Register::Instruction, &buf, last, true)?;
        self.sm.change_mode(JtagState::Idle)?;
        self.ir = Some(ir);
        Ok(())
    }

    fn select(&mut self, ir: u8) -> Result<(), Error> {
        if self.ir != Some(ir as u64) {
            self.write_ir(ir as u64)?;
        }
        Ok(())
    }

    /// Shift `value` through the selected data register, update it, and return what was
    /// captured.
    pub fn scan_dr(&mut self, value: u64, bits: usize) -> Result<u64, Error> {
        let (buf, last) = to_bytes(value, bits);
        let out = self.sm.read_write_reg(Register::Data, &buf, last, true)?;
        self.sm.change_mode(JtagState::Idle)?;
        Ok(from_bytes(&out, bits))
    }

    /// Capture the selected data register, shifting zeroes in.
    pub fn read_dr(&mut self, bits: usize) -> Result<u64, Error> {
        self.scan_dr(0, bits)
    }

    /// Debug transport module control and status.
    pub fn dtmcs(&mut self) -> Result<u32, Error> {
        self.select(Instruction::DTMCS)?;
        Ok(self.read_dr(32)? as u32)
    }

    /// Write one word of the debug module.
    pub fn dmi_write(&mut self, addr: u8, data: u32) -> Result<(), Error> {
        self.select(Instruction::DMI)?;
        self.scan_dr(dmi_request(addr, data, DMI_OP_WRITE), DMI_BITS)?;
        Ok(())
    }

    /// Read one word of the debug module.  The read is issued by one scan and collected by a
    /// second.
    pub fn dmi_read(&mut self, addr: u8) -> Result<u32, Error> {
        self.select(Instruction::DMI)?;
        self.scan_dr(dmi_request(addr, 0, DMI_OP_READ), DMI_BITS)?;
        let (_, data, _) = dmi_fields(self.scan_dr(dmi_request(0, 0, DMI_OP_NOP), DMI_BITS)?);
        Ok(data)
    }
}
