//! Data registers of the modelled device: IDCODE, BYPASS and a minimal RISC-V debug transport
//! module (DTMCS and DMI) in front of a flat 128-word debug module register file.
use log::debug;

/// Instruction register width.
pub const IR_LEN: usize = 5;
/// Default IDCODE of the modelled device.
pub const IDCODE_VALUE: u32 = 0x1dea_d3ff;
/// DTMCS read value: version 1 (0.13), abits 7, idle 0, dmistat 0.
pub const DTMCS_VALUE: u32 = 0x0000_0071;
/// DMI address width.
pub const DMI_ABITS: usize = 7;
/// DMI register width: address, 32-bit data, 2-bit op.
pub const DMI_BITS: usize = DMI_ABITS + 32 + 2;

const DTMCS_DMIRESET: u32 = 1 << 16;
const DTMCS_DMIHARDRESET: u32 = 1 << 17;

/// DMI `op` field values.
pub const DMI_OP_NOP: u8 = 0;
pub const DMI_OP_READ: u8 = 1;
pub const DMI_OP_WRITE: u8 = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Instruction {
    Idcode,
    Dtmcs,
    Dmi,
    Bypass,
}

impl Instruction {
    pub const IDCODE: u8 = 0x01;
    pub const DTMCS: u8 = 0x10;
    pub const DMI: u8 = 0x11;
    pub const BYPASS: u8 = 0x1f;

    /// Unimplemented opcodes select BYPASS.
    pub fn decode(ir: u8) -> Self {
        match ir {
            Self::IDCODE => Instruction::Idcode,
            Self::DTMCS => Instruction::Dtmcs,
            Self::DMI => Instruction::Dmi,
            _ => Instruction::Bypass,
        }
    }

    pub fn opcode(self) -> u8 {
        match self {
            Instruction::Idcode => Self::IDCODE,
            Instruction::Dtmcs => Self::DTMCS,
            Instruction::Dmi => Self::DMI,
            Instruction::Bypass => Self::BYPASS,
        }
    }

    /// Length of the data register this instruction selects.
    pub fn width(self) -> usize {
        match self {
            Instruction::Idcode | Instruction::Dtmcs => 32,
            Instruction::Dmi => DMI_BITS,
            Instruction::Bypass => 1,
        }
    }
}

/// Pack a DMI request as shifted into the DMI register.
pub fn dmi_request(addr: u8, data: u32, op: u8) -> u64 {
    ((addr as u64 & 0x7f) << 34) | ((data as u64) << 2) | (op as u64 & 0x3)
}

/// Split a DMI register value into `(addr, data, op)`.
pub fn dmi_fields(value: u64) -> (u8, u32, u8) {
    (((value >> 34) & 0x7f) as u8, (value >> 2) as u32, (value & 0x3) as u8)
}

pub struct DebugRegisters {
    idcode: u32,
    words: [u32; 1 << DMI_ABITS],
    dmi_addr: u8,
    dmi_data: u32,
}

impl DebugRegisters {
    pub fn new() -> Self {
        Self::with_idcode(IDCODE_VALUE)
    }

    pub fn with_idcode(idcode: u32) -> Self {
        Self {
            idcode,
            words: [0; 1 << DMI_ABITS],
            dmi_addr: 0,
            dmi_data: 0,
        }
    }

    pub fn idcode(&self) -> u32 {
        self.idcode
    }

    /// Value loaded into the shift register in Capture-DR.
    pub fn capture(&self, instruction: Instruction) -> u64 {
        match instruction {
            Instruction::Idcode => self.idcode as u64,
            Instruction::Dtmcs => DTMCS_VALUE as u64,
            Instruction::Dmi => dmi_request(self.dmi_addr, self.dmi_data, DMI_OP_NOP),
            Instruction::Bypass => 0,
        }
    }

    /// Apply the shift register contents in Update-DR.
    pub fn update(&mut self, instruction: Instruction, value: u64) {
        match instruction {
            Instruction::Dtmcs => {
                if value as u32 & (DTMCS_DMIRESET | DTMCS_DMIHARDRESET) != 0 {
                    debug!("dtmcs: dmi reset");
                    self.dmi_addr = 0;
                    self.dmi_data = 0;
                }
            }
            Instruction::Dmi => {
                let (addr, data, op) = dmi_fields(value);
                match op {
                    DMI_OP_READ => {
                        self.dmi_addr = addr;
                        self.dmi_data = self.words[addr as usize];
                        debug!("dmi read {:#04x} -> {:#010x}", addr, self.dmi_data);
                    }
                    DMI_OP_WRITE => {
                        self.dmi_addr = addr;
                        self.words[addr as usize] = data;
                        debug!("dmi write {:#04x} <- {:#010x}", addr, data);
                    }
                    _ => {}
                }
            }
            Instruction::Idcode | Instruction::Bypass => {}
        }
    }

    /// Direct access to the debug module register file.
    pub fn word(&self, addr: u8) -> u32 {
        self.words[(addr & 0x7f) as usize]
    }

    pub fn set_word(&mut self, addr: u8, value: u32) {
        self.words[(addr & 0x7f) as usize] = value;
    }
}

impl Default for DebugRegisters {
    fn default() -> Self {
        Self::new()
    }
}
