//! A single IEEE 1149.1 TAP with a 5-bit instruction register.
use crate::device::registers::{DebugRegisters, Instruction, IR_LEN};
use crate::device::JtagPort;
use crate::oscan1::JtagPins;
use crate::statemachine::JtagState;

pub struct TapModel {
    state: JtagState,
    ir: u8,
    shift: u64,
    shift_len: usize,
    tck: bool,
    tdo: bool,
    registers: DebugRegisters,
}

impl TapModel {
    pub fn new() -> Self {
        Self::with_registers(DebugRegisters::new())
    }

    pub fn with_registers(registers: DebugRegisters) -> Self {
        Self {
            state: JtagState::Reset,
            ir: Instruction::IDCODE,
            shift: 0,
            shift_len: 0,
            tck: false,
            tdo: false,
            registers,
        }
    }

    pub fn state(&self) -> JtagState {
        self.state
    }

    /// Current contents of the instruction register.
    pub fn ir(&self) -> u8 {
        self.ir
    }

    pub fn instruction(&self) -> Instruction {
        Instruction::decode(self.ir)
    }

    pub fn registers(&self) -> &DebugRegisters {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut DebugRegisters {
        &mut self.registers
    }

    // TCK rising edge: act on the current state, then move
    fn clock(&mut self, tms: bool, tdi: bool) {
        match self.state {
            JtagState::CaptureIR => {
                self.shift = self.ir as u64;
                self.shift_len = IR_LEN;
            }
            JtagState::CaptureDR => {
                let instruction = self.instruction();
                self.shift = self.registers.capture(instruction);
                self.shift_len = instruction.width();
            }
            JtagState::ShiftIR | JtagState::ShiftDR => {
                self.shift >>= 1;
                if tdi {
                    self.shift |= 1 << (self.shift_len - 1);
                }
            }
            JtagState::UpdateIR => {
                self.ir = (self.shift & ((1 << IR_LEN) - 1)) as u8;
            }
            JtagState::UpdateDR => {
                let instruction = self.instruction();
                self.registers.update(instruction, self.shift);
            }
            _ => {}
        }

        self.state = self.state.next(tms);
        if self.state == JtagState::Reset {
            self.ir = Instruction::IDCODE;
        }
    }
}

impl Default for TapModel {
    fn default() -> Self {
        Self::new()
    }
}

impl JtagPort for TapModel {
    fn drive(&mut self, pins: JtagPins) {
        let rising = pins.tck && !self.tck;
        let falling = !pins.tck && self.tck;
        self.tck = pins.tck;

        if rising {
            self.clock(pins.tms, pins.tdi);
        }
        // TDO changes on the falling edge and is only driven while shifting
        if falling {
            self.tdo = match self.state {
                JtagState::ShiftIR | JtagState::ShiftDR => self.shift & 1 == 1,
                _ => false,
            };
        }
    }

    fn tdo(&self) -> bool {
        self.tdo
    }

    fn trst(&mut self) {
        self.state = JtagState::Reset;
        self.ir = Instruction::IDCODE;
        self.tdo = false;
    }
}
