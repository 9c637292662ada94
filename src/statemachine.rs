//! The sixteen-state TAP controller.  `JtagState::next` is the IEEE 1149.1 transition table; it
//! drives both the device model behind the bridge and `JtagSM`, which sits on the host side of a
//! `Cable`, keeps track of the state of the TAP and gets to any desired state by the shortest
//! TMS path.
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use alloc::vec;

use crate::cable::Cable;
use crate::Error;

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum Register {
    Data,
    Instruction
}

#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum JtagState {
    Reset = 0,
    Idle = 1,
    SelectDR = 2,
    CaptureDR = 3,
    ShiftDR = 4,
    Exit1DR = 5,
    PauseDR = 6,
    Exit2DR = 7,
    UpdateDR = 8,
    SelectIR = 9,
    CaptureIR = 10,
    ShiftIR = 11,
    Exit1IR = 12,
    PauseIR = 13,
    Exit2IR = 14,
    UpdateIR = 15,
}

impl JtagState {
    pub const ALL: [JtagState; 16] = [
        JtagState::Reset, JtagState::Idle,
        JtagState::SelectDR, JtagState::CaptureDR, JtagState::ShiftDR, JtagState::Exit1DR,
        JtagState::PauseDR, JtagState::Exit2DR, JtagState::UpdateDR,
        JtagState::SelectIR, JtagState::CaptureIR, JtagState::ShiftIR, JtagState::Exit1IR,
        JtagState::PauseIR, JtagState::Exit2IR, JtagState::UpdateIR,
    ];

    /// State entered on the next TCK rising edge for the given TMS level.
    pub fn next(self, tms: bool) -> JtagState {
        use JtagState::*;
        match (self, tms) {
            (Reset, false) => Idle,
            (Reset, true) => Reset,
            (Idle, false) => Idle,
            (Idle, true) => SelectDR,

            (SelectDR, false) => CaptureDR,
            (SelectDR, true) => SelectIR,
            (CaptureDR, false) | (ShiftDR, false) | (Exit2DR, false) => ShiftDR,
            (CaptureDR, true) | (ShiftDR, true) => Exit1DR,
            (Exit1DR, false) | (PauseDR, false) => PauseDR,
            (Exit1DR, true) | (Exit2DR, true) => UpdateDR,
            (PauseDR, true) => Exit2DR,
            (UpdateDR, false) | (UpdateIR, false) => Idle,
            (UpdateDR, true) | (UpdateIR, true) => SelectDR,

            (SelectIR, false) => CaptureIR,
            (SelectIR, true) => Reset,
            (CaptureIR, false) | (ShiftIR, false) | (Exit2IR, false) => ShiftIR,
            (CaptureIR, true) | (ShiftIR, true) => Exit1IR,
            (Exit1IR, false) | (PauseIR, false) => PauseIR,
            (Exit1IR, true) | (Exit2IR, true) => UpdateIR,
            (PauseIR, true) => Exit2IR,
        }
    }

    /// TMS levels of the shortest path from `self` to `target`.  Empty if already there.
    pub fn path_to(self, target: JtagState) -> Vec<usize> {
        if self == target {
            return vec![];
        }

        // Breadth-first over the 16 states; every state is reachable from every other one
        let mut from: [Option<(JtagState, usize)>; 16] = [None; 16];
        let mut queue = VecDeque::new();
        queue.push_back(self);
        while let Some(state) = queue.pop_front() {
            for tms in [0, 1] {
                let next = state.next(tms != 0);
                if next == self || from[next as usize].is_some() {
                    continue;
                }
                from[next as usize] = Some((state, tms));
                if next == target {
                    queue.clear();
                    break;
                }
                queue.push_back(next);
            }
        }

        let mut path = Vec::new();
        let mut state = target;
        while let Some((prev, tms)) = from[state as usize] {
            path.push(tms);
            state = prev;
        }
        path.reverse();
        path
    }
}

pub struct JtagSM<T> {
    pub cable: T,
    state: JtagState,
}

impl<T, U> JtagSM<T>
    where T: core::ops::DerefMut<Target=U>,
          U: Cable + ?Sized
{
    /// Create a JTAG state machine using an existing `Cable`.  The TAP is forced into
    /// Test-Logic-Reset.
    pub fn new(cable: T) -> Result<Self, Error> {
        let mut sm = Self {
            cable,
            state: JtagState::Reset,
        };
        sm.mode_reset()?;
        Ok(sm)
    }

    /// Reset the TAP by driving TMS high for 5 clocks
    pub fn mode_reset(&mut self) -> Result<(), Error> {
        self.cable.change_mode(&[1, 1, 1, 1, 1], true)?;
        self.state = JtagState::Reset;
        Ok(())
    }

    pub fn state(&self) -> JtagState {
        self.state
    }

    /// Use TMS to get into `state` by the most efficient path
    pub fn change_mode(&mut self, state: JtagState) -> Result<(), Error> {
        if self.state == state {
            return Ok(());
        }

        let path = self.state.path_to(state);
        log::trace!("path from {:?} to {:?}: {:?}", self.state, state, path);
        self.cable.change_mode(&path, true)?;
        self.state = state;
        Ok(())
    }

    fn enter_shift(&mut self, reg: Register) -> Result<(), Error> {
        match reg {
            Register::Data => self.change_mode(JtagState::ShiftDR),
            Register::Instruction => self.change_mode(JtagState::ShiftIR),
        }
    }

    fn after_shift(&mut self, reg: Register, exit_after: bool) {
        if exit_after {
            self.state = match reg {
                Register::Data => JtagState::Exit1DR,
                Register::Instruction => JtagState::Exit1IR,
            };
        }
    }

    /// Read `bits` from either the instruction or data register, staying in the shift state
    pub fn read_reg(&mut self, reg: Register, bits: usize) -> Result<Vec<u8>, Error> {
        self.enter_shift(reg)?;
        self.cable.read_data(bits)
    }

    /// Write `data` into either the instruction or data register.  `bits` indicates how many bits
    /// of the last byte should be written (8 indicates that the entire byte should be written).
    /// The mode will either be ShiftIR / ShiftDR if `exit_after` is false, or Exit1IR / Exit1DR
    /// if `exit_after` is true.  This allows for setting the register with multiple calls to
    /// `write_reg`, which may be more convenient than manual bit-shifting.
    pub fn write_reg(&mut self, reg: Register, data: &[u8], bits: u8, exit_after: bool) -> Result<(), Error> {
        self.enter_shift(reg)?;
        self.cable.write_data(data, bits, exit_after)?;
        self.after_shift(reg, exit_after);
        Ok(())
    }

    /// Similar to `write_reg` except it returns the bits that were shifted out during writing.
    pub fn read_write_reg(&mut self, reg: Register, data: &[u8], bits: u8, exit_after: bool) -> Result<Vec<u8>, Error> {
        self.enter_shift(reg)?;
        let data = self.cable.read_write_data(data, bits, exit_after)?;
        self.after_shift(reg, exit_after);
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(start: JtagState, path: &[usize]) -> JtagState {
        path.iter().fold(start, |state, tms| state.next(*tms != 0))
    }

    #[test]
    fn five_ones_reach_reset_from_anywhere() {
        for state in JtagState::ALL {
            assert_eq!(walk(state, &[1, 1, 1, 1, 1]), JtagState::Reset, "from {:?}", state);
        }
    }

    #[test]
    fn shortest_paths() {
        assert_eq!(JtagState::Reset.path_to(JtagState::ShiftDR), vec![0, 1, 0, 0]);
        assert_eq!(JtagState::Reset.path_to(JtagState::ShiftIR), vec![0, 1, 1, 0, 0]);
        assert_eq!(JtagState::Exit1DR.path_to(JtagState::Idle), vec![1, 0]);
        assert_eq!(JtagState::Idle.path_to(JtagState::Idle), Vec::<usize>::new());
    }

    #[test]
    fn every_path_arrives() {
        for from in JtagState::ALL {
            for to in JtagState::ALL {
                let path = from.path_to(to);
                assert_eq!(walk(from, &path), to, "{:?} -> {:?}", from, to);
            }
        }
    }
}
