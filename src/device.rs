//! The four-wire side of the bridge.  Whatever sits there implements `JtagPort`; `TapModel` is a
//! complete single-TAP device with a small RISC-V style debug transport register set, used by
//! the simulation and the tests.
pub mod registers;
pub mod tap;

pub use registers::{DebugRegisters, Instruction};
pub use tap::TapModel;

use crate::oscan1::JtagPins;

/// A device driven by the bridge's TCK/TMS/TDI outputs.
pub trait JtagPort {
    /// Apply the levels the bridge drives on this tick.  Implementations act on TCK edges.
    fn drive(&mut self, pins: JtagPins);
    /// Current TDO level.
    fn tdo(&self) -> bool;
    /// Asynchronous TAP reset (TRST).
    fn trst(&mut self);
}

impl<T: JtagPort + ?Sized> JtagPort for &mut T {
    fn drive(&mut self, pins: JtagPins) {
        (**self).drive(pins)
    }

    fn tdo(&self) -> bool {
        (**self).tdo()
    }

    fn trst(&mut self) {
        (**self).trst()
    }
}
