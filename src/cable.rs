//! Host side of the two-wire link.  A `Probe` is whatever can put levels on TCKC and TMSC and
//! look at TMSC; the GPIO, simulated and remote probes live in the submodules.  `Oscan1Cable`
//! turns a probe into a `Cable`, the four-wire view `JtagSM` works with, by framing every JTAG
//! clock as an OScan1 packet.
use alloc::vec::Vec;

use crate::Error;

pub mod gpio;
pub mod oscan1;
pub mod sim;
#[cfg(feature = "std")]
pub mod remote;

pub use oscan1::Oscan1Cable;

pub trait Cable {
    /// Clock out a series of TMS values to change the state of the JTAG chain.  Each element of
    /// `tms` determines the value of the TMS line, zero for low and any other value for high.
    /// `tdi` controls the state of the TDI line during mode changes.
    fn change_mode(&mut self, tms: &[usize], tdi: bool) -> Result<(), Error>;
    /// Shift in bits from the TDO line.  `bits` is the total number of bits to read.  Should be
    /// called with state = ShiftIR or ShiftDR, and will remain in that state.  Should clock out
    /// all ones.
    fn read_data(&mut self, bits: usize) -> Result<Vec<u8>, Error>;
    /// Shift out bits on the TDI line, least significant bit of the first byte first.  `bits` is
    /// the number of bits to send from the last byte.  Should be called with state = ShiftIR or
    /// ShiftDR.  State won't change unless `exit_after` is true, in which case TMS is raised on
    /// the last bit and the state will be Exit1IR or Exit1DR on exit.
    fn write_data(&mut self, data: &[u8], bits: u8, exit_after: bool) -> Result<(), Error>;

    fn read_write_data(&mut self, data: &[u8], bits: u8, exit_after: bool) -> Result<Vec<u8>, Error>;
}

/// Raw access to the two wires.
pub trait Probe {
    /// Put `tckc` on TCKC and `tmsc` on TMSC for half a TCKC period, then return the level seen
    /// on TMSC.  `None` releases TMSC so the bridge can drive it.
    fn exchange(&mut self, tckc: bool, tmsc: Option<bool>) -> Result<bool, Error>;

    /// Pulse the bridge's asynchronous reset, if the probe has one.
    fn hard_reset(&mut self) -> Result<(), Error>;

    /// Whether the bridge reports itself online.  `None` when the probe cannot observe it.
    fn online(&mut self) -> Result<Option<bool>, Error>;
}

impl<P: Probe + ?Sized> Probe for &mut P {
    fn exchange(&mut self, tckc: bool, tmsc: Option<bool>) -> Result<bool, Error> {
        (**self).exchange(tckc, tmsc)
    }

    fn hard_reset(&mut self) -> Result<(), Error> {
        (**self).hard_reset()
    }

    fn online(&mut self) -> Result<Option<bool>, Error> {
        (**self).online()
    }
}
