//! Framing of four-wire JTAG clocks as OScan1 packets over a two-wire `Probe`.
use alloc::vec::Vec;
use alloc::vec;
use log::{debug, trace};

use crate::activation::{ActivationFields, PACKET_BITS};
use crate::cable::{Cable, Probe};
use crate::Error;

/// TMSC toggles sent while TCKC is high for each escape.
pub const SELECT_TOGGLES: usize = 6;
pub const DESELECT_TOGGLES: usize = 8;

pub struct Oscan1Cable<P> {
    probe: P,
    tmsc: bool,
}

impl<P: Probe> Oscan1Cable<P> {
    /// Wrap a probe.  The bridge behind it is assumed to be offline; call `select` before
    /// clocking any JTAG traffic.
    pub fn new(probe: P) -> Self {
        Self { probe, tmsc: true }
    }

    pub fn probe(&mut self) -> &mut P {
        &mut self.probe
    }

    pub fn into_inner(self) -> P {
        self.probe
    }

    fn drive(&mut self, tckc: bool, tmsc: bool) -> Result<bool, Error> {
        self.tmsc = tmsc;
        self.probe.exchange(tckc, Some(tmsc))
    }

    // TCKC high, `toggles` changes of TMSC, TCKC low
    fn escape(&mut self, toggles: usize) -> Result<(), Error> {
        let tmsc = self.tmsc;
        self.drive(false, tmsc)?;
        self.drive(true, tmsc)?;
        for _ in 0..toggles {
            let tmsc = !self.tmsc;
            self.drive(true, tmsc)?;
        }
        let tmsc = self.tmsc;
        self.drive(false, tmsc)?;
        Ok(())
    }

    /// Selection escape followed by the OScan1 activation packet.  Fails with `NotOnline` if the
    /// probe can see the bridge and it did not come online.
    pub fn select(&mut self) -> Result<(), Error> {
        self.escape(SELECT_TOGGLES)?;
        let raw = ActivationFields::OSCAN1.to_raw();
        for bit in 0..PACKET_BITS {
            let level = (raw >> bit) & 1 == 1;
            self.drive(true, level)?;
            self.drive(false, level)?;
        }

        if self.probe.online()? == Some(false) {
            return Err(Error::NotOnline);
        }
        debug!("oscan1 link selected");
        Ok(())
    }

    /// Reset escape.  Only takes effect on a bridge that recognizes escapes while online.
    pub fn deselect(&mut self) -> Result<(), Error> {
        self.escape(DESELECT_TOGGLES)?;
        debug!("oscan1 link deselected");
        Ok(())
    }

    /// Hard reset through the probe.  The link has to be selected again afterwards.
    pub fn hard_reset(&mut self) -> Result<(), Error> {
        self.tmsc = true;
        self.probe.hard_reset()
    }

    pub fn online(&mut self) -> Result<Option<bool>, Error> {
        self.probe.online()
    }

    /// One JTAG clock: nTDI, TMS, then TDO read back while the bridge drives TMSC.
    pub fn packet(&mut self, tdi: bool, tms: bool) -> Result<bool, Error> {
        self.drive(true, !tdi)?;
        self.drive(false, !tdi)?;
        self.drive(true, tms)?;
        self.drive(false, tms)?;
        let tdo = self.probe.exchange(true, None)?;
        self.probe.exchange(false, None)?;
        trace!("packet tdi={} tms={} -> tdo={}", tdi, tms, tdo);
        Ok(tdo)
    }
}

impl<P: Probe> Cable for Oscan1Cable<P> {
    fn change_mode(&mut self, tms: &[usize], tdi: bool) -> Result<(), Error> {
        for t in tms {
            self.packet(tdi, *t != 0)?;
        }
        Ok(())
    }

    fn read_data(&mut self, bits: usize) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0; (bits + 7) / 8];
        for i in 0..bits {
            let tdo = self.packet(true, false)?;
            buf[i / 8] |= (tdo as u8) << (i % 8);
        }
        Ok(buf)
    }

    fn write_data(&mut self, data: &[u8], bits: u8, exit_after: bool) -> Result<(), Error> {
        self.read_write_data(data, bits, exit_after)?;
        Ok(())
    }

    fn read_write_data(&mut self, data: &[u8], bits: u8, exit_after: bool) -> Result<Vec<u8>, Error> {
        if data.is_empty() {
            return Ok(vec![]);
        }

        // Constrain `bits` to be between 1 and 8
        let bits = bits.clamp(1, 8) as usize;
        let total = (data.len() - 1) * 8 + bits;

        let mut out = vec![0; data.len()];
        for i in 0..total {
            let tdi = (data[i / 8] >> (i % 8)) & 1 == 1;
            let tms = exit_after && i == total - 1;
            let tdo = self.packet(tdi, tms)?;
            out[i / 8] |= (tdo as u8) << (i % 8);
        }
        Ok(out)
    }
}
