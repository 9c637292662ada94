//! Bit-banged two-wire probe on `embedded-hal` pins.  TMSC must be an open-drain pin with a
//! pull-up: setting it high releases the line, and reading it returns whatever is on the wire.
use embedded_hal::{delay::DelayNs, digital::{InputPin, OutputPin, PinState}};

use crate::cable::Probe;
use crate::Error;

pub struct Gpio<Tckc, Tmsc, Delay> where Tckc: OutputPin, Tmsc: OutputPin + InputPin, Delay: DelayNs {
    half_period: u32,
    delay: Delay,
    tckc: Tckc,
    tmsc: Tmsc,
}

impl<Tckc, Tmsc, Delay> Gpio<Tckc, Tmsc, Delay> where Tckc: OutputPin, Tmsc: OutputPin + InputPin, Delay: DelayNs {
    /// `freq_khz` is the TCKC frequency.  One JTAG clock takes three TCKC periods.
    pub fn new(freq_khz: u32, tckc: Tckc, tmsc: Tmsc, delay: Delay) -> Result<Gpio<Tckc, Tmsc, Delay>, Error> {
        let period_ns = 1_000_000 / freq_khz.max(1);
        let half_period = period_ns / 2;
        let mut gpio = Gpio { half_period, delay, tckc, tmsc };

        // Idle levels: TCKC low, TMSC high
        gpio.tckc.set_low().map_err(Error::pin)?;
        gpio.tmsc.set_high().map_err(Error::pin)?;
        Ok(gpio)
    }

    pub fn release(self) -> (Tckc, Tmsc, Delay) {
        (self.tckc, self.tmsc, self.delay)
    }
}

impl<Tckc, Tmsc, Delay> Probe for Gpio<Tckc, Tmsc, Delay> where Tckc: OutputPin, Tmsc: OutputPin + InputPin, Delay: DelayNs {
    fn exchange(&mut self, tckc: bool, tmsc: Option<bool>) -> Result<bool, Error> {
        // Releasing the open-drain line is the same as driving it high
        let level = tmsc.unwrap_or(true);
        self.tmsc.set_state(PinState::from(level)).map_err(Error::pin)?;
        self.tckc.set_state(PinState::from(tckc)).map_err(Error::pin)?;

        self.delay.delay_ns(self.half_period);
        self.tmsc.is_high().map_err(Error::pin)
    }

    fn hard_reset(&mut self) -> Result<(), Error> {
        // No reset line; park both wires at their idle levels
        self.tckc.set_low().map_err(Error::pin)?;
        self.tmsc.set_high().map_err(Error::pin)?;
        Ok(())
    }

    fn online(&mut self) -> Result<Option<bool>, Error> {
        Ok(None)
    }
}
