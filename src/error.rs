//! Errors raised on the host side of the bridge.  The bridge engine itself never fails; a
//! malformed escape or activation packet simply leaves it offline.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("GPIO pin access failed ({0:?})")]
    Pin(embedded_hal::digital::ErrorKind),

    #[error("bridge did not come online after the selection escape and activation packet")]
    NotOnline,

    #[error("no TAP responded behind the bridge")]
    NoTap,

    #[error("command {command:#04x} answered with unexpected byte {response:#04x}")]
    UnexpectedResponse {
        command: u8,
        response: u8,
    },

    #[error("unknown host command {0:#04x}")]
    UnknownCommand(u8),

    #[cfg(feature = "std")]
    #[error("I/O error talking to the bridge")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wrap an `embedded-hal` pin error.
    pub fn pin<E: embedded_hal::digital::Error>(err: E) -> Self {
        Error::Pin(err.kind())
    }
}
