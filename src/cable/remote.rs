//! Client for the bridge command channel served by `crate::server`.
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use log::debug;

use crate::cable::Probe;
use crate::server::command;
use crate::Error;

pub struct RemoteProbe<S = TcpStream> {
    stream: S,
    tmsc: bool,
}

impl RemoteProbe<TcpStream> {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, Error> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        debug!("connected to {:?}", stream.peer_addr()?);
        Ok(Self::new(stream))
    }
}

impl<S: Read + Write> RemoteProbe<S> {
    pub fn new(stream: S) -> Self {
        Self { stream, tmsc: true }
    }

    fn transact(&mut self, request: &[u8]) -> Result<u8, Error> {
        self.stream.write_all(request)?;
        let mut reply = [0u8; 1];
        self.stream.read_exact(&mut reply)?;
        if reply[0] == command::ERROR {
            return Err(Error::UnexpectedResponse { command: request[0], response: reply[0] });
        }
        Ok(reply[0])
    }

    /// Read one of the bridge's signals by its `command::signal` id.
    pub fn signal(&mut self, id: u8) -> Result<bool, Error> {
        Ok(self.transact(&[command::GET_SIGNAL, id])? & 1 == 1)
    }

    /// Ask the server to end the session and stop.
    pub fn stop(mut self) -> Result<(), Error> {
        self.stream.write_all(&[command::STOP])?;
        self.stream.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> S {
        self.stream
    }
}

impl<S: Read + Write> Probe for RemoteProbe<S> {
    fn exchange(&mut self, tckc: bool, tmsc: Option<bool>) -> Result<bool, Error> {
        if let Some(level) = tmsc {
            self.tmsc = level;
        }
        let reply = self.transact(&[command::OSCAN1_RAW, (tckc as u8) | ((self.tmsc as u8) << 1)])?;
        Ok(reply & 1 == 1)
    }

    fn hard_reset(&mut self) -> Result<(), Error> {
        self.tmsc = true;
        match self.transact(&[command::RESET])? {
            0 => Ok(()),
            response => Err(Error::UnexpectedResponse { command: command::RESET, response }),
        }
    }

    fn online(&mut self) -> Result<Option<bool>, Error> {
        self.signal(command::signal::ONLINE).map(Some)
    }
}
