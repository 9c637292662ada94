//! Host command channel.  A TCP client drives the two-wire pins of a simulated bridge one
//! command at a time and reads back the bridge's signals.
//!
//! Every command is one byte followed by its arguments.  The pin commands move one wire at a
//! time; `TMS_SEQ` and the `SCAN_CHAIN` pair frame whole OScan1 packets on the server side, one
//! per JTAG bit.  Unknown commands answer `command::ERROR`.
//!
//! The server handles one client at a time on the calling thread.
use std::io::{self, ErrorKind, Read, Write};
use std::net::{TcpListener, ToSocketAddrs};
use std::vec;
use std::vec::Vec;

use log::{debug, info, warn};

use crate::device::{JtagPort, TapModel};
use crate::signal::PinLevels;
use crate::sim::Simulation;
use crate::Error;

pub mod command {
    /// Hard reset followed by a few idle clocks.  Reply 0.
    pub const RESET: u8 = 0x00;
    /// Arguments: bit count, then one byte of TMS bits, LSB first.  At most 8 packets are
    /// clocked with TDI low.  Reply 0.
    pub const TMS_SEQ: u8 = 0x01;
    /// Arguments: big-endian 16-bit bit count, then that many TDI bits packed LSB first.  One
    /// packet per bit with TMS low.  Reply: the TDO bits, packed the same way.
    pub const SCAN_CHAIN: u8 = 0x02;
    /// As `SCAN_CHAIN`, but TMS is raised on the last bit.
    pub const SCAN_CHAIN_FLIP_TMS: u8 = 0x03;
    /// End the session and stop serving.  No reply.
    pub const STOP: u8 = 0x04;
    /// Read one signal, argument is a `signal` id.  Reply 0 or 1.
    pub const GET_SIGNAL: u8 = 0x05;
    /// Set TCKC to the argument's bit 0.  No reply.
    pub const TCKC: u8 = 0x10;
    /// Set TMSC to the argument's bit 0.  No reply.
    pub const WRITE: u8 = 0x11;
    /// Reply with the level the bridge drives on TMSC.
    pub const READ: u8 = 0x12;
    /// Argument bit 0 TCKC, bit 1 TMSC.  Reply bit 0 is the TMSC level seen on the wire, bit 1
    /// is set while the bridge drives TMSC.
    pub const OSCAN1_RAW: u8 = 0x20;
    /// Reply to anything not understood.
    pub const ERROR: u8 = 0xff;

    pub mod signal {
        pub const TMSC: u8 = 0;
        pub const ONLINE: u8 = 1;
        pub const STANDARD_PROTOCOL: u8 = 2;
        pub const TCK: u8 = 3;
        pub const TMS: u8 = 4;
        pub const TDI: u8 = 5;
        pub const TDO: u8 = 6;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Ticks run after every command that changes a pin.
    pub ticks_per_command: u32,
    /// Idle ticks run after a hard reset.
    pub reset_ticks: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ticks_per_command: 5,
            reset_ticks: 10,
        }
    }
}

/// How a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Session {
    /// The client went away.
    Closed,
    /// The client asked the server to stop.
    Stop,
}

pub struct Server<D = TapModel> {
    sim: Simulation<D>,
    config: ServerConfig,
}

impl<D: JtagPort> Server<D> {
    pub fn new(sim: Simulation<D>, config: ServerConfig) -> Self {
        Self { sim, config }
    }

    pub fn sim(&self) -> &Simulation<D> {
        &self.sim
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind `addr` and serve clients until one sends `STOP`.
    pub fn listen<A: ToSocketAddrs>(&mut self, addr: A) -> Result<(), Error> {
        let listener = TcpListener::bind(addr)?;
        self.run(listener)
    }

    /// Serve clients from an already bound listener until one sends `STOP`.
    pub fn run(&mut self, listener: TcpListener) -> Result<(), Error> {
        info!("listening on {}", listener.local_addr()?);
        for stream in listener.incoming() {
            let stream = stream?;
            stream.set_nodelay(true)?;
            let peer = stream.peer_addr()?;
            info!("client {} connected", peer);

            match self.serve(stream) {
                Ok(Session::Stop) => {
                    info!("stop requested by {}", peer);
                    return Ok(());
                }
                Ok(Session::Closed) => info!("client {} disconnected", peer),
                Err(e) => warn!("session with {} failed: {}", peer, e),
            }
        }
        Ok(())
    }

    /// Run one session on `stream` until the client closes it or asks to stop.
    pub fn serve<S: Read + Write>(&mut self, mut stream: S) -> Result<Session, Error> {
        loop {
            let cmd = match read_byte(&mut stream)? {
                Some(cmd) => cmd,
                None => return Ok(Session::Closed),
            };
            if cmd == command::STOP {
                return Ok(Session::Stop);
            }
            let reply = self.execute(cmd, &mut stream)?;
            if !reply.is_empty() {
                stream.write_all(&reply)?;
                stream.flush()?;
            }
        }
    }

    // Reply bytes for `cmd`, empty when the command has no reply
    fn execute<S: Read>(&mut self, cmd: u8, stream: &mut S) -> Result<Vec<u8>, Error> {
        let reply = match cmd {
            command::RESET => {
                debug!("hard reset");
                self.sim.hard_reset();
                self.sim.run(PinLevels::default(), self.config.reset_ticks);
                Some(0)
            }
            command::TMS_SEQ => {
                let bits = argument(stream)?;
                let tms = argument(stream)?;
                for i in 0..bits.min(8) {
                    self.packet(false, (tms >> i) & 1 == 1);
                }
                Some(0)
            }
            command::SCAN_CHAIN | command::SCAN_CHAIN_FLIP_TMS => {
                let bits = u16::from_be_bytes([argument(stream)?, argument(stream)?]) as usize;
                let mut tdi = vec![0u8; (bits + 7) / 8];
                stream.read_exact(&mut tdi)?;
                debug!("scan {} bits", bits);

                let mut tdo = vec![0u8; tdi.len()];
                for i in 0..bits {
                    let last = i + 1 == bits;
                    let tms = last && cmd == command::SCAN_CHAIN_FLIP_TMS;
                    if self.packet(tdi[i / 8] >> (i % 8) & 1 == 1, tms) {
                        tdo[i / 8] |= 1 << (i % 8);
                    }
                }
                return Ok(tdo);
            }
            command::GET_SIGNAL => {
                let id = argument(stream)?;
                match self.signal(id) {
                    Some(value) => Some(value as u8),
                    None => {
                        warn!("unknown signal id {}", id);
                        Some(command::ERROR)
                    }
                }
            }
            command::TCKC => {
                let tckc = argument(stream)? & 1 == 1;
                let tmsc = self.sim.pins().tmsc;
                self.sim.run(PinLevels::new(tckc, tmsc), self.config.ticks_per_command);
                None
            }
            command::WRITE => {
                let tmsc = argument(stream)? & 1 == 1;
                let tckc = self.sim.pins().tckc;
                self.sim.run(PinLevels::new(tckc, tmsc), self.config.ticks_per_command);
                None
            }
            command::READ => Some(self.sim.bridge().tmsc().value as u8),
            command::OSCAN1_RAW => {
                let arg = argument(stream)?;
                let pins = PinLevels::new(arg & 1 == 1, arg & 2 == 2);
                let out = self.sim.run(pins, self.config.ticks_per_command);
                Some(self.tmsc_level() as u8 | (out.tmsc.driven() as u8) << 1)
            }
            _ => {
                warn!("{}", Error::UnknownCommand(cmd));
                Some(command::ERROR)
            }
        };
        Ok(reply.into_iter().collect())
    }

    fn step(&mut self, tckc: bool, tmsc: bool) {
        self.sim.run(PinLevels::new(tckc, tmsc), self.config.ticks_per_command);
    }

    // One OScan1 packet: nTDI, TMS, then TDO read back while TCKC is high in the third slot
    fn packet(&mut self, tdi: bool, tms: bool) -> bool {
        self.step(true, !tdi);
        self.step(false, !tdi);
        self.step(true, tms);
        self.step(false, tms);
        self.step(true, tms);
        let tdo = self.tmsc_level();
        self.step(false, tms);
        tdo
    }

    // What a probe sees on TMSC: the bridge's level while it drives, otherwise its own
    fn tmsc_level(&self) -> bool {
        let line = self.sim.bridge().tmsc();
        if line.driven() {
            line.value
        } else {
            self.sim.pins().tmsc
        }
    }

    fn signal(&self, id: u8) -> Option<bool> {
        let bridge = self.sim.bridge();
        let jtag = bridge.jtag();
        let value = match id {
            command::signal::TMSC => self.tmsc_level(),
            command::signal::ONLINE => bridge.online(),
            command::signal::STANDARD_PROTOCOL => bridge.standard_protocol(),
            command::signal::TCK => jtag.tck,
            command::signal::TMS => jtag.tms,
            command::signal::TDI => jtag.tdi,
            command::signal::TDO => self.sim.device().tdo(),
            _ => return None,
        };
        Some(value)
    }
}

fn read_byte<S: Read>(stream: &mut S) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    match stream.read_exact(&mut buf) {
        Ok(()) => Ok(Some(buf[0])),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e),
    }
}

fn argument<S: Read>(stream: &mut S) -> Result<u8, Error> {
    read_byte(stream)?.ok_or_else(|| Error::Io(ErrorKind::UnexpectedEof.into()))
}
