//! This crate implements a bridge from the two-wire cJTAG OScan1 protocol (IEEE 1149.7) to a
//! standard four-wire JTAG TAP, together with the host-side tooling to talk through it.
//!
//! At the lowest level is the `Bridge`, a synchronous engine that is ticked once per local
//! clock with the raw TCKC and TMSC levels.  It synchronizes both inputs, watches for escape
//! sequences (TMSC toggling while TCKC is held high), validates the activation packet that
//! follows a selection escape, and once online demultiplexes every three TCKC periods into one
//! TCK pulse with its TMS and TDI, driving TDO back onto TMSC.
//!
//! `Simulation` ties a bridge to a device on its four-wire side.  `TapModel` is such a device:
//! a single TAP with IDCODE, BYPASS and a RISC-V style debug transport (DTMCS and DMI).
//!
//! On the host side the `Probe` trait abstracts the two wires.  `Oscan1Cable` wraps a probe,
//! sends the selection escape and activation packet, and then implements the `Cable` trait by
//! framing each JTAG clock as an OScan1 packet.  On top of that, `JtagSM` keeps track of the
//! state of the TAP and gets to any desired state with the fewest TMS clocks, and `Target`
//! reads and writes registers of the TAP by value.
//!
//! With the `std` feature the simulated bridge can be served over TCP by `server::Server` and
//! reached with `cable::remote::RemoteProbe`.
//!
//! # Example
//! ```
//! use cjtag_bridge::bridge::BridgeConfig;
//! use cjtag_bridge::cable::{sim::SimProbe, Oscan1Cable};
//! use cjtag_bridge::sim::Simulation;
//! use cjtag_bridge::statemachine::JtagSM;
//! use cjtag_bridge::target::Target;
//!
//! let probe = SimProbe::new(Simulation::new(BridgeConfig::default()));
//! let mut cable = Oscan1Cable::new(probe);
//! cable.select()?;
//!
//! let jtag = JtagSM::new(&mut cable)?;
//! let mut target = Target::detect(jtag)?;
//! assert_eq!(target.irlen(), 5);
//! assert_eq!(target.idcode()?, 0x1dead3ff);
//! # Ok::<(), cjtag_bridge::Error>(())
//! ```

#![no_std]

#[cfg(feature = "std")]
extern crate std;

extern crate alloc;

pub mod activation;
pub mod bridge;
pub mod cable;
pub mod device;
pub mod error;
pub mod escape;
pub mod oscan1;
#[cfg(feature = "std")]
pub mod server;
pub mod signal;
pub mod sim;
pub mod statemachine;
pub mod target;

pub use bridge::{Bridge, BridgeConfig, BridgeOutputs, BridgeState};
pub use error::Error;
