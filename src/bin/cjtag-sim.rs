//! Serves a simulated cJTAG bridge, with a `TapModel` behind it, on a TCP port.
use std::net::{Ipv4Addr, SocketAddr};

use clap::Parser;
use log::info;

use cjtag_bridge::bridge::BridgeConfig;
use cjtag_bridge::server::{Server, ServerConfig};
use cjtag_bridge::sim::Simulation;
use cjtag_bridge::Error;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// TCP port to listen on
    #[arg(short = 'p', long = "port", env = "VPI_PORT", default_value_t = 3333)]
    port: u16,
    /// Bridge ticks run after every pin change
    #[arg(long = "ticks-per-command", default_value_t = 5)]
    ticks_per_command: u32,
    /// Idle ticks run after a hard reset
    #[arg(long = "reset-ticks", default_value_t = 10)]
    reset_ticks: u32,
    /// Shortest TCKC-high window, in ticks, accepted as an escape (0 accepts any)
    #[arg(long = "min-escape-high-ticks", default_value_t = 0)]
    min_escape_high_ticks: u8,
    /// Recognize reset and deselect escapes while online
    #[arg(long = "online-escapes", default_value_t = false)]
    online_escapes: bool,
}

fn main() -> Result<(), Error> {
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let bridge = BridgeConfig {
        min_escape_high_ticks: args.min_escape_high_ticks,
        online_escapes: args.online_escapes,
    };
    let config = ServerConfig {
        ticks_per_command: args.ticks_per_command.max(1),
        reset_ticks: args.reset_ticks,
    };
    info!("bridge {:?}, server {:?}", bridge, config);

    let mut server = Server::new(Simulation::new(bridge), config);
    server.listen(SocketAddr::from((Ipv4Addr::LOCALHOST, args.port)))?;
    info!("simulation finished after {} ticks", server.sim().ticks());
    Ok(())
}
