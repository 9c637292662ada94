//! A probe wired straight into an in-process `Simulation`.
use crate::cable::Probe;
use crate::device::{JtagPort, TapModel};
use crate::signal::PinLevels;
use crate::sim::Simulation;
use crate::Error;

/// Ticks run per exchange unless configured otherwise.  Enough for the two-stage synchronizer
/// plus the tick that acts on the edge.
pub const DEFAULT_TICKS_PER_EXCHANGE: u32 = 5;

pub struct SimProbe<D = TapModel> {
    sim: Simulation<D>,
    ticks_per_exchange: u32,
    reset_ticks: u32,
}

impl<D: JtagPort> SimProbe<D> {
    pub fn new(sim: Simulation<D>) -> Self {
        Self {
            sim,
            ticks_per_exchange: DEFAULT_TICKS_PER_EXCHANGE,
            reset_ticks: 2 * DEFAULT_TICKS_PER_EXCHANGE,
        }
    }

    pub fn with_ticks(mut self, ticks_per_exchange: u32) -> Self {
        self.ticks_per_exchange = ticks_per_exchange.max(1);
        self
    }

    pub fn sim(&self) -> &Simulation<D> {
        &self.sim
    }

    pub fn sim_mut(&mut self) -> &mut Simulation<D> {
        &mut self.sim
    }

    pub fn into_inner(self) -> Simulation<D> {
        self.sim
    }
}

impl<D: JtagPort> Probe for SimProbe<D> {
    fn exchange(&mut self, tckc: bool, tmsc: Option<bool>) -> Result<bool, Error> {
        // A released line keeps its last level
        let level = tmsc.unwrap_or(self.sim.pins().tmsc);
        let out = self.sim.run(PinLevels::new(tckc, level), self.ticks_per_exchange);
        Ok(if out.tmsc.driven() { out.tmsc.value } else { level })
    }

    fn hard_reset(&mut self) -> Result<(), Error> {
        self.sim.hard_reset();
        self.sim.run(PinLevels::default(), self.reset_ticks);
        Ok(())
    }

    fn online(&mut self) -> Result<Option<bool>, Error> {
        Ok(Some(self.sim.bridge().online()))
    }
}
