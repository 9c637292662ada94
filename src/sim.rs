//! Lock-step simulation of the bridge with a device on its four-wire side.
use crate::bridge::{Bridge, BridgeConfig, BridgeOutputs};
use crate::device::{JtagPort, TapModel};
use crate::signal::PinLevels;

/// A bridge and the device it drives, advanced together one tick at a time.
pub struct Simulation<D = TapModel> {
    bridge: Bridge,
    device: D,
    pins: PinLevels,
    ticks: u64,
}

impl Simulation<TapModel> {
    /// Bridge in front of a `TapModel`.
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_device(config, TapModel::new())
    }
}

impl<D: JtagPort> Simulation<D> {
    pub fn with_device(config: BridgeConfig, device: D) -> Self {
        Self {
            bridge: Bridge::new(config),
            device,
            pins: PinLevels::default(),
            ticks: 0,
        }
    }

    /// One tick with the current pin levels.  The bridge sees TDO as the device presented it
    /// before this tick, then the device sees the bridge's new outputs.
    pub fn step(&mut self) -> BridgeOutputs {
        let out = self.bridge.tick(self.pins, self.device.tdo());
        self.device.drive(out.jtag);
        self.ticks += 1;
        out
    }

    /// Set the probe-side pin levels and run `ticks` ticks.
    pub fn run(&mut self, pins: PinLevels, ticks: u32) -> BridgeOutputs {
        self.pins = pins;
        let mut out = self.bridge.outputs();
        for _ in 0..ticks {
            out = self.step();
        }
        out
    }

    /// Hard reset of the bridge together with TRST on the device.
    pub fn hard_reset(&mut self) {
        self.bridge.hard_reset();
        self.device.trst();
        self.device.drive(self.bridge.jtag());
    }

    pub fn pins(&self) -> PinLevels {
        self.pins
    }

    pub fn set_pins(&mut self, pins: PinLevels) {
        self.pins = pins;
    }

    pub fn bridge(&self) -> &Bridge {
        &self.bridge
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Ticks run since creation.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
