//! Feature modules: optional peripheral attachments applied to a SoC under
//! composition.
//!
//! Each module is a single state transition on [`SocState`] that reports what
//! it did as a [`FeatureAttachment`].

pub mod boot;
pub mod flash;
pub mod gpio;
pub mod network;
pub mod video;

use std::fmt;

use serde::Serialize;
use vexsoc_platform::{Endianness, Namespace, PinResource};

use crate::arbiter::Port;
use crate::compose::SocState;
use crate::error::Result;
use crate::wiring::{SignalRef, Tristate, Wire};

pub use boot::BootConfig;
pub use flash::{BootFlash, FlashBoot};
pub use gpio::{IceGpo, Leds};
pub use network::{Ipv4Octets, Network};
pub use video::VideoOut;

/// The fixed catalogue of feature modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureKind {
    BootFlash,
    Network,
    VideoOut,
    IceGpo,
    Leds,
    BootConfig,
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureKind::BootFlash => "boot-flash",
            FeatureKind::Network => "network",
            FeatureKind::VideoOut => "video-out",
            FeatureKind::IceGpo => "ice-gpo",
            FeatureKind::Leds => "leds",
            FeatureKind::BootConfig => "boot-config",
        };
        write!(f, "{name}")
    }
}

/// A peripheral core instantiated by a feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum Core {
    SpiFlash {
        name: String,
        dummy_cycles: u32,
        clock_div: u32,
        endianness: Endianness,
    },
    VideoOut {
        name: String,
        port: usize,
    },
    GpioOut {
        name: String,
        width: u32,
    },
    GpioInOut {
        name: String,
        width: u32,
    },
}

/// A vendor primitive a feature depends on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", rename_all_fields = "kebab-case")]
pub enum Primitive {
    /// Xilinx 7-series STARTUPE2: hands the configuration clock pin to user
    /// logic once configuration is done.
    Startupe2 { user_clock: SignalRef, user_done: u64 },
}

/// Record of everything one feature application reserved and wired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FeatureAttachment {
    pub kind: FeatureKind,
    pub csr: Vec<(String, u64)>,
    pub interrupts: Vec<(String, u64)>,
    pub regions: Vec<String>,
    pub cores: Vec<Core>,
    pub primitives: Vec<Primitive>,
    pub port: Option<Port>,
    /// Pin resources requested, as `name:number`.
    pub pins: Vec<String>,
    pub wires: Vec<Wire>,
    pub tristates: Vec<Tristate>,
    pub constants: Vec<String>,
}

impl FeatureAttachment {
    pub fn new(kind: FeatureKind) -> Self {
        Self {
            kind,
            csr: Vec::new(),
            interrupts: Vec::new(),
            regions: Vec::new(),
            cores: Vec::new(),
            primitives: Vec::new(),
            port: None,
            pins: Vec::new(),
            wires: Vec::new(),
            tristates: Vec::new(),
            constants: Vec::new(),
        }
    }

    /// Allocate a CSR slot for `name` and record it.
    pub(crate) fn bind_csr(&mut self, soc: &mut SocState, name: &str) -> Result<u64> {
        let slot = soc.registry.allocate(Namespace::Csr, name)?;
        self.csr.push((name.into(), slot));
        Ok(slot)
    }

    /// Request a pin resource and record it.
    pub(crate) fn request_pins(
        &mut self,
        soc: &mut SocState,
        name: &str,
        number: u32,
    ) -> Result<PinResource> {
        let resource = soc.pins.request(name, number)?;
        self.pins.push(resource.key());
        Ok(resource)
    }

    /// Define an integer constant and record it.
    pub(crate) fn constant(&mut self, soc: &mut SocState, name: &str, value: u64) -> Result<()> {
        soc.constants.add_int(name, value)?;
        self.constants.push(name.into());
        Ok(())
    }

    /// Define a presence-only constant and record it.
    pub(crate) fn marker(&mut self, soc: &mut SocState, name: &str) -> Result<()> {
        soc.constants.define(name)?;
        self.constants.push(name.into());
        Ok(())
    }
}

/// A feature module.
pub trait Feature: fmt::Debug {
    fn kind(&self) -> FeatureKind;

    /// Apply the feature. Any error aborts the whole composition.
    fn apply(&self, soc: &mut SocState) -> Result<FeatureAttachment>;
}
