//! SoC composition for Linux-capable VexRiscv systems.
//!
//! A composition takes one board's base platform and extends it:
//! - **Base registration:** namespace tables merged with caller overrides
//! - **Feature modules:** boot flash, network boot, video output, GPIO banks,
//!   boot configuration (always last)
//! - **Emission:** constants, C header, linker regions and a JSON report
//! - **Device tree:** optional `dtc` run after emission
//!
//! [`Composer`] drives the whole sequence. Applying a feature consumes it, so
//! a failed application leaves no partially composed SoC behind.

pub mod arbiter;
pub mod compose;
pub mod config;
pub mod constants;
pub mod devicetree;
pub mod emit;
pub mod error;
pub mod fabric;
pub mod feature;
pub mod program;
pub mod tool;
pub mod wiring;

pub use arbiter::{Port, PortArbiter, PortMode, PortRequest};
pub use compose::{ComposedSoc, Composer, SocState, Stage};
pub use config::{CompositionConfig, NamespaceOverrides};
pub use constants::{Constant, ConstantTable, ConstantValue};
pub use devicetree::DeviceTreeCompiler;
pub use error::{ComposeError, ErrorKind, Result};
pub use fabric::{AccessPath, Attachment, BusEndpoint, BusFabric};
pub use feature::{
    BootConfig, BootFlash, Feature, FeatureAttachment, FeatureKind, FlashBoot, IceGpo, Ipv4Octets,
    Leds, Network, VideoOut,
};
pub use program::{ProgramAction, ProgramPlan};
pub use tool::{run_checked, SystemRunner, ToolInvocation, ToolOutput, ToolRunner};
pub use wiring::{SignalRef, Tristate, Wire, WireSource};
