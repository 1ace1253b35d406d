//! Base platform descriptors and the address/index registry for vexsoc.
//!
//! A board target is described by:
//! - **Base platform:** CPU, FPGA family, base peripherals, memory map, SDRAM
//! - **Pin catalogue:** logical signal groups and expansion connectors
//! - **Board metadata:** toolchain, capabilities, device-tree variant
//!
//! The [`Registry`] holds the three namespaces (CSR slots, interrupt lines,
//! memory bases) that composition extends without ever rebinding.

pub mod board;
pub mod error;
pub mod namespace;
pub mod parse;
pub mod pins;
pub mod platform;
pub mod region;

pub use board::{builtin_board, builtin_boards, Board, Capability, Toolchain};
pub use error::{PlatformError, Result};
pub use namespace::{Binding, Entry, Namespace, Registry};
pub use pins::{PinCatalogue, PinResource, Subsignal};
pub use platform::{
    BasePeripheral, BasePlatform, CpuDescriptor, Endianness, FpgaFamily, SdramDescriptor,
    DEFAULT_SHADOW_BASE,
};
pub use region::{MemoryRegion, RegionKind, Span};
