//! Base platform model.
//!
//! The processor, FPGA family, and the peripherals and memory regions a board
//! target provides before any feature module runs.

use serde::{Deserialize, Serialize};

use crate::pins::PinResource;
use crate::region::MemoryRegion;

/// Alias offset for cache-bypassing accesses.
pub const DEFAULT_SHADOW_BASE: u64 = 0x8000_0000;

/// Byte order of the processor bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Endianness {
    Little,
    Big,
}

/// FPGA device family; decides which startup primitives exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FpgaFamily {
    /// Artix-7 / Kintex-7 / Virtex-7 / Zynq-7000.
    Xilinx7Series,
    Spartan6,
    Ecp5,
}

impl FpgaFamily {
    /// Whether the family exposes a user-driven configuration clock
    /// (STARTUPE2), required to reach the boot flash after configuration.
    pub fn has_startup_clock_primitive(&self) -> bool {
        matches!(self, FpgaFamily::Xilinx7Series)
    }
}

/// Processor selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CpuDescriptor {
    /// CPU type (e.g., "vexriscv").
    pub cpu_type: String,
    /// CPU variant (e.g., "linux").
    pub variant: String,
    pub endianness: Endianness,
}

impl CpuDescriptor {
    pub fn vexriscv_linux() -> Self {
        Self {
            cpu_type: "vexriscv".into(),
            variant: "linux".into(),
            endianness: Endianness::Little,
        }
    }
}

/// External DRAM controller behind the memory-access arbiter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SdramDescriptor {
    /// Memory module part (e.g., "MT41K128M16").
    pub module: String,
    /// Native port width of the controller in bits.
    pub native_data_width: u32,
}

/// A peripheral that ships with the base platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BasePeripheral {
    pub name: String,
    /// Fixed CSR slot; `None` means allocated at composition time.
    #[serde(default)]
    pub csr: Option<u64>,
    /// Interrupt line, if the peripheral raises one.
    #[serde(default)]
    pub interrupt: Option<u64>,
}

impl BasePeripheral {
    fn new(name: &str, csr: Option<u64>, interrupt: Option<u64>) -> Self {
        Self {
            name: name.into(),
            csr,
            interrupt,
        }
    }
}

/// Everything a board target contributes before composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BasePlatform {
    pub cpu: CpuDescriptor,
    pub family: FpgaFamily,
    /// System clock in Hz.
    pub clock_hz: u64,
    #[serde(default = "default_shadow_base")]
    pub shadow_base: u64,
    /// Peripherals owned by the base target, in CSR allocation order.
    pub peripherals: Vec<BasePeripheral>,
    /// Base memory map.
    pub regions: Vec<MemoryRegion>,
    #[serde(default)]
    pub sdram: Option<SdramDescriptor>,
    /// Pin resources of the board.
    #[serde(default)]
    pub pins: Vec<PinResource>,
    /// Expansion connectors extensions may use.
    #[serde(default)]
    pub connectors: Vec<String>,
}

fn default_shadow_base() -> u64 {
    DEFAULT_SHADOW_BASE
}

impl BasePlatform {
    pub fn peripheral(&self, name: &str) -> Option<&BasePeripheral> {
        self.peripherals.iter().find(|p| p.name == name)
    }

    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.regions.iter().find(|r| r.name == name)
    }

    pub fn has_ethernet(&self) -> bool {
        self.region("ethmac").is_some()
    }

    /// Linux-capable VexRiscv base: rom, scratch sram, machine-mode emulator
    /// RAM, CSR window and main RAM, with ethernet MAC when requested.
    pub fn linux_vexriscv(
        family: FpgaFamily,
        clock_hz: u64,
        main_ram_bytes: u64,
        sdram: SdramDescriptor,
        ethernet: bool,
    ) -> Self {
        let mut peripherals = vec![
            BasePeripheral::new("ctrl", Some(0), None),
            BasePeripheral::new("crg", None, None),
            BasePeripheral::new("uart", Some(2), Some(0)),
            BasePeripheral::new("timer0", Some(3), Some(1)),
            BasePeripheral::new("identifier_mem", None, None),
            BasePeripheral::new("ddrphy", None, None),
            BasePeripheral::new("sdram", None, None),
        ];
        let mut regions = vec![
            MemoryRegion::cached("rom", 0x0000_0000, 0x8000),
            MemoryRegion::cached("sram", 0x1000_0000, 0x1000),
            MemoryRegion::cached("emulator_ram", 0x1800_0000, 0x4000),
        ];
        if ethernet {
            peripherals.push(BasePeripheral::new("ethphy", None, None));
            peripherals.push(BasePeripheral::new("ethmac", None, Some(2)));
            regions.push(MemoryRegion::io("ethmac", 0xA000_0000, 0x2000));
        }
        regions.push(MemoryRegion::io("csr", 0xB000_0000, 0x1_0000));
        regions.push(MemoryRegion::cached("main_ram", 0xC000_0000, main_ram_bytes));

        Self {
            cpu: CpuDescriptor::vexriscv_linux(),
            family,
            clock_hz,
            shadow_base: DEFAULT_SHADOW_BASE,
            peripherals,
            regions,
            sdram: Some(sdram),
            pins: Vec::new(),
            connectors: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sdram() -> SdramDescriptor {
        SdramDescriptor {
            module: "MT41K128M16".into(),
            native_data_width: 128,
        }
    }

    #[test]
    fn ethernet_base_has_mac_region_and_irq() {
        let p = BasePlatform::linux_vexriscv(
            FpgaFamily::Xilinx7Series,
            100_000_000,
            0x1000_0000,
            sdram(),
            true,
        );
        assert!(p.has_ethernet());
        assert_eq!(p.peripheral("ethmac").unwrap().interrupt, Some(2));
        assert_eq!(p.region("main_ram").unwrap().base_address, 0xC000_0000);
    }

    #[test]
    fn serial_only_base() {
        let p = BasePlatform::linux_vexriscv(FpgaFamily::Spartan6, 80_000_000, 0x200_0000, sdram(), false);
        assert!(!p.has_ethernet());
        assert!(p.peripheral("ethphy").is_none());
        assert_eq!(p.peripheral("uart").unwrap().csr, Some(2));
    }

    #[test]
    fn only_7_series_has_startup_clock() {
        assert!(FpgaFamily::Xilinx7Series.has_startup_clock_primitive());
        assert!(!FpgaFamily::Ecp5.has_startup_clock_primitive());
        assert!(!FpgaFamily::Spartan6.has_startup_clock_primitive());
    }
}
