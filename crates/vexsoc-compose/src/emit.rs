//! Configuration emitter.
//!
//! Derives the memory map, CSR and interrupt constants from the composed
//! registry and renders the constant table for the firmware build: a C header,
//! a linker `MEMORY` block, and a JSON description of the whole SoC.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use serde::Serialize;
use vexsoc_platform::{Entry, MemoryRegion, Namespace, PinResource};

use crate::arbiter::Port;
use crate::compose::{ComposedSoc, SocState};
use crate::constants::{Constant, ConstantValue};
use crate::error::{ComposeError, Result};
use crate::feature::{FeatureAttachment, FlashBoot};

/// Address stride between CSR banks inside the CSR window.
pub const CSR_BANK_STRIDE: u64 = 0x800;

/// Output file names written by [`ComposedSoc::write_outputs`].
pub const HEADER_FILE: &str = "soc.h";
pub const LINKER_FILE: &str = "regions.ld";
pub const JSON_FILE: &str = "soc.json";

/// Constants derived from the registry and the base platform, in emission
/// order.
pub(crate) fn derive_constants(soc: &SocState) -> Result<Vec<(String, ConstantValue)>> {
    let shadow = soc.registry.shadow_base();
    let cpu = &soc.platform.cpu;
    let mut out = vec![
        ("CONFIG_CPU_TYPE".to_string(), ConstantValue::Str(cpu.cpu_type.clone())),
        ("CONFIG_CPU_VARIANT".to_string(), ConstantValue::Str(cpu.variant.clone())),
        (
            "CONFIG_CLOCK_FREQUENCY".to_string(),
            ConstantValue::Int(soc.platform.clock_hz),
        ),
    ];

    for region in soc.registry.regions() {
        let name = region.name.to_uppercase();
        out.push((format!("{name}_BASE"), ConstantValue::Int(region.exposed_base(shadow))));
        out.push((format!("{name}_SIZE"), ConstantValue::Int(region.size_bytes)));
    }

    let window = soc.registry.region("csr")?;
    let window_base = window.exposed_base(shadow);
    for entry in soc.registry.bound(Namespace::Csr) {
        let base = entry
            .value
            .checked_mul(CSR_BANK_STRIDE)
            .filter(|offset| {
                offset
                    .checked_add(CSR_BANK_STRIDE)
                    .is_some_and(|end| end <= window.size_bytes)
            })
            .and_then(|offset| window_base.checked_add(offset))
            .ok_or_else(|| {
                ComposeError::validation(format!(
                    "csr slot {} of '{}' lies outside the 0x{:X}-byte CSR window",
                    entry.value, entry.name, window.size_bytes
                ))
            })?;
        out.push((
            format!("CSR_{}_BASE", entry.name.to_uppercase()),
            ConstantValue::Int(base),
        ));
    }

    for entry in soc.registry.bound(Namespace::Interrupt) {
        out.push((
            format!("{}_INTERRUPT", entry.name.to_uppercase()),
            ConstantValue::Int(entry.value),
        ));
    }
    Ok(out)
}

fn is_address(name: &str) -> bool {
    name.ends_with("_BASE") || name.ends_with("_SIZE") || name.ends_with("_ADDRESS")
}

fn header_value(name: &str, value: &ConstantValue) -> Option<String> {
    match value {
        ConstantValue::Int(v) if is_address(name) => Some(format!("0x{v:08x}L")),
        ConstantValue::Int(v) => Some(v.to_string()),
        ConstantValue::Str(s) => Some(format!("\"{s}\"")),
        ConstantValue::Defined => None,
    }
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct RegionReport<'a> {
    #[serde(flatten)]
    region: &'a MemoryRegion,
    exposed_base: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "kebab-case")]
struct SocReport<'a> {
    board: &'a str,
    stage: String,
    cpu_type: &'a str,
    cpu_variant: &'a str,
    clock_hz: u64,
    regions: Vec<RegionReport<'a>>,
    csr: Vec<&'a Entry>,
    interrupts: Vec<&'a Entry>,
    ports: &'a [Port],
    pins: Vec<&'a PinResource>,
    features: &'a [FeatureAttachment],
    flash_boot: Option<&'a FlashBoot>,
    constants: Vec<&'a Constant>,
}

impl ComposedSoc {
    /// C header of `#define`s; presence-only markers carry no value.
    pub fn render_header(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "/* Generated by vexsoc for board '{}'. Do not edit. */", self.board);
        out.push_str("#ifndef __GENERATED_SOC_H\n#define __GENERATED_SOC_H\n\n");
        for c in self.constants.iter() {
            match header_value(&c.name, &c.value) {
                Some(v) => {
                    let _ = writeln!(out, "#define {} {v}", c.name);
                }
                None => {
                    let _ = writeln!(out, "#define {}", c.name);
                }
            }
        }
        out.push_str("\n#endif\n");
        out
    }

    /// Linker script `MEMORY` block at the processor-visible addresses.
    pub fn render_linker_regions(&self) -> String {
        let shadow = self.registry.shadow_base();
        let mut out = String::from("MEMORY {\n");
        for r in self.registry.regions() {
            let _ = writeln!(
                out,
                "\t{} : ORIGIN = 0x{:08x}, LENGTH = 0x{:08x}",
                r.name,
                r.exposed_base(shadow),
                r.size_bytes
            );
        }
        out.push_str("}\n");
        out
    }

    pub fn to_json(&self) -> Result<String> {
        let shadow = self.registry.shadow_base();
        let report = SocReport {
            board: &self.board,
            stage: self.stage.to_string(),
            cpu_type: &self.platform.cpu.cpu_type,
            cpu_variant: &self.platform.cpu.variant,
            clock_hz: self.platform.clock_hz,
            regions: self
                .registry
                .regions()
                .iter()
                .map(|region| RegionReport {
                    region,
                    exposed_base: region.exposed_base(shadow),
                })
                .collect(),
            csr: self.registry.bound(Namespace::Csr),
            interrupts: self.registry.bound(Namespace::Interrupt),
            ports: &self.ports,
            pins: self.pin_requirements(),
            features: &self.attachments,
            flash_boot: self.flash_boot.as_ref(),
            constants: self.constants.iter().collect(),
        };
        Ok(serde_json::to_string_pretty(&report)?)
    }

    /// Write the header, linker regions and JSON report into `dir`.
    pub fn write_outputs(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let files = [
            (HEADER_FILE, self.render_header()),
            (LINKER_FILE, self.render_linker_regions()),
            (JSON_FILE, self.to_json()?),
        ];
        let mut written = Vec::with_capacity(files.len());
        for (name, contents) in files {
            let path = dir.join(name);
            std::fs::write(&path, contents)?;
            tracing::debug!(path = %path.display(), "wrote output");
            written.push(path);
        }
        tracing::info!(dir = %dir.display(), "configuration written");
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::Composer;
    use crate::config::{CompositionConfig, NamespaceOverrides};
    use crate::error::ErrorKind;
    use crate::feature::{BootConfig, BootFlash, Network};
    use vexsoc_platform::Board;

    fn arty_full() -> ComposedSoc {
        Composer::new(CompositionConfig::new(Board::arty()))
            .unwrap()
            .apply(&BootFlash::default())
            .unwrap()
            .apply(&Network::new("192.168.1.50", "192.168.1.100").unwrap())
            .unwrap()
            .apply(&BootConfig)
            .unwrap()
            .emit()
            .unwrap()
    }

    #[test]
    fn derived_constants() {
        let soc = arty_full();
        let c = soc.constants();
        assert_eq!(
            c.get("CONFIG_CPU_TYPE"),
            Some(&ConstantValue::Str("vexriscv".into()))
        );
        assert_eq!(c.get("CONFIG_CLOCK_FREQUENCY"), Some(&ConstantValue::Int(100_000_000)));
        assert_eq!(c.get("MAIN_RAM_BASE"), Some(&ConstantValue::Int(0xC000_0000)));
        assert_eq!(c.get("SPIFLASH_BASE"), Some(&ConstantValue::Int(0xD000_0000)));
        assert_eq!(c.get("CSR_UART_BASE"), Some(&ConstantValue::Int(0xB000_1000)));
        assert_eq!(c.get("UART_INTERRUPT"), Some(&ConstantValue::Int(0)));
        assert_eq!(c.get("ETHMAC_INTERRUPT"), Some(&ConstantValue::Int(2)));
    }

    #[test]
    fn header_renders_markers_bare() {
        let h = arty_full().render_header();
        assert!(h.contains("#define NETBOOT_LINUX_VEXRISCV\n"));
        assert!(h.contains("#define LOCALIP1 192\n"));
        assert!(h.contains("#define FLASH_BOOT_ADDRESS 0xd0400000L\n"));
        assert!(h.contains("#define CONFIG_CPU_VARIANT \"linux\"\n"));
    }

    #[test]
    fn linker_regions_use_exposed_bases() {
        let ld = arty_full().render_linker_regions();
        assert!(ld.starts_with("MEMORY {\n"));
        assert!(ld.contains("\tspiflash : ORIGIN = 0xd0000000, LENGTH = 0x01000000\n"));
        assert!(ld.contains("\trom : ORIGIN = 0x00000000, LENGTH = 0x00008000\n"));
    }

    #[test]
    fn json_report_parses() {
        let json = arty_full().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["board"], "arty");
        assert_eq!(value["flash-boot"]["boot-address"], 0xD040_0000u64);
        assert_eq!(value["cpu-type"], "vexriscv");
        let spiflash = value["regions"]
            .as_array()
            .unwrap()
            .iter()
            .find(|r| r["name"] == "spiflash")
            .unwrap();
        assert_eq!(spiflash["base-address"], 0x5000_0000u64);
        assert_eq!(spiflash["exposed-base"], 0xD000_0000u64);
        assert!(spiflash.get("exposed_base").is_none());
        assert!(value["features"].as_array().unwrap().len() == 3);
    }

    #[test]
    fn write_outputs_creates_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("software/include/generated");
        let written = arty_full().write_outputs(&out).unwrap();
        assert_eq!(written.len(), 3);
        let header = std::fs::read_to_string(out.join(HEADER_FILE)).unwrap();
        assert!(header.contains("REMOTEIP4 100"));
        assert!(out.join(LINKER_FILE).exists());
        assert!(out.join(JSON_FILE).exists());
    }

    #[test]
    fn csr_slot_outside_window_fails() {
        for slot in [40, 1 << 62, i64::MAX as u64] {
            let mut extra = NamespaceOverrides::default();
            extra.csr.insert("timer0".into(), slot);
            let err = Composer::new(CompositionConfig::new(Board::arty()).with_overrides(&extra))
                .and_then(Composer::emit)
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "slot {slot}");
        }
    }

    #[test]
    fn csr_constants_stay_within_window() {
        let mut extra = NamespaceOverrides::default();
        extra.csr.insert("leds".into(), 31);
        let soc = Composer::new(CompositionConfig::new(Board::versa_ecp5()).with_overrides(&extra))
            .unwrap()
            .apply(&crate::feature::Leds { count: 8 })
            .unwrap()
            .emit()
            .unwrap();
        assert_eq!(
            soc.constants().get("CSR_LEDS_BASE"),
            Some(&ConstantValue::Int(0xB000_F800))
        );
    }
}
