//! Composition configuration.
//!
//! The base board plus caller overrides for the three namespaces, merged into
//! a fresh [`Registry`] when composition starts. Overrides naming a base
//! peripheral or region move it; any other name becomes a planned entry that
//! a feature module claims later.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use vexsoc_platform::{Board, MemoryRegion, Namespace, Registry};

use crate::arbiter::PortRequest;
use crate::emit::CSR_BANK_STRIDE;
use crate::error::{ComposeError, Result};

/// Caller-supplied namespace assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NamespaceOverrides {
    #[serde(default)]
    pub csr: BTreeMap<String, u64>,
    #[serde(default)]
    pub interrupts: BTreeMap<String, u64>,
    #[serde(default)]
    pub mem_map: BTreeMap<String, u64>,
}

impl NamespaceOverrides {
    /// The Linux-on-VexRiscv assignments.
    pub fn linux_defaults() -> Self {
        let csr = [
            ("ctrl", 0),
            ("uart", 2),
            ("timer0", 3),
            ("hdmi_out", 10),
            ("hdmi_iic", 11),
            ("ice_gpo", 12),
        ];
        let interrupts = [("uart", 0), ("timer0", 1)];
        let mem_map = [
            ("rom", 0x0000_0000),
            ("sram", 0x1000_0000),
            ("emulator_ram", 0x1800_0000),
            ("spiflash", 0x5000_0000),
            ("ethmac", 0xA000_0000),
            ("csr", 0xB000_0000),
            ("main_ram", 0xC000_0000),
        ];
        Self {
            csr: to_map(&csr),
            interrupts: to_map(&interrupts),
            mem_map: to_map(&mem_map),
        }
    }

    /// Layer `other` on top of `self`; `other` wins on equal names.
    pub fn merged(mut self, other: &NamespaceOverrides) -> Self {
        self.csr
            .extend(other.csr.iter().map(|(k, v)| (k.clone(), *v)));
        self.interrupts
            .extend(other.interrupts.iter().map(|(k, v)| (k.clone(), *v)));
        self.mem_map
            .extend(other.mem_map.iter().map(|(k, v)| (k.clone(), *v)));
        self
    }
}

fn to_map(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
    pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

/// Everything the driver needs to start a composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositionConfig {
    pub board: Board,
    pub overrides: NamespaceOverrides,
    /// Crossbar ports already held by base-platform consumers.
    pub dram_ports: Vec<PortRequest>,
}

impl CompositionConfig {
    /// Board with the Linux-on-VexRiscv namespace assignments.
    pub fn new(board: Board) -> Self {
        Self {
            board,
            overrides: NamespaceOverrides::linux_defaults(),
            dram_ports: Vec::new(),
        }
    }

    /// Layer caller overrides on top of the current ones.
    pub fn with_overrides(mut self, overrides: &NamespaceOverrides) -> Self {
        self.overrides = self.overrides.merged(overrides);
        self
    }

    pub fn with_dram_port(mut self, request: PortRequest) -> Self {
        self.dram_ports.push(request);
        self
    }

    /// Build the initial registry from the base tables and the overrides.
    pub fn seed_registry(&self) -> Result<Registry> {
        let platform = &self.board.platform;
        let o = &self.overrides;
        let mut registry = Registry::new(platform.shadow_base);

        // Memory: base regions at their (possibly moved) bases, then plans.
        for region in &platform.regions {
            let base = o
                .mem_map
                .get(&region.name)
                .copied()
                .unwrap_or(region.base_address);
            registry.reserve_region(MemoryRegion {
                base_address: base,
                ..region.clone()
            })?;
        }
        for (name, base) in &o.mem_map {
            if platform.region(name).is_none() {
                registry.plan(Namespace::Memory, name, *base)?;
            }
        }

        // CSR: fixed slots, then plans, then auto-allocated base peripherals.
        let csr_slots = registry
            .region("csr")
            .ok()
            .map(|window| window.size_bytes / CSR_BANK_STRIDE);
        for p in &platform.peripherals {
            if let Some(slot) = o.csr.get(&p.name).copied().or(p.csr) {
                check_csr_slot(&p.name, slot, csr_slots)?;
                registry.reserve(Namespace::Csr, &p.name, slot)?;
            }
        }
        for (name, slot) in &o.csr {
            if platform.peripheral(name).is_none() {
                check_csr_slot(name, *slot, csr_slots)?;
                registry.plan(Namespace::Csr, name, *slot)?;
            }
        }
        for p in &platform.peripherals {
            if !o.csr.contains_key(&p.name) && p.csr.is_none() {
                registry.allocate(Namespace::Csr, &p.name)?;
            }
        }

        // Interrupts: base lines, then plans.
        for p in &platform.peripherals {
            if let Some(irq) = o.interrupts.get(&p.name).copied().or(p.interrupt) {
                registry.reserve(Namespace::Interrupt, &p.name, irq)?;
            }
        }
        for (name, irq) in &o.interrupts {
            if platform.peripheral(name).is_none() {
                registry.plan(Namespace::Interrupt, name, *irq)?;
            }
        }

        Ok(registry)
    }
}

/// Reject a fixed CSR slot that cannot fit in the CSR window.
fn check_csr_slot(name: &str, slot: u64, slots: Option<u64>) -> Result<()> {
    match slots {
        Some(slots) if slot >= slots => Err(ComposeError::validation(format!(
            "csr slot {slot} of '{name}' lies outside the {slots}-slot CSR window"
        ))),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn arty_seed_layout() {
        let reg = CompositionConfig::new(Board::arty()).seed_registry().unwrap();
        assert_eq!(reg.lookup(Namespace::Csr, "ctrl").unwrap(), 0);
        assert_eq!(reg.lookup(Namespace::Csr, "crg").unwrap(), 1);
        assert_eq!(reg.lookup(Namespace::Csr, "uart").unwrap(), 2);
        assert_eq!(reg.lookup(Namespace::Csr, "timer0").unwrap(), 3);
        assert_eq!(reg.lookup(Namespace::Interrupt, "ethmac").unwrap(), 2);
        assert_eq!(reg.planned(Namespace::Csr, "hdmi_out"), Some(10));
        assert_eq!(reg.planned(Namespace::Memory, "spiflash"), Some(0x5000_0000));
        assert_eq!(reg.region("emulator_ram").unwrap().size_bytes, 0x4000);
    }

    #[test]
    fn auto_slots_skip_planned_values() {
        let reg = CompositionConfig::new(Board::arty()).seed_registry().unwrap();
        let slots: Vec<u64> = reg.bound(Namespace::Csr).iter().map(|e| e.value).collect();
        assert!(!slots.contains(&10));
        assert!(!slots.contains(&11));
        assert!(!slots.contains(&12));
    }

    #[test]
    fn override_moves_base_region() {
        let mut extra = NamespaceOverrides::default();
        extra.mem_map.insert("sram".into(), 0x2000_0000);
        let reg = CompositionConfig::new(Board::arty())
            .with_overrides(&extra)
            .seed_registry()
            .unwrap();
        assert_eq!(reg.region("sram").unwrap().base_address, 0x2000_0000);
    }

    #[test]
    fn colliding_overrides_abort() {
        let mut extra = NamespaceOverrides::default();
        extra.csr.insert("timer0".into(), 2);
        let err = CompositionConfig::new(Board::arty())
            .with_overrides(&extra)
            .seed_registry()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn out_of_window_csr_override_aborts() {
        for slot in [32, 1 << 62, i64::MAX as u64, u64::MAX] {
            let mut extra = NamespaceOverrides::default();
            extra.csr.insert("timer0".into(), slot);
            let err = CompositionConfig::new(Board::arty())
                .with_overrides(&extra)
                .seed_registry()
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "slot {slot}");
        }

        let mut planned = NamespaceOverrides::default();
        planned.csr.insert("leds".into(), 1 << 62);
        let err = CompositionConfig::new(Board::arty())
            .with_overrides(&planned)
            .seed_registry()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn last_window_slot_is_accepted() {
        let mut extra = NamespaceOverrides::default();
        extra.csr.insert("leds".into(), 31);
        let reg = CompositionConfig::new(Board::arty())
            .with_overrides(&extra)
            .seed_registry()
            .unwrap();
        assert_eq!(reg.planned(Namespace::Csr, "leds"), Some(31));
    }

    #[test]
    fn overlapping_override_aborts() {
        let mut extra = NamespaceOverrides::default();
        extra.mem_map.insert("sram".into(), 0xC000_1000);
        let err = CompositionConfig::new(Board::arty())
            .with_overrides(&extra)
            .seed_registry()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Overlap);
    }
}
