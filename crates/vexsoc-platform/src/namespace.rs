//! Address/index registry.
//!
//! Three disjoint namespaces (CSR slots, interrupt lines, memory bases) plus the
//! memory regions that back the memory namespace. The registry starts from a
//! base-platform table and is only ever extended: entries are never removed or
//! rebound.
//!
//! An entry is either *planned* (a caller fixed its value up front but no
//! peripheral owns it yet) or *bound* (owned by a peripheral). Reserving a
//! planned entry with its planned value binds it; reserving a bound entry is
//! always a conflict, so every reservation is single-use.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::region::MemoryRegion;

/// One of the three identifier spaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Namespace {
    /// Control/status register slot indices.
    Csr,
    /// Interrupt line numbers.
    Interrupt,
    /// Memory region base addresses.
    Memory,
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Namespace::Csr => write!(f, "csr"),
            Namespace::Interrupt => write!(f, "interrupt"),
            Namespace::Memory => write!(f, "memory"),
        }
    }
}

/// Whether an entry is owned yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Binding {
    Planned,
    Bound,
}

/// A (name, value) pair in one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub value: u64,
    pub binding: Binding,
}

#[derive(Debug, Clone, Default)]
struct Table {
    by_name: BTreeMap<String, Entry>,
    by_value: BTreeMap<u64, String>,
}

impl Table {
    /// Validate a reservation without mutating anything.
    fn check(&self, namespace: Namespace, name: &str, value: u64) -> Result<()> {
        if let Some(existing) = self.by_name.get(name) {
            if existing.value != value {
                return Err(PlatformError::Conflict {
                    namespace,
                    name: name.into(),
                    detail: format!(
                        "already assigned {} 0x{:X}, requested 0x{:X}",
                        namespace, existing.value, value
                    ),
                });
            }
            if existing.binding == Binding::Bound {
                return Err(PlatformError::Conflict {
                    namespace,
                    name: name.into(),
                    detail: format!("already reserved at 0x{value:X}"),
                });
            }
            return Ok(());
        }
        if let Some(owner) = self.by_value.get(&value) {
            return Err(PlatformError::Conflict {
                namespace,
                name: name.into(),
                detail: format!("value 0x{value:X} already bound to '{owner}'"),
            });
        }
        Ok(())
    }

    fn commit(&mut self, name: &str, value: u64, binding: Binding) {
        self.by_value.insert(value, name.to_string());
        self.by_name.insert(
            name.to_string(),
            Entry {
                name: name.to_string(),
                value,
                binding,
            },
        );
    }

    fn lowest_free(&self) -> u64 {
        (0..)
            .find(|candidate| !self.by_value.contains_key(candidate))
            .unwrap_or(0)
    }
}

/// The three namespaces plus the region table.
#[derive(Debug, Clone)]
pub struct Registry {
    csr: Table,
    interrupts: Table,
    memory: Table,
    regions: Vec<MemoryRegion>,
    shadow_base: u64,
}

impl Registry {
    /// Empty registry; `shadow_base` is the alias offset of shadowed regions.
    pub fn new(shadow_base: u64) -> Self {
        Self {
            csr: Table::default(),
            interrupts: Table::default(),
            memory: Table::default(),
            regions: Vec::new(),
            shadow_base,
        }
    }

    pub fn shadow_base(&self) -> u64 {
        self.shadow_base
    }

    fn table(&self, namespace: Namespace) -> &Table {
        match namespace {
            Namespace::Csr => &self.csr,
            Namespace::Interrupt => &self.interrupts,
            Namespace::Memory => &self.memory,
        }
    }

    fn table_mut(&mut self, namespace: Namespace) -> &mut Table {
        match namespace {
            Namespace::Csr => &mut self.csr,
            Namespace::Interrupt => &mut self.interrupts,
            Namespace::Memory => &mut self.memory,
        }
    }

    /// Fix a value for a name that a later peripheral is expected to claim.
    pub fn plan(&mut self, namespace: Namespace, name: &str, value: u64) -> Result<()> {
        let table = self.table(namespace);
        if table.by_name.contains_key(name) {
            return Err(PlatformError::Conflict {
                namespace,
                name: name.into(),
                detail: "already present in the base table".into(),
            });
        }
        table.check(namespace, name, value)?;
        self.table_mut(namespace)
            .commit(name, value, Binding::Planned);
        tracing::debug!(%namespace, name, value, "planned entry");
        Ok(())
    }

    /// Bind `name` to `value`.
    ///
    /// Fails with a conflict if the name is bound, planned with another value,
    /// or if the value belongs to another name.
    pub fn reserve(&mut self, namespace: Namespace, name: &str, value: u64) -> Result<u64> {
        self.table(namespace).check(namespace, name, value)?;
        self.table_mut(namespace).commit(name, value, Binding::Bound);
        tracing::debug!(%namespace, name, value, "reserved entry");
        Ok(value)
    }

    /// Bind `name` to its planned value, or to the lowest free index.
    ///
    /// Only meaningful for index namespaces; memory bases must be explicit.
    pub fn allocate(&mut self, namespace: Namespace, name: &str) -> Result<u64> {
        if namespace == Namespace::Memory {
            return Err(PlatformError::validation(format!(
                "memory entry '{name}' needs an explicit base address"
            )));
        }
        let value = match self.planned(namespace, name) {
            Some(value) => value,
            None => self.table(namespace).lowest_free(),
        };
        self.reserve(namespace, name, value)
    }

    /// Value of a bound entry.
    pub fn lookup(&self, namespace: Namespace, name: &str) -> Result<u64> {
        match self.table(namespace).by_name.get(name) {
            Some(entry) if entry.binding == Binding::Bound => Ok(entry.value),
            _ => Err(PlatformError::NotFound {
                namespace,
                name: name.into(),
            }),
        }
    }

    /// Value of a planned (not yet bound) entry.
    pub fn planned(&self, namespace: Namespace, name: &str) -> Option<u64> {
        self.table(namespace)
            .by_name
            .get(name)
            .filter(|e| e.binding == Binding::Planned)
            .map(|e| e.value)
    }

    /// Bound entries of a namespace, ordered by value.
    pub fn bound(&self, namespace: Namespace) -> Vec<&Entry> {
        let table = self.table(namespace);
        table
            .by_value
            .values()
            .filter_map(|name| table.by_name.get(name))
            .filter(|e| e.binding == Binding::Bound)
            .collect()
    }

    /// Reserve a memory region: geometry check, then overlap against every
    /// exposed span, then the memory namespace entry. Nothing is recorded
    /// unless all three pass.
    pub fn reserve_region(&mut self, region: MemoryRegion) -> Result<&MemoryRegion> {
        region.validate_geometry(self.shadow_base)?;
        self.memory
            .check(Namespace::Memory, &region.name, region.base_address)?;

        for new_span in region.exposed_spans(self.shadow_base) {
            for other in &self.regions {
                for other_span in other.exposed_spans(self.shadow_base) {
                    if new_span.intersects(&other_span) {
                        return Err(PlatformError::Overlap {
                            name: region.name.clone(),
                            base: new_span.start,
                            end: new_span.end,
                            other: other.name.clone(),
                            other_base: other_span.start,
                            other_end: other_span.end,
                        });
                    }
                }
            }
        }

        self.memory
            .commit(&region.name, region.base_address, Binding::Bound);
        tracing::debug!(
            name = %region.name,
            base = region.base_address,
            size = region.size_bytes,
            shadowed = region.shadowed,
            "reserved memory region"
        );
        self.regions.push(region);
        Ok(&self.regions[self.regions.len() - 1])
    }

    /// A reserved memory region by name.
    pub fn region(&self, name: &str) -> Result<&MemoryRegion> {
        self.regions
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| PlatformError::NotFound {
                namespace: Namespace::Memory,
                name: name.into(),
            })
    }

    /// All reserved regions in reservation order.
    pub fn regions(&self) -> &[MemoryRegion] {
        &self.regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        Registry::new(0x8000_0000)
    }

    #[test]
    fn reserve_then_lookup() {
        let mut reg = registry();
        reg.reserve(Namespace::Csr, "uart", 2).unwrap();
        assert_eq!(reg.lookup(Namespace::Csr, "uart").unwrap(), 2);
        assert!(matches!(
            reg.lookup(Namespace::Csr, "timer0"),
            Err(PlatformError::NotFound { .. })
        ));
    }

    #[test]
    fn namespaces_are_disjoint() {
        let mut reg = registry();
        reg.reserve(Namespace::Csr, "uart", 0).unwrap();
        reg.reserve(Namespace::Interrupt, "uart", 0).unwrap();
        assert!(reg.lookup(Namespace::Memory, "uart").is_err());
    }

    #[test]
    fn reservation_is_single_use() {
        let mut reg = registry();
        reg.reserve(Namespace::Csr, "uart", 2).unwrap();
        let err = reg.reserve(Namespace::Csr, "uart", 2).unwrap_err();
        assert!(matches!(err, PlatformError::Conflict { .. }));
    }

    #[test]
    fn value_collision_is_conflict() {
        let mut reg = registry();
        reg.reserve(Namespace::Interrupt, "uart", 0).unwrap();
        let err = reg.reserve(Namespace::Interrupt, "timer0", 0).unwrap_err();
        assert!(err.to_string().contains("uart"));
    }

    #[test]
    fn planned_entry_binds_once() {
        let mut reg = registry();
        reg.plan(Namespace::Csr, "hdmi_out", 10).unwrap();
        assert!(reg.lookup(Namespace::Csr, "hdmi_out").is_err());
        assert_eq!(reg.planned(Namespace::Csr, "hdmi_out"), Some(10));

        assert!(reg.reserve(Namespace::Csr, "hdmi_out", 11).is_err());
        assert_eq!(reg.reserve(Namespace::Csr, "hdmi_out", 10).unwrap(), 10);
        assert!(reg.reserve(Namespace::Csr, "hdmi_out", 10).is_err());
    }

    #[test]
    fn planned_value_blocks_other_names() {
        let mut reg = registry();
        reg.plan(Namespace::Csr, "hdmi_out", 10).unwrap();
        assert!(reg.reserve(Namespace::Csr, "leds", 10).is_err());
    }

    #[test]
    fn allocate_prefers_plan_then_lowest_free() {
        let mut reg = registry();
        reg.reserve(Namespace::Csr, "ctrl", 0).unwrap();
        reg.reserve(Namespace::Csr, "uart", 2).unwrap();
        reg.plan(Namespace::Csr, "ice_gpo", 12).unwrap();

        assert_eq!(reg.allocate(Namespace::Csr, "ice_gpo").unwrap(), 12);
        assert_eq!(reg.allocate(Namespace::Csr, "leds").unwrap(), 1);
        assert_eq!(reg.allocate(Namespace::Csr, "spiflash").unwrap(), 3);
        assert!(reg.allocate(Namespace::Memory, "spiflash").is_err());
    }

    #[test]
    fn bound_entries_sorted_by_value() {
        let mut reg = registry();
        reg.reserve(Namespace::Csr, "timer0", 3).unwrap();
        reg.reserve(Namespace::Csr, "ctrl", 0).unwrap();
        reg.plan(Namespace::Csr, "hdmi_out", 10).unwrap();
        let names: Vec<_> = reg
            .bound(Namespace::Csr)
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, vec!["ctrl", "timer0"]);
    }

    #[test]
    fn overlapping_regions_rejected() {
        let mut reg = registry();
        reg.reserve_region(MemoryRegion::cached("main_ram", 0xC000_0000, 0x1000_0000))
            .unwrap();
        let err = reg
            .reserve_region(MemoryRegion::cached("other", 0xC800_0000, 0x0100_0000))
            .unwrap_err();
        assert!(matches!(err, PlatformError::Overlap { .. }));
        // Nothing leaked into the namespace.
        assert!(reg.lookup(Namespace::Memory, "other").is_err());
    }

    #[test]
    fn shadow_alias_participates_in_overlap() {
        let mut reg = registry();
        reg.reserve_region(MemoryRegion::io("ethmac", 0xA000_0000, 0x2000))
            .unwrap();
        // 0x2000_0000 | 0x8000_0000 lands on ethmac.
        let err = reg
            .reserve_region(MemoryRegion::cached("spiflash", 0x2000_0000, 0x100_0000).with_shadow())
            .unwrap_err();
        assert!(matches!(err, PlatformError::Overlap { ref other, .. } if other == "ethmac"));
    }

    #[test]
    fn region_lookup() {
        let mut reg = registry();
        reg.reserve_region(MemoryRegion::cached("rom", 0, 0x8000)).unwrap();
        assert_eq!(reg.region("rom").unwrap().size_bytes, 0x8000);
        assert_eq!(reg.lookup(Namespace::Memory, "rom").unwrap(), 0);
        assert!(reg.region("sram").is_err());
        assert_eq!(reg.regions().len(), 1);
    }
}
