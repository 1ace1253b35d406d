//! Memory regions of the SoC address map.

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};

/// How the processor is expected to access a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegionKind {
    /// Cacheable memory (ROM, RAM, flash).
    Cached,
    /// Uncached device registers.
    Io,
}

/// A named window of the processor's address space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MemoryRegion {
    /// Region name (e.g., "rom", "main_ram", "spiflash").
    pub name: String,
    /// Base address seen by the bus decoder.
    pub base_address: u64,
    /// Size in bytes.
    pub size_bytes: u64,
    /// Whether the region is also exposed at `base | shadow_base` (cache bypass).
    #[serde(default)]
    pub shadowed: bool,
    /// Access kind.
    pub kind: RegionKind,
}

/// A half-open address span `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: u64,
    pub end: u64,
}

impl Span {
    pub fn intersects(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.start <= addr && addr < self.end
    }
}

impl MemoryRegion {
    /// Cached region constructor.
    pub fn cached(name: impl Into<String>, base_address: u64, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            base_address,
            size_bytes,
            shadowed: false,
            kind: RegionKind::Cached,
        }
    }

    /// Device-register region constructor.
    pub fn io(name: impl Into<String>, base_address: u64, size_bytes: u64) -> Self {
        Self {
            name: name.into(),
            base_address,
            size_bytes,
            shadowed: false,
            kind: RegionKind::Io,
        }
    }

    /// Mark the region as reachable through the shadow alias.
    pub fn with_shadow(mut self) -> Self {
        self.shadowed = true;
        self
    }

    /// End address (exclusive), saturating at the top of the address space.
    pub fn end_address(&self) -> u64 {
        self.base_address.saturating_add(self.size_bytes)
    }

    /// The direct span decoded by the bus.
    pub fn span(&self) -> Span {
        Span {
            start: self.base_address,
            end: self.end_address(),
        }
    }

    /// Base address of the shadow alias, if the region is shadowed.
    pub fn alias_base(&self, shadow_base: u64) -> Option<u64> {
        self.shadowed.then_some(self.base_address | shadow_base)
    }

    /// Every span through which the processor can reach this region.
    pub fn exposed_spans(&self, shadow_base: u64) -> Vec<Span> {
        let mut spans = vec![self.span()];
        if let Some(alias) = self.alias_base(shadow_base) {
            spans.push(Span {
                start: alias,
                end: alias.saturating_add(self.size_bytes),
            });
        }
        spans
    }

    /// The address firmware should use: the shadow alias when present.
    pub fn exposed_base(&self, shadow_base: u64) -> u64 {
        self.alias_base(shadow_base).unwrap_or(self.base_address)
    }

    /// Check the region fits the decoder: power-of-two size, base aligned to
    /// the size, and no shadow bit already present on a shadowed base.
    pub fn validate_geometry(&self, shadow_base: u64) -> Result<()> {
        if self.size_bytes == 0 || !self.size_bytes.is_power_of_two() {
            return Err(PlatformError::validation(format!(
                "memory region '{}' size 0x{:X} is not a power of two",
                self.name, self.size_bytes
            )));
        }
        if self.base_address % self.size_bytes != 0 {
            return Err(PlatformError::validation(format!(
                "memory region '{}' base 0x{:08X} is not aligned to its size 0x{:X}",
                self.name, self.base_address, self.size_bytes
            )));
        }
        if self.shadowed && self.base_address & shadow_base != 0 {
            return Err(PlatformError::validation(format!(
                "shadowed region '{}' base 0x{:08X} already lies in the shadow window 0x{:08X}",
                self.name, self.base_address, shadow_base
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHADOW: u64 = 0x8000_0000;

    #[test]
    fn shadowed_region_exposes_two_spans() {
        let r = MemoryRegion::cached("spiflash", 0x5000_0000, 0x100_0000).with_shadow();
        let spans = r.exposed_spans(SHADOW);
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[1].start, 0xD000_0000);
        assert_eq!(r.exposed_base(SHADOW), 0xD000_0000);
    }

    #[test]
    fn plain_region_has_no_alias() {
        let r = MemoryRegion::cached("rom", 0, 0x8000);
        assert_eq!(r.alias_base(SHADOW), None);
        assert_eq!(r.exposed_base(SHADOW), 0);
        assert_eq!(r.exposed_spans(SHADOW).len(), 1);
    }

    #[test]
    fn geometry_rejects_odd_sizes_and_misalignment() {
        assert!(MemoryRegion::cached("x", 0, 0x3000)
            .validate_geometry(SHADOW)
            .is_err());
        assert!(MemoryRegion::cached("x", 0x1000, 0x4000)
            .validate_geometry(SHADOW)
            .is_err());
        assert!(MemoryRegion::cached("x", 0x4000, 0x4000)
            .validate_geometry(SHADOW)
            .is_ok());
    }

    #[test]
    fn geometry_rejects_shadow_bit_on_shadowed_base() {
        let r = MemoryRegion::cached("x", 0x9000_0000, 0x1000).with_shadow();
        assert!(r.validate_geometry(SHADOW).is_err());
    }

    #[test]
    fn span_intersection_is_half_open() {
        let a = Span { start: 0, end: 0x100 };
        let b = Span {
            start: 0x100,
            end: 0x200,
        };
        assert!(!a.intersects(&b));
        assert!(a.contains(0xFF));
        assert!(!a.contains(0x100));
    }
}
