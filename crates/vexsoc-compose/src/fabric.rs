//! Bus fabric adapter.
//!
//! Binds a peripheral's bus interface to a reserved memory region and decodes
//! addresses logically. A shadowed region answers at both its direct span and
//! its alias span; both resolve to the same peripheral.

use serde::Serialize;
use vexsoc_platform::{PlatformError, Registry, Span};

use crate::error::{ComposeError, Result};

/// Peripheral side of a bus attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BusEndpoint {
    /// Peripheral instance name.
    pub peripheral: String,
    /// Data width of the peripheral bus interface in bits.
    pub data_width: u32,
}

impl BusEndpoint {
    pub fn new(peripheral: &str) -> Self {
        Self {
            peripheral: peripheral.into(),
            data_width: 32,
        }
    }
}

/// Which span an access came through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessPath {
    Direct,
    /// Cache-bypassing alias.
    Shadowed,
}

/// A peripheral bound to a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Attachment {
    pub region: String,
    pub endpoint: BusEndpoint,
    pub base: u64,
    pub size: u64,
    /// Base of the alias span, for shadowed regions.
    pub alias_base: Option<u64>,
}

impl Attachment {
    fn resolve(&self, addr: u64) -> Option<AccessPath> {
        let direct = Span {
            start: self.base,
            end: self.base.saturating_add(self.size),
        };
        if direct.contains(addr) {
            return Some(AccessPath::Direct);
        }
        let alias = self.alias_base.map(|start| Span {
            start,
            end: start.saturating_add(self.size),
        })?;
        alias.contains(addr).then_some(AccessPath::Shadowed)
    }
}

/// Address-decoded shared bus.
#[derive(Debug, Clone, Default)]
pub struct BusFabric {
    attachments: Vec<Attachment>,
}

impl BusFabric {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `endpoint` to the region previously reserved as `region`.
    pub fn attach(
        &mut self,
        registry: &Registry,
        region: &str,
        endpoint: BusEndpoint,
    ) -> Result<&Attachment> {
        let reserved = registry.region(region).map_err(|e| match e {
            PlatformError::NotFound { .. } => ComposeError::UnboundRegion {
                region: region.into(),
                peripheral: endpoint.peripheral.clone(),
            },
            other => other.into(),
        })?;
        if let Some(existing) = self.attachments.iter().find(|a| a.region == region) {
            return Err(ComposeError::Conflict {
                resource: format!("bus region '{region}'"),
                detail: format!(
                    "already attached to '{}', cannot attach '{}'",
                    existing.endpoint.peripheral, endpoint.peripheral
                ),
            });
        }
        let attachment = Attachment {
            region: region.into(),
            base: reserved.base_address,
            size: reserved.size_bytes,
            alias_base: reserved.alias_base(registry.shadow_base()),
            endpoint,
        };
        tracing::debug!(
            region,
            peripheral = %attachment.endpoint.peripheral,
            base = attachment.base,
            "attached bus endpoint"
        );
        self.attachments.push(attachment);
        Ok(&self.attachments[self.attachments.len() - 1])
    }

    /// Resolve an address to the peripheral answering it.
    pub fn decode(&self, addr: u64) -> Option<(&Attachment, AccessPath)> {
        self.attachments
            .iter()
            .find_map(|a| a.resolve(addr).map(|path| (a, path)))
    }

    pub fn attachment(&self, region: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.region == region)
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use vexsoc_platform::MemoryRegion;

    fn registry() -> Registry {
        let mut reg = Registry::new(0x8000_0000);
        reg.reserve_region(MemoryRegion::cached("rom", 0, 0x8000))
            .unwrap();
        reg.reserve_region(MemoryRegion::cached("spiflash", 0x5000_0000, 0x100_0000).with_shadow())
            .unwrap();
        reg
    }

    #[test]
    fn attach_requires_reserved_region() {
        let reg = registry();
        let mut bus = BusFabric::new();
        let err = bus
            .attach(&reg, "main_ram", BusEndpoint::new("sdram"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnboundRegion);
    }

    #[test]
    fn one_peripheral_per_region() {
        let reg = registry();
        let mut bus = BusFabric::new();
        bus.attach(&reg, "rom", BusEndpoint::new("rom")).unwrap();
        let err = bus
            .attach(&reg, "rom", BusEndpoint::new("bootrom2"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn shadowed_and_direct_paths_reach_same_peripheral() {
        let reg = registry();
        let mut bus = BusFabric::new();
        bus.attach(&reg, "spiflash", BusEndpoint::new("spiflash"))
            .unwrap();

        let (direct, path) = bus.decode(0x5000_0010).unwrap();
        assert_eq!(path, AccessPath::Direct);
        let (alias, path) = bus.decode(0xD000_0010).unwrap();
        assert_eq!(path, AccessPath::Shadowed);
        assert_eq!(direct.endpoint, alias.endpoint);
        assert!(bus.decode(0x6000_0000).is_none());
    }
}
