//! Boot flash: quad SPI flash mapped into the address space so the boot
//! loader can copy the kernel out of it.

use serde::Serialize;
use vexsoc_platform::{MemoryRegion, Namespace};

use super::{Core, Feature, FeatureAttachment, FeatureKind, Primitive};
use crate::compose::SocState;
use crate::error::{ComposeError, Result};
use crate::fabric::BusEndpoint;
use crate::wiring::SignalRef;

const REGION: &str = "spiflash";

/// Boot flash parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootFlash {
    /// Direct base address; `None` takes the planned `spiflash` entry.
    pub base: Option<u64>,
    pub size_bytes: u64,
    pub dummy_cycles: u32,
    pub clock_div: u32,
    /// Offset of the kernel image inside the flash.
    pub image_offset: u64,
}

impl Default for BootFlash {
    fn default() -> Self {
        Self {
            base: None,
            size_bytes: 0x100_0000,
            dummy_cycles: 11,
            clock_div: 2,
            image_offset: 0x40_0000,
        }
    }
}

/// Set on the SoC once the boot flash is attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlashBoot {
    pub region: String,
    /// Address the processor uses to reach the flash (shadow alias).
    pub exposed_base: u64,
    /// Where the boot loader finds the kernel image.
    pub boot_address: u64,
}

impl Feature for BootFlash {
    fn kind(&self) -> FeatureKind {
        FeatureKind::BootFlash
    }

    fn apply(&self, soc: &mut SocState) -> Result<FeatureAttachment> {
        // The flash clock pin is owned by the configuration logic; user
        // logic only reaches it through a startup primitive.
        let family = soc.platform.family;
        if !family.has_startup_clock_primitive() {
            return Err(ComposeError::validation(format!(
                "boot flash needs a user-driven configuration clock; {family:?} targets are not supported"
            )));
        }
        if self.image_offset >= self.size_bytes {
            return Err(ComposeError::validation(format!(
                "image offset 0x{:X} lies outside the 0x{:X}-byte flash",
                self.image_offset, self.size_bytes
            )));
        }

        let base = self
            .base
            .or_else(|| soc.registry.planned(Namespace::Memory, REGION))
            .or_else(|| soc.registry.lookup(Namespace::Memory, REGION).ok())
            .ok_or_else(|| ComposeError::NotFound {
                what: format!("memory map entry '{REGION}'"),
            })?;

        let mut attachment = FeatureAttachment::new(self.kind());
        let shadow = soc.registry.shadow_base();
        let exposed_base = soc
            .registry
            .reserve_region(MemoryRegion::cached(REGION, base, self.size_bytes).with_shadow())?
            .exposed_base(shadow);
        attachment.regions.push(REGION.into());
        soc.fabric
            .attach(&soc.registry, REGION, BusEndpoint::new(REGION))?;
        attachment.bind_csr(soc, REGION)?;
        attachment.request_pins(soc, "spiflash4x", 0)?;

        attachment.primitives.push(Primitive::Startupe2 {
            user_clock: SignalRef::new("spiflash4x.clk"),
            user_done: 1,
        });
        attachment.cores.push(Core::SpiFlash {
            name: REGION.into(),
            dummy_cycles: self.dummy_cycles,
            clock_div: self.clock_div,
            endianness: soc.platform.cpu.endianness,
        });

        let boot = FlashBoot {
            region: REGION.into(),
            exposed_base,
            boot_address: exposed_base + self.image_offset,
        };
        tracing::debug!(
            base = boot.exposed_base,
            boot_address = boot.boot_address,
            "boot flash attached"
        );
        soc.flash_boot = Some(boot);
        Ok(attachment)
    }
}
