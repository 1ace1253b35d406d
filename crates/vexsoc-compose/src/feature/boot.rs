//! Boot-mode selection for the boot loader.

use super::{Feature, FeatureAttachment, FeatureKind};
use crate::compose::SocState;
use crate::error::Result;

/// Network boot is always enabled; flash boot only when the boot flash was
/// attached earlier in the composition. Must be the last feature applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootConfig;

impl Feature for BootConfig {
    fn kind(&self) -> FeatureKind {
        FeatureKind::BootConfig
    }

    fn apply(&self, soc: &mut SocState) -> Result<FeatureAttachment> {
        let mut attachment = FeatureAttachment::new(self.kind());
        attachment.marker(soc, "NETBOOT_LINUX_VEXRISCV")?;
        if let Some(boot_address) = soc.flash_boot.as_ref().map(|f| f.boot_address) {
            attachment.marker(soc, "FLASHBOOT_LINUX_VEXRISCV")?;
            attachment.constant(soc, "FLASH_BOOT_ADDRESS", boot_address)?;
        }
        Ok(attachment)
    }
}
