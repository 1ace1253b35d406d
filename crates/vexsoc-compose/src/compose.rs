//! Composition driver.
//!
//! base registered -> features applied (0..n) -> config emitted ->
//! (device tree compiled) -> finalized. No stage is revisited. Feature
//! application consumes the [`Composer`], so a failing module drops the whole
//! partial SoC.

use std::fmt;
use std::path::{Path, PathBuf};

use vexsoc_platform::{BasePlatform, PinCatalogue, PinResource, Registry};

use crate::arbiter::{Port, PortArbiter};
use crate::config::CompositionConfig;
use crate::constants::ConstantTable;
use crate::devicetree::DeviceTreeCompiler;
use crate::emit::derive_constants;
use crate::error::{ComposeError, Result};
use crate::fabric::{BusEndpoint, BusFabric};
use crate::feature::{Feature, FeatureAttachment, FeatureKind, FlashBoot};
use crate::tool::ToolRunner;

/// Driver stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Uninitialized,
    BaseRegistered,
    FeaturesApplied,
    ConfigEmitted,
    DeviceTreeCompiled,
    Finalized,
}

impl Stage {
    /// Valid transitions from this stage.
    pub fn valid_transitions(&self) -> &'static [Stage] {
        use Stage::*;
        match self {
            Uninitialized => &[BaseRegistered],
            BaseRegistered => &[FeaturesApplied],
            FeaturesApplied => &[FeaturesApplied, ConfigEmitted],
            ConfigEmitted => &[DeviceTreeCompiled, Finalized],
            DeviceTreeCompiled => &[Finalized],
            Finalized => &[],
        }
    }

    pub fn can_transition_to(&self, target: Stage) -> bool {
        self.valid_transitions().contains(&target)
    }

    fn advance(&mut self, target: Stage) -> Result<()> {
        if !self.can_transition_to(target) {
            return Err(ComposeError::InvalidTransition {
                from: *self,
                to: target,
            });
        }
        if *self != target {
            tracing::debug!(from = %self, to = %target, "composition stage");
        }
        *self = target;
        Ok(())
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Uninitialized => write!(f, "UNINITIALIZED"),
            Stage::BaseRegistered => write!(f, "BASE_REGISTERED"),
            Stage::FeaturesApplied => write!(f, "FEATURES_APPLIED"),
            Stage::ConfigEmitted => write!(f, "CONFIG_EMITTED"),
            Stage::DeviceTreeCompiled => write!(f, "DEVICE_TREE_COMPILED"),
            Stage::Finalized => write!(f, "FINALIZED"),
        }
    }
}

/// Mutable SoC under composition, handed to feature modules.
#[derive(Debug, Clone)]
pub struct SocState {
    pub platform: BasePlatform,
    pub registry: Registry,
    pub fabric: BusFabric,
    /// Present when the base platform has a DRAM controller.
    pub arbiter: Option<PortArbiter>,
    pub pins: PinCatalogue,
    pub constants: ConstantTable,
    /// Set by the boot-flash module.
    pub flash_boot: Option<FlashBoot>,
}

fn base_endpoint(region: &str) -> &str {
    match region {
        "csr" => "csr_bridge",
        "main_ram" => "sdram",
        other => other,
    }
}

/// Owns one composition from base registration until emission.
#[derive(Debug)]
pub struct Composer {
    board: String,
    dts_variant: Option<String>,
    stage: Stage,
    soc: SocState,
    attachments: Vec<FeatureAttachment>,
}

impl Composer {
    /// Register the base platform with the merged namespace tables.
    pub fn new(config: CompositionConfig) -> Result<Self> {
        let mut stage = Stage::Uninitialized;
        tracing::info!(board = %config.board.name, "registering base platform");

        let registry = config.seed_registry()?;
        let mut fabric = BusFabric::new();
        for region in registry.regions() {
            fabric.attach(
                &registry,
                &region.name,
                BusEndpoint::new(base_endpoint(&region.name)),
            )?;
        }

        let platform = config.board.platform;
        let mut arbiter = platform.sdram.as_ref().map(PortArbiter::new);
        for request in config.dram_ports {
            arbiter
                .as_mut()
                .ok_or_else(|| ComposeError::NotFound {
                    what: "memory-access arbiter".into(),
                })?
                .get_port(request)?;
        }
        let pins = PinCatalogue::new(platform.pins.clone(), platform.connectors.clone());

        stage.advance(Stage::BaseRegistered)?;
        Ok(Self {
            board: config.board.name,
            dts_variant: config.board.dts_variant,
            stage,
            soc: SocState {
                platform,
                registry,
                fabric,
                arbiter,
                pins,
                constants: ConstantTable::new(),
                flash_boot: None,
            },
            attachments: Vec::new(),
        })
    }

    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn state(&self) -> &SocState {
        &self.soc
    }

    pub fn has_applied(&self, kind: FeatureKind) -> bool {
        self.attachments.iter().any(|a| a.kind == kind)
    }

    /// Apply one feature module. Boot configuration must come last.
    pub fn apply(mut self, feature: &dyn Feature) -> Result<Self> {
        let kind = feature.kind();
        self.stage.advance(Stage::FeaturesApplied)?;
        if self.has_applied(FeatureKind::BootConfig) {
            return Err(ComposeError::Ordering {
                feature: kind,
                detail: "boot configuration has already been applied and must be last".into(),
            });
        }

        let attachment = feature.apply(&mut self.soc)?;
        tracing::info!(
            feature = %kind,
            csr = attachment.csr.len(),
            pins = attachment.pins.len(),
            constants = attachment.constants.len(),
            "applied feature"
        );
        self.attachments.push(attachment);
        Ok(self)
    }

    /// Run the configuration emitter and freeze the result.
    pub fn emit(mut self) -> Result<ComposedSoc> {
        if self.stage == Stage::BaseRegistered {
            self.stage.advance(Stage::FeaturesApplied)?;
        }
        self.stage.advance(Stage::ConfigEmitted)?;

        for (name, value) in derive_constants(&self.soc)? {
            self.soc.constants.add(&name, value)?;
        }
        tracing::info!(
            board = %self.board,
            constants = self.soc.constants.len(),
            features = self.attachments.len(),
            "configuration emitted"
        );

        let SocState {
            platform,
            registry,
            fabric,
            arbiter,
            pins,
            constants,
            flash_boot,
        } = self.soc;
        Ok(ComposedSoc {
            board: self.board,
            dts_variant: self.dts_variant,
            stage: self.stage,
            platform,
            registry,
            fabric,
            ports: arbiter.map(|a| a.ports().to_vec()).unwrap_or_default(),
            pins,
            constants,
            attachments: self.attachments,
            flash_boot,
            device_tree: None,
        })
    }
}

/// A composed SoC. Read-only apart from the device-tree side step.
#[derive(Debug, Clone)]
pub struct ComposedSoc {
    pub(crate) board: String,
    pub(crate) dts_variant: Option<String>,
    pub(crate) stage: Stage,
    pub(crate) platform: BasePlatform,
    pub(crate) registry: Registry,
    pub(crate) fabric: BusFabric,
    pub(crate) ports: Vec<Port>,
    pub(crate) pins: PinCatalogue,
    pub(crate) constants: ConstantTable,
    pub(crate) attachments: Vec<FeatureAttachment>,
    pub(crate) flash_boot: Option<FlashBoot>,
    pub(crate) device_tree: Option<PathBuf>,
}

impl ComposedSoc {
    pub fn board(&self) -> &str {
        &self.board
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn platform(&self) -> &BasePlatform {
        &self.platform
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn fabric(&self) -> &BusFabric {
        &self.fabric
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn constants(&self) -> &ConstantTable {
        &self.constants
    }

    pub fn attachments(&self) -> &[FeatureAttachment] {
        &self.attachments
    }

    pub fn attachment(&self, kind: FeatureKind) -> Option<&FeatureAttachment> {
        self.attachments.iter().find(|a| a.kind == kind)
    }

    /// Whether the boot-flash module ran.
    pub fn flash_boot(&self) -> Option<&FlashBoot> {
        self.flash_boot.as_ref()
    }

    /// Pin resources for the constraint resolver, in request order.
    pub fn pin_requirements(&self) -> Vec<&PinResource> {
        self.pins.requirements()
    }

    pub fn device_tree(&self) -> Option<&Path> {
        self.device_tree.as_deref()
    }

    /// Compile the board's device tree with an external compiler.
    ///
    /// `variant` defaults to the board's variant (empty for the default
    /// source). Failure leaves the SoC in `ConfigEmitted` with its constants
    /// untouched.
    pub fn compile_device_tree(
        &mut self,
        compiler: &DeviceTreeCompiler,
        runner: &dyn ToolRunner,
        variant: Option<&str>,
    ) -> Result<&Path> {
        if !self.stage.can_transition_to(Stage::DeviceTreeCompiled) {
            return Err(ComposeError::InvalidTransition {
                from: self.stage,
                to: Stage::DeviceTreeCompiled,
            });
        }
        let variant = variant
            .or(self.dts_variant.as_deref())
            .unwrap_or("")
            .to_string();
        let output = compiler.compile(runner, &variant)?;
        self.stage.advance(Stage::DeviceTreeCompiled)?;
        Ok(self.device_tree.insert(output).as_path())
    }

    /// Mark the composition complete.
    pub fn finalize(&mut self) -> Result<()> {
        self.stage.advance(Stage::Finalized)?;
        tracing::info!(board = %self.board, "composition finalized");
        Ok(())
    }
}
