//! Device-tree compile step.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::tool::{run_checked, ToolInvocation, ToolRunner};

/// Where the board device-tree sources live and where the blob goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DeviceTreeCompiler {
    pub program: String,
    pub source_dir: PathBuf,
    pub output: PathBuf,
}

impl Default for DeviceTreeCompiler {
    fn default() -> Self {
        Self {
            program: "dtc".into(),
            source_dir: PathBuf::from("buildroot/board/litex_vexriscv"),
            output: PathBuf::from("buildroot/rv32.dtb"),
        }
    }
}

impl DeviceTreeCompiler {
    /// Source for a board variant; an empty variant is the default board.
    pub fn source(&self, variant: &str) -> PathBuf {
        let file = if variant.is_empty() {
            "litex_vexriscv.dts".to_string()
        } else {
            format!("litex_vexriscv_{variant}.dts")
        };
        self.source_dir.join(file)
    }

    pub fn invocation(&self, variant: &str) -> ToolInvocation {
        ToolInvocation::new(&self.program).args([
            "-O".to_string(),
            "dtb".to_string(),
            "-o".to_string(),
            self.output.display().to_string(),
            self.source(variant).display().to_string(),
        ])
    }

    /// Compile and return the output path.
    pub fn compile(&self, runner: &dyn ToolRunner, variant: &str) -> Result<PathBuf> {
        run_checked(runner, &self.invocation(variant))?;
        tracing::info!(output = %self.output.display(), variant, "device tree compiled");
        Ok(self.output.clone())
    }
}
