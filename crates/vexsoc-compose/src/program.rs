//! Bitstream loading and flash programming plans per board.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::{ComposeError, Result};
use crate::tool::{run_checked, ToolInvocation, ToolRunner};

/// What a plan does to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgramAction {
    /// Load the bitstream into the FPGA's volatile configuration memory.
    Load,
    /// Write bitstream and boot images to the configuration flash.
    Flash,
}

impl fmt::Display for ProgramAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramAction::Load => write!(f, "load"),
            ProgramAction::Flash => write!(f, "flash"),
        }
    }
}

/// Files written to the Arty configuration flash, relative to the project
/// directory, and their flash offsets.
pub const ARTY_FLASH_IMAGES: [(&str, u64); 5] = [
    ("gateware/top.bin", 0x0000_0000),
    ("buildroot/Image", 0x0040_0000),
    ("buildroot/rootfs.cpio", 0x0080_0000),
    ("buildroot/rv32.dtb", 0x00f0_0000),
    ("emulator/emulator.bin", 0x00f8_0000),
];

const XILINX_CFG: &str = "prog/openocd_xilinx.cfg";
const XC7A35T_PROXY: &str = "prog/bscan_spi_xc7a35t.bit";

/// Ordered tool invocations for one board and action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgramPlan {
    pub board: String,
    pub action: ProgramAction,
    pub steps: Vec<ToolInvocation>,
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

fn openocd(cfg: &str, commands: &str) -> ToolInvocation {
    ToolInvocation::new("openocd").args(["-f", cfg, "-c", commands])
}

impl ProgramPlan {
    /// Plan a bitstream load. `build_dir` is the board's build directory
    /// (containing `gateware/`); `root` is the project directory holding
    /// `prog/`, and every step runs there.
    pub fn load(board: &str, build_dir: &Path, root: &Path) -> Result<Self> {
        let gateware = build_dir.join("gateware");
        let bit = path_arg(&gateware.join("top.bit"));
        let svf = path_arg(&gateware.join("top.svf"));
        let steps = match board {
            "arty" => vec![openocd(
                XILINX_CFG,
                &format!("transport select jtag; init; pld load 0 {{{bit}}}; exit"),
            )],
            "minispartan6" => vec![ToolInvocation::new("xc3sprog").args(["-c", "ftdi", bit.as_str()])],
            "versa_ecp5" => vec![
                ToolInvocation::new("python3").args(["prog/bit_to_svf.py", bit.as_str(), svf.as_str()]),
                openocd(
                    "prog/ecp5-versa5g.cfg",
                    &format!("transport select jtag; init; svf {svf}; exit"),
                ),
            ],
            "ulx3s" => vec![ToolInvocation::new("ujprog").arg(svf)],
            other => return Err(unsupported(other, ProgramAction::Load)),
        };
        Ok(Self {
            board: board.into(),
            action: ProgramAction::Load,
            steps: in_dir(steps, root),
        })
    }

    /// Plan a flash write of the gateware and Linux boot images. `root` is
    /// the project directory holding `prog/`, `buildroot/` and `emulator/`.
    pub fn flash(board: &str, build_dir: &Path, root: &Path) -> Result<Self> {
        if board != "arty" {
            return Err(unsupported(board, ProgramAction::Flash));
        }
        let steps = ARTY_FLASH_IMAGES
            .iter()
            .map(|(file, offset)| {
                let path: PathBuf = match file.strip_prefix("gateware/") {
                    Some(name) => build_dir.join("gateware").join(name),
                    None => root.join(file),
                };
                openocd(
                    XILINX_CFG,
                    &format!(
                        "init; jtagspi_init 0 {{{XC7A35T_PROXY}}}; jtagspi_program {{{}}} 0x{offset:08x}; fpga_program; exit",
                        path_arg(&path)
                    ),
                )
            })
            .collect();
        Ok(Self {
            board: board.into(),
            action: ProgramAction::Flash,
            steps: in_dir(steps, root),
        })
    }

    /// Run every step in order, stopping at the first failure.
    pub fn execute(&self, runner: &dyn ToolRunner) -> Result<()> {
        for (i, step) in self.steps.iter().enumerate() {
            tracing::info!(
                board = %self.board,
                action = %self.action,
                step = i + 1,
                of = self.steps.len(),
                "programming"
            );
            run_checked(runner, step)?;
        }
        Ok(())
    }
}

fn in_dir(steps: Vec<ToolInvocation>, root: &Path) -> Vec<ToolInvocation> {
    steps.into_iter().map(|s| s.current_dir(root)).collect()
}

fn unsupported(board: &str, action: ProgramAction) -> ComposeError {
    ComposeError::Unsupported {
        board: board.into(),
        action: action.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tool::testing::ScriptedRunner;

    #[test]
    fn versa_load_converts_then_programs() {
        let plan = ProgramPlan::load("versa_ecp5", Path::new("build/versa_ecp5"), Path::new("/work/lab")).unwrap();
        assert_eq!(plan.steps.len(), 2);
        assert_eq!(plan.steps[0].program, "python3");
        assert_eq!(plan.steps[1].program, "openocd");
        assert!(plan.steps[1].args[3].contains("svf build/versa_ecp5/gateware/top.svf"));
        for step in &plan.steps {
            assert_eq!(step.cwd.as_deref(), Some(Path::new("/work/lab")));
        }
    }

    #[test]
    fn arty_flash_writes_every_image() {
        let plan =
            ProgramPlan::flash("arty", Path::new("build/arty"), Path::new(".")).unwrap();
        assert_eq!(plan.steps.len(), ARTY_FLASH_IMAGES.len());
        assert!(plan.steps[0].args[3].contains("build/arty/gateware/top.bin"));
        assert!(plan.steps[0].args[3].contains("0x00000000"));
        assert!(plan.steps[3].args[3].contains("rv32.dtb"));
        assert!(plan.steps[3].args[3].contains("0x00f00000"));
        assert!(plan.steps.iter().all(|s| s.cwd.as_deref() == Some(Path::new("."))));
    }

    #[test]
    fn flash_unsupported_elsewhere() {
        for board in ["minispartan6", "versa_ecp5", "ulx3s"] {
            let err = ProgramPlan::flash(board, Path::new("build"), Path::new(".")).unwrap_err();
            assert!(matches!(err, ComposeError::Unsupported { .. }));
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn execute_stops_at_first_failure() {
        let plan = ProgramPlan::load("versa_ecp5", Path::new("build/versa_ecp5"), Path::new("/work/lab")).unwrap();
        let runner = ScriptedRunner::failing("cable not found");
        assert_eq!(plan.execute(&runner).unwrap_err().kind(), ErrorKind::ExternalTool);
        assert_eq!(runner.calls.borrow().len(), 1);
    }
}
