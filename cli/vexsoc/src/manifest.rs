//! `vexsoc.toml` manifest parsing and board resolution.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use vexsoc_compose::{DeviceTreeCompiler, NamespaceOverrides};
use vexsoc_platform::parse::{discover_boards, load_board_toml};
use vexsoc_platform::{builtin_board, builtin_boards, Board};

pub const MANIFEST_FILE: &str = "vexsoc.toml";

/// The top-level manifest of a vexsoc project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VexsocManifest {
    pub project: ProjectConfig,
    /// Namespace overrides layered over the Linux defaults.
    #[serde(default)]
    pub soc: NamespaceOverrides,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub devicetree: DeviceTreeConfig,
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

/// Network boot addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkConfig {
    #[serde(default = "default_local_ip")]
    pub local_ip: String,
    #[serde(default = "default_remote_ip")]
    pub remote_ip: String,
}

fn default_local_ip() -> String {
    "192.168.1.50".to_string()
}

fn default_remote_ip() -> String {
    "192.168.1.100".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            local_ip: default_local_ip(),
            remote_ip: default_remote_ip(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeviceTreeConfig {
    /// Run the device-tree compiler after emission.
    #[serde(default = "default_true")]
    pub compile: bool,
    /// Overrides the board's DTS variant.
    #[serde(default)]
    pub variant: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

impl Default for DeviceTreeConfig {
    fn default() -> Self {
        Self {
            compile: true,
            variant: None,
            program: None,
            source_dir: None,
            output: None,
        }
    }
}

impl DeviceTreeConfig {
    /// Compiler settings, with relative paths resolved against `project_dir`.
    pub fn compiler(&self, project_dir: &Path) -> DeviceTreeCompiler {
        let defaults = DeviceTreeCompiler::default();
        DeviceTreeCompiler {
            program: self.program.clone().unwrap_or(defaults.program),
            source_dir: project_dir.join(self.source_dir.as_ref().unwrap_or(&defaults.source_dir)),
            output: project_dir.join(self.output.as_ref().unwrap_or(&defaults.output)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BuildConfig {
    /// Board built when `--board` is not given.
    #[serde(default)]
    pub board: Option<String>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Attach the HDMI video pipeline.
    #[serde(default)]
    pub video: bool,
    /// Attach the iCE40 programming GPIOs.
    #[serde(default)]
    pub ice_gpo: bool,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("build")
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            board: None,
            output_dir: default_output_dir(),
            video: false,
            ice_gpo: false,
        }
    }
}

impl VexsocManifest {
    /// Search upward from `start_dir` for a `vexsoc.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: VexsocManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing vexsoc.toml")
    }
}

/// Resolve a board by name: built-ins first, then `boards/*.board.toml` in the
/// project.
pub fn resolve_board(name: &str, project_dir: Option<&Path>) -> Result<Board> {
    if let Some(board) = builtin_board(name) {
        return Ok(board);
    }
    if let Some(dir) = project_dir {
        for (board_name, path) in discover_boards(dir)? {
            if board_name == name {
                return load_board_toml(&path)
                    .with_context(|| format!("loading {}", path.display()));
            }
        }
    }
    bail!("unknown board: '{name}'. Use 'vexsoc board list' to see available boards.")
}

/// Expand a `--board` argument; `all` selects every built-in and project
/// board.
pub fn select_boards(name: &str, project_dir: Option<&Path>) -> Result<Vec<Board>> {
    if name != "all" {
        return Ok(vec![resolve_board(name, project_dir)?]);
    }
    let mut boards = builtin_boards();
    if let Some(dir) = project_dir {
        for (_, path) in discover_boards(dir)? {
            boards.push(
                load_board_toml(&path).with_context(|| format!("loading {}", path.display()))?,
            );
        }
    }
    Ok(boards)
}
