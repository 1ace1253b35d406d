//! TOML parsing, serialization, validation, and discovery for board definitions.
//!
//! Custom boards are stored as `.board.toml` files in the `boards/` directory of
//! a vexsoc project. This module loads, validates, serializes, and discovers
//! these files.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::board::{Board, Capability};
use crate::error::{PlatformError, Result};

/// A validation issue found in a board definition.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity: "error" or "warning".
    pub severity: &'static str,
    /// Human-readable description.
    pub message: String,
}

impl ValidationIssue {
    fn error(message: String) -> Self {
        Self {
            severity: "error",
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            severity: "warning",
            message,
        }
    }
}

/// Region and peripheral names become `NAME_BASE`/`CSR_NAME_BASE` macros.
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Load a board from a `.board.toml` file.
pub fn load_board_toml(path: &Path) -> Result<Board> {
    if !path.exists() {
        return Err(PlatformError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_board_toml(&content)
}

/// Parse a board from a TOML string.
pub fn parse_board_toml(toml_str: &str) -> Result<Board> {
    let board: Board = toml::from_str(toml_str)?;
    Ok(board)
}

/// Serialize a board to pretty TOML.
pub fn board_to_toml(board: &Board) -> Result<String> {
    let toml_str = toml::to_string_pretty(board)?;
    Ok(toml_str)
}

/// Validate a board definition for structural correctness.
///
/// Returns `Ok(())` if valid, or `Err(issues)` with a list of problems.
pub fn validate_board(board: &Board) -> std::result::Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();
    let platform = &board.platform;
    let shadow = platform.shadow_base;

    if platform.clock_hz == 0 {
        issues.push(ValidationIssue::error("system clock is 0 Hz".into()));
    }

    // Region geometry and pairwise overlap over exposed spans
    for region in &platform.regions {
        if !is_identifier(&region.name) {
            issues.push(ValidationIssue::error(format!(
                "memory region name '{}' is not a C identifier",
                region.name
            )));
        }
        if let Err(e) = region.validate_geometry(shadow) {
            issues.push(ValidationIssue::error(e.to_string()));
        }
    }
    let regions = &platform.regions;
    for i in 0..regions.len() {
        for j in (i + 1)..regions.len() {
            let a = &regions[i];
            let b = &regions[j];
            if a.name == b.name {
                issues.push(ValidationIssue::error(format!(
                    "memory region '{}' declared twice",
                    a.name
                )));
                continue;
            }
            let overlap = a.exposed_spans(shadow).iter().any(|sa| {
                b.exposed_spans(shadow)
                    .iter()
                    .any(|sb| sa.intersects(sb))
            });
            if overlap {
                issues.push(ValidationIssue::error(format!(
                    "memory regions '{}' (0x{:X}..0x{:X}) and '{}' (0x{:X}..0x{:X}) overlap",
                    a.name,
                    a.base_address,
                    a.end_address(),
                    b.name,
                    b.base_address,
                    b.end_address()
                )));
            }
        }
    }
    if platform.region("csr").is_none() {
        issues.push(ValidationIssue::error("no 'csr' window in the memory map".into()));
    }
    if platform.region("main_ram").is_none() {
        issues.push(ValidationIssue::warning("no 'main_ram' region".into()));
    }

    // Peripheral names, CSR slots and interrupt lines are unique
    let mut names = HashSet::new();
    let mut slots = HashSet::new();
    let mut irqs = HashSet::new();
    for p in &platform.peripherals {
        if !is_identifier(&p.name) {
            issues.push(ValidationIssue::error(format!(
                "peripheral name '{}' is not a C identifier",
                p.name
            )));
        }
        if !names.insert(p.name.as_str()) {
            issues.push(ValidationIssue::error(format!(
                "peripheral '{}' declared twice",
                p.name
            )));
        }
        if let Some(slot) = p.csr {
            if !slots.insert(slot) {
                issues.push(ValidationIssue::error(format!(
                    "CSR slot {slot} of '{}' is already used",
                    p.name
                )));
            }
        }
        if let Some(irq) = p.interrupt {
            if !irqs.insert(irq) {
                issues.push(ValidationIssue::error(format!(
                    "interrupt {irq} of '{}' is already used",
                    p.name
                )));
            }
        }
    }

    // Capabilities need their hardware
    if board.has(Capability::Ethernet) && !platform.has_ethernet() {
        issues.push(ValidationIssue::error(
            "ethernet capability without an 'ethmac' region".into(),
        ));
    }
    if board.has(Capability::SpiFlash)
        && !platform.pins.iter().any(|p| p.name == "spiflash4x")
    {
        issues.push(ValidationIssue::error(
            "spiflash capability without a 'spiflash4x' pin resource".into(),
        ));
    }
    if board.has(Capability::Leds) && !platform.pins.iter().any(|p| p.name == "user_led") {
        issues.push(ValidationIssue::warning(
            "leds capability without any 'user_led' pins".into(),
        ));
    }
    if platform.sdram.is_none() {
        issues.push(ValidationIssue::warning(
            "no SDRAM controller; streaming ports are unavailable".into(),
        ));
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

/// Generate a template `.board.toml` for a new board.
///
/// Seeds from the arty board with the given custom name.
pub fn generate_template(name: &str) -> Result<String> {
    let mut board = Board::arty();
    board.name = name.into();
    board.description = format!("{name} (custom board)");
    board.dts_variant = None;
    board_to_toml(&board)
}

/// Discover all `.board.toml` files in a project's `boards/` directory.
///
/// Returns a list of (board_name, file_path) pairs.
pub fn discover_boards(project_dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let boards_dir = project_dir.join("boards");
    if !boards_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut boards = Vec::new();
    for entry in std::fs::read_dir(&boards_dir)? {
        let path = entry?.path();
        if let Some(name) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".board.toml"))
        {
            boards.push((name.to_string(), path.clone()));
        }
    }
    boards.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(boards)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::MemoryRegion;

    #[test]
    fn round_trip_arty() {
        let original = Board::arty();
        let toml_str = board_to_toml(&original).unwrap();
        let parsed = parse_board_toml(&toml_str).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn builtins_validate() {
        for board in crate::board::builtin_boards() {
            assert!(
                validate_board(&board).is_ok(),
                "{} should validate: {:?}",
                board.name,
                validate_board(&board).err()
            );
        }
    }

    #[test]
    fn overlap_is_reported() {
        let mut board = Board::ulx3s();
        board
            .platform
            .regions
            .push(MemoryRegion::cached("extra", 0xC000_0000, 0x1000));
        let issues = validate_board(&board).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.severity == "error" && i.message.contains("overlap")));
    }

    #[test]
    fn names_must_be_c_identifiers() {
        let mut board = Board::arty();
        board.platform.regions.push(MemoryRegion::cached("my-ram", 0x2000_0000, 0x1000));
        board.platform.peripherals[0].name = "1ctrl".into();
        let issues = validate_board(&board).unwrap_err();
        assert!(issues
            .iter()
            .any(|i| i.severity == "error" && i.message.contains("'my-ram'")));
        assert!(issues.iter().any(|i| i.message.contains("'1ctrl'")));

        assert!(is_identifier("emulator_ram"));
        assert!(is_identifier("_x0"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("hdmi out"));
    }

    #[test]
    fn missing_ethmac_for_ethernet_capability() {
        let mut board = Board::arty();
        board.platform.regions.retain(|r| r.name != "ethmac");
        let issues = validate_board(&board).unwrap_err();
        assert!(issues.iter().any(|i| i.message.contains("ethmac")));
    }

    #[test]
    fn template_parses_with_new_name() {
        let toml_str = generate_template("my-board").unwrap();
        let board = parse_board_toml(&toml_str).unwrap();
        assert_eq!(board.name, "my-board");
        assert!(board.dts_variant.is_none());
    }

    #[test]
    fn load_missing_file() {
        let err = load_board_toml(Path::new("/nonexistent/x.board.toml")).unwrap_err();
        assert!(matches!(err, PlatformError::FileNotFound { .. }));
    }

    #[test]
    fn discover_in_boards_dir() {
        let dir = tempfile::tempdir().unwrap();
        let boards = dir.path().join("boards");
        std::fs::create_dir(&boards).unwrap();
        std::fs::write(
            boards.join("custom.board.toml"),
            generate_template("custom").unwrap(),
        )
        .unwrap();
        std::fs::write(boards.join("notes.txt"), "ignored").unwrap();

        let found = discover_boards(dir.path()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "custom");
        let board = load_board_toml(&found[0].1).unwrap();
        assert_eq!(board.name, "custom");
    }

    #[test]
    fn discover_without_boards_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_boards(dir.path()).unwrap().is_empty());
    }
}
