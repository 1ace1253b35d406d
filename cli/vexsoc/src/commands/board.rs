//! `vexsoc board`: listing, description, templates and validation.

use std::path::Path;

use anyhow::{bail, Context, Result};
use vexsoc_platform::parse::{
    board_to_toml, discover_boards, generate_template, load_board_toml, validate_board,
};
use vexsoc_platform::{builtin_boards, Board, DEFAULT_SHADOW_BASE};

use crate::manifest::resolve_board;

/// List built-in boards plus any in the project's `boards/` directory.
pub fn list(project_dir: Option<&Path>) -> Result<()> {
    println!("Built-in boards:");
    println!();
    for board in builtin_boards() {
        println!(
            "  {:<15} {:<26} {}",
            board.name,
            board.capability_string(),
            board.description
        );
    }
    if let Some(dir) = project_dir {
        let custom = discover_boards(dir)?;
        if !custom.is_empty() {
            println!();
            println!("Project boards:");
            println!();
            for (name, path) in custom {
                println!("  {name:<15} {}", path.display());
            }
        }
    }
    println!();
    println!("Use 'vexsoc board describe <name>' for details.");
    Ok(())
}

/// Describe one board, human-readable or as TOML.
pub fn describe(name: &str, project_dir: Option<&Path>, format: Option<&str>) -> Result<()> {
    let board = resolve_board(name, project_dir)?;
    match format {
        Some("toml") => print!("{}", board_to_toml(&board)?),
        Some(other) => bail!("unknown format '{other}' (expected 'toml')"),
        None => print_board(&board),
    }
    Ok(())
}

fn print_board(board: &Board) {
    let p = &board.platform;
    println!("=== Board: {} ===", board.name);
    println!("{}", board.description);
    println!();
    println!("  Toolchain:    {:?}", board.toolchain);
    println!("  Family:       {:?}", p.family);
    println!("  Capabilities: {}", board.capability_string());
    println!(
        "  CPU:          {} ({}), {} Hz",
        p.cpu.cpu_type, p.cpu.variant, p.clock_hz
    );
    if let Some(sdram) = &p.sdram {
        println!(
            "  SDRAM:        {} ({}-bit native port)",
            sdram.module, sdram.native_data_width
        );
    }
    println!(
        "  Device tree:  {}",
        board.dts_variant.as_deref().unwrap_or("(default)")
    );
    println!();

    println!("--- Memory Map ---");
    for r in &p.regions {
        println!(
            "  {:<14} 0x{:08X} - 0x{:08X} ({} bytes) [{:?}]{}",
            r.name,
            r.base_address,
            r.end_address(),
            r.size_bytes,
            r.kind,
            if r.shadowed {
                format!(" alias 0x{:08X}", r.base_address | p.shadow_base)
            } else {
                String::new()
            }
        );
    }
    if p.shadow_base != DEFAULT_SHADOW_BASE {
        println!("  shadow base 0x{:08X}", p.shadow_base);
    }
    println!();

    println!("--- Peripherals ---");
    for periph in &p.peripherals {
        let csr = periph
            .csr
            .map_or_else(|| "auto".to_string(), |c| c.to_string());
        let irq = periph
            .interrupt
            .map_or_else(|| "-".to_string(), |i| i.to_string());
        println!("  {:<14} csr {csr:<5} irq {irq}", periph.name);
    }
    println!();

    println!("--- Pins ---");
    for res in &p.pins {
        let subs: Vec<&str> = res.subsignals.iter().map(|s| s.name.as_str()).collect();
        println!("  {:<14} {}", res.key(), subs.join(" "));
    }
    if !p.connectors.is_empty() {
        println!("  connectors: {}", p.connectors.join(", "));
    }
}

/// Write a template `.board.toml` into the project's `boards/` directory.
pub fn new(name: &str, project_dir: &Path) -> Result<()> {
    let dir = project_dir.join("boards");
    let path = dir.join(format!("{name}.board.toml"));
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    std::fs::write(&path, generate_template(name)?)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("Created {}", path.display());
    Ok(())
}

/// Validate a `.board.toml` file.
pub fn validate(file: &Path) -> Result<()> {
    let board = load_board_toml(file).with_context(|| format!("loading {}", file.display()))?;
    match validate_board(&board) {
        Ok(()) => {
            println!("{}: ok", file.display());
            Ok(())
        }
        Err(issues) => {
            let mut errors = 0;
            for issue in &issues {
                println!("  {}: {}", issue.severity, issue.message);
                if issue.severity == "error" {
                    errors += 1;
                }
            }
            if errors > 0 {
                bail!("{}: {errors} error(s)", file.display());
            }
            println!("{}: ok with {} warning(s)", file.display(), issues.len());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_builtin_boards() {
        for board in builtin_boards() {
            assert!(describe(&board.name, None, None).is_ok());
        }
        assert!(describe("arty", None, Some("toml")).is_ok());
        assert!(describe("arty", None, Some("yaml")).is_err());
        assert!(describe("nonexistent", None, None).is_err());
    }

    #[test]
    fn new_then_validate() {
        let dir = tempfile::tempdir().unwrap();
        new("custom", dir.path()).unwrap();
        let path = dir.path().join("boards/custom.board.toml");
        validate(&path).unwrap();
        assert!(new("custom", dir.path()).is_err());
        assert!(list(Some(dir.path())).is_ok());
        assert!(describe("custom", Some(dir.path()), None).is_ok());
    }

    #[test]
    fn validate_rejects_broken_board() {
        let dir = tempfile::tempdir().unwrap();
        let mut board = Board::arty();
        board.platform.clock_hz = 0;
        let path = dir.path().join("broken.board.toml");
        std::fs::write(&path, board_to_toml(&board).unwrap()).unwrap();
        assert!(validate(&path).is_err());
    }

    #[test]
    fn validate_missing_file() {
        assert!(validate(Path::new("/nonexistent/x.board.toml")).is_err());
    }
}
