//! `vexsoc doctor`: external tool and project diagnostics.

use std::path::Path;

use anyhow::Result;
use vexsoc_compose::{ToolInvocation, ToolRunner};
use vexsoc_platform::builtin_boards;
use vexsoc_platform::parse::discover_boards;

use crate::manifest::VexsocManifest;

/// Tools the build and programming steps call, with a version probe.
const TOOLS: [(&str, &str); 5] = [
    ("dtc", "--version"),
    ("openocd", "--version"),
    ("xc3sprog", "-h"),
    ("ujprog", "-h"),
    ("python3", "--version"),
];

/// Print tool availability and project status.
pub fn run(project_dir: &Path, runner: &dyn ToolRunner) -> Result<()> {
    println!("=== vexsoc doctor ===");
    println!();
    println!("vexsoc version: {}", env!("CARGO_PKG_VERSION"));
    println!();

    println!("--- External Tools ---");
    for (name, probe) in TOOLS {
        println!("  {name}: {}", tool_status(runner, name, probe));
    }
    println!();

    println!("--- Project Status ---");
    match VexsocManifest::find_and_load(project_dir) {
        Ok(Some((manifest, dir))) => {
            println!("  vexsoc.toml: found at {}", dir.display());
            println!("  Project:     {}", manifest.project.name);
            if let Some(board) = &manifest.build.board {
                println!("  Board:       {board}");
            }
        }
        Ok(None) => println!("  vexsoc.toml: not found"),
        Err(e) => println!("  vexsoc.toml: error: {e:#}"),
    }
    let custom = discover_boards(project_dir).map(|b| b.len()).unwrap_or(0);
    println!(
        "  Boards:      {} built-in, {custom} in boards/",
        builtin_boards().len()
    );
    Ok(())
}

/// First line of the tool's probe output, or why it could not run. Some
/// tools print their banner on stderr or exit non-zero for `-h`.
fn tool_status(runner: &dyn ToolRunner, name: &str, probe: &str) -> String {
    match runner.run(&ToolInvocation::new(name).arg(probe)) {
        Ok(output) => output
            .stdout
            .lines()
            .chain(output.stderr.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("(unknown version)")
            .to_string(),
        Err(_) => "not found".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vexsoc_compose::ToolOutput;

    #[derive(Debug)]
    struct Missing;

    impl ToolRunner for Missing {
        fn run(&self, _: &ToolInvocation) -> std::io::Result<ToolOutput> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
        }
    }

    #[derive(Debug)]
    struct Banner;

    impl ToolRunner for Banner {
        fn run(&self, inv: &ToolInvocation) -> std::io::Result<ToolOutput> {
            Ok(ToolOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: format!("\n{} 1.0\nusage: ...\n", inv.program),
            })
        }
    }

    #[test]
    fn doctor_runs_without_error() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &Missing).unwrap();
    }

    #[test]
    fn status_reads_stderr_banner() {
        assert_eq!(tool_status(&Banner, "openocd", "--version"), "openocd 1.0");
        assert_eq!(tool_status(&Missing, "dtc", "--version"), "not found");
    }
}
