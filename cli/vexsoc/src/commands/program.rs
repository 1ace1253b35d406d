//! `vexsoc load` and `vexsoc flash`: program a board.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use vexsoc_compose::{ProgramAction, ProgramPlan, ToolRunner};

use crate::manifest::{resolve_board, VexsocManifest};

/// Build and (unless `dry_run`) execute the plan for `action`.
pub fn run(
    action: ProgramAction,
    board: &str,
    project_dir: &Path,
    manifest: Option<&VexsocManifest>,
    build_dir: Option<&Path>,
    dry_run: bool,
    runner: &dyn ToolRunner,
) -> Result<()> {
    let board = resolve_board(board, Some(project_dir))?;
    let build_dir = match build_dir {
        Some(dir) => project_dir.join(dir),
        None => project_dir
            .join(
                manifest
                    .map(|m| m.build.output_dir.clone())
                    .unwrap_or_else(|| PathBuf::from("build")),
            )
            .join(&board.name),
    };

    let plan = match action {
        ProgramAction::Load => ProgramPlan::load(&board.name, &build_dir, project_dir),
        ProgramAction::Flash => ProgramPlan::flash(&board.name, &build_dir, project_dir),
    }?;

    if dry_run {
        for step in &plan.steps {
            println!("{step}");
        }
        return Ok(());
    }
    plan.execute(runner)
        .with_context(|| format!("{action} failed for board '{}'", board.name))?;
    println!("{action}: {} ok", board.name);
    Ok(())
}
