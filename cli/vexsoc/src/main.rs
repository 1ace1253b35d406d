//! vexsoc CLI: compose Linux-on-VexRiscv SoCs and program boards.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use vexsoc_compose::{ProgramAction, SystemRunner};

use manifest::VexsocManifest;

#[derive(Parser)]
#[command(name = "vexsoc", version, about = "Linux-on-VexRiscv SoC composer")]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compose a SoC and emit its firmware configuration
    Build {
        /// Board name, or "all"
        #[arg(long)]
        board: Option<String>,
        /// Local IPv4 address for network boot
        #[arg(long)]
        local_ip: Option<String>,
        /// TFTP server IPv4 address
        #[arg(long)]
        remote_ip: Option<String>,
        /// Build output directory (default: build)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Device-tree source variant (default: the board's)
        #[arg(long)]
        dts_variant: Option<String>,
        /// Skip the device-tree compile step
        #[arg(long)]
        no_dtc: bool,
        /// Attach the HDMI video output
        #[arg(long)]
        video: bool,
        /// Attach the iCE40 programming GPIOs
        #[arg(long)]
        ice_gpo: bool,
    },
    /// Inspect and manage boards
    Board {
        #[command(subcommand)]
        action: BoardAction,
    },
    /// Load the bitstream into the FPGA
    Load {
        #[arg(long)]
        board: String,
        /// Board build directory (default: <output-dir>/<board>)
        #[arg(long)]
        build_dir: Option<PathBuf>,
        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,
    },
    /// Write bitstream and Linux images to the configuration flash
    Flash {
        #[arg(long)]
        board: String,
        /// Board build directory (default: <output-dir>/<board>)
        #[arg(long)]
        build_dir: Option<PathBuf>,
        /// Print the commands without running them
        #[arg(long)]
        dry_run: bool,
    },
    /// Check external tools and project status
    Doctor,
}

#[derive(Subcommand)]
enum BoardAction {
    /// List available boards
    List,
    /// Show details of a board
    Describe {
        /// Board name
        name: String,
        /// Output format (default: human-readable, "toml" for TOML)
        #[arg(long)]
        format: Option<String>,
    },
    /// Create boards/<name>.board.toml from a template
    New {
        /// Board name
        name: String,
    },
    /// Validate a board definition file
    Validate {
        /// Path to a .board.toml file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let runner = SystemRunner;

    match cli.command {
        Commands::Build {
            board,
            local_ip,
            remote_ip,
            output_dir,
            dts_variant,
            no_dtc,
            video,
            ice_gpo,
        } => {
            let (manifest, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            let opts = commands::build::BuildOptions {
                board: board.as_deref(),
                local_ip: local_ip.as_deref(),
                remote_ip: remote_ip.as_deref(),
                output_dir: output_dir.as_deref(),
                dts_variant: dts_variant.as_deref(),
                no_dtc,
                video,
                ice_gpo,
            };
            commands::build::run(&project_dir, manifest.as_ref(), &opts, &runner)
        }

        Commands::Board { action } => {
            let (_, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or_else(|| cwd.clone());
            match action {
                BoardAction::List => commands::board::list(Some(&project_dir)),
                BoardAction::Describe { name, format } => {
                    commands::board::describe(&name, Some(&project_dir), format.as_deref())
                }
                BoardAction::New { name } => commands::board::new(&name, &project_dir),
                BoardAction::Validate { file } => commands::board::validate(&cwd.join(file)),
            }
        }

        Commands::Load {
            board,
            build_dir,
            dry_run,
        } => program(ProgramAction::Load, &cwd, &board, build_dir.as_deref(), dry_run, &runner),

        Commands::Flash {
            board,
            build_dir,
            dry_run,
        } => program(ProgramAction::Flash, &cwd, &board, build_dir.as_deref(), dry_run, &runner),

        Commands::Doctor => {
            let (_, project_dir) = load_manifest_optional(&cwd)?;
            let project_dir = project_dir.unwrap_or(cwd);
            commands::doctor::run(&project_dir, &runner)
        }
    }
}

fn program(
    action: ProgramAction,
    cwd: &Path,
    board: &str,
    build_dir: Option<&Path>,
    dry_run: bool,
    runner: &SystemRunner,
) -> anyhow::Result<()> {
    let (manifest, project_dir) = load_manifest_optional(cwd)?;
    let project_dir = project_dir.unwrap_or_else(|| cwd.to_path_buf());
    commands::program::run(
        action,
        board,
        &project_dir,
        manifest.as_ref(),
        build_dir,
        dry_run,
        runner,
    )
}

/// Try to load a manifest from the current directory upward. Returns (None, None) if not found.
fn load_manifest_optional(
    cwd: &Path,
) -> anyhow::Result<(Option<VexsocManifest>, Option<PathBuf>)> {
    match VexsocManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((Some(manifest), Some(dir))),
        None => Ok((None, None)),
    }
}
