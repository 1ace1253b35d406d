//! `vexsoc build`: compose, emit configuration and compile the device tree.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use vexsoc_compose::{
    BootConfig, BootFlash, ComposedSoc, Composer, CompositionConfig, Feature, IceGpo, Leds,
    Network, ToolRunner, VideoOut,
};
use vexsoc_platform::{Board, Capability};

use crate::manifest::{select_boards, VexsocManifest};

/// Command-line overrides for a build; `None` falls back to the manifest.
#[derive(Debug, Default)]
pub struct BuildOptions<'a> {
    pub board: Option<&'a str>,
    pub local_ip: Option<&'a str>,
    pub remote_ip: Option<&'a str>,
    pub output_dir: Option<&'a Path>,
    pub dts_variant: Option<&'a str>,
    pub no_dtc: bool,
    pub video: bool,
    pub ice_gpo: bool,
}

/// Run the build for one board or `all`.
pub fn run(
    project_dir: &Path,
    manifest: Option<&VexsocManifest>,
    opts: &BuildOptions<'_>,
    runner: &dyn ToolRunner,
) -> Result<()> {
    let board_name = opts
        .board
        .or_else(|| manifest.and_then(|m| m.build.board.as_deref()));
    let Some(board_name) = board_name else {
        bail!("no board selected: pass --board <name|all> or set [build] board in vexsoc.toml");
    };

    for board in select_boards(board_name, Some(project_dir))? {
        let name = board.name.clone();
        tracing::info!(board = %name, "building");
        let soc = build_board(project_dir, manifest, opts, board, runner)
            .with_context(|| format!("building board '{name}'"))?;
        print_summary(&soc);
    }
    Ok(())
}

/// Features for a board: capability-driven, then the optional extras, with
/// boot configuration last.
pub fn select_features(
    board: &Board,
    manifest: Option<&VexsocManifest>,
    opts: &BuildOptions<'_>,
) -> Result<Vec<Box<dyn Feature>>> {
    let mut features: Vec<Box<dyn Feature>> = Vec::new();
    if board.has(Capability::SpiFlash) {
        features.push(Box::new(BootFlash::default()));
    }
    if opts.video || manifest.is_some_and(|m| m.build.video) {
        features.push(Box::new(VideoOut::default()));
    }
    if opts.ice_gpo || manifest.is_some_and(|m| m.build.ice_gpo) {
        features.push(Box::new(IceGpo::default()));
    }
    if board.has(Capability::Leds) {
        let count = led_count(board);
        if count > 0 {
            features.push(Box::new(Leds { count }));
        }
    }
    if board.has(Capability::Ethernet) {
        let network = manifest.map(|m| &m.network);
        let local = opts
            .local_ip
            .or(network.map(|n| n.local_ip.as_str()))
            .unwrap_or("192.168.1.50");
        let remote = opts
            .remote_ip
            .or(network.map(|n| n.remote_ip.as_str()))
            .unwrap_or("192.168.1.100");
        features.push(Box::new(Network::new(local, remote)?));
    }
    features.push(Box::new(BootConfig));
    Ok(features)
}

/// Width of the LED register: `user_led` resources numbered contiguously
/// from 0, capped at 32.
fn led_count(board: &Board) -> u32 {
    (0..32)
        .take_while(|&n| {
            board
                .platform
                .pins
                .iter()
                .any(|p| p.name == "user_led" && p.number == n)
        })
        .count() as u32
}

/// Directory receiving the generated header, linker regions and report.
pub fn generated_dir(output_dir: &Path, board: &str) -> PathBuf {
    output_dir
        .join(board)
        .join("software")
        .join("include")
        .join("generated")
}

/// Compose one board and write its outputs.
pub fn build_board(
    project_dir: &Path,
    manifest: Option<&VexsocManifest>,
    opts: &BuildOptions<'_>,
    board: Board,
    runner: &dyn ToolRunner,
) -> Result<ComposedSoc> {
    let features = select_features(&board, manifest, opts)?;
    tracing::debug!(
        board = %board.name,
        features = ?features.iter().map(|f| f.kind()).collect::<Vec<_>>(),
        "selected features"
    );

    let mut config = CompositionConfig::new(board);
    if let Some(m) = manifest {
        config = config.with_overrides(&m.soc);
    }
    let mut composer = Composer::new(config)?;
    for feature in &features {
        composer = composer.apply(feature.as_ref())?;
    }
    let mut soc = composer.emit()?;

    let output_dir = match opts.output_dir {
        Some(dir) => project_dir.join(dir),
        None => project_dir.join(
            manifest
                .map(|m| m.build.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from("build")),
        ),
    };
    let generated = generated_dir(&output_dir, soc.board());
    soc.write_outputs(&generated)
        .with_context(|| format!("writing {}", generated.display()))?;

    let dt = manifest.map(|m| m.devicetree.clone()).unwrap_or_default();
    if dt.compile && !opts.no_dtc {
        let variant = opts.dts_variant.or(dt.variant.as_deref());
        soc.compile_device_tree(&dt.compiler(project_dir), runner, variant)?;
    }
    soc.finalize()?;
    Ok(soc)
}

fn print_summary(soc: &ComposedSoc) {
    let cpu = &soc.platform().cpu;
    println!("=== Board: {} ===", soc.board());
    println!("  Stage:     {}", soc.stage());
    println!(
        "  CPU:       {} ({}), {} Hz",
        cpu.cpu_type,
        cpu.variant,
        soc.platform().clock_hz
    );
    println!(
        "  Bus:       {}",
        soc.fabric()
            .attachments()
            .iter()
            .map(|a| format!("{}@0x{:08X}", a.endpoint.peripheral, a.base))
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "  Features:  {}",
        soc.attachments()
            .iter()
            .map(|a| a.kind.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  Constants: {}", soc.constants().len());
    if let Some(flash) = soc.flash_boot() {
        println!("  Flash boot: 0x{:08X}", flash.boot_address);
    }
    if let Some(dtb) = soc.device_tree() {
        println!("  Device tree: {}", dtb.display());
    }
    println!();
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use vexsoc_compose::{FeatureKind, Stage, ToolInvocation, ToolOutput};

    #[derive(Debug, Default)]
    struct Recorder {
        calls: RefCell<Vec<ToolInvocation>>,
    }

    impl ToolRunner for Recorder {
        fn run(&self, invocation: &ToolInvocation) -> std::io::Result<ToolOutput> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(ToolOutput {
                status: Some(0),
                ..ToolOutput::default()
            })
        }
    }

    #[test]
    fn arty_features_in_order() {
        let kinds: Vec<FeatureKind> = select_features(&Board::arty(), None, &BuildOptions::default())
            .unwrap()
            .iter()
            .map(|f| f.kind())
            .collect();
        assert_eq!(
            kinds,
            [FeatureKind::BootFlash, FeatureKind::Network, FeatureKind::BootConfig]
        );
    }

    #[test]
    fn led_width_stops_at_first_gap() {
        let mut board = Board::versa_ecp5();
        board
            .platform
            .pins
            .retain(|p| p.name != "user_led" || [0, 1, 5].contains(&p.number));
        assert_eq!(led_count(&board), 2);

        let dir = tempfile::tempdir().unwrap();
        let opts = BuildOptions {
            no_dtc: true,
            ..BuildOptions::default()
        };
        let soc = build_board(dir.path(), None, &opts, board, &Recorder::default()).unwrap();
        let leds = soc.attachment(FeatureKind::Leds).unwrap();
        assert_eq!(leds.pins, ["user_led:0", "user_led:1"]);

        let mut dark = Board::versa_ecp5();
        dark.platform.pins.retain(|p| p.name != "user_led" || p.number != 0);
        let kinds: Vec<FeatureKind> = select_features(&dark, None, &BuildOptions::default())
            .unwrap()
            .iter()
            .map(|f| f.kind())
            .collect();
        assert!(!kinds.contains(&FeatureKind::Leds));
    }

    #[test]
    fn bad_ip_rejected_before_composition() {
        let opts = BuildOptions {
            local_ip: Some("999.1.1.1"),
            ..BuildOptions::default()
        };
        assert!(select_features(&Board::arty(), None, &opts).is_err());
    }

    #[test]
    fn build_writes_generated_files_and_runs_dtc() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Recorder::default();
        let soc = build_board(
            dir.path(),
            None,
            &BuildOptions::default(),
            Board::arty(),
            &runner,
        )
        .unwrap();
        assert_eq!(soc.stage(), Stage::Finalized);

        let generated = generated_dir(&dir.path().join("build"), "arty");
        let header = std::fs::read_to_string(generated.join("soc.h")).unwrap();
        assert!(header.contains("#define FLASHBOOT_LINUX_VEXRISCV"));
        assert!(header.contains("#define LOCALIP1 192"));

        let calls = runner.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "dtc");
        assert!(calls[0].args.last().unwrap().ends_with("litex_vexriscv_arty.dts"));
    }

    #[test]
    fn no_dtc_skips_device_tree() {
        let dir = tempfile::tempdir().unwrap();
        let runner = Recorder::default();
        let opts = BuildOptions {
            no_dtc: true,
            output_dir: Some(Path::new("out")),
            ..BuildOptions::default()
        };
        let soc = build_board(dir.path(), None, &opts, Board::ulx3s(), &runner).unwrap();
        assert!(soc.device_tree().is_none());
        assert!(runner.calls.borrow().is_empty());
        assert!(generated_dir(&dir.path().join("out"), "ulx3s")
            .join("regions.ld")
            .is_file());
    }

    #[test]
    fn run_requires_a_board() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(dir.path(), None, &BuildOptions::default(), &Recorder::default()).unwrap_err();
        assert!(err.to_string().contains("no board selected"));
    }

    #[test]
    fn run_all_boards() {
        let dir = tempfile::tempdir().unwrap();
        let opts = BuildOptions {
            board: Some("all"),
            no_dtc: true,
            ..BuildOptions::default()
        };
        run(dir.path(), None, &opts, &Recorder::default()).unwrap();
        for board in ["arty", "minispartan6", "versa_ecp5", "ulx3s"] {
            assert!(generated_dir(&dir.path().join("build"), board)
                .join("soc.h")
                .is_file());
        }
    }
}
