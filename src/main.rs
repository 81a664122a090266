//! Layout Repair CLI
//!
//! Usage:
//!   layout-repair detect <SCENE>
//!   layout-repair repair <SCENE> [-o OUT] [--iterations N] [--frames DIR]
//!   layout-repair render <SCENE> [-o OUT]

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use layout_repair::cleanup::find_overlapping_pairs;
use layout_repair::{render_layout, repair_scene, Palette, RepairConfig, RepairError, Scene, SceneError, SvgConfig};

#[derive(Parser)]
#[command(name = "layout-repair")]
#[command(about = "Repair overlapping furniture in an optimized room layout")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List overlapping asset pairs
    Detect {
        /// Scene file (TOML)
        scene: PathBuf,
    },

    /// Run one local repair step and write the repaired scene
    Repair {
        /// Scene file (TOML)
        scene: PathBuf,

        /// Output scene file (prints to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Number of optimizer steps
        #[arg(long)]
        iterations: Option<usize>,

        /// Adam learning rate
        #[arg(long)]
        learning_rate: Option<f64>,

        /// Project onto feasible regions every N steps (0 disables)
        #[arg(long)]
        projection_interval: Option<usize>,

        /// Directory for snapshot frames and loss curves
        #[arg(long)]
        frames: Option<PathBuf>,

        /// Palette file for frames (TOML format)
        #[arg(long)]
        palette: Option<PathBuf>,
    },

    /// Render the scene as SVG
    Render {
        /// Scene file (TOML)
        scene: PathBuf,

        /// Output SVG file (prints to stdout if not provided)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Palette file (TOML format)
        #[arg(long)]
        palette: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Detect { scene } => {
            let scene = load_scene(&scene);
            let pairs = find_overlapping_pairs(
                scene.assets(),
                |id| scene.is_fixture(id),
                layout_repair::LayoutSolver::on_top_of(&scene),
            );
            if pairs.is_empty() {
                println!("no overlapping assets");
            }
            for pair in pairs {
                println!("{}", pair);
            }
        }

        Command::Repair {
            scene,
            output,
            iterations,
            learning_rate,
            projection_interval,
            frames,
            palette,
        } => {
            let loaded = load_scene(&scene);

            let mut cleanup = loaded.cleanup_config().clone();
            if let Some(n) = iterations {
                cleanup.iterations = n;
            }
            if let Some(lr) = learning_rate {
                cleanup.learning_rate = lr;
            }
            if let Some(n) = projection_interval {
                cleanup.projection_interval = n;
            }
            if let Some(dir) = frames {
                cleanup.diagnostics_dir = Some(dir);
            }

            let config = RepairConfig::new()
                .with_cleanup(cleanup)
                .with_palette(load_palette(palette.as_deref()));

            let outcome = match repair_scene(loaded, &config) {
                Ok(outcome) => outcome,
                Err(e) => fail(&e),
            };
            info!(
                pairs = outcome.report.overlap_pairs.len(),
                steps = outcome.report.steps,
                frames = outcome.report.frames.len(),
                "repair complete"
            );

            let text = match outcome.scene.to_toml() {
                Ok(text) => text,
                Err(e) => fail(&RepairError::Scene(e)),
            };
            write_output(output.as_deref(), &text);
        }

        Command::Render {
            scene,
            output,
            palette,
        } => {
            let scene = load_scene(&scene);
            let svg = render_layout(
                scene.boundary(),
                scene.assets(),
                &SvgConfig::default(),
                &load_palette(palette.as_deref()),
            );
            write_output(output.as_deref(), &svg);
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_scene(path: &Path) -> Scene {
    let source = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    };
    match Scene::from_str(&source) {
        Ok(scene) => scene,
        Err(e @ SceneError::Syntax { .. }) => {
            eprint!("{}", e.format(&source, &path.display().to_string()));
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error in scene '{}': {}", path.display(), e);
            std::process::exit(1);
        }
    }
}

fn load_palette(path: Option<&Path>) -> Palette {
    match path {
        Some(path) => match Palette::from_file(path) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error loading palette '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None => Palette::default(),
    }
}

fn write_output(path: Option<&Path>, content: &str) {
    match path {
        Some(path) => {
            if let Err(e) = fs::write(path, content) {
                eprintln!("Error writing '{}': {}", path.display(), e);
                std::process::exit(1);
            }
        }
        None => println!("{}", content),
    }
}

fn fail(err: &RepairError) -> ! {
    eprintln!("Error: {}", err);
    std::process::exit(1);
}
