use std::path::PathBuf;

use anyhow::Context;
use blastfield_assets::{SpriteLoader, SpritePools};
use blastfield_common::Timestamp;
use blastfield_fx::{DemoConfig, Detonation, FxEvent, Stage};
use blastfield_render::{DebugTextRenderer, Frame, RenderView, Renderer};
use clap::{Parser, Subcommand};
use glam::Vec3;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "blastfield-cli", about = "Headless blastfield effect runner")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML config file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the particle sampling seed
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the effective configuration as YAML
    Config,
    /// Spawn one preset at the origin and step it
    Spawn {
        /// Preset name from the config
        #[arg(short, long, default_value = "burst")]
        preset: String,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Drop the bomb and step until the effects die out
    Drop {
        /// Leave sprites loading in the background instead of preloading
        #[arg(long)]
        cold: bool,
        #[command(flatten)]
        run: RunArgs,
    },
}

#[derive(clap::Args, Clone, Copy)]
struct RunArgs {
    /// Number of frames to step
    #[arg(short, long, default_value = "600")]
    frames: u32,
    /// Simulated frame time in milliseconds
    #[arg(long, default_value = "16.0")]
    frame_ms: f64,
    /// Print a debug frame every N frames (0 disables)
    #[arg(long, default_value = "60")]
    every: u32,
    /// Print a JSON summary instead of debug frames
    #[arg(long)]
    json: bool,
}

/// What happened over a headless run.
#[derive(Debug, Serialize)]
struct RunSummary {
    frames: u32,
    frame_ms: f64,
    detonations: Vec<Detonation>,
    events: Vec<FxEvent>,
    active_at_end: usize,
    sprites_loaded: usize,
}

enum Scenario {
    Spawn(String),
    Drop { cold: bool },
}

fn run(config: &DemoConfig, scenario: &Scenario, args: RunArgs) -> anyhow::Result<RunSummary> {
    let mut stage = Stage::from_config(config);
    let mut pools = SpritePools::new();
    let mut loader = SpriteLoader::new(&config.assets);
    let renderer = DebugTextRenderer::new();
    let mut detonations = Vec::new();

    match scenario {
        Scenario::Spawn(name) => {
            loader.load_all(&mut pools);
            stage
                .spawn_preset(name, Vec3::ZERO, Timestamp::ZERO, &pools)
                .with_context(|| format!("spawning preset `{name}`"))?;
        }
        Scenario::Drop { cold } => {
            if !cold {
                loader.load_all(&mut pools);
            }
            stage.drop_bomb();
        }
    }

    for frame in 1..=args.frames {
        loader.poll(&mut pools);
        let now = Timestamp::from_millis(frame as f64 * args.frame_ms);
        if let Some(detonation) = stage.tick(now, &pools) {
            if !args.json {
                println!(
                    "frame {frame}: detonation at ({:.2}, {:.2}, {:.2}), {} spawned, {} skipped",
                    detonation.position.x,
                    detonation.position.y,
                    detonation.position.z,
                    detonation.spawned.len(),
                    detonation.skipped.len()
                );
            }
            detonations.push(detonation);
        }

        if !args.json && args.every > 0 && frame % args.every == 0 {
            let view = RenderView::default();
            print!("{}", renderer.render(&Frame::capture(&stage, now, view)));
        }

        let settled = !stage.bomb().is_falling() && stage.simulator().is_empty();
        if settled && frame > 1 {
            tracing::debug!(frame, "all effects retired");
            break;
        }
    }

    let active_at_end = stage.simulator().active_count();
    Ok(RunSummary {
        frames: stage.simulator().tick() as u32,
        frame_ms: args.frame_ms,
        detonations,
        events: stage.simulator_mut().drain_events(),
        active_at_end,
        sprites_loaded: pools.total(),
    })
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<DemoConfig> {
    match path {
        Some(path) => DemoConfig::load(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(DemoConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let (scenario, args) = match cli.command {
        Commands::Info => {
            println!("blastfield-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", blastfield_common::crate_info());
            println!("assets: {}", blastfield_assets::crate_info());
            println!("fx: {}", blastfield_fx::crate_info());
            println!("input: {}", blastfield_input::crate_info());
            println!("render: {}", blastfield_render::crate_info());
            println!(
                "presets: {}",
                config.presets.keys().cloned().collect::<Vec<_>>().join(", ")
            );
            println!("chain: {}", config.chain.join(" -> "));
            return Ok(());
        }
        Commands::Config => {
            print!("{}", config.to_yaml()?);
            return Ok(());
        }
        Commands::Spawn { preset, run } => (Scenario::Spawn(preset), run),
        Commands::Drop { cold, run } => (Scenario::Drop { cold }, run),
    };

    let summary = run(&config, &scenario, args)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "done after {} frames: {} detonation(s), {} event(s), {} active, {} sprite(s) loaded",
            summary.frames,
            summary.detonations.len(),
            summary.events.len(),
            summary.active_at_end,
            summary.sprites_loaded
        );
    }

    Ok(())
}
