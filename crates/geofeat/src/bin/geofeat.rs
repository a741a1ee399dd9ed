use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use geofeat::io::{PipelineConfig, PipelineReport, Task};
use geofeat::pipeline::{ForestParams, RoadAxisParams, RoadMaskParams, RunSummary};

#[cfg(feature = "tracing")]
use geofeat::core::init_tracing;
#[cfg(not(feature = "tracing"))]
use geofeat::core::init_with_level;
#[cfg(not(feature = "tracing"))]
use log::LevelFilter;
#[cfg(not(feature = "tracing"))]
use std::str::FromStr;

#[derive(Parser, Debug)]
#[command(name = "geofeat")]
#[command(version, about = "Extract roads and forest regions from 24-bit satellite bitmaps")]
struct Cli {
    /// Write a JSON report of the run to this path.
    #[arg(long, global = true)]
    report: Option<PathBuf>,
    /// One of off, error, warn, info, debug, trace. `RUST_LOG` wins when set
    /// in tracing builds.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
    /// Emit one JSON object per log line (needs the `tracing` feature).
    #[arg(long, global = true)]
    log_json: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Binarize an image and erase small road fragments.
    RoadMask(RoadMaskArgs),
    /// Box large non-road regions of a road mask on the original image.
    Forest(ForestArgs),
    /// Clean the road mask and trace its longest border-to-border axis.
    RoadAxis(RoadAxisArgs),
    /// Run a pipeline described by a JSON config file.
    Run { config: PathBuf },
}

#[derive(Args, Debug, Clone)]
struct IoArgs {
    #[arg(long)]
    input: String,
    #[arg(long)]
    output: Option<String>,
}

#[derive(Args, Debug, Clone)]
struct RoadMaskArgs {
    #[command(flatten)]
    io: IoArgs,
    #[arg(long, default_value_t = RoadMaskParams::default().intensity_threshold)]
    threshold: u8,
    #[arg(long, default_value_t = RoadMaskParams::default().min_area)]
    min_area: usize,
}

#[derive(Args, Debug, Clone)]
struct ForestArgs {
    #[command(flatten)]
    io: IoArgs,
    /// Road mask produced by `road-mask`.
    #[arg(long)]
    mask: String,
    #[arg(long, default_value_t = ForestParams::default().min_area)]
    min_area: usize,
    #[arg(long, default_value_t = ForestParams::default().box_thickness)]
    thickness: usize,
}

#[derive(Args, Debug, Clone)]
struct RoadAxisArgs {
    #[command(flatten)]
    io: IoArgs,
    #[arg(long, default_value_t = RoadAxisParams::default().intensity_threshold)]
    threshold: u8,
    #[arg(long, default_value_t = RoadAxisParams::default().kernel_size)]
    kernel: usize,
    #[arg(long, default_value_t = RoadAxisParams::default().restore_kernel_size)]
    restore_kernel: usize,
    #[arg(long, default_value_t = RoadAxisParams::default().min_area)]
    min_area: usize,
    #[arg(long, default_value_t = RoadAxisParams::default().border_margin)]
    margin: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    #[cfg(not(feature = "tracing"))]
    {
        init_with_level(LevelFilter::from_str(&cli.log_level).unwrap_or(LevelFilter::Info))?;
        if cli.log_json {
            log::warn!("--log-json needs the `tracing` feature; logging plain text");
        }
    }
    #[cfg(feature = "tracing")]
    init_tracing(cli.log_json, &cli.log_level);

    let config = build_config(cli.cmd)?;
    let outcome = config.run();

    let report_path = cli
        .report
        .or_else(|| config.report_path.as_ref().map(PathBuf::from));
    if let Some(path) = report_path {
        PipelineReport::new(&config)
            .with_outcome(&outcome)
            .write_json(&path)?;
        log::info!("report written to {}", path.display());
    }

    let summary = outcome?;
    print_summary(&config, &summary);
    Ok(())
}

fn build_config(cmd: Command) -> Result<PipelineConfig, Box<dyn std::error::Error>> {
    let config = match cmd {
        Command::RoadMask(args) => {
            let mut cfg = PipelineConfig::new(Task::RoadMask, args.io.input);
            cfg.output_path = args.io.output;
            cfg.road_mask = RoadMaskParams {
                intensity_threshold: args.threshold,
                min_area: args.min_area,
            };
            cfg
        }
        Command::Forest(args) => {
            let mut cfg = PipelineConfig::new(Task::Forest, args.io.input);
            cfg.output_path = args.io.output;
            cfg.mask_path = Some(args.mask);
            cfg.forest = ForestParams {
                min_area: args.min_area,
                box_thickness: args.thickness,
                ..ForestParams::default()
            };
            cfg
        }
        Command::RoadAxis(args) => {
            let mut cfg = PipelineConfig::new(Task::RoadAxis, args.io.input);
            cfg.output_path = args.io.output;
            cfg.road_axis = RoadAxisParams {
                intensity_threshold: args.threshold,
                kernel_size: args.kernel,
                restore_kernel_size: args.restore_kernel,
                min_area: args.min_area,
                border_margin: args.margin,
                ..RoadAxisParams::default()
            };
            cfg
        }
        Command::Run { config } => PipelineConfig::load_json(&config)?,
    };
    Ok(config)
}

fn print_summary(config: &PipelineConfig, summary: &RunSummary) {
    println!(
        "{}: {}x{} -> {}",
        config.task,
        summary.width,
        summary.height,
        config.output_path().display()
    );
    if let Some(prune) = &summary.prune {
        println!(
            "kept {} road components, removed {} ({} px)",
            prune.kept, prune.removed, prune.removed_pixels
        );
    }
    for r in &summary.regions {
        println!(
            "region {}: centroid=({}, {}) area={} box_area={}",
            r.index, r.centroid.row, r.centroid.col, r.area, r.box_area
        );
    }
    if let Some(axis) = &summary.axis {
        println!(
            "longest axis: {:.2} px, orientation {:.2} deg",
            axis.length, axis.angle_degrees
        );
    }
    if let Some(t) = &summary.timings {
        println!("total time: {} us", t.total_us);
    }
}
