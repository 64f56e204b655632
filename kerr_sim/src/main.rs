//! Kerr camera simulator CLI
//!
//! Places a camera around a Kerr black hole, traces it with the reference
//! tracer and saves or exports the result.

use std::path::{Path, PathBuf};

use clap::Parser;
use kerr_core::{CameraSpec, SpeedMode};
use kerr_sim::{ScenarioId, ScenarioOutcome, ScenarioRunner, SimConfig, SimError, SnapshotExport};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Kerr black hole camera simulator
#[derive(Parser, Debug)]
#[command(name = "kerr-sim")]
#[command(about = "Trace camera scenarios around a Kerr black hole", long_about = None)]
struct Args {
    /// Scenario to run (edge_on, inclined, face_on, close_orbit, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Camera spec JSON file; replaces the scenario
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Black hole spin a, |a| <= 1
    #[arg(short = 'a', long, default_value = "0.9", allow_hyphen_values = true)]
    spin: f64,

    /// Sensor rows
    #[arg(long)]
    rows: Option<usize>,

    /// Sensor columns
    #[arg(long)]
    cols: Option<usize>,

    /// Affine parameter to integrate to
    #[arg(long, default_value = "-150", allow_hyphen_values = true)]
    final_time: f64,

    /// Also trace this many time slices
    #[arg(long)]
    slices: Option<usize>,

    /// Integration steps
    #[arg(long, default_value = "400")]
    steps: usize,

    /// Put the camera on a Keplerian orbit
    #[arg(long)]
    keplerian: bool,

    /// Render a procedural texture instead of class colours
    #[arg(long)]
    texture: bool,

    /// Directory for PNG snapshots
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Export results to this JSON file (single scenario only)
    #[arg(long)]
    export: Option<PathBuf>,

    /// Sample one geodesic per NxN pixel block in the export
    #[arg(long, default_value = "8")]
    stride: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,
}

impl Args {
    /// Apply flag overrides to a camera spec.
    fn customize(&self, mut spec: CameraSpec) -> CameraSpec {
        if let Some(rows) = self.rows {
            spec.sensor_shape.0 = rows;
        }
        if let Some(cols) = self.cols {
            spec.sensor_shape.1 = cols;
        }
        if self.keplerian {
            spec.speed_mode = SpeedMode::Keplerian;
        }
        spec
    }
}

fn load_spec(path: &Path) -> Result<CameraSpec, SimError> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn save_outputs(args: &Args, outcome: &ScenarioOutcome) -> Result<(), SimError> {
    if let Some(dir) = &args.output {
        std::fs::create_dir_all(dir)?;
        outcome
            .snapshot
            .save(dir.join(format!("{}.png", outcome.result.name)))?;
    }

    if let Some(path) = &args.export {
        SnapshotExport::from_outcome(outcome, args.stride)?.write_to_file(path)?;
        info!("Exported {} to {}", outcome.result.name, path.display());
    }

    Ok(())
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    if !args.json {
        info!("Kerr camera simulator v{}", env!("CARGO_PKG_VERSION"));
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Resolve what to run
    let runs: Vec<(String, CameraSpec)> = match &args.config {
        Some(path) => match load_spec(path) {
            Ok(spec) => {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "custom".to_string());
                vec![(name, args.customize(spec))]
            }
            Err(e) => {
                error!("Cannot load {}: {}", path.display(), e);
                std::process::exit(1);
            }
        },
        None if args.scenario == "all" => ScenarioId::all()
            .into_iter()
            .map(|s| (s.name().to_string(), args.customize(s.spec())))
            .collect(),
        None => match args.scenario.parse::<ScenarioId>() {
            Ok(s) => vec![(s.name().to_string(), args.customize(s.spec()))],
            Err(e) => {
                error!("{}", e);
                eprintln!("Available scenarios: edge_on, inclined, face_on, close_orbit, all");
                std::process::exit(1);
            }
        },
    };

    if args.export.is_some() && runs.len() > 1 {
        warn!("--export only supports a single scenario, not 'all'");
        std::process::exit(1);
    }

    let config = SimConfig {
        steps: args.steps,
        texture: args.texture,
        ..Default::default()
    };
    let mut runner = ScenarioRunner::new(args.spin)
        .with_config(config)
        .with_final_time(args.final_time);
    if let Some(slices) = args.slices {
        runner = runner.with_slices(slices);
    }

    // Run
    let mut results = Vec::new();
    let mut failed_count = 0;

    for (name, spec) in runs {
        let outcome = match runner.run_spec(&name, spec) {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("✗ {} ERROR: {}", name, e);
                failed_count += 1;
                continue;
            }
        };

        if let Err(e) = save_outputs(&args, &outcome) {
            error!("✗ {} could not save output: {}", name, e);
            failed_count += 1;
        }

        let result = outcome.result;
        if !args.json {
            if result.passed {
                info!("✓ {} (a={}) PASSED in {:.2}s", result.name, result.spin, result.elapsed_secs);
            } else {
                error!(
                    "✗ {} (a={}) FAILED: {}",
                    result.name,
                    result.spin,
                    result.failure_reason.as_deref().unwrap_or("unknown")
                );
            }
        }
        if !result.passed {
            failed_count += 1;
        }
        results.push(result);
    }

    // Summary
    if args.json {
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.iter().filter(|r| r.passed).count(),
            "failed": failed_count,
            "results": results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.name,
                    "spin": r.spin,
                    "passed": r.passed,
                    "counts": r.counts,
                    "image_size": r.image_size,
                    "elapsed_secs": r.elapsed_secs,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        match serde_json::to_string_pretty(&summary) {
            Ok(text) => println!("{}", text),
            Err(e) => error!("Failed to encode summary: {}", e),
        }
    } else {
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed_count == 0 {
            info!("✅ All {} runs passed!", results.len());
        } else {
            error!("❌ {} run(s) failed!", failed_count);
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
