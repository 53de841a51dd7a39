use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgAction, Parser, ValueHint};
use log::{error, info, warn};

use tidal_transit::config::PlannerConfig;
use tidal_transit::engine::planner::TransitPlanner;
use tidal_transit::output::tables::write_plan;
use tidal_transit::parsers::currents::CurrentTable;
use tidal_transit::parsers::route::RouteFile;

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan departure windows for a tidal passage", long_about = None)]
struct Cli {
    /// Current predictions CSV (`time,<node>,<node>,...`)
    #[arg(long, value_hint = ValueHint::FilePath)]
    currents: PathBuf,

    /// Route legs CSV (`start,end,length`)
    #[arg(long, value_hint = ValueHint::FilePath)]
    route: PathBuf,

    /// Planner configuration JSON
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Boat speed in knots; repeat for several. Overrides the config list.
    #[arg(short, long = "speed", allow_negative_numbers = true)]
    speeds: Vec<f64>,

    /// Timestep in seconds
    #[arg(long)]
    timestep: Option<f64>,

    /// Window margin in timesteps
    #[arg(long)]
    margin: Option<u32>,

    /// Directory for cached per-segment artifacts
    #[arg(long, value_hint = ValueHint::DirPath)]
    cache_dir: Option<PathBuf>,

    /// Output directory for transit and window tables
    #[arg(short, long, default_value = "plan", value_hint = ValueHint::DirPath)]
    output: PathBuf,

    /// Debug logging
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::builder()
        .filter_level(if cli.verbose { log::LevelFilter::Debug } else { log::LevelFilter::Info })
        .parse_default_env()
        .init();

    info!("Starting tidal transit planner...");

    let mut config = match &cli.config {
        Some(path) => PlannerConfig::load_from_json(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PlannerConfig::default(),
    };
    if !cli.speeds.is_empty() {
        config.boat_speeds = cli.speeds.clone();
    }
    if let Some(timestep) = cli.timestep {
        config.timestep_seconds = timestep;
    }
    if let Some(margin) = cli.margin {
        config.timestep_margin = margin;
    }
    if cli.cache_dir.is_some() {
        config.cache_dir = cli.cache_dir.clone();
    }
    config.validate()?;

    let currents = CurrentTable::load_from_csv(&cli.currents)
        .with_context(|| format!("failed to load currents {}", cli.currents.display()))?;
    currents.check_timestep(config.timestep())?;
    let first_sample = currents.epoch().ok_or_else(|| anyhow!("currents table has no rows"))?;
    let epoch = match config.reference_epoch {
        Some(epoch) => {
            if epoch != first_sample {
                warn!("Reference epoch {} differs from first current sample {}", epoch, first_sample);
            }
            epoch
        }
        None => first_sample,
    };

    let route = RouteFile::load_from_csv(&cli.route)
        .with_context(|| format!("failed to load route {}", cli.route.display()))?
        .build(&currents)?;
    if route.segments.is_empty() {
        bail!("route {} has no legs", cli.route.display());
    }

    let planner = TransitPlanner::new(&config, epoch)?;
    let outcome = planner.plan(&route);

    let mut failed = 0;
    for (speed, result) in &outcome {
        match result {
            Ok(plan) => {
                write_plan(&cli.output, plan)?;
                println!("\n--- {} kts: {} windows ---", speed, plan.windows.len());
                for w in &plan.windows {
                    println!(
                        "  depart {} .. {} (best {}, {} steps, window {} min)",
                        w.start_time_rounded.format("%Y-%m-%d %H:%M"),
                        w.end_time_rounded.format("%H:%M"),
                        w.min_time_rounded.format("%H:%M"),
                        w.window.minimum_value,
                        w.window_duration.num_minutes()
                    );
                }
            }
            Err(e) => {
                error!("{} kts: {}", speed, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} speeds could not be planned", failed, outcome.len());
    }
    Ok(())
}
