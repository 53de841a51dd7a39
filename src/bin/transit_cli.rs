use chrono::{TimeZone, Utc};
use tidal_transit::config::{PlannerConfig, SmoothingConfig};
use tidal_transit::engine::models::{Route, Segment, VelocitySeries};
use tidal_transit::engine::planner::TransitPlanner;
use std::f64::consts::PI;
use std::time::Instant;

/// Semidiurnal current at a node: amplitude in knots, phase lag in hours.
fn synthetic_tide(node: &str, amplitude: f64, lag_hours: f64, steps: usize, timestep_s: f64) -> VelocitySeries {
    let period_h = 12.42;
    let velocities = (0..steps)
        .map(|i| {
            let t = i as f64 * timestep_s / 3600.0 - lag_hours;
            amplitude * (2.0 * PI * t / period_h).sin()
        })
        .collect();
    VelocitySeries::new(node, velocities)
}

fn main() {
    env_logger::init();
    println!("--- Tidal Transit CLI Debugger ---");

    // 1. Setup Data: three days of 5 minute predictions along a four node channel
    let timestep = 300.0;
    let steps = 3 * 24 * 12;
    let nodes = [
        synthetic_tide("Entrance", 1.8, 0.0, steps, timestep),
        synthetic_tide("Narrows", 3.5, 0.4, steps, timestep),
        synthetic_tide("Bend", 2.2, 0.9, steps, timestep),
        synthetic_tide("Head", 0.8, 1.3, steps, timestep),
    ];
    let lengths = [4.2, 2.6, 5.1];
    let route = Route::new(
        lengths
            .iter()
            .zip(nodes.windows(2))
            .map(|(&length, pair)| Segment::new(length, pair[0].clone(), pair[1].clone()))
            .collect(),
    );
    println!("Route: {} segments, {:.1} nm", route.segments.len(), route.total_length());

    let config = PlannerConfig {
        timestep_seconds: timestep,
        timestep_margin: 6,
        boat_speeds: vec![4.0, 5.5, 7.0],
        reference_epoch: None,
        smoothing: SmoothingConfig::default(),
        cache_dir: None,
    };
    let epoch = Utc.with_ymd_and_hms(2024, 6, 21, 0, 0, 0).unwrap();

    // 2. Run
    let start_time = Instant::now();
    let planner = match TransitPlanner::new(&config, epoch) {
        Ok(planner) => planner,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return;
        }
    };
    let outcome = planner.plan(&route);
    println!("Calculation time: {:?}", start_time.elapsed());

    for (speed, result) in outcome {
        println!("\n--- {} kts ---", speed);
        match result {
            Ok(plan) => {
                let fastest = plan.transit.steps.iter().min().copied().unwrap_or_default();
                let slowest = plan.transit.steps.iter().max().copied().unwrap_or_default();
                println!(
                    "Departures: {}, transit {}..{} steps ({:.1}h..{:.1}h)",
                    plan.transit.len(),
                    fastest,
                    slowest,
                    fastest as f64 * timestep / 3600.0,
                    slowest as f64 * timestep / 3600.0
                );
                for w in &plan.windows {
                    println!(
                        "  {} -> best {} -> {}  ({} steps)",
                        w.start_time_rounded.format("%a %H:%M"),
                        w.min_time_rounded.format("%H:%M"),
                        w.end_time_rounded.format("%H:%M"),
                        w.window.minimum_value
                    );
                }
            }
            Err(e) => println!("Failed: {}", e),
        }
    }

    println!("\nDebug completed.");
}
