use log::debug;

use crate::engine::models::{ElapsedTimeTable, Segment};
use crate::engine::physics::PhysicsModel;
use crate::error::{Result, TransitError};

/// Simulates crossings of a single segment for every departure timestep.
pub struct SegmentSimulator {
    pub physics: PhysicsModel,
}

impl SegmentSimulator {
    pub fn new(timestep_seconds: f64) -> Self {
        Self { physics: PhysicsModel::new(timestep_seconds) }
    }

    /// Builds the elapsed-time table of `segment` crossed at `boat_speed`.
    pub fn simulate(&self, segment: &Segment, boat_speed: f64) -> Result<ElapsedTimeTable> {
        check_series(segment)?;
        let rates = self.physics.progress_rates(segment, boat_speed);
        table_from_rates(segment, boat_speed, &rates)
    }
}

/// Elapsed-time table from a precomputed distance-per-timestep series.
pub fn table_from_rates(segment: &Segment, boat_speed: f64, rates: &[f64]) -> Result<ElapsedTimeTable> {
    let table = elapsed_steps(rates, segment.length, boat_speed);
    if table.is_empty() {
        return Err(TransitError::InsufficientHorizon {
            segment: segment.id.clone(),
            speed: boat_speed,
        });
    }
    debug!(
        "{} @ {} kts: {} departures, longest crossing {:?} steps",
        segment.id,
        boat_speed,
        table.len(),
        table.max_steps()
    );
    Ok(table)
}

pub fn check_series(segment: &Segment) -> Result<()> {
    if segment.start.len() != segment.end.len() {
        return Err(TransitError::MismatchedSeries {
            segment: segment.id.clone(),
            start_len: segment.start.len(),
            end_len: segment.end.len(),
        });
    }
    Ok(())
}

/// Runs the accumulation for each departure in turn. The table stops at the
/// first departure whose crossing does not finish within `rates`.
pub fn elapsed_steps(rates: &[f64], length: f64, boat_speed: f64) -> ElapsedTimeTable {
    let steps = (0..rates.len())
        .map_while(|departure| crossing_steps(rates, departure, length, boat_speed))
        .collect();
    ElapsedTimeTable::new(steps)
}

/// Rounding allowed per accumulated step, relative to the target distance.
const ARRIVAL_ULPS_PER_STEP: f64 = 4.0 * f64::EPSILON;

/// Number of timesteps to cover `length` leaving at `departure`, or `None`
/// when the series runs out first.
///
/// A total short of the target by no more than a few ulps per summed step
/// counts as arrived, so lengths that are whole multiples of the per-step
/// distance finish on that step.
pub fn crossing_steps(rates: &[f64], departure: usize, length: f64, boat_speed: f64) -> Option<usize> {
    let target = length.abs();
    let forward = boat_speed > 0.0;
    let mut total = 0.0;
    for (i, rate) in rates.get(departure + 1..)?.iter().enumerate() {
        let steps = i + 1;
        total += rate;
        let reach = target - target * ARRIVAL_ULPS_PER_STEP * steps as f64;
        let arrived = if forward { total >= reach } else { total <= -reach };
        if arrived {
            return Some(steps);
        }
    }
    None
}
