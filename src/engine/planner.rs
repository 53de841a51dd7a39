use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};
use log::{info, warn};
use ordered_float::OrderedFloat;
use rayon::prelude::*;

use crate::config::PlannerConfig;
use crate::engine::aggregator::aggregate;
use crate::engine::cache::{fingerprint, ArtifactCache};
use crate::engine::minima::MinimaWindowFinder;
use crate::engine::models::{
    step_time, ArtifactKey, ElapsedTimeTable, Route, Segment, TimedWindow, TransitTimeSeries,
};
use crate::engine::simulator::{check_series, table_from_rates, SegmentSimulator};
use crate::error::{Result, TransitError};

/// Everything computed for one boat speed.
#[derive(Debug, Clone)]
pub struct SpeedPlan {
    pub speed: f64,
    pub transit: TransitTimeSeries,
    pub baseline: Vec<f64>,
    pub windows: Vec<TimedWindow>,
    pub epoch: DateTime<Utc>,
    pub timestep: TimeDelta,
}

impl SpeedPlan {
    pub fn departure_time(&self, index: usize) -> DateTime<Utc> {
        step_time(self.epoch, self.timestep, index)
    }
}

/// Outcome per boat speed, in ascending speed order.
pub type PlanOutcome = BTreeMap<OrderedFloat<f64>, Result<SpeedPlan>>;

/// Runs the whole pipeline: one simulation per (segment, speed) on the rayon
/// pool, then aggregation and window search per speed once all of that
/// speed's simulations are in.
pub struct TransitPlanner<'a> {
    pub config: &'a PlannerConfig,
    pub epoch: DateTime<Utc>,
    simulator: SegmentSimulator,
    finder: MinimaWindowFinder,
    cache: Option<ArtifactCache>,
}

impl<'a> TransitPlanner<'a> {
    pub fn new(config: &'a PlannerConfig, epoch: DateTime<Utc>) -> Result<Self> {
        config.validate()?;
        let cache = config.cache_dir.as_ref().map(ArtifactCache::open).transpose()?;
        Ok(Self {
            config,
            epoch,
            simulator: SegmentSimulator::new(config.timestep_seconds),
            finder: MinimaWindowFinder::new(config.smoothing, config.timestep_margin),
            cache,
        })
    }

    /// Elapsed-time table for one unit of work, read from the cache when an
    /// entry for the same inputs exists.
    pub fn simulate_unit(&self, segment: &Segment, speed: f64) -> Result<ElapsedTimeTable> {
        check_series(segment)?;
        let Some(cache) = &self.cache else {
            return self.simulator.simulate(segment, speed);
        };

        let key = ArtifactKey::new(segment.id.clone(), speed);
        let fp = fingerprint(segment, self.config.timestep_seconds);
        if let Some(table) = cache.load_table(&key, fp) {
            return Ok(table);
        }

        let rates = match cache.load_rates(&key, fp) {
            Some(rates) => rates,
            None => {
                let rates = self.simulator.physics.progress_rates(segment, speed);
                if let Err(e) = cache.store_rates(&key, fp, &rates) {
                    warn!("Could not cache progress rates for {}: {}", key, e);
                }
                rates
            }
        };
        let table = table_from_rates(segment, speed, &rates)?;
        if let Err(e) = cache.store_table(&key, fp, &table) {
            warn!("Could not cache elapsed times for {}: {}", key, e);
        }
        Ok(table)
    }

    /// Simulates every (segment, speed) pair in parallel.
    pub fn simulate_all(&self, route: &Route) -> Vec<(ArtifactKey, Result<ElapsedTimeTable>)> {
        let units: Vec<(&Segment, f64)> = self
            .config
            .boat_speeds
            .iter()
            .flat_map(|&speed| route.segments.iter().map(move |segment| (segment, speed)))
            .collect();
        info!("Simulating {} segment/speed combinations", units.len());

        units
            .par_iter()
            .map(|&(segment, speed)| {
                let key = ArtifactKey::new(segment.id.clone(), speed);
                (key, self.simulate_unit(segment, speed))
            })
            .collect()
    }

    pub fn plan(&self, route: &Route) -> PlanOutcome {
        let mut tables = HashMap::new();
        let mut failures = HashMap::new();
        for (key, result) in self.simulate_all(route) {
            match result {
                Ok(table) => {
                    tables.insert(key, table);
                }
                Err(e) => {
                    warn!("Simulation {} failed: {}", key, e);
                    failures.insert(key, e);
                }
            }
        }

        let mut outcome = PlanOutcome::new();
        for &speed in &self.config.boat_speeds {
            let result = self.plan_speed(route, speed, &tables, &mut failures);
            outcome.insert(OrderedFloat(speed), result);
        }
        outcome
    }

    /// Aggregation and window search for one speed. Refuses to run when any
    /// of the speed's simulations failed.
    fn plan_speed(
        &self,
        route: &Route,
        speed: f64,
        tables: &HashMap<ArtifactKey, ElapsedTimeTable>,
        failures: &mut HashMap<ArtifactKey, TransitError>,
    ) -> Result<SpeedPlan> {
        for segment in &route.segments {
            if let Some(e) = failures.remove(&ArtifactKey::new(segment.id.clone(), speed)) {
                return Err(e);
            }
        }

        let transit = aggregate(route, tables, speed)?;
        let search = self.finder.find_windows(&transit);
        let timestep = self.config.timestep();
        let windows: Vec<TimedWindow> =
            search.windows.iter().map(|w| w.timed(self.epoch, timestep)).collect();
        info!(
            "{} kts: {} departures, {} windows",
            speed,
            transit.len(),
            windows.len()
        );

        Ok(SpeedPlan {
            speed,
            transit,
            baseline: search.baseline,
            windows,
            epoch: self.epoch,
            timestep,
        })
    }
}
