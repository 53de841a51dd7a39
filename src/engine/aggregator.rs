use std::collections::HashMap;

use log::debug;

use crate::engine::models::{ArtifactKey, ElapsedTimeTable, Route, TransitTimeSeries};
use crate::error::{Result, TransitError};

/// Chains per-segment elapsed-time tables into whole-route transit times.
pub struct RouteTransitAggregator<'a> {
    tables: Vec<&'a ElapsedTimeTable>,
}

impl<'a> RouteTransitAggregator<'a> {
    /// Resolves the table of every segment of `route` at `speed`, in route order.
    pub fn new(
        route: &Route,
        tables: &'a HashMap<ArtifactKey, ElapsedTimeTable>,
        speed: f64,
    ) -> Result<Self> {
        let tables = route
            .segments
            .iter()
            .map(|segment| {
                tables
                    .get(&ArtifactKey::new(segment.id.clone(), speed))
                    .ok_or_else(|| TransitError::MissingUpstreamArtifact {
                        segment: segment.id.clone(),
                        speed,
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { tables })
    }

    /// Transit timesteps for leaving at `departure`, threading the arrival
    /// index at each segment into the next one.
    pub fn transit_from(&self, departure: usize) -> Option<usize> {
        self.tables
            .iter()
            .try_fold((departure, 0), |(row, total), table| {
                let elapsed = table.get(row)?;
                Some((row + elapsed, total + elapsed))
            })
            .map(|(_, total)| total)
    }

    /// Transit series over every departure of the first segment, cut short at
    /// the first departure that runs off a downstream table.
    pub fn aggregate(&self) -> TransitTimeSeries {
        let departures = self.tables.first().map_or(0, |t| t.len());
        let steps: Vec<usize> = (0..departures)
            .map_while(|departure| self.transit_from(departure))
            .collect();
        if steps.len() < departures {
            debug!("Transit series truncated at departure {} of {}", steps.len(), departures);
        }
        TransitTimeSeries::new(steps)
    }
}

/// Aggregates `route` at `speed`, failing when any table is missing or
/// nothing survives the chaining.
pub fn aggregate(
    route: &Route,
    tables: &HashMap<ArtifactKey, ElapsedTimeTable>,
    speed: f64,
) -> Result<TransitTimeSeries> {
    let series = RouteTransitAggregator::new(route, tables, speed)?.aggregate();
    if series.is_empty() {
        return Err(TransitError::EmptyTransitSeries { speed });
    }
    Ok(series)
}
