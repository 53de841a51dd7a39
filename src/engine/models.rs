use std::fmt;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Predicted current at one route node, sampled at a fixed timestep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VelocitySeries {
    pub node: String,
    /// Signed velocity in knots, positive along the route orientation
    pub velocities: Vec<f64>,
}

impl VelocitySeries {
    pub fn new(node: impl Into<String>, velocities: Vec<f64>) -> Self {
        Self { node: node.into(), velocities }
    }

    /// Series holding the same velocity at every sample.
    pub fn constant(node: impl Into<String>, velocity: f64, len: usize) -> Self {
        Self::new(node, vec![velocity; len])
    }

    pub fn len(&self) -> usize {
        self.velocities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.velocities.is_empty()
    }

    /// The same series with every velocity negated, as seen travelling the other way.
    pub fn mirrored(&self) -> Self {
        Self::new(self.node.clone(), self.velocities.iter().map(|v| -v).collect())
    }
}

/// Stable identity of a segment, independent of where it lives in memory.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub String);

impl SegmentId {
    pub fn between(start: &str, end: &str) -> Self {
        Self(format!("{start}-{end}"))
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub id: SegmentId,
    /// Length in nautical miles
    pub length: f64,
    pub start: VelocitySeries,
    pub end: VelocitySeries,
}

impl Segment {
    pub fn new(length: f64, start: VelocitySeries, end: VelocitySeries) -> Self {
        Self {
            id: SegmentId::between(&start.node, &end.node),
            length,
            start,
            end,
        }
    }

    /// The segment traversed in the opposite direction, currents mirrored.
    pub fn reversed(&self) -> Self {
        Self::new(self.length, self.end.mirrored(), self.start.mirrored())
    }
}

/// Ordered list of segments making up one passage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub segments: Vec<Segment>,
}

impl Route {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|s| s.length).sum()
    }
}

/// Key of one unit of work: a segment crossed at one boat speed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactKey {
    pub segment: SegmentId,
    pub speed: OrderedFloat<f64>,
}

impl ArtifactKey {
    pub fn new(segment: SegmentId, speed: f64) -> Self {
        Self { segment, speed: OrderedFloat(speed) }
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.segment, self.speed)
    }
}

/// Timesteps needed to cross one segment, indexed by departure timestep.
///
/// Covers a contiguous range of departures starting at 0; later departures
/// whose crossing would outrun the velocity data are not represented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElapsedTimeTable {
    pub steps: Vec<usize>,
}

impl ElapsedTimeTable {
    pub fn new(steps: Vec<usize>) -> Self {
        Self { steps }
    }

    pub fn get(&self, departure: usize) -> Option<usize> {
        self.steps.get(departure).copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn max_steps(&self) -> Option<usize> {
        self.steps.iter().copied().max()
    }
}

/// Whole-route transit timesteps, indexed by departure timestep, for one speed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitTimeSeries {
    pub steps: Vec<usize>,
}

impl TransitTimeSeries {
    pub fn new(steps: Vec<usize>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn as_f64(&self) -> Vec<f64> {
        self.steps.iter().map(|&s| s as f64).collect()
    }
}

/// A departure opportunity around a local transit-time minimum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start_index: usize,
    pub min_index: usize,
    pub end_index: usize,
    pub minimum_value: f64,
}

impl Window {
    /// Attaches wall-clock times, counting indices from `epoch`.
    pub fn timed(&self, epoch: DateTime<Utc>, timestep: TimeDelta) -> TimedWindow {
        let at = |index: usize| step_time(epoch, timestep, index);
        let start_time = at(self.start_index);
        let min_time = at(self.min_index);
        let end_time = at(self.end_index);
        TimedWindow {
            window: *self,
            start_time,
            min_time,
            end_time,
            window_duration: end_time - start_time,
            start_time_rounded: round_to_minute(start_time),
            min_time_rounded: round_to_minute(min_time),
            end_time_rounded: round_to_minute(end_time),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimedWindow {
    pub window: Window,
    pub start_time: DateTime<Utc>,
    pub min_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub window_duration: TimeDelta,
    pub start_time_rounded: DateTime<Utc>,
    pub min_time_rounded: DateTime<Utc>,
    pub end_time_rounded: DateTime<Utc>,
}

/// Wall-clock time of timestep `index`, saturating at the latest representable time.
pub fn step_time(epoch: DateTime<Utc>, timestep: TimeDelta, index: usize) -> DateTime<Utc> {
    i64::try_from(index)
        .ok()
        .and_then(|i| timestep.num_milliseconds().checked_mul(i))
        .and_then(TimeDelta::try_milliseconds)
        .and_then(|offset| epoch.checked_add_signed(offset))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

pub fn round_to_minute(time: DateTime<Utc>) -> DateTime<Utc> {
    time.duration_round(TimeDelta::minutes(1)).unwrap_or(time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_segment_id_from_nodes() {
        let seg = Segment::new(
            3.0,
            VelocitySeries::constant("Deception", 0.0, 4),
            VelocitySeries::constant("Rosario", 0.0, 4),
        );
        assert_eq!(seg.id.to_string(), "Deception-Rosario");
        assert_eq!(seg.reversed().id.to_string(), "Rosario-Deception");
    }

    #[test]
    fn test_reversed_segment_mirrors_currents() {
        let seg = Segment::new(
            2.0,
            VelocitySeries::new("A", vec![1.0, -2.0]),
            VelocitySeries::new("B", vec![0.5, 0.0]),
        );
        let rev = seg.reversed();
        assert_eq!(rev.start.velocities, vec![-0.5, 0.0]);
        assert_eq!(rev.end.velocities, vec![-1.0, 2.0]);
        assert_eq!(rev.length, 2.0);
    }

    #[test]
    fn test_table_lookup_outside_range_is_none() {
        let table = ElapsedTimeTable::new(vec![3, 2, 2]);
        assert_eq!(table.get(1), Some(2));
        assert_eq!(table.get(3), None);
        assert_eq!(table.max_steps(), Some(3));
    }

    #[test]
    fn test_timed_window_fields() {
        let epoch = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let window = Window { start_index: 3, min_index: 5, end_index: 8, minimum_value: 40.0 };
        // 90 second steps put indices off the minute grid
        let timed = window.timed(epoch, TimeDelta::seconds(90));

        assert_eq!(timed.start_time, Utc.with_ymd_and_hms(2024, 6, 1, 0, 4, 30).unwrap());
        assert_eq!(timed.min_time, Utc.with_ymd_and_hms(2024, 6, 1, 0, 7, 30).unwrap());
        assert_eq!(timed.end_time, Utc.with_ymd_and_hms(2024, 6, 1, 0, 12, 0).unwrap());
        assert_eq!(timed.window_duration, TimeDelta::seconds(450));
        assert_eq!(timed.end_time_rounded, timed.end_time);
        assert_eq!(timed.min_time_rounded.timestamp() % 60, 0);
    }

    #[test]
    fn test_step_time_beyond_i32_indices() {
        let epoch = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let index = 3_000_000_000usize;
        assert_eq!(
            step_time(epoch, TimeDelta::seconds(1), index),
            epoch + TimeDelta::seconds(3_000_000_000)
        );
        assert_eq!(step_time(epoch, TimeDelta::minutes(5), 12), epoch + TimeDelta::hours(1));
    }
}
