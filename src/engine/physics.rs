use crate::engine::models::Segment;

/// Converts endpoint currents and a commanded boat speed into distance made
/// good per timestep along a segment.
pub struct PhysicsModel {
    /// Length of one timestep in hours
    pub timestep_hours: f64,
}

impl PhysicsModel {
    pub fn new(timestep_seconds: f64) -> Self {
        Self { timestep_hours: timestep_seconds / 3600.0 }
    }

    /// Speed over ground in knots between samples `i` and `i + 1`.
    ///
    /// The endpoint lying ahead of the boat is sampled at the later step and
    /// the one behind at the earlier step.
    pub fn speed_over_ground(&self, segment: &Segment, boat_speed: f64, i: usize) -> f64 {
        let start = &segment.start.velocities;
        let end = &segment.end.velocities;
        let current = if boat_speed > 0.0 {
            (end[i + 1] + start[i]) / 2.0
        } else {
            (start[i + 1] + end[i]) / 2.0
        };
        current + boat_speed
    }

    /// Signed distance (nm) made good during each timestep, `N - 1` entries for
    /// `N` velocity samples. Steps with missing data contribute nothing.
    pub fn progress_rates(&self, segment: &Segment, boat_speed: f64) -> Vec<f64> {
        let samples = segment.start.len().min(segment.end.len());
        (0..samples.saturating_sub(1))
            .map(|i| {
                let distance = self.speed_over_ground(segment, boat_speed, i) * self.timestep_hours;
                if distance.is_nan() { 0.0 } else { distance }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::models::VelocitySeries;

    fn segment(start: Vec<f64>, end: Vec<f64>) -> Segment {
        Segment::new(1.0, VelocitySeries::new("A", start), VelocitySeries::new("B", end))
    }

    #[test]
    fn test_forward_speed_samples_end_ahead() {
        let physics = PhysicsModel::new(3600.0);
        let seg = segment(vec![1.0, 3.0, 5.0], vec![10.0, 20.0, 30.0]);
        // rate[0] = avg(end[1], start[0]) + 2 = avg(20, 1) + 2
        let rates = physics.progress_rates(&seg, 2.0);
        assert_eq!(rates, vec![12.5, 18.5]);
    }

    #[test]
    fn test_reverse_and_zero_speed_sample_start_ahead() {
        let physics = PhysicsModel::new(3600.0);
        let seg = segment(vec![1.0, 3.0, 5.0], vec![10.0, 20.0, 30.0]);
        // rate[0] = avg(start[1], end[0]) + s
        assert_eq!(physics.progress_rates(&seg, -2.0), vec![4.5, 10.5]);
        assert_eq!(physics.progress_rates(&seg, 0.0), vec![6.5, 12.5]);
    }

    #[test]
    fn test_rates_scale_with_timestep() {
        let physics = PhysicsModel::new(1800.0);
        let seg = segment(vec![0.0; 4], vec![0.0; 4]);
        assert_eq!(physics.progress_rates(&seg, 6.0), vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_nan_current_contributes_nothing() {
        let physics = PhysicsModel::new(3600.0);
        let seg = segment(vec![0.0, 0.0, 0.0], vec![0.0, f64::NAN, 0.0]);
        assert_eq!(physics.progress_rates(&seg, 4.0), vec![0.0, 4.0]);
    }

    #[test]
    fn test_single_sample_yields_no_rates() {
        let physics = PhysicsModel::new(3600.0);
        let seg = segment(vec![1.0], vec![1.0]);
        assert!(physics.progress_rates(&seg, 4.0).is_empty());
    }
}
