use std::ops::Range;

use log::{debug, trace};

use crate::config::SmoothingConfig;
use crate::engine::models::{TransitTimeSeries, Window};
use crate::engine::smoothing::SavitzkyGolay;

/// Baseline and windows found for one transit-time series.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSearch {
    pub baseline: Vec<f64>,
    pub windows: Vec<Window>,
}

/// Locates departure windows around the dips of a transit-time series that
/// fall below its slow tidal trend.
pub struct MinimaWindowFinder {
    pub smoother: SavitzkyGolay,
    /// Timesteps above a minimum still counted as part of its window
    pub margin: f64,
}

impl MinimaWindowFinder {
    pub fn new(smoothing: SmoothingConfig, timestep_margin: u32) -> Self {
        Self {
            smoother: smoothing.into(),
            margin: timestep_margin as f64,
        }
    }

    pub fn find_windows(&self, series: &TransitTimeSeries) -> WindowSearch {
        let values = series.as_f64();
        let baseline = self.smoother.smooth(&values);
        let windows = find_windows_with_baseline(&values, &baseline, self.margin);
        debug!("{} windows from {} departures", windows.len(), values.len());
        WindowSearch { baseline, windows }
    }
}

/// Windows of `values` against a precomputed `baseline`, in departure order.
pub fn find_windows_with_baseline(values: &[f64], baseline: &[f64], margin: f64) -> Vec<Window> {
    clumps(values, baseline)
        .into_iter()
        .filter_map(|clump| {
            let min_index = representative_minimum(values, &clump);
            let window = window_around(values, &clump, min_index, margin);
            if window.is_none() {
                trace!("Discarding degenerate clump {:?} (minimum at {})", clump, min_index);
            }
            window
        })
        .collect()
}

/// Maximal runs of consecutive indices strictly below the baseline, longer
/// than a single index.
pub fn clumps(values: &[f64], baseline: &[f64]) -> Vec<Range<usize>> {
    let mut runs = Vec::new();
    let mut open: Option<usize> = None;
    let n = values.len().min(baseline.len());

    for i in 0..=n {
        let below = i < n && values[i] < baseline[i];
        match (below, open) {
            (true, None) => open = Some(i),
            (false, Some(start)) => {
                if i - start > 1 {
                    runs.push(start..i);
                }
                open = None;
            }
            _ => {}
        }
    }
    runs
}

/// Index of the clump minimum. When the minimum value repeats, the index
/// closest to the median of the repeats wins, lower index first.
pub fn representative_minimum(values: &[f64], clump: &Range<usize>) -> usize {
    let minimum = values[clump.clone()].iter().copied().fold(f64::INFINITY, f64::min);
    let at_minimum: Vec<usize> = clump.clone().filter(|&i| values[i] == minimum).collect();

    let mid = at_minimum.len() / 2;
    let median = if at_minimum.len() % 2 == 1 {
        at_minimum[mid] as f64
    } else {
        (at_minimum[mid - 1] + at_minimum[mid]) as f64 / 2.0
    };

    at_minimum
        .iter()
        .copied()
        .min_by(|&a, &b| (a as f64 - median).abs().total_cmp(&(b as f64 - median).abs()))
        .unwrap_or(clump.start)
}

/// Window bounds around `min_index`, or `None` for a minimum on the clump
/// edge or one without a start or end crossing.
pub fn window_around(values: &[f64], clump: &Range<usize>, min_index: usize, margin: f64) -> Option<Window> {
    if min_index == clump.start || min_index + 1 == clump.end {
        return None;
    }
    let minimum_value = values[min_index];
    let offset = minimum_value + margin;

    let start_index = (clump.start..min_index)
        .rev()
        .take_while(|&i| values[i] <= offset)
        .last()?;
    let end_index = (min_index + 1..values.len()).find(|&i| values[i] >= offset)?;

    Some(Window { start_index, min_index, end_index, minimum_value })
}
