//! Savitzky-Golay smoothing: each point is replaced by the value of a
//! least-squares polynomial fitted over a window centred on it. Points within
//! half a window of either end take the value of the polynomial fitted to the
//! first or last full window.

use crate::config::SmoothingConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SavitzkyGolay {
    pub window: usize,
    pub order: usize,
}

impl From<SmoothingConfig> for SavitzkyGolay {
    fn from(config: SmoothingConfig) -> Self {
        Self::new(config.window, config.order)
    }
}

impl SavitzkyGolay {
    pub fn new(window: usize, order: usize) -> Self {
        Self { window, order }
    }

    /// Largest odd window not longer than `len` nor the configured window.
    fn effective_window(&self, len: usize) -> usize {
        let w = self.window.min(len);
        if w % 2 == 0 { w.saturating_sub(1) } else { w }
    }

    pub fn smooth(&self, data: &[f64]) -> Vec<f64> {
        let n = data.len();
        let window = self.effective_window(n);
        if window <= self.order {
            return data.to_vec();
        }
        let Some(fit) = WindowFit::new(window, self.order) else {
            return data.to_vec();
        };

        let half = window / 2;
        let mut out = vec![0.0; n];
        for i in half..n - half {
            out[i] = fit.centre_value(&data[i - half..=i + half]);
        }

        let head = fit.coefficients(&data[..window]);
        for (i, value) in out.iter_mut().enumerate().take(half) {
            *value = fit.evaluate(&head, i as f64 - half as f64);
        }
        let tail = fit.coefficients(&data[n - window..]);
        let centre = n - 1 - half;
        for (i, value) in out.iter_mut().enumerate().skip(n - half) {
            *value = fit.evaluate(&tail, i as f64 - centre as f64);
        }
        out
    }
}

/// Least-squares projection for a fixed window length and polynomial order.
/// Positions are scaled into [-1, 1] to keep the normal equations well conditioned.
struct WindowFit {
    scale: f64,
    /// projection[k][j]: weight of sample j in coefficient k
    projection: Vec<Vec<f64>>,
}

impl WindowFit {
    fn new(window: usize, order: usize) -> Option<Self> {
        let half = (window / 2) as f64;
        let scale = half.max(1.0);
        let xs: Vec<f64> = (0..window).map(|j| (j as f64 - half) / scale).collect();
        let terms = order + 1;

        let mut normal = vec![vec![0.0; terms]; terms];
        for (r, row) in normal.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell = xs.iter().map(|x| x.powi((r + c) as i32)).sum();
            }
        }
        let inverse = invert(normal)?;

        let projection: Vec<Vec<f64>> = inverse
            .iter()
            .map(|row| {
                xs.iter()
                    .map(|x| row.iter().enumerate().map(|(m, w)| w * x.powi(m as i32)).sum::<f64>())
                    .collect()
            })
            .collect();
        Some(Self { scale, projection })
    }

    fn coefficients(&self, samples: &[f64]) -> Vec<f64> {
        self.projection
            .iter()
            .map(|weights| weights.iter().zip(samples).map(|(w, y)| w * y).sum::<f64>())
            .collect()
    }

    fn centre_value(&self, samples: &[f64]) -> f64 {
        self.projection[0].iter().zip(samples).map(|(w, y)| w * y).sum()
    }

    /// Polynomial value at `offset` samples from the window centre.
    fn evaluate(&self, coefficients: &[f64], offset: f64) -> f64 {
        let x = offset / self.scale;
        coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert(mut a: Vec<Vec<f64>>) -> Option<Vec<Vec<f64>>> {
    let n = a.len();
    let mut inv: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let pivot = (col..n).max_by(|&x, &y| a[x][col].abs().total_cmp(&a[y][col].abs()))?;
        if a[pivot][col].abs() < 1e-12 {
            return None;
        }
        a.swap(col, pivot);
        inv.swap(col, pivot);

        let p = a[col][col];
        for j in 0..n {
            a[col][j] /= p;
            inv[col][j] /= p;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                a[row][j] -= factor * a[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }
    Some(inv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (i, (x, y)) in a.iter().zip(b).enumerate() {
            assert!((x - y).abs() < 1e-9, "index {i}: {x} != {y}");
        }
    }

    #[test]
    fn test_linear_fit_reproduces_a_line() {
        let data: Vec<f64> = (0..40).map(|i| 3.0 + 0.5 * i as f64).collect();
        let smoothed = SavitzkyGolay::new(11, 1).smooth(&data);
        assert_close(&smoothed, &data);
    }

    #[test]
    fn test_quadratic_fit_reproduces_a_parabola() {
        let data: Vec<f64> = (0..30).map(|i| (i as f64 - 12.0).powi(2) / 4.0).collect();
        let smoothed = SavitzkyGolay::new(9, 2).smooth(&data);
        assert_close(&smoothed, &data);
    }

    #[test]
    fn test_order_one_centre_is_window_mean() {
        let data = [1.0, 9.0, 2.0, 8.0, 3.0, 7.0, 4.0];
        let smoothed = SavitzkyGolay::new(5, 1).smooth(&data);
        assert!((smoothed[2] - 23.0 / 5.0).abs() < 1e-12);
        assert!((smoothed[3] - 29.0 / 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_spike_is_flattened() {
        let mut data = vec![10.0; 21];
        data[10] = 0.0;
        let smoothed = SavitzkyGolay::new(7, 1).smooth(&data);
        assert!(smoothed[10] > 8.0);
        assert!(smoothed[10] < 10.0);
        assert!((smoothed[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_window_shrinks_to_short_series() {
        let data: Vec<f64> = (0..6).map(|i| i as f64 * 2.0).collect();
        // window 101 shrinks to 5 for six samples
        let smoothed = SavitzkyGolay::new(101, 1).smooth(&data);
        assert_close(&smoothed, &data);
    }

    #[test]
    fn test_unfittable_series_is_returned_unchanged() {
        assert_eq!(SavitzkyGolay::new(5, 1).smooth(&[4.0]), vec![4.0]);
        assert!(SavitzkyGolay::new(5, 1).smooth(&[]).is_empty());
    }
}
