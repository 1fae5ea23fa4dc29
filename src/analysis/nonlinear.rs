//! Nonlinear analysis of RR intervals.
//!
//! Currently this covers the Poincaré plot descriptors SD1 and SD2.
//!
//! # Example
//! ```rust
//! use hrv_intervals::analysis::nonlinear::calc_poincare_metrics;
//!
//! let data = [1000.0, 1010.0, 1001.0, 1030.0, 1049.0];
//! let poincare = calc_poincare_metrics(&data).unwrap();
//! println!("SD1: {}, SD2: {}", poincare.sd1, poincare.sd2);
//! ```

use anyhow::anyhow;
use anyhow::Result;
use nalgebra::DVectorView;

/// Poincaré plot descriptors.
///
/// `sd1` is the spread perpendicular to the line of identity (short-term
/// variability), `sd2` the spread along it (long-term variability).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoincareMetrics {
    pub sd1: f64,
    pub sd2: f64,
}

impl PoincareMetrics {
    /// Ratio SD1/SD2, or `None` when `sd2` is zero.
    pub fn sd1_sd2_ratio(&self) -> Option<f64> {
        (self.sd2 > 0.0).then(|| self.sd1 / self.sd2)
    }
}

fn sample_variance(data: &[f64]) -> f64 {
    let data = DVectorView::from(data);
    let mean = data.mean();
    data.iter().map(|&x| (x - mean).powi(2)).sum::<f64>() / (data.len() - 1) as f64
}

/// Calculates the Poincaré metrics SD1 and SD2 of a series of RR intervals.
///
/// SD1 is derived from the variance of successive differences and SD2 from the
/// overall variance, both with sample (`n - 1`) normalisation.
///
/// # Errors
///
/// Returns an error if the input contains fewer than three intervals.
pub fn calc_poincare_metrics(data: &[f64]) -> Result<PoincareMetrics> {
    if data.len() < 3 {
        return Err(anyhow!(
            "Data must contain at least three elements for Poincaré metrics calculation."
        ));
    }

    let diffs = DVectorView::from(&data[1..]) - DVectorView::from(&data[..data.len() - 1]);

    let var_rr = sample_variance(data);
    let var_diff = sample_variance(diffs.as_slice());

    let sd1 = (0.5 * var_diff).sqrt();
    // rounding may push the argument marginally below zero for flat series
    let sd2 = (2.0 * var_rr - 0.5 * var_diff).max(0.0).sqrt();

    Ok(PoincareMetrics { sd1, sd2 })
}
