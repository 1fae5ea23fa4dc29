//! Detrended Fluctuation Analysis (DFA) of RR interval series.
//!
//! DFA estimates the statistical self-affinity of a series. For HRV the
//! short-term scaling exponent `alpha1` (window sizes 4 to 16 beats) is the
//! usual summary.
//!
//! The module includes:
//!
//! - `DetrendAlgorithm` trait: interface for removing the local trend of a segment.
//! - `DetrendStrategy` enum: linear least-squares detrending or a user supplied algorithm.
//! - `DFAnalysis`: the scaling exponent, intercept and goodness of fit of the log-log regression.
//!
//! # Example
//!
//! ```rust
//! use hrv_intervals::analysis::dfa::{DFAnalysis, DetrendStrategy};
//!
//! let data = (0..128)
//!     .map(|i| 1000.0 + 25.0 * (i as f64 * 0.7).sin())
//!     .collect::<Vec<f64>>();
//! let analysis = DFAnalysis::dfa(&data, &[4, 8, 16], DetrendStrategy::Linear).unwrap();
//! println!("Alpha: {}", analysis.alpha);
//! ```

use anyhow::anyhow;
use anyhow::Result;
use log::trace;
use nalgebra::DMatrix;
use nalgebra::DVector;
use nalgebra::DVectorView;
use rayon::iter::ParallelIterator;
use rayon::slice::ParallelSlice;

/// Window sizes, in beats, of the short-term exponent `alpha1`.
pub const ALPHA1_WINDOWS: [usize; 13] = [4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];

/// Removes the local trend of a segment of the integrated series.
#[cfg_attr(test, mockall::automock)]
pub trait DetrendAlgorithm {
    /// Returns the residuals of `data` after the trend has been removed.
    fn detrend(&self, data: &[f64]) -> Result<Vec<f64>>;
}

/// Available detrend strategies for the DFA algorithm.
pub enum DetrendStrategy {
    /// Least squares straight line.
    Linear,
    /// User supplied algorithm. Must be `Sync + Send` since segments are detrended in parallel.
    Custom(Box<dyn DetrendAlgorithm + Sync + Send>),
}

impl DetrendAlgorithm for DetrendStrategy {
    fn detrend(&self, data: &[f64]) -> Result<Vec<f64>> {
        match self {
            DetrendStrategy::Linear => LinearDetrend.detrend(data),
            DetrendStrategy::Custom(detrender) => detrender.detrend(data),
        }
    }
}

/// Linear detrending using least squares regression.
pub struct LinearDetrend;

impl DetrendAlgorithm for LinearDetrend {
    fn detrend(&self, data: &[f64]) -> Result<Vec<f64>> {
        if data.len() < 2 {
            return Err(anyhow!(
                "Data must contain at least two elements for detrending."
            ));
        }
        let x: Vec<f64> = (0..data.len()).map(|i| i as f64).collect();
        let ((slope, intercept), _) = linear_fit(&x, data)?;
        Ok(data
            .iter()
            .zip(x.iter())
            .map(|(&y, &i)| y - (slope * i + intercept))
            .collect())
    }
}

/// Result of a Detrended Fluctuation Analysis.
///
/// * `alpha` - scaling exponent, the slope of `log_f` over `log_n`.
/// * `intercept` - intercept of that fit.
/// * `r_squared` - coefficient of determination of that fit.
/// * `log_n` / `log_f` - log window sizes and log fluctuation amplitudes that were fitted.
#[derive(Debug, Clone)]
pub struct DFAnalysis {
    pub alpha: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub log_n: Vec<f64>,
    pub log_f: Vec<f64>,
}

impl DFAnalysis {
    /// Performs DFA over non-overlapping windows of the given sizes.
    ///
    /// The series is mean-centred and integrated, every window size splits the
    /// profile into whole segments which are detrended, and the root mean
    /// residual variance per window size is regressed against the window size
    /// on a log-log scale.
    ///
    /// # Errors
    ///
    /// This method returns an error if:
    /// - `windows` is empty.
    /// - The smallest window size is less than 4.
    /// - The input is shorter than four times the largest window size.
    /// - The `detrender` fails on a segment.
    pub fn dfa(data: &[f64], windows: &[usize], detrender: DetrendStrategy) -> Result<Self> {
        let mut windows = windows.to_vec();
        windows.sort_unstable();
        windows.dedup();
        let (Some(&smallest), Some(&largest)) = (windows.first(), windows.last()) else {
            return Err(anyhow!("Windows must not be empty"));
        };
        if smallest < 4 {
            return Err(anyhow!("Minimum window size must be at least 4"));
        }
        if data.len() < 4 * largest {
            return Err(anyhow!(
                "Data length must be at least 4x the size of the largest window ({} < {})",
                data.len(),
                4 * largest
            ));
        }

        let profile = integrate(data);
        let mut log_n = Vec::with_capacity(windows.len());
        let mut log_f = Vec::with_capacity(windows.len());
        for window in windows {
            let f_n = fluctuation(&profile, window, &detrender)?;
            trace!("DFA window {window}: F(n) = {f_n}");
            if f_n > 0.0 && f_n.is_finite() {
                log_n.push((window as f64).ln());
                log_f.push(f_n.ln());
            }
        }

        let ((alpha, intercept), r_squared) = linear_fit(&log_n, &log_f)?;
        Ok(DFAnalysis {
            alpha,
            intercept,
            r_squared,
            log_n,
            log_f,
        })
    }

    /// Short-term exponent `alpha1` with linear detrending over [`ALPHA1_WINDOWS`].
    pub fn alpha1(data: &[f64]) -> Result<Self> {
        Self::dfa(data, &ALPHA1_WINDOWS, DetrendStrategy::Linear)
    }
}

/// Cumulative sum of the mean-centred series.
fn integrate(data: &[f64]) -> Vec<f64> {
    let mean = DVectorView::from(data).mean();
    data.iter()
        .scan(0.0, |state, &x| {
            *state += x - mean;
            Some(*state)
        })
        .collect()
}

/// Root mean residual variance over all whole segments of size `window`.
fn fluctuation(profile: &[f64], window: usize, detrender: &DetrendStrategy) -> Result<f64> {
    let variances = profile
        .par_chunks_exact(window)
        .map(|segment| -> Result<f64> {
            let residuals = DVector::from(detrender.detrend(segment)?);
            Ok(residuals.variance())
        })
        .collect::<Result<Vec<f64>>>()?;
    if variances.is_empty() {
        return Err(anyhow!("No complete segment of size {window}"));
    }
    Ok((variances.iter().sum::<f64>() / variances.len() as f64).sqrt())
}

/// Least squares fit of `y = slope * x + intercept`.
///
/// Returns `((slope, intercept), r_squared)`.
fn linear_fit(x: &[f64], y: &[f64]) -> Result<((f64, f64), f64)> {
    if x.len() < 2 {
        return Err(anyhow!(
            "Data must contain at least two elements for linear fit."
        ));
    }
    if x.len() != y.len() {
        return Err(anyhow!("X and Y data must have the same length."));
    }
    let design = DMatrix::from_columns(&[
        DVector::from_column_slice(x),
        DVector::from_element(x.len(), 1.0),
    ]);
    let y = DVectorView::from(y);
    let fit = lstsq::lstsq(&design, &y.into(), f64::EPSILON).map_err(|e| anyhow!(e))?;

    let y_mean = y.mean();
    let tss: f64 = y.iter().map(|&yi| (yi - y_mean).powi(2)).sum();
    let r_squared = 1.0 - (fit.residuals / tss);

    Ok(((fit.solution[0], fit.solution[1]), r_squared))
}

#[cfg(test)]
mod tests {
    use rand::{Rng, SeedableRng};

    use super::*;

    fn get_test_data(size: usize) -> Vec<f64> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        (0..size)
            .map(|_| 1000.0 + rng.gen_range(-10.0..10.0))
            .collect()
    }

    #[test]
    fn empty_windows() {
        let data = get_test_data(128);
        let result = DFAnalysis::dfa(&data, &[], DetrendStrategy::Linear);
        assert!(result.is_err(), "DFA should fail with empty windows.");
    }

    #[test]
    fn window_too_small() {
        let data = get_test_data(128);
        let result = DFAnalysis::dfa(&data, &[3, 8], DetrendStrategy::Linear);
        assert!(result.is_err(), "DFA should fail with windows below 4.");
    }

    #[test]
    fn data_too_short() {
        let data = get_test_data(63);
        let result = DFAnalysis::alpha1(&data);
        assert!(
            result.is_err(),
            "DFA should fail with less than 4x window size data."
        );
    }

    #[test]
    fn white_noise_alpha_near_half() {
        let data = get_test_data(1024);
        let analysis = DFAnalysis::alpha1(&data).unwrap();
        assert_eq!(analysis.log_n.len(), ALPHA1_WINDOWS.len());
        assert!(
            analysis.alpha > 0.2 && analysis.alpha < 0.8,
            "alpha of uncorrelated noise should be near 0.5, got {}",
            analysis.alpha
        );
    }

    #[test]
    fn custom_detrend() {
        let mut detrender = MockDetrendAlgorithm::new();
        detrender
            .expect_detrend()
            .times(1..)
            .returning(|data| Ok(data.to_vec()));
        let data = get_test_data(128);
        let result = DFAnalysis::dfa(&data, &[4, 5, 6], DetrendStrategy::Custom(Box::new(detrender)));
        assert!(result.is_ok(), "DFA should succeed with custom detrender.");
    }

    #[test]
    fn failing_detrend_propagates() {
        let mut detrender = MockDetrendAlgorithm::new();
        detrender
            .expect_detrend()
            .returning(|_| Err(anyhow!("detrend failed")));
        let data = get_test_data(128);
        let result = DFAnalysis::dfa(&data, &[4, 8], DetrendStrategy::Custom(Box::new(detrender)));
        assert!(result.is_err());
    }

    #[test]
    fn detrend_invalid_data() {
        let result = LinearDetrend.detrend(&[1.0]);
        assert!(result.is_err(), "Detrend should fail with less than 2 elements.");
    }

    #[test]
    fn detrend_removes_line() {
        let data = [1.0, 3.0, 5.0, 7.0];
        let residuals = LinearDetrend.detrend(&data).unwrap();
        assert!(residuals.iter().all(|r| r.abs() < 1e-9));
    }

    #[test]
    fn test_linear_fit() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        let ((slope, intercept), r_sqr) = linear_fit(&x, &y).unwrap();
        assert!((slope - 2.0).abs() < 1e-6, "Slope should be approximately 2.0");
        assert!(intercept.abs() < 1e-6, "Intercept should be approximately 0.0");
        assert!(r_sqr > 0.999, "R-squared should be close to 1.0 for perfect fit.");
    }

    #[test]
    fn test_linear_fit_errors() {
        assert!(linear_fit(&[1.0], &[2.0]).is_err());
        assert!(linear_fit(&[1.0, 2.0], &[2.0, 3.0, 4.0]).is_err());
    }
}
