//! Time-domain measures of heart rate variability.
//!
//! The following metrics can be calculated from a series of RR intervals in milliseconds:
//! - Mean of NN intervals (MeanNN)
//! - Standard Deviation of NN intervals (SDNN)
//! - Root Mean Square of Successive Differences (RMSSD)

use anyhow::anyhow;
use anyhow::Result;
use nalgebra::DVectorView;

/// Converts R-peak sample positions into RR intervals in milliseconds.
///
/// # Arguments
///
/// * `peaks` - Sample indices of successive R-peaks, ascending.
/// * `sampling_rate` - Samples per second of the signal the peaks were found in.
///
/// # Errors
///
/// Fails if fewer than two peaks are given, if the sampling rate is zero,
/// or if the peaks are not strictly increasing.
pub fn rr_intervals_from_peaks(peaks: &[usize], sampling_rate: u32) -> Result<Vec<f64>> {
    if sampling_rate == 0 {
        return Err(anyhow!("Sampling rate must be positive."));
    }
    if peaks.len() < 2 {
        return Err(anyhow!(
            "At least two R-peaks are required to compute RR intervals, got {}.",
            peaks.len()
        ));
    }
    peaks
        .windows(2)
        .map(|pair| {
            if pair[1] <= pair[0] {
                Err(anyhow!("R-peaks must be strictly increasing."))
            } else {
                Ok((pair[1] - pair[0]) as f64 / sampling_rate as f64 * 1000.0)
            }
        })
        .collect()
}

/// Calculates the mean of the RR intervals (MeanNN).
///
/// # Errors
///
/// This function will return an error if the input slice is empty.
pub fn calc_mean_nn(data: &[f64]) -> Result<f64> {
    if data.is_empty() {
        return Err(anyhow!("Data must not be empty for MeanNN calculation."));
    }
    Ok(DVectorView::from(data).mean())
}

/// Calculates the Standard Deviation of NN intervals (SDNN).
///
/// Uses the sample standard deviation (`n - 1` in the denominator).
///
/// # Errors
///
/// This function will return an error if the input slice contains fewer than two elements.
pub fn calc_sdnn(data: &[f64]) -> Result<f64> {
    if data.len() < 2 {
        return Err(anyhow!(
            "Data must contain at least two elements for SDNN calculation."
        ));
    }
    let data = DVectorView::from(data);
    let mean = data.mean();
    let sum_sq: f64 = data.iter().map(|&x| (x - mean).powi(2)).sum();
    Ok((sum_sq / (data.len() - 1) as f64).sqrt())
}

/// Calculates the Root Mean Square of Successive Differences (RMSSD).
///
/// RMSSD is the square root of the mean of the squares of the successive
/// differences between adjacent RR intervals.
///
/// # Errors
///
/// This function will return an error if the input slice contains fewer than two elements.
pub fn calc_rmssd(data: &[f64]) -> Result<f64> {
    if data.len() < 2 {
        return Err(anyhow!(
            "Data must contain at least two elements for RMSSD calculation."
        ));
    }
    let rr_points_a = DVectorView::from(&data[0..data.len() - 1]);
    let rr_points_b = DVectorView::from(&data[1..]);
    let successive_diffs = rr_points_b - rr_points_a;
    Ok((successive_diffs.dot(&successive_diffs) / (successive_diffs.len() as f64)).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rr_from_peaks() {
        let rr = rr_intervals_from_peaks(&[0, 100, 190, 300], 100).unwrap();
        assert_eq!(rr, vec![1000.0, 900.0, 1100.0]);
    }

    #[test]
    fn test_rr_from_peaks_errors() {
        assert!(rr_intervals_from_peaks(&[10], 100).is_err());
        assert!(rr_intervals_from_peaks(&[0, 100], 0).is_err());
        assert!(rr_intervals_from_peaks(&[100, 100], 100).is_err());
    }

    #[test]
    fn test_mean_nn() {
        let data = [900.0, 1000.0, 1100.0];
        assert!((calc_mean_nn(&data).unwrap() - 1000.0).abs() < 1e-9);
        assert!(calc_mean_nn(&[]).is_err());
    }

    #[test]
    fn test_sdnn() {
        let data = [900.0, 1000.0, 1100.0];
        let sdnn = calc_sdnn(&data).unwrap();
        assert!((sdnn - 100.0).abs() < 1e-9, "SDNN should be 100, got {sdnn}");
    }

    #[test]
    fn test_rmssd() {
        let data = [1000.0, 1010.0, 1020.0, 1030.0, 1040.0];
        let rmssd = calc_rmssd(&data).unwrap();
        assert!((rmssd - 10.0).abs() < 1e-9, "RMSSD should be 10, got {rmssd}");
    }

    #[test]
    fn test_single_point_errors() {
        let data = [1000.0];
        assert!(calc_sdnn(&data).is_err());
        assert!(calc_rmssd(&data).is_err());
    }
}
