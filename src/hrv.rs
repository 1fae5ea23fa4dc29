//! Heart rate variability routines invoked once per analysed window.
//!
//! [`VariabilityRoutine`] is the seam between the interval aggregator and the
//! HRV computation: it receives the full window and returns a one-row table of
//! named metrics. [`EcgHrv`] is the built-in routine; any closure with the
//! matching signature works as well.

use anyhow::anyhow;
use anyhow::Result;
use log::trace;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::analysis::dfa::{DFAnalysis, DetrendStrategy, ALPHA1_WINDOWS};
use crate::analysis::nonlinear::calc_poincare_metrics;
use crate::analysis::time::{calc_mean_nn, calc_rmssd, calc_sdnn, rr_intervals_from_peaks};
use crate::table::SignalTable;

/// Name of the R-peak marker column produced by ECG processing pipelines.
pub const R_PEAKS_COLUMN: &str = "ECG_R_Peaks";

/// Computes HRV metrics for one window of processed ECG signals.
#[cfg_attr(test, mockall::automock)]
pub trait VariabilityRoutine {
    /// Returns a table with one row whose columns are the named metrics.
    ///
    /// Implementations should fail, or leave the metric out, rather than
    /// return NaN when a metric is undefined for the window.
    fn compute(&self, table: &SignalTable, sampling_rate: u32) -> Result<SignalTable>;
}

impl<F> VariabilityRoutine for F
where
    F: Fn(&SignalTable, u32) -> Result<SignalTable>,
{
    fn compute(&self, table: &SignalTable, sampling_rate: u32) -> Result<SignalTable> {
        self(table, sampling_rate)
    }
}

/// Settings of [`EcgHrv`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct HrvConfig {
    /// Column whose positive values mark R-peak samples.
    pub peaks_column: String,
    /// Window sizes, in beats, for `HRV_DFA_alpha1`. Empty disables DFA.
    pub dfa_windows: Vec<usize>,
}

impl Default for HrvConfig {
    fn default() -> Self {
        Self {
            peaks_column: R_PEAKS_COLUMN.to_string(),
            dfa_windows: ALPHA1_WINDOWS.to_vec(),
        }
    }
}

impl HrvConfig {
    pub fn with_peaks_column(mut self, column: impl Into<String>) -> Self {
        self.peaks_column = column.into();
        self
    }

    pub fn with_dfa_windows(mut self, windows: Vec<usize>) -> Self {
        self.dfa_windows = windows;
        self
    }
}

/// Built-in HRV routine working on an R-peak marker column.
///
/// Always emits `HRV_MeanNN`, `HRV_SDNN`, `HRV_RMSSD`, `HRV_SD1` and `HRV_SD2`.
/// `HRV_SD1SD2` is left out when SD2 is zero. `HRV_DFA_alpha1` is only emitted
/// when the window holds at least four times as many RR intervals as the
/// largest DFA window and the intervals vary at all. Every emitted value is
/// finite.
#[derive(Debug, Clone, Default)]
pub struct EcgHrv {
    config: HrvConfig,
}

impl EcgHrv {
    pub fn new(config: HrvConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HrvConfig {
        &self.config
    }

    /// RR intervals in milliseconds between the marked R-peaks of `table`.
    pub fn rr_intervals(&self, table: &SignalTable, sampling_rate: u32) -> Result<Vec<f64>> {
        let markers = table.column(&self.config.peaks_column).ok_or_else(|| {
            anyhow!(
                "Column `{}` is required to compute HRV.",
                self.config.peaks_column
            )
        })?;
        let peaks: Vec<usize> = markers
            .iter()
            .enumerate()
            .filter(|&(_, &v)| v > 0.0)
            .map(|(i, _)| i)
            .collect();
        if peaks.len() < 4 {
            return Err(anyhow!(
                "At least 4 R-peaks are required to compute HRV, found {}.",
                peaks.len()
            ));
        }
        rr_intervals_from_peaks(&peaks, sampling_rate)
    }

    fn dfa_applicable(&self, n_intervals: usize) -> bool {
        match self.config.dfa_windows.iter().max() {
            Some(&largest) => n_intervals >= 4 * largest,
            None => false,
        }
    }
}

impl VariabilityRoutine for EcgHrv {
    fn compute(&self, table: &SignalTable, sampling_rate: u32) -> Result<SignalTable> {
        let rr = self.rr_intervals(table, sampling_rate)?;
        trace!("computing HRV over {} RR intervals", rr.len());

        let sdnn = calc_sdnn(&rr)?;
        let poincare = calc_poincare_metrics(&rr)?;
        let mut metrics = vec![
            ("HRV_MeanNN", calc_mean_nn(&rr)?),
            ("HRV_SDNN", sdnn),
            ("HRV_RMSSD", calc_rmssd(&rr)?),
            ("HRV_SD1", poincare.sd1),
            ("HRV_SD2", poincare.sd2),
        ];
        match poincare.sd1_sd2_ratio() {
            Some(ratio) => metrics.push(("HRV_SD1SD2", ratio)),
            None => trace!("SD2 is zero, skipping HRV_SD1SD2"),
        }

        if !self.dfa_applicable(rr.len()) {
            trace!("window too short for DFA, skipping HRV_DFA_alpha1");
        } else if sdnn == 0.0 {
            trace!("no variability, skipping HRV_DFA_alpha1");
        } else {
            match DFAnalysis::dfa(&rr, &self.config.dfa_windows, DetrendStrategy::Linear) {
                Ok(dfa) if dfa.alpha.is_finite() => metrics.push(("HRV_DFA_alpha1", dfa.alpha)),
                Ok(dfa) => trace!("DFA alpha is {}, skipping HRV_DFA_alpha1", dfa.alpha),
                Err(e) => trace!("DFA fit failed, skipping HRV_DFA_alpha1: {e}"),
            }
        }

        let table = SignalTable::from_columns(
            metrics
                .into_iter()
                .map(|(name, value)| (name, vec![value])),
        )?;
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Marker column with a peak every `period` samples, starting at sample 5.
    fn peak_train(n_samples: usize, period: usize) -> Vec<f64> {
        (0..n_samples)
            .map(|i| if i >= 5 && (i - 5) % period == 0 { 1.0 } else { 0.0 })
            .collect()
    }

    #[test]
    fn regular_rhythm_has_no_variability() {
        let table = SignalTable::new()
            .with_column(R_PEAKS_COLUMN, peak_train(1000, 100))
            .unwrap();
        let hrv = EcgHrv::default().compute(&table, 100).unwrap();
        assert_eq!(hrv.nrows(), 1);
        assert_eq!(hrv.column("HRV_MeanNN"), Some(&[1000.0][..]));
        assert_eq!(hrv.column("HRV_RMSSD"), Some(&[0.0][..]));
        assert_eq!(hrv.column("HRV_SDNN"), Some(&[0.0][..]));
        assert!(hrv.column("HRV_DFA_alpha1").is_none());
        assert!(hrv.column("HRV_SD1SD2").is_none());
    }

    #[test]
    fn long_regular_rhythm_skips_dfa() {
        // 80 identical intervals is enough beats for DFA, but nothing to fit
        let table = SignalTable::new()
            .with_column(R_PEAKS_COLUMN, peak_train(80 * 100 + 10, 100))
            .unwrap();
        let hrv = EcgHrv::default().compute(&table, 100).unwrap();
        assert_eq!(hrv.column("HRV_SDNN"), Some(&[0.0][..]));
        assert!(hrv.column("HRV_DFA_alpha1").is_none());
        assert!(hrv.column("HRV_SD1SD2").is_none());
        for (name, values) in hrv.columns() {
            assert!(values[0].is_finite(), "{name} was {}", values[0]);
        }
    }

    #[test]
    fn dfa_emitted_for_long_windows() {
        let mut markers = vec![0.0; 70 * 100 + 50];
        let mut pos = 0;
        for i in 0..70 {
            markers[pos] = 1.0;
            pos += if i % 2 == 0 { 95 } else { 105 };
        }
        let table = SignalTable::new().with_column(R_PEAKS_COLUMN, markers).unwrap();
        let hrv = EcgHrv::default().compute(&table, 100).unwrap();
        let alpha = hrv.column("HRV_DFA_alpha1").expect("alpha1 should be present")[0];
        assert!(alpha.is_finite());
        let mean_nn = hrv.column("HRV_MeanNN").unwrap()[0];
        assert!((mean_nn - 1000.0).abs() < 10.0);
    }

    #[test]
    fn dfa_can_be_disabled() {
        let hrv = EcgHrv::new(HrvConfig::default().with_dfa_windows(vec![]));
        assert!(!hrv.dfa_applicable(10_000));
    }

    #[test]
    fn missing_peaks_column_fails() {
        let table = SignalTable::new()
            .with_column("ECG_Rate", vec![60.0; 10])
            .unwrap();
        assert!(EcgHrv::default().compute(&table, 100).is_err());
    }

    #[test]
    fn too_few_peaks_fails() {
        let table = SignalTable::new()
            .with_column(R_PEAKS_COLUMN, peak_train(250, 100))
            .unwrap();
        let err = EcgHrv::default().compute(&table, 100).unwrap_err();
        assert!(err.to_string().contains("R-peaks"));
    }

    #[test]
    fn custom_peaks_column() {
        let hrv = EcgHrv::new(HrvConfig::default().with_peaks_column("Peaks"));
        let table = SignalTable::new()
            .with_column("Peaks", peak_train(500, 50))
            .unwrap();
        let metrics = hrv.compute(&table, 100).unwrap();
        assert_eq!(metrics.column("HRV_MeanNN"), Some(&[500.0][..]));
    }

    #[test]
    fn closures_are_routines() {
        let routine = |_: &SignalTable, rate: u32| -> Result<SignalTable> {
            Ok(SignalTable::new().with_column("HRV_Rate", vec![rate as f64])?)
        };
        let out = routine.compute(&SignalTable::new(), 250).unwrap();
        assert_eq!(out.column("HRV_Rate"), Some(&[250.0][..]));
    }
}
