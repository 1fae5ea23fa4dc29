//! Interval-related ECG analysis.
//!
//! Summarises one or more windows of processed ECG signals (typically longer
//! than ten seconds, such as resting-state recordings) into rows of features:
//! the mean heart rate `ECG_Rate_Mean` followed by the metrics of a
//! [`VariabilityRoutine`].
//!
//! # Example
//!
//! ```rust
//! use anyhow::Result;
//! use hrv_intervals::interval::{analyze_interval, IntervalInput};
//! use hrv_intervals::table::SignalTable;
//!
//! let window = SignalTable::new()
//!     .with_column("ECG_Rate", vec![60.0, 62.0, 64.0, 66.0])
//!     .unwrap();
//! let routine = |_: &SignalTable, _: u32| -> Result<SignalTable> {
//!     Ok(SignalTable::new().with_column("HRV_MeanNN", vec![950.0])?)
//! };
//! let features = analyze_interval(IntervalInput::from(window), 100, &routine).unwrap();
//! assert_eq!(features.get("0", "ECG_Rate_Mean"), Some(63.0));
//! assert_eq!(features.get("0", "HRV_MeanNN"), Some(950.0));
//! ```

use log::{debug, trace, warn};
use nalgebra::DVectorView;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{IntervalError, IntervalResult};
use crate::hrv::{EcgHrv, VariabilityRoutine};
use crate::record::{IntervalRecord, IntervalTable};
use crate::table::SignalTable;

/// Instantaneous heart rate column, one value per sample in beats per minute.
pub const RATE_COLUMN: &str = "ECG_Rate";
/// Feature holding the mean of [`RATE_COLUMN`].
pub const RATE_MEAN_FEATURE: &str = "ECG_Rate_Mean";
/// Sample index column carried by epoch tables.
pub const INDEX_COLUMN: &str = "Index";
/// Epoch label column carried by epoch tables.
pub const LABEL_COLUMN: &str = "Label";
/// Sampling rate, in Hz, assumed when the caller has no better value.
pub const DEFAULT_SAMPLING_RATE: u32 = 1000;

/// How columns are recognised as the heart rate column.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateColumnMatch {
    /// Any column whose name contains `ECG_Rate` counts towards the
    /// ambiguity check, but the one rate column found must still be named
    /// exactly `ECG_Rate`. A lone `ECG_Rate_Surrogate` is rejected, not averaged.
    #[default]
    Substring,
    /// Only a column named exactly `ECG_Rate`.
    Exact,
}

impl RateColumnMatch {
    pub fn matches(&self, column: &str) -> bool {
        match self {
            RateColumnMatch::Substring => column.contains(RATE_COLUMN),
            RateColumnMatch::Exact => column == RATE_COLUMN,
        }
    }
}

/// Windows to analyse.
#[derive(Debug, Clone, PartialEq)]
pub enum IntervalInput {
    /// One window, summarised into a single row.
    Single(SignalTable),
    /// Labelled epochs, one row per label in the given order. Labels must be
    /// unique. Each table carries `Index` and `Label` bookkeeping columns.
    Collection(Vec<(String, SignalTable)>),
}

impl From<SignalTable> for IntervalInput {
    fn from(table: SignalTable) -> Self {
        IntervalInput::Single(table)
    }
}

impl<S: Into<String>> FromIterator<(S, SignalTable)> for IntervalInput {
    fn from_iter<I: IntoIterator<Item = (S, SignalTable)>>(iter: I) -> Self {
        IntervalInput::Collection(
            iter.into_iter()
                .map(|(label, table)| (label.into(), table))
                .collect(),
        )
    }
}

/// Computes interval features with a variability routine `R`.
#[derive(Debug, Clone, Default)]
pub struct IntervalAggregator<R = EcgHrv> {
    routine: R,
    rate_match: RateColumnMatch,
}

impl<R: VariabilityRoutine> IntervalAggregator<R> {
    pub fn new(routine: R) -> Self {
        Self {
            routine,
            rate_match: RateColumnMatch::default(),
        }
    }

    pub fn with_rate_match(mut self, rate_match: RateColumnMatch) -> Self {
        self.rate_match = rate_match;
        self
    }

    pub fn routine(&self) -> &R {
        &self.routine
    }

    pub fn rate_match(&self) -> RateColumnMatch {
        self.rate_match
    }

    /// Analyses a single window or every epoch of a collection.
    ///
    /// # Errors
    ///
    /// - [`IntervalError::InvalidInput`] if `sampling_rate` is zero, a window
    ///   has no (or more than one) rate column, an epoch lacks its
    ///   `Index`/`Label` columns, or two epochs share a label.
    /// - [`IntervalError::Coercion`] if the routine returns a metric with other than one row.
    /// - [`IntervalError::Variability`] for failures of the routine itself.
    ///
    /// The first failing epoch aborts the whole call.
    pub fn analyze(&self, data: IntervalInput, sampling_rate: u32) -> IntervalResult<IntervalTable> {
        analyze_with(&self.routine, self.rate_match, data, sampling_rate)
    }

    /// Features of one window, without epoch normalisation.
    pub fn analyze_window(
        &self,
        table: &SignalTable,
        sampling_rate: u32,
    ) -> IntervalResult<IntervalRecord> {
        check_sampling_rate(sampling_rate)?;
        window_features(&self.routine, self.rate_match, table, sampling_rate)
    }
}

/// Analyses `data` with `routine`, matching rate columns by substring.
///
/// See [`IntervalAggregator::analyze`] for the error conditions.
pub fn analyze_interval<R: VariabilityRoutine + ?Sized>(
    data: IntervalInput,
    sampling_rate: u32,
    routine: &R,
) -> IntervalResult<IntervalTable> {
    analyze_with(routine, RateColumnMatch::default(), data, sampling_rate)
}

fn analyze_with<R: VariabilityRoutine + ?Sized>(
    routine: &R,
    rate_match: RateColumnMatch,
    data: IntervalInput,
    sampling_rate: u32,
) -> IntervalResult<IntervalTable> {
    check_sampling_rate(sampling_rate)?;
    match data {
        IntervalInput::Single(table) => {
            debug!("analysing single window of {} samples", table.nrows());
            let record = window_features(routine, rate_match, &table, sampling_rate)?;
            Ok(IntervalTable::from_record(record))
        }
        IntervalInput::Collection(epochs) => {
            check_unique_labels(&epochs)?;
            let records = epochs
                .into_iter()
                .map(|(label, mut table)| -> IntervalResult<(String, IntervalRecord)> {
                    table.set_index(INDEX_COLUMN)?;
                    table.drop_column(LABEL_COLUMN)?;
                    debug!("analysing epoch `{label}` of {} samples", table.nrows());
                    let record = window_features(routine, rate_match, &table, sampling_rate)?;
                    Ok((label, record))
                })
                .collect::<IntervalResult<Vec<_>>>()?;
            Ok(IntervalTable::from_records(records))
        }
    }
}

fn check_sampling_rate(sampling_rate: u32) -> IntervalResult<()> {
    if sampling_rate == 0 {
        return Err(IntervalError::invalid_input(
            "sampling_rate",
            "sampling rate must be positive",
        ));
    }
    Ok(())
}

fn check_unique_labels(epochs: &[(String, SignalTable)]) -> IntervalResult<()> {
    for (i, (label, _)) in epochs.iter().enumerate() {
        if epochs[..i].iter().any(|(seen, _)| seen == label) {
            return Err(IntervalError::invalid_input(
                LABEL_COLUMN,
                format!("duplicate epoch label `{label}`"),
            ));
        }
    }
    Ok(())
}

/// The one rate column of `table`.
fn rate_column(table: &SignalTable, rate_match: RateColumnMatch) -> IntervalResult<&[f64]> {
    let mut candidates = table.columns().filter(|(name, _)| rate_match.matches(name));
    let (name, values) = candidates.next().ok_or_else(|| {
        IntervalError::invalid_input(
            RATE_COLUMN,
            "couldn't extract heart rate, the table must contain an `ECG_Rate` column",
        )
    })?;
    let others: Vec<&str> = candidates.map(|(name, _)| name).collect();
    if !others.is_empty() {
        return Err(IntervalError::invalid_input(
            RATE_COLUMN,
            format!(
                "ambiguous heart rate, found several rate columns: {name}, {}",
                others.join(", ")
            ),
        ));
    }
    if name != RATE_COLUMN {
        return Err(IntervalError::invalid_input(
            RATE_COLUMN,
            format!("couldn't extract heart rate, found `{name}` but no `ECG_Rate` column"),
        ));
    }
    if values.is_empty() {
        return Err(IntervalError::invalid_input(name, "rate column is empty"));
    }
    Ok(values)
}

/// Mean rate followed by the flattened metrics of `routine`.
fn window_features<R: VariabilityRoutine + ?Sized>(
    routine: &R,
    rate_match: RateColumnMatch,
    table: &SignalTable,
    sampling_rate: u32,
) -> IntervalResult<IntervalRecord> {
    let rate = rate_column(table, rate_match)?;
    let rate_mean = DVectorView::from(rate).mean();
    trace!("mean heart rate {rate_mean} over {} samples", rate.len());

    let mut record = IntervalRecord::new();
    record.insert(RATE_MEAN_FEATURE, rate_mean);

    let metrics = routine.compute(table, sampling_rate)?;
    for (name, values) in metrics.columns() {
        let [value] = values else {
            return Err(IntervalError::Coercion {
                column: name.to_string(),
                rows: values.len(),
            });
        };
        if name == RATE_MEAN_FEATURE {
            warn!("variability routine returned `{RATE_MEAN_FEATURE}`, keeping the computed mean");
            continue;
        }
        record.insert(name, *value);
    }
    Ok(record)
}
