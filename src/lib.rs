//! Interval-related ECG analysis
//!
//! Summarises windows of processed ECG signals into one row of features per
//! window: the mean heart rate and a set of heart rate variability metrics.
//! Windows are given either as a single table or as labelled epochs.
//!
//! The HRV computation is pluggable through [`hrv::VariabilityRoutine`];
//! [`hrv::EcgHrv`] derives RR intervals from R-peak markers and computes
//! time-domain, Poincaré and DFA metrics with the algorithms in [`analysis`].

pub mod analysis;
pub mod error;
pub mod hrv;
pub mod interval;
pub mod record;
pub mod table;

pub use error::{IntervalError, IntervalResult};
pub use hrv::{EcgHrv, HrvConfig, VariabilityRoutine};
pub use interval::{analyze_interval, IntervalAggregator, IntervalInput, RateColumnMatch};
pub use record::{IntervalRecord, IntervalTable};
pub use table::SignalTable;
