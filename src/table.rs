//! Column-oriented table of per-sample signals.
//!
//! A [`SignalTable`] holds named `f64` columns of equal length, one row per
//! time sample, in insertion order. Rows carry an integer index which starts
//! out as `0..n` and can be re-keyed from a column with [`SignalTable::set_index`].
//! Duplicate column names are allowed; lookups by name return the first match.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{IntervalError, IntervalResult};

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SignalTable {
    index: Vec<i64>,
    columns: Vec<(String, Vec<f64>)>,
}

impl SignalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from `(name, values)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`IntervalError::InvalidInput`] if the columns differ in length.
    pub fn from_columns<I, S>(columns: I) -> IntervalResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (name, values) in columns {
            table.push_column(name, values)?;
        }
        Ok(table)
    }

    /// Builder form of [`SignalTable::push_column`].
    pub fn with_column(mut self, name: impl Into<String>, values: Vec<f64>) -> IntervalResult<Self> {
        self.push_column(name, values)?;
        Ok(self)
    }

    /// Appends a column. The first column fixes the row count of the table.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> IntervalResult<()> {
        let name = name.into();
        if self.columns.is_empty() {
            self.index = (0..values.len() as i64).collect();
        } else if values.len() != self.nrows() {
            return Err(IntervalError::invalid_input(
                name,
                format!(
                    "column has {} rows but the table has {}",
                    values.len(),
                    self.nrows()
                ),
            ));
        }
        self.columns.push((name, values));
        Ok(())
    }

    pub fn nrows(&self) -> usize {
        self.index.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn index(&self) -> &[i64] {
        &self.index
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    /// Returns the values of the first column called `name`.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Re-keys the rows by the column `name` and removes that column.
    ///
    /// # Errors
    ///
    /// Fails if the column does not exist or holds values that are not integers.
    pub fn set_index(&mut self, name: &str) -> IntervalResult<()> {
        let pos = self
            .columns
            .iter()
            .position(|(col, _)| col == name)
            .ok_or_else(|| IntervalError::invalid_input(name, "index column not found"))?;
        let index = self.columns[pos]
            .1
            .iter()
            .map(|&v| {
                if v.is_finite() && v.fract() == 0.0 {
                    Ok(v as i64)
                } else {
                    Err(IntervalError::invalid_input(
                        name,
                        format!("index value {v} is not an integer"),
                    ))
                }
            })
            .collect::<IntervalResult<Vec<_>>>()?;
        self.columns.remove(pos);
        self.index = index;
        Ok(())
    }

    /// Removes every column called `name`.
    pub fn drop_column(&mut self, name: &str) -> IntervalResult<()> {
        let before = self.columns.len();
        self.columns.retain(|(col, _)| col != name);
        if self.columns.len() == before {
            return Err(IntervalError::invalid_input(name, "column not found"));
        }
        Ok(())
    }
}
