//! Per-window feature records and the output table assembled from them.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Feature name to scalar value, in insertion order.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalRecord {
    entries: Vec<(String, f64)>,
}

impl IntervalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing an earlier value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Label used for the only row of a single-window result.
pub const SINGLE_ROW_LABEL: &str = "0";

/// Rows of interval features, one per analysed window.
///
/// Columns are the union of the keys of all records, in first-seen order.
/// A record that lacks a column has `None` in that cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalTable {
    rows: Vec<String>,
    columns: Vec<String>,
    cells: Vec<Vec<Option<f64>>>,
}

impl IntervalTable {
    /// Wraps one record as a single-row table labelled [`SINGLE_ROW_LABEL`].
    pub fn from_record(record: IntervalRecord) -> Self {
        Self::from_records(vec![(SINGLE_ROW_LABEL.to_string(), record)])
    }

    /// Builds a table with one row per `(label, record)` pair.
    pub fn from_records(records: Vec<(String, IntervalRecord)>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for (_, record) in &records {
            for key in record.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.to_string());
                }
            }
        }

        let (rows, cells) = records
            .into_iter()
            .map(|(label, record)| {
                let row: Vec<Option<f64>> = columns.iter().map(|col| record.get(col)).collect();
                (label, row)
            })
            .unzip();

        Self {
            rows,
            columns,
            cells,
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn row_labels(&self) -> &[String] {
        &self.rows
    }

    pub fn column_names(&self) -> &[String] {
        &self.columns
    }

    /// Cells of the row `label`, aligned with [`IntervalTable::column_names`].
    pub fn row(&self, label: &str) -> Option<&[Option<f64>]> {
        self.rows
            .iter()
            .position(|r| r == label)
            .map(|i| self.cells[i].as_slice())
    }

    /// Value at (`row`, `column`). `None` for missing cells and unknown labels alike.
    pub fn get(&self, row: &str, column: &str) -> Option<f64> {
        let col = self.columns.iter().position(|c| c == column)?;
        self.row(row).and_then(|cells| cells[col])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(entries: &[(&str, f64)]) -> IntervalRecord {
        let mut rec = IntervalRecord::new();
        for &(k, v) in entries {
            rec.insert(k, v);
        }
        rec
    }

    #[test]
    fn insert_replaces_in_place() {
        let mut rec = record(&[("ECG_Rate_Mean", 60.0), ("HRV_RMSSD", 20.0)]);
        rec.insert("ECG_Rate_Mean", 70.0);
        assert_eq!(rec.len(), 2);
        assert_eq!(rec.keys().collect::<Vec<_>>(), ["ECG_Rate_Mean", "HRV_RMSSD"]);
        assert_eq!(rec.get("ECG_Rate_Mean"), Some(70.0));
    }

    #[test]
    fn single_record_becomes_single_row() {
        let table = IntervalTable::from_record(record(&[("ECG_Rate_Mean", 63.0)]));
        assert_eq!(table.row_labels(), [SINGLE_ROW_LABEL]);
        assert_eq!(table.get(SINGLE_ROW_LABEL, "ECG_Rate_Mean"), Some(63.0));
    }

    #[test]
    fn union_of_columns_with_missing_cells() {
        let table = IntervalTable::from_records(vec![
            ("a".into(), record(&[("ECG_Rate_Mean", 70.0)])),
            (
                "b".into(),
                record(&[("ECG_Rate_Mean", 72.0), ("HRV_MeanNN", 900.0)]),
            ),
        ]);
        assert_eq!(table.column_names(), ["ECG_Rate_Mean", "HRV_MeanNN"]);
        assert_eq!(table.row("a"), Some(&[Some(70.0), None][..]));
        assert_eq!(table.get("b", "HRV_MeanNN"), Some(900.0));
        assert_eq!(table.get("c", "HRV_MeanNN"), None);
    }
}
