//! Dataset profiling: the compact summary every later stage reads and the
//! narrative prompt embeds.

use serde::Serialize;

use crate::data::model::{CellValue, Dataset};
use crate::stats;

/// Rows included in the profile sample.
pub const SAMPLE_ROWS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    /// `(rows, columns)`.
    pub shape: (usize, usize),
    pub null_values: Vec<NamedCount>,
    pub dtypes: Vec<NamedType>,
    pub numerical_summary: Vec<NumericSummary>,
    pub headers: Vec<String>,
    pub sample_data: Vec<SampleColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedCount {
    pub column: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NamedType {
    pub column: String,
    pub dtype: &'static str,
}

/// Descriptive statistics of one numeric column.  Undefined values are `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleColumn {
    pub column: String,
    pub values: Vec<CellValue>,
}

/// Summarise a dataset.  Pure; columns that are not numeric simply have no
/// entry in `numerical_summary`.
pub fn profile_dataset(dataset: &Dataset) -> Profile {
    let columns = dataset.columns();
    let sample_len = dataset.row_count().min(SAMPLE_ROWS);

    Profile {
        shape: (dataset.row_count(), dataset.column_count()),
        null_values: columns
            .iter()
            .map(|c| NamedCount {
                column: c.name.clone(),
                count: c.null_count(),
            })
            .collect(),
        dtypes: columns
            .iter()
            .map(|c| NamedType {
                column: c.name.clone(),
                dtype: c.dtype(),
            })
            .collect(),
        numerical_summary: dataset
            .numeric_columns()
            .map(|c| summarize(&c.name, &c.numeric_values()))
            .collect(),
        headers: dataset.column_names(),
        sample_data: columns
            .iter()
            .map(|c| SampleColumn {
                column: c.name.clone(),
                values: c.values[..sample_len].to_vec(),
            })
            .collect(),
    }
}

fn summarize(name: &str, values: &[Option<f64>]) -> NumericSummary {
    let mut sorted = stats::present(values);
    sorted.sort_by(f64::total_cmp);
    NumericSummary {
        column: name.to_string(),
        count: sorted.len(),
        mean: stats::mean(&sorted),
        std: stats::sample_variance(&sorted).map(f64::sqrt),
        min: sorted.first().copied(),
        q25: stats::quantile_sorted(&sorted, 0.25),
        q50: stats::quantile_sorted(&sorted, 0.5),
        q75: stats::quantile_sorted(&sorted, 0.75),
        max: sorted.last().copied(),
    }
}

impl Profile {
    /// `{"headers": [...]}` – the column context handed to the narrative model.
    pub fn headers_json(&self) -> String {
        serde_json::json!({ "headers": self.headers }).to_string()
    }

    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Numeric column with the highest mean; the first one wins ties.
    pub fn highest_mean_column(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for s in &self.numerical_summary {
            if let Some(m) = s.mean {
                if best.map_or(true, |(_, b)| m > b) {
                    best = Some((s.column.as_str(), m));
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Column::new(
                "a",
                vec![
                    CellValue::Integer(1),
                    CellValue::Integer(2),
                    CellValue::Integer(3),
                    CellValue::Integer(4),
                ],
            ),
            Column::new(
                "b",
                vec![
                    CellValue::Float(10.0),
                    CellValue::Null,
                    CellValue::Float(30.0),
                    CellValue::Float(20.0),
                ],
            ),
            Column::new(
                "label",
                vec![
                    CellValue::Text("x".into()),
                    CellValue::Text("y".into()),
                    CellValue::Null,
                    CellValue::Text("z".into()),
                ],
            ),
        ])
        .expect("dataset")
    }

    #[test]
    fn profile_captures_shape_nulls_and_types() {
        let p = profile_dataset(&dataset());
        assert_eq!(p.shape, (4, 3));
        assert_eq!(p.null_values[1].count, 1);
        let dtypes: Vec<_> = p.dtypes.iter().map(|d| d.dtype).collect();
        assert_eq!(dtypes, vec!["int64", "float64", "object"]);
        assert_eq!(p.sample_data[0].values.len(), SAMPLE_ROWS);
    }

    #[test]
    fn numeric_summary_skips_nulls() {
        let p = profile_dataset(&dataset());
        assert_eq!(p.numerical_summary.len(), 2);
        let b = &p.numerical_summary[1];
        assert_eq!(b.count, 3);
        assert_eq!(b.mean, Some(20.0));
        assert_eq!(b.std, Some(10.0));
        assert_eq!(b.q50, Some(20.0));
        assert_eq!(b.min, Some(10.0));
        assert_eq!(b.max, Some(30.0));
    }

    #[test]
    fn profiling_twice_is_byte_identical() {
        let ds = dataset();
        let first = profile_dataset(&ds).to_pretty_json().expect("json");
        let second = profile_dataset(&ds).to_pretty_json().expect("json");
        assert_eq!(first, second);
    }

    #[test]
    fn highest_mean_and_headers_context() {
        let p = profile_dataset(&dataset());
        assert_eq!(p.highest_mean_column(), Some(("b", 20.0)));
        assert_eq!(p.headers_json(), r#"{"headers":["a","b","label"]}"#);
    }
}
