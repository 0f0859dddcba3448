use std::fmt;

use anyhow::{bail, Result};
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// CellValue – a single cell of the table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the common dataframe dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CellValue::Text(s) => serializer.serialize_str(s),
            CellValue::Integer(i) => serializer.serialize_i64(*i),
            CellValue::Float(v) if v.is_finite() => serializer.serialize_f64(*v),
            CellValue::Bool(b) => serializer.serialize_bool(*b),
            CellValue::Float(_) | CellValue::Null => serializer.serialize_none(),
        }
    }
}

impl CellValue {
    /// Interpret the value as an `f64`, coercing numeric-looking text.
    ///
    /// Non-finite floats count as missing.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if v.is_finite() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            CellValue::Null => true,
            CellValue::Float(v) => v.is_nan(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Column – one named, typed column
// ---------------------------------------------------------------------------

/// The inferred storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    /// Infer the kind from the non-null cells of a column.
    ///
    /// An all-null column is `Float`, the same way an empty dataframe column
    /// ends up as NaN floats.
    pub fn infer(values: &[CellValue]) -> Self {
        let mut saw_int = false;
        let mut saw_float = false;
        let mut saw_bool = false;
        for v in values {
            match v {
                CellValue::Null => {}
                CellValue::Integer(_) => saw_int = true,
                CellValue::Float(_) => saw_float = true,
                CellValue::Bool(_) => saw_bool = true,
                CellValue::Text(_) => return ColumnKind::Text,
            }
        }
        match (saw_int, saw_float, saw_bool) {
            (_, _, true) if saw_int || saw_float => ColumnKind::Text,
            (false, false, true) => ColumnKind::Bool,
            (true, false, false) => ColumnKind::Integer,
            _ => ColumnKind::Float,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Float)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<CellValue>,
}

impl Column {
    /// Build a column, inferring its kind from the values.
    pub fn new(name: impl Into<String>, values: Vec<CellValue>) -> Self {
        let kind = ColumnKind::infer(&values);
        Column {
            name: name.into(),
            kind,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Numeric projection of the column; cells that fail coercion are `None`.
    pub fn numeric_values(&self) -> Vec<Option<f64>> {
        self.values.iter().map(CellValue::as_f64).collect()
    }

    /// Dataframe-style dtype label used in the profile.
    pub fn dtype(&self) -> &'static str {
        let has_nulls = self.null_count() > 0;
        match self.kind {
            ColumnKind::Integer if !has_nulls => "int64",
            ColumnKind::Integer | ColumnKind::Float => "float64",
            ColumnKind::Bool if !has_nulls => "bool",
            ColumnKind::Bool | ColumnKind::Text => "object",
        }
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// A non-empty, rectangular, column-major table.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// Build a dataset, rejecting empty or ragged input.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let Some(first) = columns.first() else {
            bail!("dataset has no columns");
        };
        let rows = first.len();
        if rows == 0 {
            bail!("dataset has no rows");
        }
        if let Some(bad) = columns.iter().find(|c| c.len() != rows) {
            bail!(
                "column '{}' has {} values but the dataset has {} rows",
                bad.name,
                bad.len(),
                rows
            );
        }
        Ok(Dataset { columns })
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    /// Numeric columns in their original order.
    pub fn numeric_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.kind.is_numeric())
    }
}

// ---------------------------------------------------------------------------
// ColumnSelection – an ordered, immutable choice of columns
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection(Vec<String>);

impl ColumnSelection {
    pub fn new(names: Vec<String>) -> Self {
        ColumnSelection(names)
    }

    pub fn pair(x: impl Into<String>, y: impl Into<String>) -> Self {
        ColumnSelection(vec![x.into(), y.into()])
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn second(&self) -> Option<&str> {
        self.0.get(1).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[i64]) -> Vec<CellValue> {
        values.iter().map(|&i| CellValue::Integer(i)).collect()
    }

    #[test]
    fn kind_inference_follows_dataframe_conventions() {
        assert_eq!(ColumnKind::infer(&ints(&[1, 2])), ColumnKind::Integer);
        assert_eq!(
            ColumnKind::infer(&[CellValue::Integer(1), CellValue::Float(2.5)]),
            ColumnKind::Float
        );
        assert_eq!(
            ColumnKind::infer(&[CellValue::Bool(true), CellValue::Null]),
            ColumnKind::Bool
        );
        assert_eq!(
            ColumnKind::infer(&[CellValue::Integer(1), CellValue::Text("x".into())]),
            ColumnKind::Text
        );
        assert_eq!(
            ColumnKind::infer(&[CellValue::Null, CellValue::Null]),
            ColumnKind::Float
        );
    }

    #[test]
    fn integer_column_with_nulls_reports_float_dtype() {
        let col = Column::new("n", vec![CellValue::Integer(1), CellValue::Null]);
        assert_eq!(col.kind, ColumnKind::Integer);
        assert_eq!(col.dtype(), "float64");
        assert_eq!(Column::new("n", ints(&[1, 2])).dtype(), "int64");
    }

    #[test]
    fn text_coerces_to_numbers_where_possible() {
        let col = Column::new(
            "mixed",
            vec![
                CellValue::Text("3.5".into()),
                CellValue::Text("abc".into()),
                CellValue::Integer(2),
            ],
        );
        assert_eq!(col.numeric_values(), vec![Some(3.5), None, Some(2.0)]);
    }

    #[test]
    fn dataset_rejects_empty_and_ragged_tables() {
        assert!(Dataset::new(vec![]).is_err());
        assert!(Dataset::new(vec![Column::new("a", vec![])]).is_err());
        let ragged = vec![Column::new("a", ints(&[1, 2])), Column::new("b", ints(&[1]))];
        assert!(Dataset::new(ragged).is_err());
    }
}
