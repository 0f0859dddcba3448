//! Pairwise Pearson correlation over the numeric columns, and the choices
//! derived from it: which pair to scatter, and which relationship the report
//! calls the strongest.

use std::fmt;

use crate::data::model::{ColumnSelection, Dataset};
use crate::error::SkipReason;

/// |r| above this is a strong relationship.
pub const STRONG_CORRELATION: f64 = 0.7;

// ---------------------------------------------------------------------------
// CorrelationMatrix
// ---------------------------------------------------------------------------

/// Square, symmetric matrix over the numeric columns.  Undefined cells are NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn size(&self) -> usize {
        self.columns.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    /// Strictly-upper-triangle cells `(i, j, r)` in row-major order.
    /// Every unordered pair appears once and the diagonal never does.
    pub fn upper_triangle(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        let n = self.size();
        (0..n).flat_map(move |i| (i + 1..n).map(move |j| (i, j, self.values[i][j])))
    }

    /// Defined upper-triangle cell with the largest |r|; the first one wins ties.
    fn strongest_cell(&self) -> Option<(usize, usize, f64)> {
        let mut best: Option<(usize, usize, f64)> = None;
        for (i, j, r) in self.upper_triangle() {
            if r.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, _, b)| r.abs() > b.abs()) {
                best = Some((i, j, r));
            }
        }
        best
    }
}

/// Pearson correlation over the rows where both values are present.
fn pearson(xs: &[Option<f64>], ys: &[Option<f64>]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return f64::NAN;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let (dx, dy) = (x - mx, y - my);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

/// Correlation matrix of the numeric columns, or `None` with fewer than two.
pub fn correlation_matrix(dataset: &Dataset) -> Option<CorrelationMatrix> {
    let numeric: Vec<_> = dataset.numeric_columns().collect();
    if numeric.len() < 2 {
        return None;
    }
    let projected: Vec<Vec<Option<f64>>> = numeric.iter().map(|c| c.numeric_values()).collect();
    let n = numeric.len();
    let mut values = vec![vec![f64::NAN; n]; n];
    for i in 0..n {
        for j in i..n {
            let r = pearson(&projected[i], &projected[j]);
            values[i][j] = r;
            values[j][i] = r;
        }
    }
    Some(CorrelationMatrix {
        columns: numeric.iter().map(|c| c.name.clone()).collect(),
        values,
    })
}

/// Pick the two distinct numeric columns with the strongest correlation.
pub fn select_correlated_pair(dataset: &Dataset) -> Result<ColumnSelection, SkipReason> {
    let matrix = correlation_matrix(dataset).ok_or(SkipReason::TooFewNumericColumns)?;
    let (i, j, _) = matrix
        .strongest_cell()
        .ok_or(SkipReason::NoComparableCorrelation)?;
    Ok(ColumnSelection::pair(
        matrix.columns[i].clone(),
        matrix.columns[j].clone(),
    ))
}

/// Numeric `(x, y)` points for the selected pair, dropping rows where either
/// value is missing or not a number.
pub fn clean_for_plot(
    dataset: &Dataset,
    selection: &ColumnSelection,
) -> Result<Vec<(f64, f64)>, SkipReason> {
    let (Some(x), Some(y)) = (selection.first(), selection.second()) else {
        return Err(SkipReason::NoPlottableRows);
    };
    let (Some(xc), Some(yc)) = (dataset.column(x), dataset.column(y)) else {
        return Err(SkipReason::NoPlottableRows);
    };
    let points: Vec<(f64, f64)> = xc
        .numeric_values()
        .into_iter()
        .zip(yc.numeric_values())
        .filter_map(|(x, y)| Some((x?, y?)))
        .collect();
    if points.is_empty() {
        return Err(SkipReason::NoPlottableRows);
    }
    Ok(points)
}

// ---------------------------------------------------------------------------
// Strongest relationship, for the report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationStrength {
    StrongPositive,
    StrongNegative,
    Weak,
}

impl CorrelationStrength {
    pub fn classify(r: f64) -> Self {
        if r > STRONG_CORRELATION {
            CorrelationStrength::StrongPositive
        } else if r < -STRONG_CORRELATION {
            CorrelationStrength::StrongNegative
        } else {
            CorrelationStrength::Weak
        }
    }
}

impl fmt::Display for CorrelationStrength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationStrength::StrongPositive => write!(f, "strong positive"),
            CorrelationStrength::StrongNegative => write!(f, "strong negative"),
            CorrelationStrength::Weak => write!(f, "weak"),
        }
    }
}

/// The most strongly related pair of distinct columns, with its signed r.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationFact {
    pub x: String,
    pub y: String,
    pub value: f64,
}

impl CorrelationFact {
    pub fn strength(&self) -> CorrelationStrength {
        CorrelationStrength::classify(self.value)
    }
}

pub fn strongest_relationship(matrix: &CorrelationMatrix) -> Option<CorrelationFact> {
    let (i, j, r) = matrix.strongest_cell()?;
    Some(CorrelationFact {
        x: matrix.columns[i].clone(),
        y: matrix.columns[j].clone(),
        value: r,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{CellValue, Column};

    fn floats(name: &str, values: &[f64]) -> Column {
        Column::new(name, values.iter().map(|&v| CellValue::Float(v)).collect())
    }

    #[test]
    fn fewer_than_two_numeric_columns_is_not_applicable() {
        let ds = Dataset::new(vec![
            floats("a", &[1.0, 2.0]),
            Column::new(
                "t",
                vec![CellValue::Text("x".into()), CellValue::Text("y".into())],
            ),
        ])
        .unwrap();
        assert!(correlation_matrix(&ds).is_none());
        assert_eq!(
            select_correlated_pair(&ds),
            Err(SkipReason::TooFewNumericColumns)
        );
    }

    #[test]
    fn picks_strongest_magnitude_pair_never_a_self_pair() {
        let ds = Dataset::new(vec![
            floats("a", &[1.0, 2.0, 3.0, 4.0, 5.0]),
            floats("b", &[2.0, 1.0, 4.0, 3.0, 5.0]),
            floats("c", &[10.0, 8.0, 6.0, 4.0, 2.0]),
        ])
        .unwrap();
        let pair = select_correlated_pair(&ds).unwrap();
        assert_eq!(pair.names(), ["a", "c"]);

        let fact = strongest_relationship(&correlation_matrix(&ds).unwrap()).unwrap();
        assert_eq!((fact.x.as_str(), fact.y.as_str()), ("a", "c"));
        assert!((fact.value + 1.0).abs() < 1e-12);
        assert_eq!(fact.strength(), CorrelationStrength::StrongNegative);
    }

    #[test]
    fn ties_go_to_the_first_pair_in_row_major_order() {
        let ds = Dataset::new(vec![
            floats("a", &[1.0, 2.0, 3.0]),
            floats("b", &[1.0, 2.0, 3.0]),
            floats("c", &[1.0, 2.0, 3.0]),
        ])
        .unwrap();
        assert_eq!(select_correlated_pair(&ds).unwrap().names(), ["a", "b"]);
    }

    #[test]
    fn constant_columns_have_no_comparable_correlation() {
        let ds = Dataset::new(vec![floats("a", &[1.0, 1.0]), floats("b", &[2.0, 2.0])]).unwrap();
        assert_eq!(
            select_correlated_pair(&ds),
            Err(SkipReason::NoComparableCorrelation)
        );
        assert!(strongest_relationship(&correlation_matrix(&ds).unwrap()).is_none());
    }

    #[test]
    fn two_rows_two_columns_still_yield_a_pair() {
        let ds = Dataset::new(vec![floats("a", &[1.0, 2.0]), floats("b", &[5.0, 3.0])]).unwrap();
        let pair = select_correlated_pair(&ds).unwrap();
        assert_eq!(pair.names(), ["a", "b"]);
        assert_eq!(clean_for_plot(&ds, &pair).unwrap().len(), 2);
    }

    #[test]
    fn cleaning_drops_rows_missing_either_value() {
        let ds = Dataset::new(vec![
            Column::new(
                "a",
                vec![CellValue::Float(1.0), CellValue::Null, CellValue::Float(3.0)],
            ),
            floats("b", &[4.0, 5.0, 6.0]),
        ])
        .unwrap();
        let points = clean_for_plot(&ds, &ColumnSelection::pair("a", "b")).unwrap();
        assert_eq!(points, vec![(1.0, 4.0), (3.0, 6.0)]);

        let empty = Dataset::new(vec![
            Column::new("a", vec![CellValue::Null]),
            floats("b", &[1.0]),
        ])
        .unwrap();
        assert_eq!(
            clean_for_plot(&empty, &ColumnSelection::pair("a", "b")),
            Err(SkipReason::NoPlottableRows)
        );
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(CorrelationStrength::classify(0.71), CorrelationStrength::StrongPositive);
        assert_eq!(CorrelationStrength::classify(0.7), CorrelationStrength::Weak);
        assert_eq!(CorrelationStrength::classify(-0.8), CorrelationStrength::StrongNegative);
    }
}
