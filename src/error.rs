use thiserror::Error;

/// Why a best-effort stage produced no artifact.
///
/// None of these abort the run; the pipeline logs them and moves on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkipReason {
    #[error("fewer than two numeric columns")]
    TooFewNumericColumns,

    #[error("no pair of numeric columns has a defined correlation")]
    NoComparableCorrelation,

    #[error("no rows left after dropping non-numeric values")]
    NoPlottableRows,

    #[error("fewer than two numeric columns are eligible for clustering")]
    TooFewEligibleColumns,

    #[error("fewer than two columns with a defined variance")]
    TooFewHighVarianceColumns,

    #[error("too few rows to score any cluster count")]
    TooFewRows,

    #[error("numeric failure: {0}")]
    NumericFailure(String),
}

/// Failure of the single narrative round trip.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("failed to read image {path}: {source}")]
    ReadImage {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("request failed: {0}")]
    Transport(String),

    #[error("narrative service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected response format: {0}")]
    MalformedResponse(String),
}
