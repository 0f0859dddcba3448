//! Best-effort k-means partitioning of the informative numeric columns.
//!
//! Pipeline, each step short-circuiting to a [`SkipReason`]:
//! ```text
//!  numeric columns ─► drop id-like ─► top-N by variance ─► sample rows
//!        ─► mean-impute ─► z-score ─► silhouette search over k ─► final fit
//! ```

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

use crate::data::model::{ColumnSelection, Dataset};
use crate::error::SkipReason;
use crate::stats;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Upper bound on the high-variance columns fed to k-means.
    pub max_columns: usize,
    /// Largest cluster count evaluated; the search starts at 2.
    pub max_k: usize,
    /// Datasets with more rows than this are subsampled to exactly this size.
    pub sample_size: usize,
    pub seed: u64,
    /// Case-insensitive substrings marking identifier columns.
    pub excluded_keywords: Vec<String>,
    /// k-means++ restarts per fit; the lowest inertia wins.
    pub n_init: usize,
    pub max_iter: usize,
    pub tolerance: f64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_columns: 10,
            max_k: 5,
            sample_size: 500,
            seed: 42,
            excluded_keywords: vec!["id".to_string()],
            n_init: 4,
            max_iter: 300,
            tolerance: 1e-4,
        }
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    /// High-variance columns used for the fit, most variable first.
    pub columns: ColumnSelection,
    pub k: usize,
    /// Original row indices that were clustered, ascending.
    pub rows: Vec<usize>,
    /// Cluster label of each entry in `rows`.
    pub labels: Vec<usize>,
    /// Silhouette of every scorable k that was evaluated.
    pub scores: Vec<(usize, f64)>,
    /// Imputed, unscaled values of the two axis columns, aligned with `rows`.
    pub points: Vec<(f64, f64)>,
}

impl ClusterAssignment {
    /// The two columns the cluster plot is drawn on.
    pub fn axes(&self) -> (&str, &str) {
        let names = self.columns.names();
        (names[0].as_str(), names[1].as_str())
    }

}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Run the full clustering pass over a dataset.
pub fn build_clusters(
    dataset: &Dataset,
    config: &ClusterConfig,
) -> Result<ClusterAssignment, SkipReason> {
    if dataset.numeric_columns().count() < 2 {
        return Err(SkipReason::TooFewNumericColumns);
    }
    let eligible = eligible_columns(dataset, &config.excluded_keywords);
    if eligible.len() < 2 {
        return Err(SkipReason::TooFewEligibleColumns);
    }
    let selected = high_variance_columns(dataset, &eligible, config.max_columns);
    if selected.len() < 2 {
        return Err(SkipReason::TooFewHighVarianceColumns);
    }

    let rows = sample_rows(dataset.row_count(), config.sample_size, config.seed);
    let mut features: Vec<Vec<f64>> = Vec::with_capacity(selected.len());
    for name in &selected {
        let column = dataset
            .column(name)
            .ok_or_else(|| SkipReason::NumericFailure(format!("column '{name}' vanished")))?;
        let values = column.numeric_values();
        let sampled: Vec<Option<f64>> = rows.iter().map(|&r| values[r]).collect();
        features.push(impute_mean(name, &sampled)?);
    }
    let points: Vec<(f64, f64)> = features[0]
        .iter()
        .copied()
        .zip(features[1].iter().copied())
        .collect();

    let scaled = standardize(&features)?;
    ensure_spread(&scaled)?;
    let (k, scores) = optimal_k(&scaled, config)?;
    log::info!("Optimal number of clusters: {k}");

    let fit = fit_kmeans(&scaled, k, config);
    Ok(ClusterAssignment {
        columns: ColumnSelection::new(selected),
        k,
        rows,
        labels: fit.labels,
        scores,
        points,
    })
}

/// Numeric columns whose name carries none of the identifier keywords.
pub fn eligible_columns(dataset: &Dataset, excluded_keywords: &[String]) -> Vec<String> {
    dataset
        .numeric_columns()
        .filter(|c| {
            let lower = c.name.to_lowercase();
            !excluded_keywords
                .iter()
                .any(|kw| lower.contains(&kw.to_lowercase()))
        })
        .map(|c| c.name.clone())
        .collect()
}

/// At most `max` columns ranked by descending sample variance.  Columns with
/// undefined variance are dropped; ties keep their original order.
pub fn high_variance_columns(dataset: &Dataset, candidates: &[String], max: usize) -> Vec<String> {
    let mut ranked: Vec<(String, f64)> = candidates
        .iter()
        .filter_map(|name| {
            let column = dataset.column(name)?;
            let var = stats::sample_variance(&stats::present(&column.numeric_values()))?;
            var.is_finite().then(|| (name.clone(), var))
        })
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.into_iter().take(max).map(|(name, _)| name).collect()
}

/// Row indices to cluster: all rows, or a seeded uniform sample of exactly
/// `sample_size` when the dataset is larger.
pub fn sample_rows(row_count: usize, sample_size: usize, seed: u64) -> Vec<usize> {
    if row_count <= sample_size {
        return (0..row_count).collect();
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut rows = rand::seq::index::sample(&mut rng, row_count, sample_size).into_vec();
    rows.sort_unstable();
    rows
}

fn impute_mean(name: &str, values: &[Option<f64>]) -> Result<Vec<f64>, SkipReason> {
    let mean = stats::mean(&stats::present(values)).ok_or_else(|| {
        SkipReason::NumericFailure(format!("column '{name}' has no values in the sample"))
    })?;
    Ok(values.iter().map(|v| v.unwrap_or(mean)).collect())
}

/// Column-wise z-scores, returned row-major.  A constant column is only
/// centred.
fn standardize(features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, SkipReason> {
    let n = features.first().map_or(0, Vec::len);
    let mut rows = vec![Vec::with_capacity(features.len()); n];
    for column in features {
        let mean = stats::mean(column).unwrap_or(0.0);
        let std = stats::population_std(column).unwrap_or(0.0);
        let scale = if std > 0.0 { std } else { 1.0 };
        for (row, v) in rows.iter_mut().zip(column) {
            let z = (v - mean) / scale;
            if !z.is_finite() {
                return Err(SkipReason::NumericFailure(
                    "non-finite value after scaling".to_string(),
                ));
            }
            row.push(z);
        }
    }
    Ok(rows)
}

/// Two or more rows that all sit on the same point cannot be split into
/// clusters, whatever k is tried.
fn ensure_spread(rows: &[Vec<f64>]) -> Result<(), SkipReason> {
    match rows.split_first() {
        Some((first, rest)) if !rest.is_empty() && rest.iter().all(|r| r == first) => Err(
            SkipReason::NumericFailure("all sampled rows coincide".to_string()),
        ),
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// k-means
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct KMeansFit {
    pub labels: Vec<usize>,
    pub inertia: f64,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    centroids
        .iter()
        .enumerate()
        .map(|(i, c)| (i, squared_distance(point, c)))
        .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best })
}

/// k-means++ seeding: each next centroid is drawn with probability
/// proportional to its squared distance from the closest chosen one.
fn kmeans_plus_plus(data: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids = vec![data[rng.gen_range(0..data.len())].clone()];
    while centroids.len() < k {
        let weights: Vec<f64> = data.iter().map(|p| nearest(p, &centroids).1).collect();
        let total: f64 = weights.iter().sum();
        let next = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut chosen = data.len() - 1;
            for (i, w) in weights.iter().enumerate() {
                if target < *w {
                    chosen = i;
                    break;
                }
                target -= w;
            }
            chosen
        } else {
            rng.gen_range(0..data.len())
        };
        centroids.push(data[next].clone());
    }
    centroids
}

fn lloyd(data: &[Vec<f64>], mut centroids: Vec<Vec<f64>>, config: &ClusterConfig) -> KMeansFit {
    let dims = data[0].len();
    let mut labels = vec![0; data.len()];
    for _ in 0..config.max_iter.max(1) {
        for (label, point) in labels.iter_mut().zip(data) {
            *label = nearest(point, &centroids).0;
        }
        let mut sums = vec![vec![0.0; dims]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];
        for (point, &label) in data.iter().zip(&labels) {
            counts[label] += 1;
            for (s, v) in sums[label].iter_mut().zip(point) {
                *s += v;
            }
        }
        let mut shift = 0.0;
        for (c, (sum, count)) in centroids.iter_mut().zip(sums.into_iter().zip(counts)) {
            // An empty cluster keeps its previous centroid.
            if count == 0 {
                continue;
            }
            let updated: Vec<f64> = sum.into_iter().map(|s| s / count as f64).collect();
            shift += squared_distance(c, &updated);
            *c = updated;
        }
        if shift <= config.tolerance {
            break;
        }
    }
    let mut inertia = 0.0;
    for (label, point) in labels.iter_mut().zip(data) {
        let (l, d) = nearest(point, &centroids);
        *label = l;
        inertia += d;
    }
    KMeansFit { labels, inertia }
}

/// Seeded k-means with `n_init` k-means++ restarts; `k` is clamped to
/// `1..=data.len()`.
pub fn fit_kmeans(data: &[Vec<f64>], k: usize, config: &ClusterConfig) -> KMeansFit {
    let empty = KMeansFit {
        labels: vec![0; data.len()],
        inertia: 0.0,
    };
    if data.is_empty() || data[0].is_empty() {
        return empty;
    }
    let mut rng = StdRng::seed_from_u64(config.seed);
    let k = k.clamp(1, data.len());
    let mut best: Option<KMeansFit> = None;
    for _ in 0..config.n_init.max(1) {
        let fit = lloyd(data, kmeans_plus_plus(data, k, &mut rng), config);
        if best.as_ref().map_or(true, |b| fit.inertia < b.inertia) {
            best = Some(fit);
        }
    }
    best.unwrap_or(empty)
}

// ---------------------------------------------------------------------------
// Silhouette & optimal k
// ---------------------------------------------------------------------------

/// Mean silhouette over all points, or `None` when the labelling uses fewer
/// than two clusters or puts every point in its own cluster.
///
/// Points alone in their cluster score 0.
pub fn silhouette_score(data: &[Vec<f64>], labels: &[usize]) -> Option<f64> {
    let n = data.len();
    let clusters = labels.iter().copied().max().map_or(0, |m| m + 1);
    let mut sizes = vec![0usize; clusters];
    for &l in labels {
        sizes[l] += 1;
    }
    let used = sizes.iter().filter(|&&s| s > 0).count();
    if used < 2 || used > n.saturating_sub(1) {
        return None;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if sizes[own] <= 1 {
            continue;
        }
        let mut sums = vec![0.0; clusters];
        for j in 0..n {
            if i != j {
                sums[labels[j]] += squared_distance(&data[i], &data[j]).sqrt();
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..clusters)
            .filter(|&c| c != own && sizes[c] > 0)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);
        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }
    Some(total / n as f64)
}

/// Evaluate k = 2..=max_k and keep the best silhouette; ties keep the
/// smaller k.
pub fn optimal_k(
    data: &[Vec<f64>],
    config: &ClusterConfig,
) -> Result<(usize, Vec<(usize, f64)>), SkipReason> {
    let mut scores = Vec::new();
    let mut best: Option<(usize, f64)> = None;
    for k in 2..=config.max_k {
        if k >= data.len() {
            break;
        }
        let fit = fit_kmeans(data, k, config);
        let Some(score) = silhouette_score(data, &fit.labels) else {
            log::debug!("k={k}: labelling not scorable");
            continue;
        };
        log::debug!("k={k}: inertia={:.4} silhouette={score:.4}", fit.inertia);
        scores.push((k, score));
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((k, score));
        }
    }
    best.map(|(k, _)| (k, scores)).ok_or(SkipReason::TooFewRows)
}
