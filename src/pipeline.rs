//! Stage orchestration.  Each stage reads the dataset, decides on its own
//! whether it has anything to draw, and never blocks the stages after it.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::cluster::{self, ClusterAssignment};
use crate::config::AnalysisConfig;
use crate::correlation;
use crate::data::model::Dataset;
use crate::error::SkipReason;
use crate::narrative::client::NarrativeService;
use crate::narrative::report::compose_report;
use crate::narrative::{collect_artifacts, splitter};
use crate::profile::{profile_dataset, Profile};
use crate::render::{Artifact, RenderRequest, Renderer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    CorrelatedPair,
    Heatmap,
    Clusters,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::CorrelatedPair => write!(f, "scatterplot"),
            Stage::Heatmap => write!(f, "correlation heatmap"),
            Stage::Clusters => write!(f, "clustering"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum NarrativeOutcome {
    /// No charts were found, so nothing was sent.
    NoArtifacts,
    Failed(String),
    Received { stories: usize },
}

#[derive(Debug)]
pub struct RunSummary {
    pub profile: Profile,
    /// Charts drawn by this run.
    pub rendered: Vec<Artifact>,
    /// Charts described in the report, in report order.
    pub artifacts: Vec<Artifact>,
    pub skipped: Vec<(Stage, SkipReason)>,
    pub clusters: Option<ClusterAssignment>,
    pub narrative: NarrativeOutcome,
    pub report_path: PathBuf,
}

/// Run every stage over `dataset`, writing charts and `README.md` to `out_dir`.
///
/// Only I/O on the output directory is fatal; every analysis stage degrades
/// to "no chart" and the narrative stage to "no stories".
pub fn run(
    dataset: &Dataset,
    config: &AnalysisConfig,
    out_dir: &Path,
    renderer: &dyn Renderer,
    narrator: &dyn NarrativeService,
) -> Result<RunSummary> {
    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    let profile = profile_dataset(dataset);
    log::debug!(
        "Profile: {}",
        profile.to_pretty_json().unwrap_or_default()
    );

    let mut rendered = Vec::new();
    let mut skipped = Vec::new();
    let mut note_skip = |stage: Stage, reason: SkipReason| {
        log::warn!("Skipping {stage}: {reason}");
        skipped.push((stage, reason));
    };

    match scatter_stage(dataset, out_dir, renderer) {
        Ok(Some(artifact)) => rendered.push(artifact),
        Ok(None) => {}
        Err(reason) => note_skip(Stage::CorrelatedPair, reason),
    }

    let matrix = correlation::correlation_matrix(dataset);
    match &matrix {
        Some(matrix) => {
            if let Some(artifact) = draw(renderer, &RenderRequest::Heatmap { matrix }, out_dir) {
                rendered.push(artifact);
            }
        }
        None => note_skip(Stage::Heatmap, SkipReason::TooFewNumericColumns),
    }

    let clusters = match cluster::build_clusters(dataset, &config.cluster) {
        Ok(assignment) => {
            let (x, y) = assignment.axes();
            let request = RenderRequest::Clusters {
                x,
                y,
                k: assignment.k,
                points: &assignment.points,
                labels: &assignment.labels,
            };
            if let Some(artifact) = draw(renderer, &request, out_dir) {
                rendered.push(artifact);
            }
            Some(assignment)
        }
        Err(reason) => {
            note_skip(Stage::Clusters, reason);
            None
        }
    };

    let fact = matrix.as_ref().and_then(correlation::strongest_relationship);
    let artifacts = collect_artifacts(out_dir, &rendered)
        .with_context(|| format!("listing charts in {}", out_dir.display()))?;
    let (stories, narrative) = narrate(&artifacts, &profile, narrator);

    let report = compose_report(&artifacts, &stories, dataset, &profile, fact.as_ref());
    let report_path = report
        .write_to(out_dir)
        .with_context(|| format!("writing report to {}", out_dir.display()))?;

    Ok(RunSummary {
        profile,
        rendered,
        artifacts,
        skipped,
        clusters,
        narrative,
        report_path,
    })
}

fn scatter_stage(
    dataset: &Dataset,
    out_dir: &Path,
    renderer: &dyn Renderer,
) -> Result<Option<Artifact>, SkipReason> {
    let selection = correlation::select_correlated_pair(dataset)?;
    let points = correlation::clean_for_plot(dataset, &selection)?;
    let (Some(x), Some(y)) = (selection.first(), selection.second()) else {
        return Err(SkipReason::NoComparableCorrelation);
    };
    log::info!("Most correlated pair: {x} / {y} ({} points)", points.len());
    Ok(draw(
        renderer,
        &RenderRequest::Scatter {
            x,
            y,
            points: &points,
        },
        out_dir,
    ))
}

/// Render failures lose one chart, never the run.
fn draw(renderer: &dyn Renderer, request: &RenderRequest<'_>, out_dir: &Path) -> Option<Artifact> {
    match renderer.render(request, out_dir) {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            log::error!("Failed to render chart: {e:#}");
            None
        }
    }
}

fn narrate(
    artifacts: &[Artifact],
    profile: &Profile,
    narrator: &dyn NarrativeService,
) -> (BTreeMap<usize, String>, NarrativeOutcome) {
    if artifacts.is_empty() {
        log::warn!("No PNG images found; the report will only contain data insights");
        return (BTreeMap::new(), NarrativeOutcome::NoArtifacts);
    }
    match narrator.request_narratives(artifacts, &profile.headers_json()) {
        Ok(raw) => {
            let stories = splitter::split_narratives(&raw, artifacts.len());
            if stories.len() < artifacts.len() {
                log::warn!(
                    "Received {} of {} stories; the rest use a placeholder",
                    stories.len(),
                    artifacts.len()
                );
            }
            let count = stories.len();
            (stories, NarrativeOutcome::Received { stories: count })
        }
        Err(e) => {
            log::error!("Failed to generate stories for the images: {e}");
            (BTreeMap::new(), NarrativeOutcome::Failed(e.to_string()))
        }
    }
}
