use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::correlation::{CorrelationFact, CorrelationStrength};
use crate::data::model::Dataset;
use crate::profile::Profile;
use crate::render::Artifact;

pub const REPORT_FILE: &str = "README.md";
pub const PLACEHOLDER_STORY: &str = "No story available for this image.";

/// Above this many rows the dataset counts as large.
pub const LARGE_ROW_COUNT: usize = 1000;
/// Above this many columns the dataset counts as wide.
pub const WIDE_COLUMN_COUNT: usize = 20;

pub const MANY_ROWS_REMARK: &str = "The dataset has more than 1000 rows. It is good for analysis \
     but it may not be suitable for training models, so choose wisely.";
pub const FEW_ROWS_REMARK: &str = "The dataset has 1000 rows or fewer, so it is limited for \
     large-scale analysis.";
pub const MANY_COLUMNS_REMARK: &str = "The dataset has more than 20 columns. It is good for \
     analysis but make sure to use feature selection or dimensionality reduction techniques if \
     necessary.";
pub const FEW_COLUMNS_REMARK: &str = "The dataset has 20 columns or fewer, so it may be fine to \
     use all the columns if the number of rows is also modest.";

#[derive(Debug, Clone, PartialEq)]
pub struct ReportSection {
    pub heading: String,
    /// What the chart shows; used as the image's alt text.
    pub caption: String,
    pub image: String,
    pub story: String,
}

/// The final document: one section per chart, then the rule-based insights.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub sections: Vec<ReportSection>,
    pub insights: Vec<String>,
}

pub fn compose_report(
    artifacts: &[Artifact],
    stories: &BTreeMap<usize, String>,
    dataset: &Dataset,
    profile: &Profile,
    fact: Option<&CorrelationFact>,
) -> Report {
    let sections = artifacts
        .iter()
        .enumerate()
        .map(|(idx, artifact)| ReportSection {
            heading: artifact.stem(),
            caption: artifact.kind.to_string(),
            image: artifact.file_name(),
            story: stories
                .get(&(idx + 1))
                .cloned()
                .unwrap_or_else(|| PLACEHOLDER_STORY.to_string()),
        })
        .collect();

    Report {
        sections,
        insights: insights(dataset, profile, fact),
    }
}

fn insights(dataset: &Dataset, profile: &Profile, fact: Option<&CorrelationFact>) -> Vec<String> {
    let mut out = Vec::new();

    match profile.highest_mean_column() {
        Some((column, _)) => out.push(format!(
            "The column '{column}' has the highest average value among numerical features."
        )),
        None => log::warn!("no numeric column with a defined mean; skipping average insight"),
    }

    match fact {
        Some(fact) => {
            out.push(format!(
                "The highest correlation is between '{}' and '{}' with a value of {:.2}.",
                fact.x, fact.y, fact.value
            ));
            out.push(strength_remark(fact));
        }
        None => log::warn!("no defined correlation; skipping correlation insight"),
    }

    out.push(rows_remark(dataset.row_count()).to_string());
    out.push(columns_remark(dataset.column_count()).to_string());
    out
}

fn strength_remark(fact: &CorrelationFact) -> String {
    let (x, y) = (&fact.x, &fact.y);
    match fact.strength() {
        CorrelationStrength::StrongPositive => format!(
            "This indicates a strong positive correlation between the features '{x}' and '{y}'. \
             Growth of one feature is often associated with the growth of the other feature."
        ),
        CorrelationStrength::StrongNegative => format!(
            "This indicates a strong negative correlation between the features '{x}' and '{y}'. \
             Growth of one feature is often associated with the decline of the other feature."
        ),
        CorrelationStrength::Weak => format!(
            "This indicates a weak correlation between the features '{x}' and '{y}'. \
             They are correlated but not strongly."
        ),
    }
}

pub fn rows_remark(rows: usize) -> &'static str {
    if rows > LARGE_ROW_COUNT {
        MANY_ROWS_REMARK
    } else {
        FEW_ROWS_REMARK
    }
}

pub fn columns_remark(columns: usize) -> &'static str {
    if columns > WIDE_COLUMN_COUNT {
        MANY_COLUMNS_REMARK
    } else {
        FEW_COLUMNS_REMARK
    }
}

impl Report {
    pub fn to_markdown(&self) -> String {
        let mut md = String::from("# Image Narratives\n\n");
        for s in &self.sections {
            let _ = write!(
                md,
                "## {}\n\n![{}](./{})\n\n{}\n\n",
                s.heading, s.caption, s.image, s.story
            );
        }
        md.push_str("\n## Some more key insights from the data:\n\n");
        for insight in &self.insights {
            let _ = write!(md, "- {insight}\n\n");
        }
        md
    }

    /// Write `README.md` into `dir`, returning its path.
    pub fn write_to(&self, dir: &Path) -> std::io::Result<PathBuf> {
        let path = dir.join(REPORT_FILE);
        std::fs::write(&path, self.to_markdown())?;
        log::info!("README.md created at {}", path.display());
        Ok(path)
    }
}
