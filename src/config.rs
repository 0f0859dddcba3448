use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cluster::ClusterConfig;
use crate::narrative::client::NarrativeConfig;
use crate::render::RenderConfig;

/// Tunables for a run.  Every field has a default, so a config file only
/// needs the values it changes:
///
/// ```json
/// { "cluster": { "max_k": 8 }, "narrative": { "model": "gpt-4o" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub cluster: ClusterConfig,
    pub render: RenderConfig,
    pub narrative: NarrativeConfig,
}

impl AnalysisConfig {
    pub fn from_json_str(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("parsing analysis config")
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let config = AnalysisConfig::default();
        assert_eq!(config.cluster.max_columns, 10);
        assert_eq!(config.cluster.max_k, 5);
        assert_eq!(config.cluster.sample_size, 500);
        assert_eq!(config.narrative.model, "gpt-4o-mini");
        assert_eq!(config.narrative.min_words, 250);
    }

    #[test]
    fn partial_files_keep_other_defaults() {
        let config =
            AnalysisConfig::from_json_str(r#"{ "cluster": { "max_k": 8 }, "render": { "width": 300 } }"#)
                .unwrap();
        assert_eq!(config.cluster.max_k, 8);
        assert_eq!(config.cluster.sample_size, 500);
        assert_eq!(config.render.width, 300);
        assert_eq!(config.render.height, 600);
        assert_eq!(config.narrative, NarrativeConfig::default());
    }

    #[test]
    fn malformed_config_is_an_error() {
        assert!(AnalysisConfig::from_json_str(r#"{ "cluster": { "max_k": "many" } }"#).is_err());
    }
}
