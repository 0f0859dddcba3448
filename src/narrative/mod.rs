//! Narrative stage: gather the charts, ask the vision model for one story per
//! chart in a single round trip, split the reply and assemble the report.

pub mod client;
pub mod report;
pub mod splitter;

use std::io;
use std::path::Path;

use crate::render::{Artifact, ArtifactKind};

/// Every story in the model's reply starts with `### Image <n>`.
pub const MARKER_PREFIX: &str = "### Image";

/// PNG files in `dir`, sorted by file name.
///
/// Files this run rendered keep their kind; any other PNG is `External`.
pub fn collect_artifacts(dir: &Path, rendered: &[Artifact]) -> io::Result<Vec<Artifact>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_png = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("png"));
        if is_png && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(paths
        .into_iter()
        .map(|path| {
            let kind = rendered
                .iter()
                .find(|a| a.path.file_name() == path.file_name())
                .map_or(ArtifactKind::External, |a| a.kind.clone());
            Artifact { path, kind }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_pngs_in_lexical_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["z_plot.png", "a_plot.PNG", "notes.txt", "m_plot.png"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let rendered = [Artifact {
            path: dir.path().join("m_plot.png"),
            kind: ArtifactKind::CorrelationHeatmap,
        }];
        let artifacts = collect_artifacts(dir.path(), &rendered).unwrap();
        let names: Vec<_> = artifacts.iter().map(Artifact::file_name).collect();
        assert_eq!(names, vec!["a_plot.PNG", "m_plot.png", "z_plot.png"]);
        assert_eq!(artifacts[0].kind, ArtifactKind::External);
        assert_eq!(artifacts[1].kind, ArtifactKind::CorrelationHeatmap);
    }

    #[test]
    fn empty_directory_is_not_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(collect_artifacts(dir.path(), &[]).unwrap().is_empty());
    }
}
