//! Splits the model's single combined reply into one story per image.
//!
//! ```text
//!            marker(n)                      marker(m)
//!  NoActiveStory ───────► InStory(n) ─────────────────► InStory(m)
//!       │ other line          │ other line                  │ end of input
//!       ▼                     ▼                             ▼
//!    dropped           appended to n's body           m's story closed
//! ```

use std::collections::BTreeMap;

use super::MARKER_PREFIX;

#[derive(Debug)]
enum State {
    NoActiveStory,
    InStory { ordinal: usize, body: Vec<String> },
}

/// Ordinal of a marker line (`### Image <n>`, n ≥ 1), ignoring surrounding
/// whitespace.
pub fn parse_marker(line: &str) -> Option<usize> {
    let rest = line.trim().strip_prefix(MARKER_PREFIX)?;
    let digits = rest.strip_prefix(' ')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse::<usize>().ok().filter(|&n| n >= 1)
}

/// Map each 1-based image ordinal to its story.
///
/// Text before the first marker is dropped.  Ordinals outside
/// `1..=artifact_count` are ignored.  When an ordinal repeats, the first
/// story is kept.  Stories are trimmed of leading and trailing blank lines,
/// and empty ones are not recorded.
pub fn split_narratives(raw: &str, artifact_count: usize) -> BTreeMap<usize, String> {
    let mut stories = BTreeMap::new();
    let mut state = State::NoActiveStory;

    for line in raw.lines() {
        if let Some(ordinal) = parse_marker(line) {
            let previous = std::mem::replace(
                &mut state,
                State::InStory {
                    ordinal,
                    body: Vec::new(),
                },
            );
            close(previous, artifact_count, &mut stories);
            continue;
        }
        if let State::InStory { body, .. } = &mut state {
            body.push(line.to_string());
        }
    }
    close(state, artifact_count, &mut stories);
    stories
}

fn close(state: State, artifact_count: usize, stories: &mut BTreeMap<usize, String>) {
    let State::InStory { ordinal, body } = state else {
        return;
    };
    if ordinal > artifact_count {
        log::warn!("story labelled image {ordinal} but only {artifact_count} images were sent");
        return;
    }
    if stories.contains_key(&ordinal) {
        log::warn!("duplicate story for image {ordinal}; keeping the first");
        return;
    }
    let start = body.iter().position(|l| !l.trim().is_empty());
    let end = body.iter().rposition(|l| !l.trim().is_empty());
    if let (Some(start), Some(end)) = (start, end) {
        stories.insert(ordinal, body[start..=end].join("\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_consecutive_stories() {
        let stories = split_narratives("### Image 1\nfoo\n### Image 2\nbar\n", 2);
        assert_eq!(stories.len(), 2);
        assert_eq!(stories[&1], "foo");
        assert_eq!(stories[&2], "bar");
    }

    #[test]
    fn preamble_is_dropped_and_blank_edges_trimmed() {
        let raw = "Here are your stories:\n\n### Image 1\n\n  first line\nsecond\n\n";
        let stories = split_narratives(raw, 1);
        assert_eq!(stories[&1], "  first line\nsecond");
    }

    #[test]
    fn missing_ordinals_are_simply_absent() {
        let stories = split_narratives("### Image 2\nonly two\n", 2);
        assert!(!stories.contains_key(&1));
        assert_eq!(stories[&2], "only two");
    }

    #[test]
    fn out_of_range_duplicate_and_empty_stories_are_ignored() {
        let raw = "### Image 1\nfirst\n### Image 3\nextra\n### Image 1\nagain\n### Image 2\n\n";
        let stories = split_narratives(raw, 2);
        assert_eq!(stories.len(), 1);
        assert_eq!(stories[&1], "first");
    }

    #[test]
    fn marker_lines_must_match_exactly() {
        assert_eq!(parse_marker("### Image 4"), Some(4));
        assert_eq!(parse_marker("  ### Image 12  "), Some(12));
        assert_eq!(parse_marker("### Image 0"), None);
        assert_eq!(parse_marker("### Image 1: Heatmap"), None);
        assert_eq!(parse_marker("## Image 1"), None);
        assert_eq!(parse_marker("### Image"), None);
        // A non-marker heading stays inside the story body.
        let stories = split_narratives("### Image 1\n#### Trends\ntext", 1);
        assert_eq!(stories[&1], "#### Trends\ntext");
    }
}
