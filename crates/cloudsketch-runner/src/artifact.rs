use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use glob::Pattern;
use ignore::WalkBuilder;
use serde::Serialize;

/// A PNG picked up after a script ran.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiagramArtifact {
    pub path: PathBuf,
    pub modified: DateTime<Local>,
    pub priority: u8,
}

pub const EXPECTED_PRIORITY: u8 = 3;
pub const HINT_PRIORITY: u8 = 2;
pub const NAME_PRIORITY: u8 = 1;

const MAX_DEPTH: usize = 3;

/// What to look for: files newer than `modified_after`, ranked by the first
/// pattern they match, newest first within a rank.
#[derive(Debug, Clone, Default)]
pub struct ArtifactQuery {
    pub modified_after: Option<SystemTime>,
    patterns: Vec<(Pattern, u8)>,
}

impl ArtifactQuery {
    /// Ranks `<stem>.png` highest, then common diagram names.
    pub fn expecting(stem: &str) -> Self {
        let mut query = Self::default();
        query.push(&format!("{}.png", Pattern::escape(stem)), EXPECTED_PRIORITY);
        query.push("*diagram*", NAME_PRIORITY);
        query.push("*architecture*", NAME_PRIORITY);
        query
    }

    /// Stem the script itself announced, ranked just below the expected one.
    pub fn with_hint(mut self, stem: &str) -> Self {
        self.push(&format!("{}*", Pattern::escape(stem)), HINT_PRIORITY);
        self
    }

    pub fn modified_after(mut self, at: SystemTime) -> Self {
        self.modified_after = Some(at);
        self
    }

    fn push(&mut self, pattern: &str, priority: u8) {
        match Pattern::new(pattern) {
            Ok(p) => {
                self.patterns.push((p, priority));
                self.patterns.sort_by(|a, b| b.1.cmp(&a.1));
            }
            Err(e) => tracing::warn!(pattern, error = %e, "skipping bad artifact pattern"),
        }
    }

    fn priority(&self, file_name: &str) -> u8 {
        self.patterns
            .iter()
            .find(|(p, _)| p.matches(file_name))
            .map(|(_, priority)| *priority)
            .unwrap_or(0)
    }
}

/// Newest matching PNG under `root`, best priority first.
pub fn find_newest(root: &Path, query: &ArtifactQuery) -> Option<DiagramArtifact> {
    let walker = WalkBuilder::new(root)
        .max_depth(Some(MAX_DEPTH))
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .build();

    let mut best: Option<(u8, SystemTime, PathBuf)> = None;
    for entry in walker.flatten() {
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) || !is_png(path) {
            continue;
        }
        let Some(modified) = entry.metadata().ok().and_then(|m| m.modified().ok()) else {
            continue;
        };
        if query.modified_after.is_some_and(|cutoff| modified < cutoff) {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        let priority = query.priority(&name);
        let better = match &best {
            Some((p, m, _)) => (priority, modified) > (*p, *m),
            None => true,
        };
        if better {
            best = Some((priority, modified, path.to_path_buf()));
        }
    }

    best.map(|(priority, modified, path)| {
        tracing::debug!(path = %path.display(), priority, "found diagram");
        DiagramArtifact {
            path,
            modified: DateTime::<Local>::from(modified),
            priority,
        }
    })
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn touch(dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, b"png").unwrap();
        path
    }

    #[test]
    fn expected_stem_beats_newer_files() {
        let dir = tempfile::tempdir().unwrap();
        let expected = touch(dir.path(), "cloudsketch_1.png");
        touch(dir.path(), "architecture_diagram.png");
        touch(dir.path(), "random.png");
        let found = find_newest(dir.path(), &ArtifactQuery::expecting("cloudsketch_1")).unwrap();
        assert_eq!(found.path, expected);
        assert_eq!(found.priority, EXPECTED_PRIORITY);
    }

    #[test]
    fn ranks_hint_over_generic_names() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "my_architecture.png");
        let hinted = touch(dir.path(), "nested/amazon_q_professional_v2.png");
        let query = ArtifactQuery::expecting("cloudsketch_1").with_hint("amazon_q_professional");
        let found = find_newest(dir.path(), &query).unwrap();
        assert_eq!(found.path, hinted);
        assert_eq!(found.priority, HINT_PRIORITY);
    }

    #[test]
    fn ignores_other_extensions_and_old_files() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "diagram.svg");
        touch(dir.path(), "script.py");
        assert!(find_newest(dir.path(), &ArtifactQuery::default()).is_none());

        touch(dir.path(), "diagram.PNG");
        let future = SystemTime::now() + Duration::from_secs(3600);
        let query = ArtifactQuery::default().modified_after(future);
        assert!(find_newest(dir.path(), &query).is_none());
        assert!(find_newest(dir.path(), &ArtifactQuery::default()).is_some());
    }

    #[test]
    fn stems_with_glob_characters_match_literally() {
        let dir = tempfile::tempdir().unwrap();
        let expected = touch(dir.path(), "plan[1].png");
        touch(dir.path(), "plan1.png");
        let found = find_newest(dir.path(), &ArtifactQuery::expecting("plan[1]")).unwrap();
        assert_eq!(found.path, expected);
    }
}
