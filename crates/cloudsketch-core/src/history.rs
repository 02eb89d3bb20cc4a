use std::collections::VecDeque;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAPACITY: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationMethod {
    ExternalCli,
    Template,
    StaticFallback,
}

impl GenerationMethod {
    /// Suffix for file stems produced by this method.
    pub fn slug(self) -> &'static str {
        match self {
            GenerationMethod::ExternalCli => "cli",
            GenerationMethod::Template => "template",
            GenerationMethod::StaticFallback => "static",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GenerationMethod::ExternalCli => "external CLI",
            GenerationMethod::Template => "template",
            GenerationMethod::StaticFallback => "static fallback",
        }
    }
}

/// Outcome of one user-triggered generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerationAttempt {
    /// Stage that produced the diagram, if any did
    pub method: Option<GenerationMethod>,
    pub success: bool,
    pub response: String,
    pub diagram_path: Option<PathBuf>,
    pub timestamp: DateTime<Local>,
}

/// Fixed-capacity ring buffer; pushing onto a full buffer drops the oldest entry.
#[derive(Debug, Clone)]
pub struct GenerationHistory {
    capacity: usize,
    entries: VecDeque<GenerationAttempt>,
}

impl Default for GenerationHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl GenerationHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, attempt: GenerationAttempt) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(attempt);
    }

    /// Newest first.
    pub fn recent(&self, n: usize) -> Vec<&GenerationAttempt> {
        self.entries.iter().rev().take(n).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &GenerationAttempt> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&GenerationAttempt> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attempt(response: &str) -> GenerationAttempt {
        GenerationAttempt {
            method: Some(GenerationMethod::Template),
            success: true,
            response: response.to_string(),
            diagram_path: None,
            timestamp: Local::now(),
        }
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut history = GenerationHistory::with_capacity(3);
        for i in 0..5 {
            history.push(attempt(&i.to_string()));
        }
        assert_eq!(history.len(), 3);
        let kept: Vec<_> = history.iter().map(|a| a.response.as_str()).collect();
        assert_eq!(kept, vec!["2", "3", "4"]);
        assert_eq!(history.latest().map(|a| a.response.as_str()), Some("4"));
    }

    #[test]
    fn recent_is_newest_first() {
        let mut history = GenerationHistory::default();
        for i in 0..4 {
            history.push(attempt(&i.to_string()));
        }
        let recent: Vec<_> = history.recent(3).iter().map(|a| a.response.clone()).collect();
        assert_eq!(recent, vec!["3", "2", "1"]);
    }

    #[test]
    fn zero_capacity_still_keeps_latest() {
        let mut history = GenerationHistory::with_capacity(0);
        history.push(attempt("a"));
        history.push(attempt("b"));
        assert_eq!(history.len(), 1);
        assert_eq!(history.capacity(), 1);
        history.clear();
        assert!(history.is_empty());
    }
}
