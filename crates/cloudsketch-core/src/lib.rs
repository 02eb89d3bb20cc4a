pub mod error;
pub mod history;
pub mod normalize;
pub mod prompt;
pub mod request;
pub mod rules;
pub mod settings;
pub mod template;

use chrono::{DateTime, Local};

pub use error::{CoreError, Result};
pub use history::{GenerationAttempt, GenerationHistory, GenerationMethod};
pub use normalize::normalize;
pub use prompt::ServiceSelection;
pub use request::ArchitectureRequest;
pub use settings::Settings;
pub use template::ServiceKind;

/// Prefix shared by every diagram this tool names.
pub const STEM_PREFIX: &str = "cloudsketch";

/// Name of the PNG a generation is expected to produce, without extension.
/// Scripts run inside the diagrams directory, so the stem is all they need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub stem: String,
}

impl OutputTarget {
    pub fn new(stem: impl Into<String>) -> Self {
        Self { stem: stem.into() }
    }

    pub fn now() -> Self {
        Self::timestamped(Local::now())
    }

    /// `cloudsketch_<YYYYmmdd_HHMMSS_mmm>`
    pub fn timestamped(at: DateTime<Local>) -> Self {
        Self::new(format!("{STEM_PREFIX}_{}", at.format("%Y%m%d_%H%M%S_%3f")))
    }

    /// Same stem with `_<suffix>` appended, so each stage writes its own file.
    pub fn with_suffix(&self, suffix: &str) -> Self {
        Self::new(format!("{}_{suffix}", self.stem))
    }

    pub fn file_name(&self) -> String {
        format!("{}.png", self.stem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamped_stem_has_millis() {
        let at = Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        let target = OutputTarget::timestamped(at);
        assert_eq!(target.stem, "cloudsketch_20240309_140507_000");
        assert_eq!(target.file_name(), "cloudsketch_20240309_140507_000.png");
        assert_eq!(
            target.with_suffix("cli").file_name(),
            "cloudsketch_20240309_140507_000_cli.png"
        );
    }
}
