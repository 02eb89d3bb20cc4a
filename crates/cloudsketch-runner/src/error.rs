use std::path::PathBuf;
use std::time::Duration;

/// Failure running a generated diagram script.
#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("script exited with {}: {stderr}", exit_label(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },

    #[error("script timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),

    #[error("script finished but wrote no PNG")]
    NoArtifact,
}

/// Failure talking to the external diagram CLI.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("CLI disabled in settings")]
    Disabled,

    #[error("CLI `{0}` not found")]
    NotFound(String),

    #[error("could not start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CLI exited with {} and no output: {stderr}", exit_label(.code))]
    Failed { code: Option<i32>, stderr: String },

    #[error("CLI timed out after {}s", .0.as_secs_f32())]
    Timeout(Duration),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}
