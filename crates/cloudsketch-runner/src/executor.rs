use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tokio::process::Command;

use cloudsketch_core::settings::ExecutorSettings;

use crate::artifact::{find_newest, ArtifactQuery, DiagramArtifact};
use crate::error::ExecError;
use crate::process::{self, RunError};

/// Slack for filesystems with coarse modification times.
pub const MTIME_SLACK: Duration = Duration::from_secs(1);

/// Runs generated diagram scripts inside the diagrams directory.
#[derive(Debug, Clone)]
pub struct ScriptExecutor {
    diagrams_dir: PathBuf,
    interpreter: String,
    interpreter_args: Vec<String>,
    timeout: Duration,
}

impl ScriptExecutor {
    pub fn new(diagrams_dir: impl Into<PathBuf>, interpreter: impl Into<String>) -> Self {
        Self {
            diagrams_dir: diagrams_dir.into(),
            interpreter: interpreter.into(),
            interpreter_args: Vec::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_settings(settings: &ExecutorSettings) -> Self {
        Self::new(settings.diagrams_dir(), settings.interpreter.clone())
            .with_args(settings.interpreter_args.clone())
            .with_timeout(Duration::from_secs(settings.timeout_secs))
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.interpreter_args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn diagrams_dir(&self) -> &Path {
        &self.diagrams_dir
    }

    /// Write `code` to a temp script, run it, and return the PNG it produced.
    ///
    /// The script file is removed on every path out of this function.
    pub async fn execute(
        &self,
        code: &str,
        query: ArtifactQuery,
    ) -> Result<DiagramArtifact, ExecError> {
        let dir = &self.diagrams_dir;
        std::fs::create_dir_all(dir).map_err(|e| io_err(dir, e))?;

        let mut file = tempfile::Builder::new()
            .prefix("cloudsketch_script_")
            .suffix(".py")
            .tempfile_in(dir)
            .map_err(|e| io_err(dir, e))?;
        file.write_all(code.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| io_err(file.path(), e))?;
        let script = file.into_temp_path();

        let started = SystemTime::now();
        let mut cmd = Command::new(&self.interpreter);
        cmd.args(&self.interpreter_args)
            .arg(script.as_os_str())
            .current_dir(dir);

        tracing::info!(
            interpreter = %self.interpreter,
            script = %script.display(),
            "running diagram script"
        );
        let outcome = process::run(cmd, None, self.timeout).await;

        let script_path = script.to_path_buf();
        if let Err(e) = script.close() {
            tracing::warn!(path = %script_path.display(), error = %e, "could not remove script");
        }

        let captured = match outcome {
            Ok(captured) => captured,
            Err(RunError::Timeout(limit)) => return Err(ExecError::Timeout(limit)),
            Err(RunError::Spawn(source)) => {
                return Err(ExecError::Spawn {
                    program: self.interpreter.clone(),
                    source,
                })
            }
            Err(RunError::Wait(source)) => return Err(io_err(&script_path, source)),
        };
        if !captured.success {
            return Err(ExecError::NonZeroExit {
                code: captured.code,
                stderr: tail(&captured.stderr),
            });
        }

        let cutoff = started.checked_sub(MTIME_SLACK).unwrap_or(started);
        find_newest(dir, &query.modified_after(cutoff)).ok_or(ExecError::NoArtifact)
    }
}

fn io_err(path: &Path, source: std::io::Error) -> ExecError {
    ExecError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Last few lines of stderr; tracebacks end with the useful part.
fn tail(stderr: &str) -> String {
    const LINES: usize = 10;
    let lines: Vec<&str> = stderr.trim_end().lines().collect();
    lines[lines.len().saturating_sub(LINES)..].join("\n")
}
