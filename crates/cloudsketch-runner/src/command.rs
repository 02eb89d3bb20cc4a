use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;

use cloudsketch_core::settings::{CliMode, CliSettings};

use crate::error::CliError;
use crate::process;

const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

/// How the diagram CLI is launched. Chosen once per process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandRunner {
    Native {
        program: PathBuf,
        args: Vec<String>,
    },
    /// Program inside the default WSL distribution.
    Wsl { program: String, args: Vec<String> },
}

impl CommandRunner {
    /// Resolve the launcher from settings.
    ///
    /// `auto` prefers a native binary on PATH and falls back to WSL on Windows.
    pub fn detect(settings: &CliSettings) -> Result<Self, CliError> {
        if !settings.enabled {
            return Err(CliError::Disabled);
        }
        let native = || {
            which::which(&settings.program).map(|program| CommandRunner::Native {
                program,
                args: settings.args.clone(),
            })
        };
        let wsl = || {
            which::which("wsl").map(|_| CommandRunner::Wsl {
                program: settings.program.clone(),
                args: settings.args.clone(),
            })
        };

        let found = match settings.mode {
            CliMode::Native => native().ok(),
            CliMode::Wsl => wsl().ok(),
            CliMode::Auto => native()
                .ok()
                .or_else(|| if cfg!(windows) { wsl().ok() } else { None }),
        };
        let runner = found.ok_or_else(|| CliError::NotFound(settings.program.clone()))?;
        tracing::info!(runner = %runner.describe(), "diagram CLI selected");
        Ok(runner)
    }

    /// Command invoking the CLI with `args` after the configured leading ones.
    pub fn command<I, S>(&self, args: I) -> Command
    where
        I: IntoIterator<Item = S>,
        S: AsRef<std::ffi::OsStr>,
    {
        match self {
            CommandRunner::Native { program, args: lead } => {
                let mut cmd = Command::new(program);
                cmd.args(lead).args(args);
                cmd
            }
            CommandRunner::Wsl { program, args: lead } => {
                let mut cmd = Command::new("wsl");
                cmd.arg("-e").arg(program).args(lead).args(args);
                cmd
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            CommandRunner::Native { program, .. } => program.display().to_string(),
            CommandRunner::Wsl { program, .. } => format!("wsl -e {program}"),
        }
    }

    /// Ask the CLI for its version.
    pub async fn check_version(&self) -> CliStatus {
        let runner = Some(self.describe());
        match process::run(self.command(["--version"]), None, VERSION_TIMEOUT).await {
            Ok(out) if out.success => CliStatus {
                available: true,
                runner,
                version: out.stdout.lines().next().map(|l| l.trim().to_string()),
                error: None,
            },
            Ok(out) => CliStatus {
                available: false,
                runner,
                version: None,
                error: Some(format!(
                    "--version exited with {:?}: {}",
                    out.code,
                    out.stderr.trim()
                )),
            },
            Err(e) => CliStatus {
                available: false,
                runner,
                version: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Reported by `cli_status`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CliStatus {
    pub available: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CliStatus {
    pub fn unavailable(err: &CliError) -> Self {
        Self {
            available: false,
            runner: None,
            version: None,
            error: Some(err.to_string()),
        }
    }
}

/// Detect and check the version in one step.
pub async fn status(settings: &CliSettings) -> CliStatus {
    match CommandRunner::detect(settings) {
        Ok(runner) => runner.check_version().await,
        Err(e) => CliStatus::unavailable(&e),
    }
}
