//! Conversation with the external diagram CLI and parsing of its transcript.
//!
//! The CLI is asked for a Python `diagrams` script. Its reply is free text
//! with terminal escapes, so code is pulled out with progressively looser
//! patterns and then normalised before it is run.

use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;

use cloudsketch_core::settings::{CliSettings, Invocation};
use cloudsketch_core::OutputTarget;

use crate::command::CommandRunner;
use crate::error::CliError;
use crate::process::{self, RunError};

/// Scripts shorter than this are treated as fragments.
const MIN_CODE_LEN: usize = 50;

pub struct QCli {
    runner: CommandRunner,
    invocation: Invocation,
    timeout: Duration,
}

impl QCli {
    pub fn new(runner: CommandRunner, invocation: Invocation, timeout: Duration) -> Self {
        Self {
            runner,
            invocation,
            timeout,
        }
    }

    pub fn from_settings(settings: &CliSettings) -> Result<Self, CliError> {
        let runner = CommandRunner::detect(settings)?;
        Ok(Self::new(
            runner,
            settings.invocation,
            Duration::from_secs(settings.timeout_secs),
        ))
    }

    pub fn runner(&self) -> &CommandRunner {
        &self.runner
    }

    /// Send one prompt from `workdir` and return the cleaned transcript.
    /// Diagrams the CLI draws itself land in `workdir/generated-diagrams`.
    ///
    /// A non-zero exit still counts when the CLI printed something; `/quit`
    /// makes some versions exit with an error after answering.
    pub async fn converse(&self, prompt: &str, workdir: &Path) -> Result<String, CliError> {
        let (mut cmd, stdin) = match self.invocation {
            Invocation::Pipe => (self.runner.command(["chat"]), Some(format!("{prompt}\n/quit\n"))),
            Invocation::Argument => (self.runner.command(["chat", prompt]), None),
        };

        cmd.current_dir(workdir);

        tracing::info!(runner = %self.runner.describe(), "asking diagram CLI");
        let out = process::run(cmd, stdin, self.timeout)
            .await
            .map_err(|e| match e {
                RunError::Timeout(limit) => CliError::Timeout(limit),
                RunError::Spawn(source) | RunError::Wait(source) => CliError::Spawn {
                    program: self.runner.describe(),
                    source,
                },
            })?;

        let transcript = strip_ansi(&out.stdout);
        if !out.success && transcript.trim().is_empty() {
            return Err(CliError::Failed {
                code: out.code,
                stderr: strip_ansi(out.stderr.trim()),
            });
        }
        tracing::debug!(bytes = transcript.len(), "CLI transcript received");
        Ok(transcript)
    }
}

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

/// Remove terminal escape sequences and carriage returns.
pub fn strip_ansi(text: &str) -> String {
    static ANSI: OnceLock<Option<Regex>> = OnceLock::new();
    let stripped = match cached(
        &ANSI,
        r"\x1b\[[0-?]*[ -/]*[@-~]|\x1b\][^\x07\x1b]*(?:\x07|\x1b\\)|\x1b[@-Z\\-_]",
    ) {
        Some(re) => re.replace_all(text, "").into_owned(),
        None => text.to_string(),
    };
    stripped.replace("\r\n", "\n").replace('\r', "\n")
}

/// Candidate scripts, best pattern first. Only blocks that look like a
/// `diagrams` program survive.
pub fn extract_code_blocks(transcript: &str) -> Vec<String> {
    static PYTHON: OnceLock<Option<Regex>> = OnceLock::new();
    static FENCED: OnceLock<Option<Regex>> = OnceLock::new();
    static LOOSE: OnceLock<Option<Regex>> = OnceLock::new();

    let fenced = |cell: &'static OnceLock<Option<Regex>>, pattern: &str| -> Vec<String> {
        cached(cell, pattern)
            .map(|re| {
                re.captures_iter(transcript)
                    .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut candidates = fenced(&PYTHON, r"(?s)```python[ \t]*\n(.*?)\n[ \t]*```");
    if candidates.is_empty() {
        candidates = fenced(&FENCED, r"(?s)```[ \t]*\n(.*?)\n[ \t]*```");
    }
    if candidates.is_empty() {
        candidates = import_runs(transcript);
    }
    if candidates.is_empty() {
        candidates = fenced(&LOOSE, r"(?s)(from diagrams.*?with Diagram.*?)(?:\n\n|\z)");
    }

    candidates
        .into_iter()
        .map(|code| code.trim().to_string())
        .filter(|code| looks_like_diagram(code))
        .collect()
}

/// Runs of lines starting at a `diagrams` import, ended by a blank line once
/// some body has been collected.
fn import_runs(transcript: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in transcript.lines() {
        let trimmed = line.trim_start();
        let starts = trimmed.starts_with("from diagrams") || trimmed.starts_with("import diagrams");
        if let Some(lines) = current.as_mut() {
            if line.trim().is_empty() && lines.len() > 5 {
                runs.push(lines.join("\n"));
                current = None;
            } else {
                lines.push(line);
            }
        } else if starts {
            current = Some(vec![line]);
        }
    }
    if let Some(lines) = current {
        runs.push(lines.join("\n"));
    }
    runs.into_iter()
        .filter(|run| run.lines().count() > 3)
        .collect()
}

pub fn looks_like_diagram(code: &str) -> bool {
    code.contains("diagrams")
        && code.contains("Diagram")
        && code.contains("with")
        && code.len() > MIN_CODE_LEN
}

/// Output stem the CLI mentioned, e.g. in a JSON tool call.
pub fn extract_filename_hint(transcript: &str) -> Option<String> {
    static HINT: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&HINT, r#""filename"\s*:\s*"([^"]+)""#)?
        .captures(transcript)
        .and_then(|c| c.get(1))
        .map(|m| {
            let name = m.as_str();
            name.strip_suffix(".png").unwrap_or(name).to_string()
        })
}

/// Make a CLI script safe to run unattended and point it at `target`.
pub fn clean_code(code: &str, target: &OutputTarget) -> String {
    static SHOW: OnceLock<Option<Regex>> = OnceLock::new();
    static FILENAME: OnceLock<Option<Regex>> = OnceLock::new();
    static DIAGRAM_CALL: OnceLock<Option<Regex>> = OnceLock::new();

    let mut code = code.to_string();
    if let Some(re) = cached(&SHOW, r"show\s*=\s*True") {
        code = re.replace_all(&code, "show=False").into_owned();
    }

    let filename_arg = format!("filename=\"{}\"", target.stem);
    let has_filename = cached(&FILENAME, r#"filename\s*=\s*(?:"[^"]*"|'[^']*')"#)
        .map(|re| {
            let found = re.is_match(&code);
            code = re
                .replace_all(&code, regex::NoExpand(&filename_arg))
                .into_owned();
            found
        })
        .unwrap_or(false);

    if let Some(re) = cached(&DIAGRAM_CALL, r"Diagram\(([^()]*)\)") {
        let has_show = code.contains("show=");
        code = re
            .replacen(&code, 1, |caps: &regex::Captures| {
                let mut args = caps[1].trim_end().trim_end_matches(',').to_string();
                if !has_filename {
                    push_arg(&mut args, &filename_arg);
                }
                if !has_show {
                    push_arg(&mut args, "show=False");
                }
                format!("Diagram({args})")
            })
            .into_owned();
    }

    if !code.contains("from diagrams import") {
        code = format!("from diagrams import Diagram, Cluster, Edge\n{code}");
    }
    code
}

fn push_arg(args: &mut String, arg: &str) {
    if !args.trim().is_empty() {
        args.push_str(", ");
    }
    args.push_str(arg);
}
