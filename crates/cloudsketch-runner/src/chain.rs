use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

use async_trait::async_trait;
use chrono::Local;
use serde::Serialize;

use cloudsketch_core::prompt::{cli_prompt, template_prompt};
use cloudsketch_core::template::{render_service, render_static_fallback, render_structured};
use cloudsketch_core::{
    ArchitectureRequest, GenerationAttempt, GenerationHistory, GenerationMethod, OutputTarget,
    ServiceSelection, Settings,
};

use crate::artifact::{find_newest, ArtifactQuery, DiagramArtifact, HINT_PRIORITY};
use crate::error::{CliError, ExecError};
use crate::executor::{ScriptExecutor, MTIME_SLACK};
use crate::qcli::{self, QCli};

#[derive(Debug, thiserror::Error)]
pub enum StageError {
    #[error("skipped: {0}")]
    Unavailable(String),

    #[error(transparent)]
    Cli(#[from] CliError),

    #[error("CLI reply contained no runnable diagram code")]
    NoCode,

    #[error(transparent)]
    Exec(#[from] ExecError),
}

/// One way of producing a diagram.
#[async_trait]
pub trait GenerationStage: Send + Sync {
    fn method(&self) -> GenerationMethod;

    async fn attempt(
        &self,
        request: &ArchitectureRequest,
        target: &OutputTarget,
    ) -> Result<DiagramArtifact, StageError>;
}

// --- Stages ---

/// Ask the external CLI for a script, then run it.
pub struct CliStage {
    cli: Result<QCli, CliError>,
    executor: Arc<ScriptExecutor>,
}

impl CliStage {
    /// `cli` is the outcome of detection; a detection error fails the stage
    /// immediately on every attempt.
    pub fn new(cli: Result<QCli, CliError>, executor: Arc<ScriptExecutor>) -> Self {
        Self { cli, executor }
    }
}

#[async_trait]
impl GenerationStage for CliStage {
    fn method(&self) -> GenerationMethod {
        GenerationMethod::ExternalCli
    }

    async fn attempt(
        &self,
        request: &ArchitectureRequest,
        target: &OutputTarget,
    ) -> Result<DiagramArtifact, StageError> {
        let cli = self
            .cli
            .as_ref()
            .map_err(|e| StageError::Unavailable(e.to_string()))?;

        let diagrams_dir = self.executor.diagrams_dir();
        std::fs::create_dir_all(diagrams_dir).map_err(|source| ExecError::Io {
            path: diagrams_dir.to_path_buf(),
            source,
        })?;
        let workdir = diagrams_dir
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));

        let started = SystemTime::now();
        let transcript = cli.converse(&cli_prompt(request, target), workdir).await?;
        let blocks = qcli::extract_code_blocks(&transcript);
        let hint = qcli::extract_filename_hint(&transcript);
        tracing::debug!(blocks = blocks.len(), hint = ?hint, "parsed CLI transcript");

        let mut last_err = StageError::NoCode;
        for block in blocks {
            let code = qcli::clean_code(&block, target);
            if !qcli::looks_like_diagram(&code) {
                continue;
            }
            let mut query = ArtifactQuery::expecting(&target.stem);
            if let Some(hint) = &hint {
                query = query.with_hint(hint);
            }
            match self.executor.execute(&code, query).await {
                Ok(artifact) => return Ok(artifact),
                Err(e) => {
                    tracing::warn!(error = %e, "CLI script failed");
                    last_err = e.into();
                }
            }
        }

        // The CLI may have drawn the diagram itself and only named the file
        if let Some(hint) = &hint {
            let cutoff = started.checked_sub(MTIME_SLACK).unwrap_or(started);
            let query = ArtifactQuery::expecting(&target.stem)
                .with_hint(hint)
                .modified_after(cutoff);
            if let Some(artifact) =
                find_newest(diagrams_dir, &query).filter(|a| a.priority >= HINT_PRIORITY)
            {
                tracing::info!(path = %artifact.path.display(), "CLI wrote the diagram itself");
                return Ok(artifact);
            }
        }
        Err(last_err)
    }
}

/// Render a built-in template.
///
/// Requests that lay out subnets get the structured script; anything else
/// gets the per-service template picked from [`template_prompt`].
pub struct TemplateStage {
    executor: Arc<ScriptExecutor>,
}

impl TemplateStage {
    pub fn new(executor: Arc<ScriptExecutor>) -> Self {
        Self { executor }
    }
}

pub fn template_code(request: &ArchitectureRequest, target: &OutputTarget) -> String {
    let vpc = &request.networking.vpc;
    if vpc.enabled && !vpc.subnets.is_empty() {
        render_structured(request, target)
    } else {
        let selection = ServiceSelection::from_prompt(&template_prompt(request));
        render_service(&selection, target)
    }
}

#[async_trait]
impl GenerationStage for TemplateStage {
    fn method(&self) -> GenerationMethod {
        GenerationMethod::Template
    }

    async fn attempt(
        &self,
        request: &ArchitectureRequest,
        target: &OutputTarget,
    ) -> Result<DiagramArtifact, StageError> {
        let code = template_code(request, target);
        Ok(self
            .executor
            .execute(&code, ArtifactQuery::expecting(&target.stem))
            .await?)
    }
}

/// Placeholder image drawn with matplotlib.
pub struct StaticStage {
    executor: Arc<ScriptExecutor>,
}

impl StaticStage {
    pub fn new(executor: Arc<ScriptExecutor>) -> Self {
        Self { executor }
    }
}

#[async_trait]
impl GenerationStage for StaticStage {
    fn method(&self) -> GenerationMethod {
        GenerationMethod::StaticFallback
    }

    async fn attempt(
        &self,
        request: &ArchitectureRequest,
        target: &OutputTarget,
    ) -> Result<DiagramArtifact, StageError> {
        let code = render_static_fallback(request.primary_service(), target);
        Ok(self
            .executor
            .execute(&code, ArtifactQuery::expecting(&target.stem))
            .await?)
    }
}

// --- Controller ---

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub method: GenerationMethod,
    pub success: bool,
    pub detail: String,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub artifact: Option<DiagramArtifact>,
    pub method: Option<GenerationMethod>,
    pub message: String,
    pub attempts: Vec<StageRecord>,
}

impl GenerationReport {
    pub fn succeeded(&self) -> bool {
        self.artifact.is_some()
    }
}

/// Tries each stage once, in order, and keeps a bounded history of outcomes.
pub struct FallbackChain {
    stages: Vec<Box<dyn GenerationStage>>,
    history: GenerationHistory,
}

impl FallbackChain {
    pub fn new(stages: Vec<Box<dyn GenerationStage>>, history_capacity: usize) -> Self {
        Self {
            stages,
            history: GenerationHistory::with_capacity(history_capacity),
        }
    }

    /// CLI, template and static stages sharing one executor.
    pub fn from_settings(settings: &Settings) -> Self {
        let executor = Arc::new(ScriptExecutor::from_settings(&settings.executor));
        let cli = QCli::from_settings(&settings.cli);
        if let Err(e) = &cli {
            tracing::info!(reason = %e, "CLI stage will be skipped");
        }
        Self::new(
            vec![
                Box::new(CliStage::new(cli, executor.clone())),
                Box::new(TemplateStage::new(executor.clone())),
                Box::new(StaticStage::new(executor)),
            ],
            settings.history_capacity,
        )
    }

    pub fn history(&self) -> &GenerationHistory {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// Run the chain for one request. Never fails; exhaustion is reported in
    /// the message. Each stage writes `<stem>_<method>.png`.
    pub async fn generate(
        &mut self,
        request: &ArchitectureRequest,
        target: &OutputTarget,
    ) -> GenerationReport {
        let mut attempts = Vec::with_capacity(self.stages.len());
        let mut produced = None;

        for stage in &self.stages {
            let method = stage.method();
            let stage_target = target.with_suffix(method.slug());
            let started = Instant::now();
            tracing::info!(stage = method.label(), stem = %stage_target.stem, "trying stage");

            let result = stage.attempt(request, &stage_target).await;
            let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            match result {
                Ok(artifact) => {
                    attempts.push(StageRecord {
                        method,
                        success: true,
                        detail: artifact.path.display().to_string(),
                        elapsed_ms,
                    });
                    produced = Some((method, artifact));
                    break;
                }
                Err(e) => {
                    tracing::warn!(stage = method.label(), error = %e, "stage failed");
                    attempts.push(StageRecord {
                        method,
                        success: false,
                        detail: e.to_string(),
                        elapsed_ms,
                    });
                }
            }
        }

        let report = match produced {
            Some((method, artifact)) => GenerationReport {
                message: format!(
                    "Diagram generated with {}: {}",
                    method.label(),
                    artifact.path.display()
                ),
                artifact: Some(artifact),
                method: Some(method),
                attempts,
            },
            None => {
                let reasons: Vec<String> = attempts
                    .iter()
                    .map(|a| format!("{}: {}", a.method.label(), a.detail))
                    .collect();
                GenerationReport {
                    message: format!("All generation methods failed ({})", reasons.join("; ")),
                    artifact: None,
                    method: None,
                    attempts,
                }
            }
        };

        self.history.push(GenerationAttempt {
            method: report.method,
            success: report.succeeded(),
            response: report.message.clone(),
            diagram_path: report.artifact.as_ref().map(|a| a.path.clone()),
            timestamp: Local::now(),
        });
        report
    }
}
