use std::sync::Arc;

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler, ServiceExt,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing_subscriber::EnvFilter;

use cloudsketch_core::normalize::from_text;
use cloudsketch_core::prompt::{cli_prompt, template_prompt};
use cloudsketch_core::template::{render_service, render_static_fallback};
use cloudsketch_core::{OutputTarget, ServiceKind, ServiceSelection, Settings};
use cloudsketch_llm::{Analysis, AnalysisSource, Analyzer, LlmEngine};
use cloudsketch_runner::chain::template_code;
use cloudsketch_runner::{FallbackChain, GenerationReport};

// --- Request types ---

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GenerateDiagramRequest {
    /// Natural-language description of the architecture, e.g. "서울 리전에 EC2 두 대와 RDS"
    request: String,
    /// Skip the language model and use keyword heuristics only
    #[serde(default)]
    heuristics_only: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct AnalyzeRequest {
    /// Natural-language description of the architecture
    request: String,
    /// Skip the language model and use keyword heuristics only
    #[serde(default)]
    heuristics_only: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
enum PromptKind {
    /// Detailed instruction for the external CLI
    Cli,
    /// Compact SERVICE / COUNT block used for template selection
    Template,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct BuildPromptRequest {
    /// Natural-language description of the architecture
    request: String,
    /// "cli" (default) or "template"
    kind: Option<PromptKind>,
    /// Normalize through the language model instead of heuristics
    #[serde(default)]
    use_model: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
enum TemplateStyle {
    /// Template chosen the same way the fallback chain chooses it
    Auto,
    /// Fixed per-service template
    Service,
    /// matplotlib placeholder
    Static,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct RenderTemplateRequest {
    /// Service name (EC2, S3, RDS, LAMBDA, VPC or any other label) or a free-text request
    service: String,
    /// Instance count for the EC2 template, 1 to 5
    count: Option<u32>,
    /// "service" (default), "auto" or "static"
    style: Option<TemplateStyle>,
    /// Output file stem; a timestamped one is generated when omitted
    stem: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
struct GetHistoryRequest {
    /// Maximum entries to return, newest first
    limit: Option<usize>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationResponse<'a> {
    #[serde(flatten)]
    report: &'a GenerationReport,
    analysis_source: AnalysisSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    analysis_warning: Option<&'a str>,
}

// --- Server ---

#[derive(Clone)]
pub struct CloudsketchServer {
    tool_router: ToolRouter<Self>,
    settings: Arc<Settings>,
    analyzer: Arc<Analyzer>,
    /// One generation at a time; stages share the diagrams directory.
    chain: Arc<Mutex<FallbackChain>>,
}

#[tool_router]
impl CloudsketchServer {
    pub fn new(settings: Settings) -> Self {
        let analyzer = Analyzer::new(Arc::new(LlmEngine::new(settings.ai.clone())));
        let chain = FallbackChain::from_settings(&settings);
        Self {
            tool_router: Self::tool_router(),
            settings: Arc::new(settings),
            analyzer: Arc::new(analyzer),
            chain: Arc::new(Mutex::new(chain)),
        }
    }

    async fn analysis(&self, text: &str, heuristics_only: bool) -> Analysis {
        if heuristics_only {
            Analysis {
                request: from_text(text),
                source: AnalysisSource::Heuristic,
                warning: None,
            }
        } else {
            self.analyzer.analyze(text).await
        }
    }

    #[tool(
        description = "Generate an AWS architecture diagram PNG from a natural-language request. Tries the external Q CLI, then a built-in template, then a static placeholder, and returns {artifact: {path, modified, priority}?, method?, message, attempts: [{method, success, detail, elapsedMs}], analysisSource, analysisWarning?}. A missing artifact means every method failed; the message says why."
    )]
    async fn generate_diagram(
        &self,
        Parameters(req): Parameters<GenerateDiagramRequest>,
    ) -> Result<CallToolResult, McpError> {
        if req.request.trim().is_empty() {
            return Ok(CallToolResult::error(vec![Content::text(
                "request must not be empty",
            )]));
        }
        let analysis = self.analysis(&req.request, req.heuristics_only).await;
        let target = OutputTarget::now();

        let report = self.chain.lock().await.generate(&analysis.request, &target).await;
        tracing::info!(
            success = report.succeeded(),
            method = ?report.method,
            "generation finished"
        );

        let body = GenerationResponse {
            report: &report,
            analysis_source: analysis.source,
            analysis_warning: analysis.warning.as_deref(),
        };
        Ok(json_result(&body))
    }

    #[tool(
        description = "Normalize a natural-language request into the structured architecture JSON (architecture, networking, compute, database, storage, security, monitoring, optimization_hints) without generating a diagram. Returns {request, source: model|heuristic, warning?}."
    )]
    async fn analyze_request(
        &self,
        Parameters(req): Parameters<AnalyzeRequest>,
    ) -> Result<CallToolResult, McpError> {
        let analysis = self.analysis(&req.request, req.heuristics_only).await;
        Ok(json_result(&analysis))
    }

    #[tool(
        description = "Show the exact prompt that would be sent to the external CLI (kind \"cli\") or used for template selection (kind \"template\") for a request."
    )]
    async fn build_prompt(
        &self,
        Parameters(req): Parameters<BuildPromptRequest>,
    ) -> Result<CallToolResult, McpError> {
        let analysis = self.analysis(&req.request, !req.use_model).await;
        let text = match req.kind.unwrap_or(PromptKind::Cli) {
            PromptKind::Cli => cli_prompt(&analysis.request, &OutputTarget::now()),
            PromptKind::Template => template_prompt(&analysis.request),
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }

    #[tool(
        description = "Return the Python code of a built-in diagram template without running it. `service` is a service name for style \"service\"/\"static\", or a free-text request for style \"auto\"."
    )]
    fn render_template(
        &self,
        Parameters(req): Parameters<RenderTemplateRequest>,
    ) -> Result<CallToolResult, McpError> {
        let target = req
            .stem
            .filter(|s| !s.trim().is_empty())
            .map(OutputTarget::new)
            .unwrap_or_else(OutputTarget::now);
        let code = match req.style.unwrap_or(TemplateStyle::Service) {
            TemplateStyle::Service => {
                let selection = match req.count {
                    Some(count) => ServiceSelection::new(ServiceKind::from_name(&req.service), count),
                    None => ServiceSelection::from_prompt(&req.service),
                };
                render_service(&selection, &target)
            }
            TemplateStyle::Auto => template_code(&from_text(&req.service), &target),
            TemplateStyle::Static => render_static_fallback(req.service.trim(), &target),
        };
        Ok(CallToolResult::success(vec![Content::text(code)]))
    }

    #[tool(description = "Check whether the external Q CLI can be launched and report its version")]
    async fn cli_status(&self) -> Result<CallToolResult, McpError> {
        let status = cloudsketch_runner::cli_status(&self.settings.cli).await;
        Ok(json_result(&status))
    }

    #[tool(description = "Recent diagram generations, newest first")]
    async fn get_history(
        &self,
        Parameters(req): Parameters<GetHistoryRequest>,
    ) -> Result<CallToolResult, McpError> {
        let chain = self.chain.lock().await;
        let history = chain.history();
        let entries = history.recent(req.limit.unwrap_or(history.capacity()));
        if entries.is_empty() {
            return Ok(CallToolResult::success(vec![Content::text(
                "No diagrams generated yet.",
            )]));
        }
        Ok(json_result(&entries))
    }

    #[tool(description = "Forget generation history and cached request analyses")]
    async fn clear_history(&self) -> Result<CallToolResult, McpError> {
        self.chain.lock().await.clear_history();
        self.analyzer.clear_cache().await;
        Ok(CallToolResult::success(vec![Content::text(
            "History and analysis cache cleared.",
        )]))
    }
}

const INSTRUCTIONS: &str = r#"cloudsketch turns natural-language AWS architecture requests into diagram PNGs rendered with the Python `diagrams` library.

## Workflow
1. Call `generate_diagram` with the user's request. The response carries the PNG path in `artifact.path` and the method that produced it.
2. If `artifact` is missing, read `message` and `attempts` for the reason. `cli_status` tells whether the external Q CLI is usable.
3. To inspect intermediate steps, use `analyze_request` (structured JSON), `build_prompt` (CLI or template prompt) and `render_template` (Python code only).

## Methods, in order
- external CLI: the Q assistant writes the script from a detailed prompt
- template: a built-in script for the request's services
- static fallback: a matplotlib placeholder image

Requests may be in Korean or English. Region names such as 서울, 도쿄 or Virginia are mapped to AWS region codes."#;

#[tool_handler]
impl ServerHandler for CloudsketchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// --- Helpers ---

fn json_result<T: Serialize + ?Sized>(value: &T) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(json) => CallToolResult::success(vec![Content::text(json)]),
        Err(e) => CallToolResult::error(vec![Content::text(format!(
            "Serialization error: {e}"
        ))]),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = Settings::load();
    tracing::info!(
        provider = %settings.ai.provider,
        model = %settings.ai.model,
        diagrams = %settings.executor.diagrams_dir().display(),
        "starting cloudsketch MCP server"
    );

    let service = CloudsketchServer::new(settings)
        .serve(rmcp::transport::io::stdio())
        .await
        .inspect_err(|e| tracing::error!(error = %e, "MCP server error"))?;
    service.waiting().await?;
    Ok(())
}
