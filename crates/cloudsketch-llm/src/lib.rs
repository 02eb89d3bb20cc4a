pub mod engine;
pub mod error;
mod parse;
mod prompt;

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;

use cloudsketch_core::{normalize, ArchitectureRequest};

pub use engine::{LlmEngine, TextGenerator};
pub use error::{LlmError, Result};
pub use parse::parse_model_output;
pub use prompt::request_schema;

/// Where the structured request came from.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum AnalysisSource {
    /// Model output, completed by heuristics
    Model,
    /// Keyword heuristics only
    Heuristic,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub request: ArchitectureRequest,
    pub source: AnalysisSource,
    /// Why the model output was not used, if it wasn't
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Turns user text into a normalized request through a language model,
/// caching results per normalized input text.
pub struct Analyzer {
    generator: Arc<dyn TextGenerator>,
    cache: Mutex<HashMap<String, Analysis>>,
}

fn cache_key(text: &str) -> String {
    text.trim().to_lowercase()
}

impl Analyzer {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Never fails: model errors and unparseable output degrade to heuristics.
    pub async fn analyze(&self, text: &str) -> Analysis {
        let key = cache_key(text);
        if let Some(hit) = self.cache.lock().await.get(&key) {
            tracing::debug!("analysis cache hit");
            return hit.clone();
        }

        let system = prompt::system_prompt();
        let user_msg = prompt::user_message(text);

        let analysis = match self.generator.generate(&system, &user_msg).await {
            Ok(raw) => {
                tracing::debug!(raw = %raw, "model output");
                match parse_model_output(&raw) {
                    Some(map) => Analysis {
                        request: normalize(text, &Value::Object(map)),
                        source: AnalysisSource::Model,
                        warning: None,
                    },
                    None => {
                        tracing::warn!("model output held no JSON object, using heuristics");
                        heuristic(text, "model output held no JSON object".to_string())
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "model call failed, using heuristics");
                heuristic(text, e.to_string())
            }
        };

        // Only model-backed results are worth keeping; heuristics are cheap to redo
        if analysis.source == AnalysisSource::Model {
            self.cache.lock().await.insert(key, analysis.clone());
        }
        analysis
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn cache_size(&self) -> usize {
        self.cache.lock().await.len()
    }
}

fn heuristic(text: &str, warning: String) -> Analysis {
    Analysis {
        request: normalize::from_text(text),
        source: AnalysisSource::Heuristic,
        warning: Some(warning),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Scripted {
        reply: std::result::Result<String, ()>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        async fn generate(&self, _system: &str, _user_msg: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply
                .clone()
                .map_err(|_| LlmError::Chat("connection refused".to_string()))
        }
    }

    fn analyzer(reply: std::result::Result<&str, ()>) -> (Arc<Scripted>, Analyzer) {
        let generator = Arc::new(Scripted {
            reply: reply.map(str::to_string),
            calls: AtomicUsize::new(0),
        });
        (generator.clone(), Analyzer::new(generator))
    }

    #[tokio::test]
    async fn model_output_is_normalized_and_cached() {
        let (generator, analyzer) = analyzer(Ok(
            "```json\n{\"architecture\": {\"region\": \"eu-central-1\"}}\n```",
        ));
        let first = analyzer.analyze("  VPC with EC2 ").await;
        assert_eq!(first.source, AnalysisSource::Model);
        assert_eq!(first.request.architecture.region, "eu-central-1");
        assert!(first.request.networking.vpc.enabled);

        let second = analyzer.analyze("vpc with ec2").await;
        assert_eq!(second.request, first.request);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(analyzer.cache_size().await, 1);

        analyzer.clear_cache().await;
        assert_eq!(analyzer.cache_size().await, 0);
    }

    #[tokio::test]
    async fn model_failure_degrades_to_heuristics() {
        let (_, analyzer) = analyzer(Err(()));
        let analysis = analyzer.analyze("서울 리전에 EC2 두 대 설치").await;
        assert_eq!(analysis.source, AnalysisSource::Heuristic);
        assert_eq!(analysis.request.architecture.region, "ap-northeast-2");
        assert!(analysis.warning.unwrap().contains("connection refused"));
        assert_eq!(analyzer.cache_size().await, 0);
    }

    #[tokio::test]
    async fn prose_only_reply_degrades_to_heuristics() {
        let (_, analyzer) = analyzer(Ok("Sorry, I can't do that."));
        let analysis = analyzer.analyze("s3 bucket").await;
        assert_eq!(analysis.source, AnalysisSource::Heuristic);
        assert!(analysis.request.storage.s3.enabled);
    }
}
