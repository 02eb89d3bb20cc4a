#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("language model is not configured (provider, model or API key missing)")]
    NotConfigured,

    #[error("build LLM: {0}")]
    Build(String),

    #[error("chat: {0}")]
    Chat(String),

    #[error("LLM returned no text")]
    EmptyResponse,
}

pub type Result<T> = std::result::Result<T, LlmError>;
