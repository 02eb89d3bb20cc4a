use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::history::DEFAULT_CAPACITY;

// --- Storage location ---

/// Resolve the global config directory (~/.cloudsketch/).
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cloudsketch")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

// --- Settings ---

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub ai: AiSettings,
    pub cli: CliSettings,
    pub executor: ExecutorSettings,
    pub history_capacity: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ai: AiSettings::default(),
            cli: CliSettings::default(),
            executor: ExecutorSettings::default(),
            history_capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct AiSettings {
    pub provider: String,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            provider: "google".to_string(),
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            temperature: 0.1,
            max_tokens: 2048,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CliMode {
    /// Native binary if found on PATH, otherwise WSL on Windows
    #[default]
    Auto,
    Native,
    Wsl,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Invocation {
    /// Prompt written to stdin, followed by `/quit`
    #[default]
    Pipe,
    /// Prompt passed as the last argument
    Argument,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct CliSettings {
    pub enabled: bool,
    pub program: String,
    /// Arguments placed before `chat`
    pub args: Vec<String>,
    pub mode: CliMode,
    pub invocation: Invocation,
    pub timeout_secs: u64,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            program: "q".to_string(),
            args: Vec::new(),
            mode: CliMode::Auto,
            invocation: Invocation::Pipe,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecutorSettings {
    pub interpreter: String,
    /// Arguments placed before the script path
    pub interpreter_args: Vec<String>,
    pub timeout_secs: u64,
    /// Directory under which `generated-diagrams/` lives; current dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workdir: Option<PathBuf>,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            interpreter: "python3".to_string(),
            interpreter_args: Vec::new(),
            timeout_secs: 30,
            workdir: None,
        }
    }
}

impl ExecutorSettings {
    pub fn diagrams_dir(&self) -> PathBuf {
        self.workdir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("generated-diagrams")
    }
}

impl Settings {
    /// Stored settings with environment overrides applied.
    pub fn load() -> Self {
        let mut settings = read_settings();
        settings.apply_overrides(|key| std::env::var(key).ok());
        settings
    }

    /// Apply overrides from `lookup` (normally the process environment).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("GEMINI_API_KEY").or_else(|| get("GOOGLE_API_KEY")) {
            if self.ai.api_key.is_empty() {
                self.ai.api_key = key;
            }
        }
        if let Some(key) = get("CLOUDSKETCH_API_KEY") {
            self.ai.api_key = key;
        }
        if let Some(provider) = get("CLOUDSKETCH_PROVIDER") {
            self.ai.provider = provider;
        }
        if let Some(model) = get("CLOUDSKETCH_MODEL") {
            self.ai.model = model;
        }
        if let Some(program) = get("AMAZON_Q_PATH") {
            self.cli.program = program;
        }
        if let Some(python) = get("CLOUDSKETCH_PYTHON") {
            self.executor.interpreter = python;
        }
        if let Some(dir) = get("CLOUDSKETCH_WORKDIR") {
            self.executor.workdir = Some(PathBuf::from(dir));
        }
    }
}

pub fn read_settings() -> Settings {
    read_settings_from(&settings_path())
}

/// Missing or unreadable files yield defaults.
pub fn read_settings_from(path: &Path) -> Settings {
    if !path.exists() {
        return Settings::default();
    }
    match fs::read_to_string(path)
        .map_err(|e| CoreError::io(path, e))
        .and_then(|s| serde_json::from_str(&s).map_err(CoreError::from))
    {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring unreadable settings");
            Settings::default()
        }
    }
}

pub fn write_settings(settings: &Settings) -> Result<()> {
    write_settings_to(&settings_path(), settings)
}

/// Atomic write: temp file next to the target, then rename.
pub fn write_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|e| CoreError::io(dir, e))?;
    let json = serde_json::to_string_pretty(settings)?;
    let tmp = dir.join(".settings.json.tmp");
    fs::write(&tmp, json).map_err(|e| CoreError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| CoreError::io(path, e))
}

pub fn ai_configured(settings: &AiSettings) -> bool {
    !settings.provider.is_empty()
        && !settings.model.is_empty()
        && (settings.provider == "ollama" || !settings.api_key.is_empty())
}
