//! Running diagram scripts and the generation fallback chain.
//!
//! [`FallbackChain`] tries the external CLI, then a built-in template, then a
//! static matplotlib placeholder. Every stage goes through [`ScriptExecutor`],
//! which runs one child process under a timeout and picks up the PNG it wrote.

pub mod artifact;
pub mod chain;
pub mod command;
pub mod error;
pub mod executor;
mod process;
pub mod qcli;

pub use artifact::{find_newest, ArtifactQuery, DiagramArtifact};
pub use chain::{
    CliStage, FallbackChain, GenerationReport, GenerationStage, StageError, StageRecord,
    StaticStage, TemplateStage,
};
pub use command::{status as cli_status, CliStatus, CommandRunner};
pub use error::{CliError, ExecError};
pub use executor::ScriptExecutor;
pub use qcli::QCli;
