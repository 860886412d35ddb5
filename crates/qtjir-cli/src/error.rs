//! The CLI's own error type: every subcommand funnels failures through
//! this enum so `main` has one place to print a message and pick an exit
//! code.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse '{path}' as a graph: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("graph failed validation with {0} error(s)")]
    ValidationFailed(usize),

    #[error(transparent)]
    Codegen(#[from] qtjir_codegen::CodegenError),

    #[error("unknown demo scenario '{0}'")]
    UnknownScenario(String),
}
