use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use weary_engine::EngineError;

/// CLI-specific error type that provides rich diagnostics.
#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("failed to {operation} {}", path.display())]
    #[diagnostic(code(weary::cli::io_error))]
    Io {
        path: PathBuf,
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid expression tree in {}", path.display())]
    #[diagnostic(
        code(weary::cli::parse_error),
        help("a node is either a 2-D number array or {{\"op\": \"add\"|\"multiply\"|\"negate\"|\"transpose\", \"args\": [...]}}")
    )]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("leaf matrix is ragged: row {row} has length {found}, expected {expected}")]
    #[diagnostic(code(weary::cli::ragged_leaf))]
    RaggedLeaf {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("shape check failed: {message}")]
    #[diagnostic(code(weary::cli::shape_error))]
    Shape { message: String },

    #[error("evaluation failed")]
    #[diagnostic(code(weary::cli::engine_error))]
    Engine(#[from] EngineError),
}

impl CliError {
    pub fn io(operation: &'static str, path: PathBuf, source: std::io::Error) -> CliError {
        CliError::Io {
            path,
            operation,
            source,
        }
    }
}
