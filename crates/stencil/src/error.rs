//! CLI error types.

use std::path::PathBuf;

use stencil_config::ConfigError;
use stencil_engine::{ContextError, RenderError};
use stencil_xml::XmlError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Render(#[from] RenderError),

    #[error("{0}")]
    Context(#[from] ContextError),

    #[error("{0}")]
    Xml(#[from] XmlError),

    #[error("invalid context file {}: {source}", path.display())]
    ContextFile {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot read image {} for {key}: {source}", path.display())]
    ImageFile {
        key: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    Validation(String),
}
