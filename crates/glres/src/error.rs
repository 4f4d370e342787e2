use crate::types::ShaderStage;

/// Failures surfaced by resource construction and use.
#[derive(Debug, thiserror::Error)]
pub enum GpuError {
    #[error("missing required extensions: {}", missing.join(", "))]
    MissingCapability { missing: Vec<String> },
    #[error("error compiling {stage} shader: {log}")]
    Compile { stage: ShaderStage, log: String },
    #[error("error linking program: {log}")]
    Link { log: String },
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("uniform '{uniform}' not found in program")]
    NotFound { uniform: String },
    #[error("resource invalid: {0}")]
    ResourceInvalid(String),
    #[error("could not find shader '{0}'")]
    ShaderSourceNotFound(String),
    #[error("device failed to create {kind}: {reason}")]
    Allocation { kind: &'static str, reason: String },
    #[error("graphics context lost")]
    ContextLost,
}

impl GpuError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GpuError::NotFound { .. })
    }

    pub fn is_context_lost(&self) -> bool {
        matches!(self, GpuError::ContextLost)
    }
}

pub type Result<T, E = GpuError> = std::result::Result<T, E>;

/// Failures of the deferred image fetch/decode path.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read image '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch image '{url}': {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to decode image '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("no image registered for '{path}'")]
    Missing { path: String },
    #[error("image loader for '{path}' has shut down")]
    Unavailable { path: String },
}
