use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// Structural problem with the job (page numbers, counts, config values).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("{context} ({}): {source}", .path.display())]
    Io {
        context: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("manifest error: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl BundleError {
    pub fn io(context: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::Io { context: context.into(), path: path.into(), source }
    }

    pub fn invalid(msg: impl Into<String>) -> Self { BundleError::InvalidInput(msg.into()) }
}
