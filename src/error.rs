//! Error taxonomy for the pulse service.
//!
//! Only configuration and listener failures are fatal. Everything the model
//! side can produce is recoverable: the caller degrades to `Normal` verdicts.

use std::path::PathBuf;

/// Errors raised while validating or evaluating an anomaly model.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Feature vector did not have the arity the model was fit on
    FeatureShape { expected: usize, found: usize },
    /// Forest contains no trees
    EmptyForest,
    /// `sample_size` must be at least 2
    InvalidSampleSize(usize),
    /// A tree failed structural validation
    MalformedTree {
        tree: usize,
        node: usize,
        reason: &'static str,
    },
    /// Model implementation panicked during `predict`
    Panicked,
}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FeatureShape { expected, found } => write!(
                f,
                "Feature vector has {} columns (model expects {})",
                found, expected
            ),
            Self::EmptyForest => write!(f, "Forest has no trees"),
            Self::InvalidSampleSize(n) => write!(f, "Invalid sample size: {}", n),
            Self::MalformedTree { tree, node, reason } => {
                write!(f, "Malformed tree {} at node {}: {}", tree, node, reason)
            }
            Self::Panicked => write!(f, "Model panicked during predict"),
        }
    }
}

impl std::error::Error for ModelError {}

/// Service-level errors.
#[derive(Debug)]
pub enum PulseError {
    ArtifactIo {
        path: PathBuf,
        source: std::io::Error,
    },
    ArtifactFormat(String),
    Model(ModelError),
    Config(String),
    Bind {
        addr: String,
        source: std::io::Error,
    },
    Serve(std::io::Error),
    Spawn(std::io::Error),
}

impl std::fmt::Display for PulseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ArtifactIo { path, source } => {
                write!(f, "Cannot read model artifact {}: {}", path.display(), source)
            }
            Self::ArtifactFormat(e) => write!(f, "Invalid model artifact: {}", e),
            Self::Model(e) => write!(f, "Model rejected: {}", e),
            Self::Config(e) => write!(f, "Invalid configuration: {}", e),
            Self::Bind { addr, source } => write!(f, "Failed to bind {}: {}", addr, source),
            Self::Serve(e) => write!(f, "HTTP server failed: {}", e),
            Self::Spawn(e) => write!(f, "Failed to spawn worker thread: {}", e),
        }
    }
}

impl std::error::Error for PulseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ArtifactIo { source, .. } | Self::Bind { source, .. } => Some(source),
            Self::Serve(e) | Self::Spawn(e) => Some(e),
            Self::Model(e) => Some(e),
            Self::ArtifactFormat(_) | Self::Config(_) => None,
        }
    }
}

impl From<ModelError> for PulseError {
    fn from(e: ModelError) -> Self {
        Self::Model(e)
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(e: serde_json::Error) -> Self {
        Self::ArtifactFormat(e.to_string())
    }
}

impl PulseError {
    /// True when the artifact simply is not there (as opposed to corrupt).
    pub fn is_missing_artifact(&self) -> bool {
        matches!(
            self,
            Self::ArtifactIo { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
