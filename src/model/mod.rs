//! Model artifact interface
//!
//! The classifier and its encoders are fit offline and shipped as a single
//! JSON artifact. This module only loads and evaluates; it never trains.

pub mod iforest;

pub use iforest::IsolationForest;

use crate::encoder::CategoryEncoder;
use crate::error::PulseError;
use serde::Deserialize;
use std::path::Path;

/// Columns per row: region, district, request type, gender, age.
pub const NUM_FEATURES: usize = 5;

/// Per-row output of [`AnomalyModel::predict`]. Discriminants follow the
/// upstream convention (1 = inlier, -1 = outlier).
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    Normal = 1,
    Anomaly = -1,
}

/// Binary classification capability over encoded feature rows.
pub trait AnomalyModel: Send + Sync {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Label>, crate::error::ModelError>;
}

/// Everything the offline trainer produces.
#[derive(Deserialize)]
pub struct ModelArtifact {
    pub encoders: CategoryEncoder,
    pub forest: IsolationForest,
}

impl ModelArtifact {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PulseError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    pub fn load(path: &Path) -> Result<Self, PulseError> {
        let bytes = std::fs::read(path).map_err(|source| PulseError::ArtifactIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_slice(&bytes)
    }
}
