//! Anomaly Classifier Adapter
//!
//! Wraps the offline-trained model behind a two-variant capability chosen
//! once at startup. `Unavailable` (degraded mode) answers `Normal` for
//! every event. `Available` turns any model failure, including a panic,
//! into `Normal` so one bad event never interrupts a batch.

use crate::encoder::{CategoryEncoder, Field};
use crate::error::ModelError;
use crate::metrics::CLASSIFIER_FAILURES_TOTAL;
use crate::model::{AnomalyModel, Label, ModelArtifact};
use crate::simulator::EnrollmentEvent;
use rand::Rng;
use std::ops::RangeInclusive;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use tracing::{debug, error, info, warn};

/// Range of the placeholder confidence attached to positive detections.
///
/// This is not a calibrated probability and is not derived from the
/// model's score; it only marks a detection as "high confidence" for the
/// dashboard.
pub const CONFIDENCE_RANGE: RangeInclusive<u8> = 85..=99;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Normal,
    Anomaly { confidence: u8 },
}

impl Verdict {
    pub fn is_anomaly(&self) -> bool {
        matches!(self, Verdict::Anomaly { .. })
    }
}

pub enum Classifier {
    Available {
        model: Box<dyn AnomalyModel>,
        encoder: CategoryEncoder,
    },
    Unavailable,
}

impl Classifier {
    pub fn new(model: Box<dyn AnomalyModel>, encoder: CategoryEncoder) -> Self {
        Classifier::Available { model, encoder }
    }

    pub fn from_artifact(artifact: ModelArtifact) -> Self {
        Self::new(Box::new(artifact.forest), artifact.encoders)
    }

    /// Load the artifact at `path`. Any failure selects degraded mode; this
    /// is the only place that condition is reported.
    pub fn load(path: &Path) -> Self {
        match ModelArtifact::load(path) {
            Ok(artifact) => {
                let missing = artifact.encoders.missing_fields();
                if !missing.is_empty() {
                    warn!(?missing, "Artifact lacks encoders; those fields encode as 0.");
                }
                info!(
                    path = %path.display(),
                    trees = artifact.forest.num_trees(),
                    "Anomaly model loaded."
                );
                Self::from_artifact(artifact)
            }
            Err(e) if e.is_missing_artifact() => {
                warn!(
                    path = %path.display(),
                    "Model artifact not found. Running in degraded mode (all events Normal)."
                );
                Classifier::Unavailable
            }
            Err(e) => {
                error!(
                    path = %path.display(),
                    error = %e,
                    "Model artifact unusable. Running in degraded mode (all events Normal)."
                );
                Classifier::Unavailable
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Classifier::Available { .. })
    }

    /// Classify one encoded feature row.
    pub fn classify<R: Rng>(&self, features: &[f64], rng: &mut R) -> Verdict {
        let Classifier::Available { model, .. } = self else {
            return Verdict::Normal;
        };

        let rows = [features.to_vec()];
        let outcome = catch_unwind(AssertUnwindSafe(|| model.predict(&rows)))
            .unwrap_or(Err(ModelError::Panicked));

        match outcome {
            Ok(labels) if labels.first() == Some(&Label::Anomaly) => Verdict::Anomaly {
                confidence: rng.random_range(CONFIDENCE_RANGE),
            },
            Ok(_) => Verdict::Normal,
            Err(e) => {
                CLASSIFIER_FAILURES_TOTAL.inc();
                debug!(error = %e, "Classifier failed; treating event as normal.");
                Verdict::Normal
            }
        }
    }

    /// Encode `event` and classify it. Degraded mode skips encoding.
    pub fn evaluate<R: Rng>(&self, event: &EnrollmentEvent, rng: &mut R) -> Verdict {
        match self {
            Classifier::Available { encoder, .. } => {
                let features = encode_event(encoder, event);
                self.classify(&features, rng)
            }
            Classifier::Unavailable => Verdict::Normal,
        }
    }
}

/// Feature row in training column order.
pub fn encode_event(encoder: &CategoryEncoder, event: &EnrollmentEvent) -> Vec<f64> {
    vec![
        encoder.encode(Field::Region, event.region) as f64,
        encoder.encode(Field::District, event.district) as f64,
        encoder.encode(Field::RequestType, event.request_type) as f64,
        encoder.encode(Field::Gender, event.gender) as f64,
        event.age as f64,
    ]
}
