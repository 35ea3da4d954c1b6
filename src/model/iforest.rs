//! Isolation Forest evaluator
//!
//! Scores points against a forest fit offline. Each tree is shipped as a
//! flat node array with the root at index 0; a point is routed left when
//! `x[feature] < threshold`. Anomalies isolate early, so short average
//! paths mean high scores.
//!
//! Reference: "Isolation Forest" (Liu, Ting, Zhou; ICDM 2008)

use super::{AnomalyModel, Label, NUM_FEATURES};
use crate::error::ModelError;
use serde::{Deserialize, Serialize};

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Node of a serialized isolation tree
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        /// Training points that reached this leaf
        size: usize,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Children must point strictly forward, which rules out cycles and
    /// guarantees `path_length` terminates.
    fn validate(&self, tree: usize) -> Result<(), ModelError> {
        if self.nodes.is_empty() {
            return Err(ModelError::MalformedTree {
                tree,
                node: 0,
                reason: "tree has no nodes",
            });
        }
        for (i, node) in self.nodes.iter().enumerate() {
            if let Node::Split {
                feature,
                threshold,
                left,
                right,
            } = *node
            {
                let malformed = |reason| ModelError::MalformedTree {
                    tree,
                    node: i,
                    reason,
                };
                if feature >= NUM_FEATURES {
                    return Err(malformed("split feature out of range"));
                }
                if !threshold.is_finite() {
                    return Err(malformed("split threshold is not finite"));
                }
                for child in [left, right] {
                    if child <= i || child >= self.nodes.len() {
                        return Err(malformed("child index must point forward"));
                    }
                }
            }
        }
        Ok(())
    }

    fn path_length(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        let mut depth = 0.0;
        loop {
            match self.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[feature] < threshold { left } else { right };
                    depth += 1.0;
                }
                Node::Leaf { size } => return depth + average_path_length(size),
            }
        }
    }
}

/// Unvalidated wire form; converted through `TryFrom` so a forest can only
/// exist once its structure has been checked.
#[derive(Deserialize)]
struct RawForest {
    sample_size: usize,
    threshold: f64,
    trees: Vec<IsolationTree>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(try_from = "RawForest")]
pub struct IsolationForest {
    sample_size: usize,
    threshold: f64,
    trees: Vec<IsolationTree>,
}

impl TryFrom<RawForest> for IsolationForest {
    type Error = ModelError;

    fn try_from(raw: RawForest) -> Result<Self, Self::Error> {
        Self::new(raw.trees, raw.sample_size, raw.threshold)
    }
}

impl IsolationForest {
    pub fn new(
        trees: Vec<IsolationTree>,
        sample_size: usize,
        threshold: f64,
    ) -> Result<Self, ModelError> {
        if trees.is_empty() {
            return Err(ModelError::EmptyForest);
        }
        if sample_size < 2 {
            return Err(ModelError::InvalidSampleSize(sample_size));
        }
        for (i, tree) in trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(Self {
            sample_size,
            threshold,
            trees,
        })
    }

    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Anomaly score in (0, 1]. Values near 1 are isolated quickly.
    pub fn score(&self, x: &[f64]) -> Result<f64, ModelError> {
        if x.len() != NUM_FEATURES {
            return Err(ModelError::FeatureShape {
                expected: NUM_FEATURES,
                found: x.len(),
            });
        }
        let total: f64 = self.trees.iter().map(|t| t.path_length(x)).sum();
        let mean = total / self.trees.len() as f64;
        Ok(2f64.powf(-mean / average_path_length(self.sample_size)))
    }
}

impl AnomalyModel for IsolationForest {
    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<Label>, ModelError> {
        rows.iter()
            .map(|row| {
                let s = self.score(row)?;
                Ok(if s > self.threshold {
                    Label::Anomaly
                } else {
                    Label::Normal
                })
            })
            .collect()
    }
}

/// Expected path length of an unsuccessful BST search over `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One cut on age (feature 4): anyone over 80 lands alone in a leaf.
    fn age_tree() -> IsolationTree {
        IsolationTree::new(vec![
            Node::Split {
                feature: 4,
                threshold: 80.0,
                left: 1,
                right: 2,
            },
            Node::Leaf { size: 255 },
            Node::Leaf { size: 1 },
        ])
    }

    fn forest() -> IsolationForest {
        IsolationForest::new(vec![age_tree(), age_tree()], 256, 0.6).unwrap()
    }

    #[test]
    fn test_average_path_length() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        let c256 = average_path_length(256);
        assert!((c256 - 10.24).abs() < 0.05, "c(256) = {}", c256);
    }

    #[test]
    fn test_isolated_point_scores_higher() {
        let f = forest();
        let outlier = f.score(&[0.0, 0.0, 0.0, 0.0, 88.0]).unwrap();
        let inlier = f.score(&[0.0, 0.0, 0.0, 0.0, 30.0]).unwrap();
        assert!(outlier > 0.9, "outlier score {}", outlier);
        assert!(inlier < 0.5, "inlier score {}", inlier);
    }

    #[test]
    fn test_predict_labels() {
        let rows = vec![vec![1.0, 2.0, 0.0, 1.0, 85.0], vec![1.0, 2.0, 0.0, 1.0, 40.0]];
        let labels = forest().predict(&rows).unwrap();
        assert_eq!(labels, vec![Label::Anomaly, Label::Normal]);
    }

    #[test]
    fn test_wrong_arity_is_an_error() {
        let err = forest().predict(&[vec![1.0, 2.0]]).unwrap_err();
        assert_eq!(
            err,
            ModelError::FeatureShape {
                expected: 5,
                found: 2
            }
        );
    }

    #[test]
    fn test_rejects_backward_child() {
        let looping = IsolationTree::new(vec![
            Node::Split {
                feature: 0,
                threshold: 1.0,
                left: 0,
                right: 1,
            },
            Node::Leaf { size: 3 },
        ]);
        let err = IsolationForest::new(vec![looping], 16, 0.5).unwrap_err();
        assert!(matches!(err, ModelError::MalformedTree { tree: 0, node: 0, .. }));
    }

    #[test]
    fn test_rejects_degenerate_forests() {
        assert_eq!(
            IsolationForest::new(vec![], 16, 0.5).unwrap_err(),
            ModelError::EmptyForest
        );
        assert_eq!(
            IsolationForest::new(vec![age_tree()], 1, 0.5).unwrap_err(),
            ModelError::InvalidSampleSize(1)
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok = r#"{"sample_size": 256, "threshold": 0.6, "trees": [
            {"nodes": [
                {"split": {"feature": 4, "threshold": 80.0, "left": 1, "right": 2}},
                {"leaf": {"size": 255}},
                {"leaf": {"size": 1}}
            ]}
        ]}"#;
        let forest: IsolationForest = serde_json::from_str(ok).unwrap();
        assert_eq!(forest.num_trees(), 1);

        let bad_feature = r#"{"sample_size": 256, "threshold": 0.6, "trees": [
            {"nodes": [
                {"split": {"feature": 9, "threshold": 1.0, "left": 1, "right": 2}},
                {"leaf": {"size": 1}},
                {"leaf": {"size": 1}}
            ]}
        ]}"#;
        assert!(serde_json::from_str::<IsolationForest>(bad_feature).is_err());
    }
}
