//! Tree-ensemble heading model loaded from a JSON artifact.
//!
//! The artifact is produced by an external training job:
//!
//! ```json
//! {
//!   "n_features": 8,
//!   "trees": [
//!     { "nodes": [
//!         { "feature": 0, "threshold": 13.5, "left": 1, "right": 2 },
//!         { "value": 0.1 },
//!         { "value": 0.9 }
//!     ] }
//!   ]
//! }
//! ```
//!
//! A split sends a sample left when `x[feature] <= threshold`. A leaf holds the
//! probability of the heading class. The forest predicts "heading" when the
//! mean leaf probability is at least 0.5.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::HeadingModel;
use crate::error::{Error, Result};
use crate::features::{FeatureVector, FEATURE_COUNT};

/// Decision threshold on the mean heading probability.
const HEADING_THRESHOLD: f32 = 0.5;

/// One node of a decision tree.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    /// Internal split
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    /// Terminal node with the heading probability
    Leaf { value: f32 },
}

/// A single decision tree stored as a flat node array; node 0 is the root.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Wrap a flat node array. Structure is checked when the tree joins a
    /// [`ForestModel`].
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Nodes in storage order.
    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    /// Heading probability for a sample.
    ///
    /// A walk that leaves the node array or revisits more nodes than the
    /// tree holds scores 0.0.
    pub fn score(&self, sample: &FeatureVector) -> f32 {
        let mut index = 0;
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index) {
                None => return 0.0,
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    index = if sample.get(*feature) <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
        0.0
    }

    fn validate(&self, tree_index: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(Error::Model(format!("tree {} has no nodes", tree_index)));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(Error::Model(format!(
                            "tree {} node {}: leaf value is not finite",
                            tree_index, i
                        )));
                    }
                }
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= FEATURE_COUNT {
                        return Err(Error::Model(format!(
                            "tree {} node {}: feature {} out of range",
                            tree_index, i, feature
                        )));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(Error::Model(format!(
                                "tree {} node {}: invalid child {}",
                                tree_index, i, child
                            )));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

/// A random-forest style ensemble of decision trees.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForestModel {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl ForestModel {
    /// Build a validated model from trees over the extractor's feature vector.
    pub fn new(trees: Vec<DecisionTree>) -> Result<Self> {
        let model = Self {
            n_features: FEATURE_COUNT,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    /// Load and validate a model artifact from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .map_err(|e| Error::Model(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&data)
    }

    /// Parse and validate a model artifact from JSON text.
    pub fn from_json(data: &str) -> Result<Self> {
        let model: ForestModel =
            serde_json::from_str(data).map_err(|e| Error::Model(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }

    fn validate(&self) -> Result<()> {
        if self.n_features != FEATURE_COUNT {
            return Err(Error::Model(format!(
                "model expects {} features, extractor produces {}",
                self.n_features, FEATURE_COUNT
            )));
        }
        if self.trees.is_empty() {
            return Err(Error::Model("model has no trees".to_string()));
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(i)?;
        }
        Ok(())
    }

    /// Member trees.
    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Number of member trees.
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Mean heading probability over all trees.
    pub fn probability(&self, sample: &FeatureVector) -> f32 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f32 = self.trees.iter().map(|t| t.score(sample)).sum();
        total / self.trees.len() as f32
    }
}

impl HeadingModel for ForestModel {
    fn predict(&self, batch: &[FeatureVector]) -> Vec<bool> {
        batch
            .iter()
            .map(|sample| self.probability(sample) >= HEADING_THRESHOLD)
            .collect()
    }

    fn name(&self) -> &str {
        "forest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Heading when font size > 13.5, or when bold and short.
    const MODEL: &str = r#"{
        "n_features": 8,
        "trees": [
            { "nodes": [
                { "feature": 0, "threshold": 13.5, "left": 1, "right": 2 },
                { "value": 0.0 },
                { "value": 1.0 }
            ] },
            { "nodes": [
                { "feature": 1, "threshold": 0.5, "left": 1, "right": 2 },
                { "value": 0.0 },
                { "feature": 4, "threshold": 6.0, "left": 3, "right": 4 },
                { "value": 1.0 },
                { "value": 0.2 }
            ] }
        ]
    }"#;

    fn sample(size: f32, bold: f32, words: f32) -> FeatureVector {
        FeatureVector([size, bold, 0.0, 0.0, words, 0.0, 1.0, 0.0])
    }

    #[test]
    fn test_load_and_predict() {
        let model = ForestModel::from_json(MODEL).unwrap();
        assert_eq!(model.tree_count(), 2);

        let batch = [
            sample(16.0, 0.0, 3.0), // 1.0 + 0.0 -> 0.5
            sample(11.0, 1.0, 3.0), // 0.0 + 1.0 -> 0.5
            sample(11.0, 0.0, 3.0), // 0.0 + 0.0
            sample(11.0, 1.0, 9.0), // 0.0 + 0.2
        ];
        assert_eq!(model.predict(&batch), vec![true, true, false, false]);
        assert!((model.probability(&batch[3]) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_empty_batch() {
        let model = ForestModel::from_json(MODEL).unwrap();
        assert!(model.predict(&[]).is_empty());
    }

    #[test]
    fn test_rejects_wrong_dimension() {
        let json = r#"{"n_features": 5, "trees": [{"nodes": [{"value": 1.0}]}]}"#;
        assert!(matches!(ForestModel::from_json(json), Err(Error::Model(_))));
    }

    #[test]
    fn test_rejects_backward_child() {
        let json = r#"{"n_features": 8, "trees": [{"nodes": [
            {"feature": 0, "threshold": 1.0, "left": 0, "right": 1},
            {"value": 1.0}
        ]}]}"#;
        assert!(ForestModel::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_feature_out_of_range() {
        let json = r#"{"n_features": 8, "trees": [{"nodes": [
            {"feature": 8, "threshold": 1.0, "left": 1, "right": 2},
            {"value": 1.0}, {"value": 0.0}
        ]}]}"#;
        assert!(ForestModel::from_json(json).is_err());
    }

    #[test]
    fn test_rejects_malformed_json_and_empty_forest() {
        assert!(ForestModel::from_json("not json").is_err());
        assert!(ForestModel::from_json(r#"{"n_features": 8, "trees": []}"#).is_err());
    }

    #[test]
    fn test_new_rejects_child_outside_tree() {
        let tree = DecisionTree::new(vec![TreeNode::Split {
            feature: 0,
            threshold: 1.0,
            left: 5,
            right: 6,
        }]);
        assert!(matches!(ForestModel::new(vec![tree]), Err(Error::Model(_))));
        assert!(ForestModel::new(Vec::new()).is_err());
    }

    #[test]
    fn test_new_accepts_valid_trees() {
        let tree = DecisionTree::new(vec![
            TreeNode::Split {
                feature: 0,
                threshold: 13.5,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf { value: 0.0 },
            TreeNode::Leaf { value: 1.0 },
        ]);
        let model = ForestModel::new(vec![tree]).unwrap();
        assert_eq!(model.trees()[0].nodes().len(), 3);
        assert_eq!(model.predict(&[sample(16.0, 0.0, 2.0)]), vec![true]);
    }

    #[test]
    fn test_unchecked_structures_score_without_panicking() {
        let dangling = DecisionTree::new(vec![TreeNode::Split {
            feature: 0,
            threshold: 1.0,
            left: 5,
            right: 6,
        }]);
        assert_eq!(dangling.score(&sample(16.0, 0.0, 2.0)), 0.0);

        let cyclic = DecisionTree::new(vec![TreeNode::Split {
            feature: 0,
            threshold: 100.0,
            left: 0,
            right: 0,
        }]);
        assert_eq!(cyclic.score(&sample(16.0, 0.0, 2.0)), 0.0);
        assert_eq!(DecisionTree::new(Vec::new()).score(&sample(16.0, 0.0, 2.0)), 0.0);

        let empty = ForestModel {
            n_features: FEATURE_COUNT,
            trees: Vec::new(),
        };
        assert_eq!(empty.probability(&sample(16.0, 0.0, 2.0)), 0.0);
        assert_eq!(empty.predict(&[sample(16.0, 0.0, 2.0)]), vec![false]);
    }

    #[test]
    fn test_missing_file() {
        let result = ForestModel::load("/nonexistent/heading_model.json");
        assert!(matches!(result, Err(Error::Model(_))));
    }
}
