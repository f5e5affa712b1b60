//! Heading classification: auditable heuristics first, trained model second.
//!
//! Every accepted candidate carries a reason trail. Heuristic acceptances
//! list every rule that matched; model acceptances carry
//! [`CLASSIFIER_REASON`]. Without a model the classifier runs heuristics only.

mod forest;

pub use forest::{DecisionTree, ForestModel, TreeNode};

use std::path::Path;
use std::sync::Arc;

use crate::features::{
    extract_features, has_bullet_prefix, has_trailing_colon, is_numbered, FeatureVector,
};
use crate::model::{Candidate, HeadingDecision};
use crate::options::HeuristicOptions;

/// Reason attached to candidates accepted by the model.
pub const CLASSIFIER_REASON: &str = "classifier positive";

/// A trained heading/body classifier.
///
/// Implementations must be immutable after construction; one instance is
/// shared by every document of a batch.
pub trait HeadingModel: Send + Sync {
    /// Predict a batch of feature vectors; `true` means heading.
    ///
    /// The result has one entry per input, in input order.
    fn predict(&self, batch: &[FeatureVector]) -> Vec<bool>;

    /// Model name, for logs.
    fn name(&self) -> &str {
        "model"
    }
}

/// Load a model artifact, falling back to heuristic-only mode on failure.
pub fn load_model_or_degrade(path: Option<&Path>) -> Option<Arc<dyn HeadingModel>> {
    let path = path?;
    match ForestModel::load(path) {
        Ok(model) => {
            log::info!(
                "Loaded heading model from {} ({} trees)",
                path.display(),
                model.tree_count()
            );
            Some(Arc::new(model))
        }
        Err(e) => {
            log::warn!("{}; continuing with heuristics only", e);
            None
        }
    }
}

/// Round to one decimal place.
pub(crate) fn round1(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

/// Two-tier heading classifier.
#[derive(Clone)]
pub struct HeadingClassifier {
    model: Option<Arc<dyn HeadingModel>>,
    options: HeuristicOptions,
}

impl HeadingClassifier {
    /// Create a classifier with an optional model.
    pub fn new(model: Option<Arc<dyn HeadingModel>>, options: HeuristicOptions) -> Self {
        Self { model, options }
    }

    /// Create a heuristic-only classifier.
    pub fn heuristics_only(options: HeuristicOptions) -> Self {
        Self::new(None, options)
    }

    /// Whether a trained model is available.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Every heuristic rule the candidate matches, in evaluation order.
    pub fn heuristic_reasons(&self, candidate: &Candidate, max_font_size: f32) -> Vec<String> {
        let line = &candidate.line;
        let text = candidate.text();
        let size = candidate.font_size();
        let blank_gap = size * self.options.blank_gap_ratio;
        let mut reasons = Vec::new();

        let isolated = matches!(
            (line.space_above, line.space_below),
            (Some(above), Some(below)) if above >= blank_gap && below >= blank_gap
        );
        if isolated {
            reasons.push("surrounded by blank line".to_string());
        }
        if size >= max_font_size - self.options.large_font_tolerance {
            reasons.push(format!("large font {}", round1(size)));
        }
        if is_numbered(text) {
            reasons.push("numbered pattern".to_string());
        }
        if has_trailing_colon(text) {
            reasons.push("trailing colon".to_string());
        }
        if has_bullet_prefix(text) {
            reasons.push("bullet/bold prefix".to_string());
        }
        if candidate.is_centered {
            reasons.push("center aligned".to_string());
        }
        if candidate.is_all_caps {
            reasons.push("all caps".to_string());
        }

        reasons
    }

    /// Classify a document's candidates, preserving their order.
    ///
    /// Candidates no heuristic accepts are sent to the model as one batch.
    pub fn classify(&self, candidates: Vec<Candidate>, max_font_size: f32) -> Vec<HeadingDecision> {
        let mut decisions = Vec::with_capacity(candidates.len());
        let mut pending = Vec::new();

        for candidate in candidates {
            let reasons = self.heuristic_reasons(&candidate, max_font_size);
            let mut decision = HeadingDecision::new(candidate);
            if reasons.is_empty() {
                pending.push(decisions.len());
            } else {
                decision.accept(reasons);
            }
            decisions.push(decision);
        }

        let Some(model) = &self.model else {
            return decisions;
        };
        if pending.is_empty() {
            return decisions;
        }

        let batch: Vec<FeatureVector> = pending
            .iter()
            .map(|&i| extract_features(&decisions[i].candidate))
            .collect();
        let predictions = model.predict(&batch);
        if predictions.len() != batch.len() {
            log::warn!(
                "{} returned {} predictions for {} samples; missing entries count as body text",
                model.name(),
                predictions.len(),
                batch.len()
            );
        }

        for (&i, is_heading) in pending.iter().zip(predictions) {
            if is_heading {
                decisions[i].accept([CLASSIFIER_REASON]);
            }
        }

        decisions
    }
}
