//! Outline level assignment.
//!
//! Two policies are supported and neither is privileged by the pipeline:
//! rank-by-size derives levels purely from the distinct heading font sizes,
//! while the rule cascade maps structural cues onto a fixed H1..H4 scale.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::features::{has_bullet_prefix, has_trailing_colon, is_numbered};
use crate::model::{HeadingDecision, HeadingLevel};
use crate::stats::size_key;

/// Deepest level produced by the rule cascade.
pub const CASCADE_DEPTH: u8 = 4;

/// Level assignment policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LevelStrategy {
    /// 1-based rank of the heading's font size among distinct heading sizes
    RankBySize,
    /// Font size and structural rules mapped onto H1..H4
    #[default]
    RuleCascade,
}

impl fmt::Display for LevelStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RankBySize => write!(f, "rank"),
            Self::RuleCascade => write!(f, "rules"),
        }
    }
}

impl FromStr for LevelStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rank" | "rank-by-size" | "size" => Ok(Self::RankBySize),
            "rules" | "rule-cascade" | "cascade" => Ok(Self::RuleCascade),
            _ => Err(format!("Unknown level strategy '{s}'. Expected: rank, rules")),
        }
    }
}

/// Document-wide font size bounds the cascade compares against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeBounds {
    /// Largest font size in the document
    pub max: f32,
    /// Smallest font size in the document
    pub min: f32,
}

/// Assigns levels to accepted headings of one document.
#[derive(Debug, Clone, Copy)]
pub struct LevelAssigner {
    strategy: LevelStrategy,
    bounds: SizeBounds,
    /// Within this many points of the maximum counts as the top size
    top_tolerance: f32,
    /// At least this many points above the minimum counts as a subheading
    sub_margin: f32,
}

impl LevelAssigner {
    /// Create an assigner for one document.
    pub fn new(strategy: LevelStrategy, bounds: SizeBounds) -> Self {
        Self {
            strategy,
            bounds,
            top_tolerance: 0.5,
            sub_margin: 1.5,
        }
    }

    /// Set the level of every accepted decision. Rejected decisions are left
    /// without a level.
    pub fn assign(&self, decisions: &mut [HeadingDecision]) {
        match self.strategy {
            LevelStrategy::RankBySize => self.assign_by_rank(decisions),
            LevelStrategy::RuleCascade => {
                for decision in decisions.iter_mut().filter(|d| d.accepted) {
                    let level = self.cascade_level(decision.candidate.text(), decision.candidate.font_size());
                    decision.level = Some(level);
                }
            }
        }
    }

    fn assign_by_rank(&self, decisions: &mut [HeadingDecision]) {
        let sizes: BTreeSet<i32> = decisions
            .iter()
            .filter(|d| d.accepted)
            .map(|d| size_key(d.candidate.font_size()))
            .collect();
        // Descending: the largest size gets rank 1.
        let ranked: Vec<i32> = sizes.into_iter().rev().collect();

        for decision in decisions.iter_mut().filter(|d| d.accepted) {
            let key = size_key(decision.candidate.font_size());
            let rank = ranked.iter().position(|k| *k == key).unwrap_or(0) + 1;
            decision.level = Some(HeadingLevel::new(rank.min(u8::MAX as usize) as u8));
        }
    }

    /// Rule cascade for a single heading.
    pub fn cascade_level(&self, text: &str, font_size: f32) -> HeadingLevel {
        let level = if font_size >= self.bounds.max - self.top_tolerance {
            1
        } else if is_numbered(text) || has_trailing_colon(text) {
            2
        } else if has_bullet_prefix(text) || font_size >= self.bounds.min + self.sub_margin {
            3
        } else {
            CASCADE_DEPTH
        };
        HeadingLevel::new(level)
    }
}
