use serde::{Deserialize, Serialize};

use crate::config::MAX_METRICS;

pub const MAX_HUMAN_SCORE: u8 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    /// Position of the metric's column pair in the configured mapping.
    pub slot: usize,
    pub name: String,
    pub score: f64,
}

/// One reference/candidate pair as read from the Data sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonItem {
    pub group_id: i64,
    pub item_id: String,
    pub reference: String,
    pub candidate_sentence: String,
    pub metrics: Vec<MetricScore>,
}

/// What the annotator has entered for one item, committed or not.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemInput {
    /// 0 means "not rated yet".
    pub human_score: u8,
    /// Rank per entry of [`ComparisonItem::metrics`], `None` while unselected.
    pub ranks: [Option<u8>; MAX_METRICS],
}

#[cfg(test)]
impl ItemInput {
    pub fn scored(human_score: u8) -> Self {
        Self {
            human_score,
            ..Self::default()
        }
    }

    pub fn with_ranks(mut self, ranks: [Option<u8>; MAX_METRICS]) -> Self {
        self.ranks = ranks;
        self
    }
}

/// A validated input, ready to be written to the Score sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Judgment {
    pub human_score: u8,
    /// Aligned with [`ComparisonItem::metrics`]; `None` when ranking is off.
    pub ranks: Option<Vec<u8>>,
}
