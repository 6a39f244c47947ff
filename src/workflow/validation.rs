use thiserror::Error;

use crate::model::{ComparisonItem, ItemInput, Judgment, MAX_HUMAN_SCORE};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("please provide a score between 1 and {max}", max = MAX_HUMAN_SCORE)]
    MissingScore,

    #[error("score {0} is out of range, expected 1 to {max}", max = MAX_HUMAN_SCORE)]
    ScoreOutOfRange(u8),

    #[error("please rank all scores: {metric} has no rank")]
    MissingRank { metric: String },

    #[error("rank {rank} for {metric} is out of range, expected 1 to {max}")]
    RankOutOfRange { metric: String, rank: u8, max: usize },

    #[error("ranks must be unique")]
    DuplicateRanks,
}

/// Checks an input against the rules for advancing past an item.
///
/// With ranking enabled the ranks must assign each of `1..=n` exactly once
/// across the item's `n` metrics.
pub fn validate_input(
    item: &ComparisonItem,
    input: &ItemInput,
    ranking_enabled: bool,
) -> Result<Judgment, ValidationError> {
    match input.human_score {
        0 => return Err(ValidationError::MissingScore),
        score if score > MAX_HUMAN_SCORE => return Err(ValidationError::ScoreOutOfRange(score)),
        _ => {}
    }

    if !ranking_enabled {
        return Ok(Judgment {
            human_score: input.human_score,
            ranks: None,
        });
    }

    let max = item.metrics.len();
    let mut ranks = Vec::with_capacity(max);
    for (metric, rank) in item.metrics.iter().zip(input.ranks) {
        let Some(rank) = rank else {
            return Err(ValidationError::MissingRank {
                metric: metric.name.clone(),
            });
        };
        if rank == 0 || usize::from(rank) > max {
            return Err(ValidationError::RankOutOfRange {
                metric: metric.name.clone(),
                rank,
                max,
            });
        }
        ranks.push(rank);
    }

    let mut sorted = ranks.clone();
    sorted.sort_unstable();
    sorted.dedup();
    if sorted.len() != ranks.len() {
        return Err(ValidationError::DuplicateRanks);
    }

    Ok(Judgment {
        human_score: input.human_score,
        ranks: Some(ranks),
    })
}
