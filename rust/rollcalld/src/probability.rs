//! Score to selection-weight model.
//!
//! Weights are relative to the candidate set being drawn from: the lowest score
//! in the set gets the full weight of 1.0 and the highest gets the 0.3 floor.
//! Students whose score is a positive multiple of 6 get a 6x "lucky" bonus on top.

pub const BASE_WEIGHT: f64 = 0.3;
pub const VARIABLE_WEIGHT: f64 = 0.7;
pub const LUCKY_DIVISOR: f64 = 6.0;
pub const LUCKY_MULTIPLIER: f64 = 6.0;

/// Min/max score over one candidate set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreRange {
    pub min: f64,
    pub max: f64,
}

impl ScoreRange {
    /// `None` for an empty set; no weights exist for it.
    pub fn of<I>(scores: I) -> Option<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut range: Option<Self> = None;
        for s in scores {
            range = Some(match range {
                None => Self { min: s, max: s },
                Some(r) => Self {
                    min: r.min.min(s),
                    max: r.max.max(s),
                },
            });
        }
        range
    }

    fn normalized(&self, score: f64) -> f64 {
        if self.max == self.min {
            0.0
        } else {
            (score - self.min) / (self.max - self.min)
        }
    }
}

pub fn is_lucky(score: f64) -> bool {
    score > 0.0 && score % LUCKY_DIVISOR == 0.0
}

/// Weight before the lucky bonus, in `[0.3, 1.0]`.
pub fn base_weight(score: f64, range: &ScoreRange) -> f64 {
    BASE_WEIGHT + VARIABLE_WEIGHT * (1.0 - range.normalized(score))
}

pub fn weight(score: f64, range: &ScoreRange) -> f64 {
    let w = base_weight(score, range);
    if is_lucky(score) {
        w * LUCKY_MULTIPLIER
    } else {
        w
    }
}

/// Weights for every score, computed against the range of this same slice.
pub fn weights(scores: &[f64]) -> Vec<f64> {
    let Some(range) = ScoreRange::of(scores.iter().copied()) else {
        return Vec::new();
    };
    scores.iter().map(|&s| weight(s, &range)).collect()
}

pub fn normalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if !total.is_finite() {
        return vec![1.0 / weights.len() as f64; weights.len()];
    }
    if total <= 0.0 {
        return vec![0.0; weights.len()];
    }
    weights.iter().map(|w| w / total).collect()
}

/// Normalized selection probabilities for a candidate set's scores.
pub fn probabilities(scores: &[f64]) -> Vec<f64> {
    normalize(&weights(scores))
}
