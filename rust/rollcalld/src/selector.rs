use rand::Rng;

use crate::error::{CoreError, CoreResult};
use crate::model::Student;
use crate::probability;

/// Draw one index from `scores` by inverse-score weight.
///
/// Weights are computed over exactly the slice passed in. The caller owns any
/// called/uncalled bookkeeping.
pub fn select_index<R>(scores: &[f64], rng: &mut R) -> CoreResult<usize>
where
    R: Rng + ?Sized,
{
    if scores.is_empty() {
        return Err(CoreError::invalid_argument(
            "cannot select from an empty candidate set",
        ));
    }

    let weights = probability::weights(scores);
    let total: f64 = weights.iter().sum();
    // Extreme score spreads overflow the range and poison the weights.
    if !total.is_finite() || total <= 0.0 {
        return Ok(rng.gen_range(0..scores.len()));
    }
    let r = rng.gen_range(0.0..total);

    let mut cumulative = 0.0;
    for (i, w) in weights.iter().enumerate() {
        cumulative += w;
        if cumulative >= r {
            return Ok(i);
        }
    }
    // Rounding can leave the last cumulative sum just below `r`.
    Ok(scores.len() - 1)
}

pub fn select_one<'a, R>(candidates: &[&'a Student], rng: &mut R) -> CoreResult<&'a Student>
where
    R: Rng + ?Sized,
{
    let scores: Vec<f64> = candidates.iter().map(|s| s.score).collect();
    let idx = select_index(&scores, rng)?;
    Ok(candidates[idx])
}
