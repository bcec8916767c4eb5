//! Random Selection
//!
//! Uniform and weighted draws over candidate sets. Drawing from an empty set
//! is an error; weights that sum to zero fall back to a uniform draw.

use echo_events::AgentId;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{SimError, SimResult};
use crate::graph::SocialGraph;

/// Pick one element uniformly at random
pub fn choose_uniform<T: Copy, R: Rng>(
    rng: &mut R,
    candidates: &[T],
    context: &'static str,
) -> SimResult<T> {
    candidates
        .choose(rng)
        .copied()
        .ok_or(SimError::InvalidSelection { context })
}

/// Pick one element with probability proportional to its weight
pub fn choose_weighted<T: Copy, R: Rng>(
    rng: &mut R,
    candidates: &[T],
    weights: &[f64],
    context: &'static str,
) -> SimResult<T> {
    if candidates.is_empty() {
        return Err(SimError::InvalidSelection { context });
    }
    debug_assert_eq!(candidates.len(), weights.len());

    match WeightedIndex::new(weights) {
        Ok(dist) => Ok(candidates[dist.sample(rng)]),
        // All-zero (or otherwise unusable) weights
        Err(_) => choose_uniform(rng, candidates, context),
    }
}

/// Pick an agent weighted by its social capital (out-degree)
pub fn choose_by_social_capital<R: Rng>(
    rng: &mut R,
    graph: &SocialGraph,
    candidates: &[AgentId],
    context: &'static str,
) -> SimResult<AgentId> {
    let weights: Vec<f64> = candidates
        .iter()
        .map(|&id| graph.out_degree(id) as f64)
        .collect();
    choose_weighted(rng, candidates, &weights, context)
}
