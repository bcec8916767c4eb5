//! Graph Construction
//!
//! Builds the initial follow network: a power-law out-degree sequence and a
//! capped in-degree sequence are realized with a directed configuration
//! model, then collapsed to a simple digraph.

use echo_events::AgentId;
use rand::distributions::{Distribution, WeightedIndex};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::Pareto;

use crate::choice::{choose_uniform, choose_weighted};
use crate::config::NetworkConfig;
use crate::error::{SimError, SimResult};

use super::SocialGraph;

/// Resampling attempts before drawing directly from the nodes below the cap
pub const MAX_RESAMPLE_ATTEMPTS: usize = 1000;

/// Power-law exponent of the out-degree weight sequence
pub const POWERLAW_EXPONENT: f64 = 2.0;

impl SocialGraph {
    /// Generate the initial network described by `config`
    pub fn generate<R: Rng>(config: &NetworkConfig, rng: &mut R) -> SimResult<Self> {
        let n = config.num_agents;
        let cap = config.effective_degree_cap();
        if n < 2 {
            return Err(SimError::GraphConstruction(format!(
                "need at least 2 agents, got {}",
                n
            )));
        }
        if config.num_links < n || config.num_links > n * cap {
            return Err(SimError::GraphConstruction(format!(
                "{} links cannot give {} agents degrees within [1, {}]",
                config.num_links, n, cap
            )));
        }

        let weights = powerlaw_sequence(n, POWERLAW_EXPONENT, rng)?;
        let (in_degree, out_degree) = assign_degrees(n, config.num_links, cap, &weights, rng)?;
        let stubs = configuration_model(&in_degree, &out_degree, rng);

        let mut graph = SocialGraph::empty(n, config.screen_size, cap);
        let rejected = graph.absorb_stubs(&stubs);
        for source in &rejected {
            graph.add_replacement_edge(*source, rng)?;
        }

        tracing::info!(
            "Generated social graph: {} agents, {} edges, {} stubs retargeted",
            n,
            graph.edge_count(),
            rejected.len()
        );
        Ok(graph)
    }

    /// Insert stub pairs, returning the sources of self-loops and duplicates
    fn absorb_stubs(&mut self, stubs: &[(AgentId, AgentId)]) -> Vec<AgentId> {
        let mut rejected = Vec::new();
        for &(source, target) in stubs {
            if source == target || !self.successors[source].insert(target) {
                rejected.push(source);
            } else {
                self.predecessors[target].insert(source);
            }
        }
        rejected
    }

    /// Give `source` an out-edge to a random node it does not follow yet.
    ///
    /// Nodes with in-degree still below the cap are preferred.
    fn add_replacement_edge<R: Rng>(&mut self, source: AgentId, rng: &mut R) -> SimResult<()> {
        let open: Vec<AgentId> = (0..self.num_agents())
            .filter(|&j| j != source && !self.follows(source, j))
            .collect();
        let below_cap: Vec<AgentId> = open
            .iter()
            .copied()
            .filter(|&j| self.in_degree(j) < self.degree_cap)
            .collect();
        let pool = if below_cap.is_empty() { &open } else { &below_cap };

        let target = choose_uniform(rng, pool, "replacement edge target")?;
        self.add_edge(source, target)?;
        Ok(())
    }
}

/// Draw an integer power-law weight per node (all weights >= 1)
pub fn powerlaw_sequence<R: Rng>(n: usize, exponent: f64, rng: &mut R) -> SimResult<Vec<f64>> {
    let pareto = Pareto::new(1.0, exponent - 1.0)
        .map_err(|e| SimError::GraphConstruction(format!("invalid power-law exponent: {}", e)))?;
    Ok((0..n).map(|_| pareto.sample(rng).floor()).collect())
}

/// Grow in/out degree sequences from 1 each until they sum to `num_links`.
///
/// In-edges go to uniformly chosen nodes, out-edges to nodes weighted by
/// `weights`; a node at `cap` is resampled.
pub fn assign_degrees<R: Rng>(
    n: usize,
    num_links: usize,
    cap: usize,
    weights: &[f64],
    rng: &mut R,
) -> SimResult<(Vec<usize>, Vec<usize>)> {
    let mut in_degree = vec![1usize; n];
    let mut out_degree = vec![1usize; n];
    let out_dist = WeightedIndex::new(weights)
        .map_err(|e| SimError::GraphConstruction(format!("invalid degree weights: {}", e)))?;

    for _ in n..num_links {
        let r_in = sample_below_cap(&in_degree, cap, rng, |rng| rng.gen_range(0..n), None)?;
        in_degree[r_in] += 1;

        let r_out = sample_below_cap(
            &out_degree,
            cap,
            rng,
            |rng| out_dist.sample(rng),
            Some(weights),
        )?;
        out_degree[r_out] += 1;
    }

    Ok((in_degree, out_degree))
}

/// Resample `draw` until it yields a node below `cap`, with a bounded number
/// of attempts before falling back to a direct draw over eligible nodes
fn sample_below_cap<R, F>(
    degree: &[usize],
    cap: usize,
    rng: &mut R,
    mut draw: F,
    weights: Option<&[f64]>,
) -> SimResult<usize>
where
    R: Rng,
    F: FnMut(&mut R) -> usize,
{
    for _ in 0..MAX_RESAMPLE_ATTEMPTS {
        let candidate = draw(&mut *rng);
        if degree[candidate] < cap {
            return Ok(candidate);
        }
    }

    let eligible: Vec<usize> = (0..degree.len()).filter(|&i| degree[i] < cap).collect();
    if eligible.is_empty() {
        return Err(SimError::GraphConstruction(format!(
            "every node reached the degree cap of {}",
            cap
        )));
    }
    match weights {
        Some(w) => {
            let eligible_weights: Vec<f64> = eligible.iter().map(|&i| w[i]).collect();
            choose_weighted(rng, &eligible, &eligible_weights, "degree assignment")
        }
        None => choose_uniform(rng, &eligible, "degree assignment"),
    }
}

/// Pair out-stubs with shuffled in-stubs; may contain self-loops and duplicates
pub fn configuration_model<R: Rng>(
    in_degree: &[usize],
    out_degree: &[usize],
    rng: &mut R,
) -> Vec<(AgentId, AgentId)> {
    let expand = |degrees: &[usize]| -> Vec<AgentId> {
        degrees
            .iter()
            .enumerate()
            .flat_map(|(node, &d)| std::iter::repeat(node).take(d))
            .collect()
    };
    let out_stubs = expand(out_degree);
    let mut in_stubs = expand(in_degree);
    in_stubs.shuffle(rng);

    out_stubs.into_iter().zip(in_stubs).collect()
}
