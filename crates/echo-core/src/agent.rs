//! Agent State and Decision Rules
//!
//! An agent anchors on a fixed base opinion, is pulled toward concordant
//! messages on its screen, and drops followees whose posts it finds
//! discordant in favor of agents with more social capital.

use echo_events::{AgentId, Message};
use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::choice::{choose_by_social_capital, choose_uniform, choose_weighted};
use crate::config::{AgentConfig, ConfigError};
use crate::error::{SimError, SimResult};
use crate::graph::SocialGraph;

/// Largest opinion change a single update may apply
pub const MAX_OPINION_CHANGE: f64 = 1.0;

/// Rejection attempts for a truncated normal draw before falling back to uniform
const MAX_TRUNCATED_DRAWS: usize = 1000;

/// How a rewiring agent picks whom to follow next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewiringMethod {
    /// Any non-followee, weighted by social capital
    Random,
    /// Originators of concordant messages seen on the screen
    Repost,
    /// Authors the feed recommends as similar
    Recommendation,
}

/// Weighting used when picking a followee to drop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnfollowWeighting {
    /// Every discordant poster is equally likely
    #[default]
    Uniform,
    /// Posters with less social capital are more likely to be dropped
    InverseDegree,
}

/// Per-tick influence parameters for an opinion update
#[derive(Debug, Clone, Copy)]
pub struct Influence {
    pub mu: f64,
    pub damping: f64,
    /// Magnitude of the bounded random perturbation
    pub noise: f64,
}

/// A single user of the social network
#[derive(Debug, Clone)]
pub struct Agent {
    pub id: AgentId,
    base_opinion: f64,
    pub opinion: f64,
    /// Bounded-confidence threshold
    pub epsilon: f64,
    k_internal: f64,
    /// Entropy of the last screen, kept for reporting
    pub screen_diversity: f64,
    concordant: Vec<Message>,
    discordant: Vec<Message>,
}

impl Agent {
    pub fn new(id: AgentId, base_opinion: f64, epsilon: f64, k_internal: f64) -> Self {
        Self {
            id,
            base_opinion,
            opinion: base_opinion,
            epsilon,
            k_internal,
            screen_diversity: 0.0,
            concordant: Vec::new(),
            discordant: Vec::new(),
        }
    }

    /// Create an agent with a randomly drawn base opinion.
    ///
    /// Well-connected agents start with less extreme views: the dispersion is
    /// halved above 5 initial followees and quartered above 10.
    pub fn spawn<R: Rng>(
        id: AgentId,
        initial_out_degree: usize,
        config: &AgentConfig,
        rng: &mut R,
    ) -> SimResult<Self> {
        let std_dev = if initial_out_degree > 10 {
            config.opinion_std / 4.0
        } else if initial_out_degree > 5 {
            config.opinion_std / 2.0
        } else {
            config.opinion_std
        };
        let base_opinion = sample_truncated_normal(std_dev, 1.0, rng)?;

        let mut k_internal = config.k_internal;
        if base_opinion.abs() > config.extreme_opinion_threshold {
            k_internal += 0.2 * (base_opinion.abs() - 0.5);
        }

        Ok(Self::new(id, base_opinion, config.epsilon, k_internal))
    }

    pub fn base_opinion(&self) -> f64 {
        self.base_opinion
    }

    pub fn k_internal(&self) -> f64 {
        self.k_internal
    }

    pub fn concordant(&self) -> &[Message] {
        &self.concordant
    }

    pub fn discordant(&self) -> &[Message] {
        &self.discordant
    }

    /// Split the screen by distance from the base opinion
    pub fn evaluate_messages(&mut self, screen: &[Message]) {
        let (concordant, discordant): (Vec<Message>, Vec<Message>) = screen
            .iter()
            .partition(|m| (self.base_opinion - m.content).abs() < self.epsilon);
        self.concordant = concordant;
        self.discordant = discordant;
    }

    /// Move the opinion toward concordant messages, returning the applied change.
    ///
    /// Each message pulls in proportion to its originator's social capital;
    /// the internal force pulls back toward the base opinion.
    pub fn update_opinion<R: Rng>(
        &mut self,
        influence: Influence,
        graph: &SocialGraph,
        rng: &mut R,
    ) -> SimResult<f64> {
        if self.concordant.is_empty() {
            return Ok(0.0);
        }

        let force_internal = -self.k_internal * (self.opinion - self.base_opinion);
        let force_external = influence.mu * self.weighted_disagreement(graph);

        let mut change = influence.damping * (force_internal + force_external);
        if influence.noise > 0.0 {
            change += influence.noise * sample_truncated_normal(1.0, 1.0, rng)?;
        }
        let change = change.clamp(-MAX_OPINION_CHANGE, MAX_OPINION_CHANGE);

        self.opinion += change;
        Ok(change)
    }

    /// Average of (content - opinion) over concordant messages, weighted by
    /// the out-degree of each originator
    fn weighted_disagreement(&self, graph: &SocialGraph) -> f64 {
        let mut weighted_sum = 0.0;
        let mut total_weight = 0.0;
        for msg in &self.concordant {
            let weight = graph.out_degree(msg.who_originated) as f64;
            weighted_sum += weight * (msg.content - self.opinion);
            total_weight += weight;
        }

        if total_weight > 0.0 {
            weighted_sum / total_weight
        } else {
            let n = self.concordant.len() as f64;
            self.concordant
                .iter()
                .map(|m| m.content - self.opinion)
                .sum::<f64>()
                / n
        }
    }

    /// Repost a random concordant message with probability `p`, otherwise
    /// post an original message carrying this agent's opinion
    pub fn post_message<R: Rng>(
        &self,
        msg_id: u64,
        p: f64,
        use_base_opinion: bool,
        rng: &mut R,
    ) -> Message {
        if !self.concordant.is_empty() && rng.gen_bool(p) {
            if let Some(selected) = self.concordant.choose(rng) {
                return selected.repost(msg_id, self.id);
            }
        }

        let content = if use_base_opinion {
            self.base_opinion
        } else {
            self.opinion
        };
        Message::original(msg_id, self.id, content)
    }

    /// Agents this agent could start following
    fn follow_candidates(&self, graph: &SocialGraph) -> Vec<AgentId> {
        (0..graph.num_agents())
            .filter(|&j| j != self.id && !graph.follows(self.id, j))
            .collect()
    }

    /// Pick any non-followee, weighted by social capital
    pub fn decide_follow_id_at_random<R: Rng>(
        &self,
        graph: &SocialGraph,
        rng: &mut R,
    ) -> SimResult<AgentId> {
        let options = self.follow_candidates(graph);
        choose_by_social_capital(rng, graph, &options, "follow target")
    }

    /// Pick a followee to drop among the posters of discordant messages
    pub fn decide_unfollow_id_at_random<R: Rng>(
        &self,
        graph: &SocialGraph,
        weighting: UnfollowWeighting,
        rng: &mut R,
    ) -> SimResult<AgentId> {
        let posters: Vec<AgentId> = self
            .discordant
            .iter()
            .map(|m| m.who_posted)
            .filter(|&poster| graph.follows(self.id, poster))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        match weighting {
            UnfollowWeighting::Uniform => choose_uniform(rng, &posters, "unfollow target"),
            UnfollowWeighting::InverseDegree => {
                let weights: Vec<f64> = posters
                    .iter()
                    .map(|&p| match graph.out_degree(p) {
                        0 => 1.0,
                        d => 1.0 / d as f64,
                    })
                    .collect();
                choose_weighted(rng, &posters, &weights, "unfollow target")
            }
        }
    }

    /// Whether to follow back `follow_id`, and if so which followee to drop.
    ///
    /// Reciprocates when `follow_id`'s social capital exceeds `r` times the
    /// mean social capital of current followees; the weakest followee (lowest
    /// id on ties) is dropped.
    pub fn decide_to_reciprocate(
        &self,
        graph: &SocialGraph,
        follow_id: AgentId,
        r: f64,
    ) -> Option<AgentId> {
        let options: Vec<AgentId> = graph.followees(self.id).collect();
        let unfollow_id = options.iter().copied().min_by_key(|&o| graph.out_degree(o))?;

        let mean_degree = options.iter().map(|&o| graph.out_degree(o) as f64).sum::<f64>()
            / options.len() as f64;
        if mean_degree <= 0.0 {
            return None;
        }

        let ratio = graph.out_degree(follow_id) as f64 / mean_degree;
        (ratio > r).then_some(unfollow_id)
    }

    /// Choose an (unfollow, follow) pair, or `None` when there is nothing to
    /// drop or nobody left to follow
    pub fn decide_to_rewire<R: Rng>(
        &self,
        graph: &SocialGraph,
        methods: &[RewiringMethod],
        weighting: UnfollowWeighting,
        rng: &mut R,
    ) -> SimResult<Option<(AgentId, AgentId)>> {
        if self.discordant.is_empty() {
            return Ok(None);
        }
        if self.follow_candidates(graph).is_empty() {
            tracing::debug!("Agent {} already follows everyone", self.id);
            return Ok(None);
        }
        if !self.discordant.iter().any(|m| graph.follows(self.id, m.who_posted)) {
            return Ok(None);
        }

        let unfollow_id = self.decide_unfollow_id_at_random(graph, weighting, rng)?;
        let method = choose_uniform(rng, methods, "rewiring method")?;

        let follow_id = match method {
            RewiringMethod::Repost => {
                let pool: Vec<AgentId> = self
                    .concordant
                    .iter()
                    .map(|m| m.who_originated)
                    .filter(|&o| o != self.id && !graph.follows(self.id, o))
                    .collect::<BTreeSet<_>>()
                    .into_iter()
                    .collect();
                self.follow_from_pool(graph, &pool, rng)?
            }
            RewiringMethod::Recommendation => {
                let pool: Vec<AgentId> = graph
                    .recommend_similar(self.id, self.epsilon)
                    .into_iter()
                    .collect();
                self.follow_from_pool(graph, &pool, rng)?
            }
            RewiringMethod::Random => self.decide_follow_id_at_random(graph, rng)?,
        };

        Ok(Some((unfollow_id, follow_id)))
    }

    /// Social-capital weighted pick from `pool`, falling back to a random follow
    fn follow_from_pool<R: Rng>(
        &self,
        graph: &SocialGraph,
        pool: &[AgentId],
        rng: &mut R,
    ) -> SimResult<AgentId> {
        if pool.is_empty() {
            self.decide_follow_id_at_random(graph, rng)
        } else {
            choose_by_social_capital(rng, graph, pool, "follow target")
        }
    }
}

/// Draw from N(0, std_dev) truncated to [-bound, bound]
pub fn sample_truncated_normal<R: Rng>(std_dev: f64, bound: f64, rng: &mut R) -> SimResult<f64> {
    if !(std_dev > 0.0 && std_dev.is_finite()) {
        return Err(invalid_dispersion(std_dev, "must be positive and finite"));
    }
    let normal =
        Normal::new(0.0, std_dev).map_err(|e| invalid_dispersion(std_dev, &e.to_string()))?;
    for _ in 0..MAX_TRUNCATED_DRAWS {
        let value = normal.sample(rng);
        if value.abs() <= bound {
            return Ok(value);
        }
    }
    Ok(rng.gen_range(-bound..=bound))
}

fn invalid_dispersion(std_dev: f64, reason: &str) -> SimError {
    ConfigError::Invalid(format!("invalid opinion dispersion {}: {}", std_dev, reason)).into()
}
