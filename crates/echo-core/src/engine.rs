//! Dynamics Engine
//!
//! Asynchronous one-agent-per-tick loop: read screen, evaluate, update
//! opinion, maybe rewire (and maybe be followed back), then post.

use echo_events::{AgentId, Message};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::agent::{Agent, Influence, RewiringMethod, UnfollowWeighting};
use crate::analysis::{screen_diversity, summarize, OpinionSummary};
use crate::config::{Config, ConfigError};
use crate::error::SimResult;
use crate::graph::SocialGraph;
use crate::interventions::{InterventionSchedule, TickParameters};
use crate::output::{Exporter, History};

/// Predicate deciding whether the run has settled and may stop early
pub trait StationaryCheck {
    fn is_stationary(
        &self,
        tick: u64,
        graph: &SocialGraph,
        agents: &[Agent],
        history: &History,
    ) -> bool;
}

/// Never stops early; runs always reach the tick horizon
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStationary;

impl StationaryCheck for NeverStationary {
    fn is_stationary(&self, _: u64, _: &SocialGraph, _: &[Agent], _: &History) -> bool {
        false
    }
}

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub agent: AgentId,
    pub screen_len: usize,
    pub opinion_change: f64,
    /// (unfollowed, followed) by the selected agent
    pub rewired: Option<(AgentId, AgentId)>,
    /// (agent following back, followee it dropped)
    pub reciprocated: Option<(AgentId, AgentId)>,
    pub message: Message,
}

/// Outcome of a full run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub final_tick: u64,
    pub ticks_run: u64,
    pub stopped_early: bool,
    pub rewires: u64,
    pub reciprocations: u64,
    pub opinions: Option<OpinionSummary>,
}

/// Owns the network, the agents and the run's random stream
pub struct Dynamics {
    graph: SocialGraph,
    agents: Vec<Agent>,
    rng: SmallRng,
    params: TickParameters,
    rewiring_methods: Vec<RewiringMethod>,
    unfollow_weighting: UnfollowWeighting,
    opinion_noise: f64,
    post_base_opinion: bool,
    schedule: InterventionSchedule,
    history: History,
    stationary: Box<dyn StationaryCheck>,
    max_ticks: u64,
    snapshot_interval: u64,
    diversity_bins: usize,
    rewires: u64,
    reciprocations: u64,
}

impl Dynamics {
    /// Build the network from `network.seed` and spawn agents from `simulation.seed`
    pub fn new(config: &Config) -> SimResult<Self> {
        config.validate()?;

        let mut topology_rng = SmallRng::seed_from_u64(config.network.seed);
        let graph = SocialGraph::generate(&config.network, &mut topology_rng)?;

        let mut rng = SmallRng::seed_from_u64(config.simulation.seed);
        let agents = (0..graph.num_agents())
            .map(|id| Agent::spawn(id, graph.out_degree(id), &config.agents, &mut rng))
            .collect::<SimResult<Vec<_>>>()?;

        Self::from_parts(graph, agents, config, rng)
    }

    /// Assemble an engine around an existing graph and agent population.
    ///
    /// `config` is validated and must describe one agent per graph node.
    pub fn from_parts(
        graph: SocialGraph,
        mut agents: Vec<Agent>,
        config: &Config,
        rng: SmallRng,
    ) -> SimResult<Self> {
        config.validate()?;
        if agents.len() != graph.num_agents() {
            return Err(ConfigError::Invalid(format!(
                "{} agents for a graph of {} nodes",
                agents.len(),
                graph.num_agents()
            ))
            .into());
        }

        let diversity_bins = config.simulation.diversity_bins;
        let empty_screen = screen_diversity(&[], diversity_bins);
        for agent in agents.iter_mut() {
            agent.screen_diversity = empty_screen;
        }

        let dynamics = &config.dynamics;
        Ok(Self {
            graph,
            agents,
            rng,
            params: TickParameters {
                mu: dynamics.mu,
                repost_probability: dynamics.repost_probability,
                rewire_probability: dynamics.rewire_probability,
                reciprocation_threshold: dynamics.reciprocation_threshold,
                damping: dynamics.damping,
            },
            rewiring_methods: dynamics.rewiring_methods.clone(),
            unfollow_weighting: dynamics.unfollow_weighting,
            opinion_noise: dynamics.opinion_noise,
            post_base_opinion: dynamics.post_base_opinion,
            schedule: InterventionSchedule::new(config.interventions.clone()),
            history: History::new(),
            stationary: Box::new(NeverStationary),
            max_ticks: config.simulation.max_ticks,
            snapshot_interval: config.simulation.snapshot_interval.max(1),
            diversity_bins,
            rewires: 0,
            reciprocations: 0,
        })
    }

    pub fn with_stationary_check(mut self, check: Box<dyn StationaryCheck>) -> Self {
        self.stationary = check;
        self
    }

    pub fn graph(&self) -> &SocialGraph {
        &self.graph
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn params(&self) -> &TickParameters {
        &self.params
    }

    pub fn opinions(&self) -> Vec<f64> {
        self.agents.iter().map(|a| a.opinion).collect()
    }

    /// Run one tick
    pub fn step(&mut self, tick: u64, exporter: &mut dyn Exporter) -> SimResult<TickReport> {
        self.schedule.apply_due(tick, &mut self.agents, &mut self.params);
        self.history.record(tick, &self.agents);

        if tick % self.snapshot_interval == 0 {
            exporter.export_snapshot(tick, &self.graph, &self.agents)?;
        }

        let user = self.rng.gen_range(0..self.agents.len());

        // Read the screen and react to it
        let screen = self.graph.show_screen(user);
        let contents: Vec<f64> = screen.iter().map(|m| m.content).collect();
        let agent = &mut self.agents[user];
        agent.evaluate_messages(&screen);
        agent.screen_diversity = screen_diversity(&contents, self.diversity_bins);

        let influence = Influence {
            mu: self.params.mu,
            damping: self.params.damping,
            noise: self.opinion_noise,
        };
        let opinion_change = agent.update_opinion(influence, &self.graph, &mut self.rng)?;

        let mut rewired = None;
        let mut reciprocated = None;
        if self.rng.gen_bool(self.params.rewire_probability) {
            let decision = self.agents[user].decide_to_rewire(
                &self.graph,
                &self.rewiring_methods,
                self.unfollow_weighting,
                &mut self.rng,
            )?;
            if let Some((unfollow, follow)) = decision {
                if self.try_rewire(user, unfollow, follow)? {
                    rewired = Some((unfollow, follow));
                    self.rewires += 1;
                    reciprocated = self.reciprocate(follow, user)?;
                }
            }
        }

        let message = self.agents[user].post_message(
            tick,
            self.params.repost_probability,
            self.post_base_opinion,
            &mut self.rng,
        );
        self.graph.update_feed(message);
        exporter.record_message(&message)?;

        tracing::debug!(
            "Tick {}: agent {} saw {} messages, opinion change {:.4}, rewired {:?}",
            tick,
            user,
            screen.len(),
            opinion_change,
            rewired
        );

        Ok(TickReport {
            tick,
            agent: user,
            screen_len: screen.len(),
            opinion_change,
            rewired,
            reciprocated,
            message,
        })
    }

    /// `responder` was just followed by `follower`; it may follow back by
    /// dropping its weakest followee
    fn reciprocate(
        &mut self,
        responder: AgentId,
        follower: AgentId,
    ) -> SimResult<Option<(AgentId, AgentId)>> {
        if self.graph.follows(responder, follower) {
            return Ok(None);
        }
        let dropped = match self.agents[responder].decide_to_reciprocate(
            &self.graph,
            follower,
            self.params.reciprocation_threshold,
        ) {
            Some(id) => id,
            None => return Ok(None),
        };

        if self.try_rewire(responder, dropped, follower)? {
            self.reciprocations += 1;
            Ok(Some((responder, dropped)))
        } else {
            Ok(None)
        }
    }

    /// Rewire, skipping (and logging) precondition failures
    fn try_rewire(&mut self, user: AgentId, unfollow: AgentId, follow: AgentId) -> SimResult<bool> {
        match self.graph.rewire(user, unfollow, follow) {
            Ok(()) => Ok(true),
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Skipping rewire of agent {}: {}", user, e);
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Run until the tick horizon or a stationary state, then export
    pub fn run(&mut self, exporter: &mut dyn Exporter) -> SimResult<RunSummary> {
        let mut final_tick = 0;
        let mut stopped_early = false;

        for tick in 0..self.max_ticks {
            self.step(tick, exporter)?;
            final_tick = tick;

            if tick > 0 && tick % self.snapshot_interval == 0 {
                tracing::info!("Tick {} / {}", tick, self.max_ticks);
            }

            if self
                .stationary
                .is_stationary(tick, &self.graph, &self.agents, &self.history)
            {
                tracing::info!("Stationary state reached at tick {}", tick);
                stopped_early = tick + 1 < self.max_ticks;
                break;
            }
        }

        exporter.finish(final_tick, &self.history, &self.graph, &self.agents)?;

        let summary = RunSummary {
            final_tick,
            ticks_run: final_tick + 1,
            stopped_early,
            rewires: self.rewires,
            reciprocations: self.reciprocations,
            opinions: summarize(&self.opinions()),
        };
        tracing::info!(
            "Simulation complete after {} ticks: {} rewires, {} reciprocations",
            summary.ticks_run,
            summary.rewires,
            summary.reciprocations
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;
    use crate::interventions::{Parameter, ScheduledIntervention};
    use crate::output::NullExporter;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.network.num_agents = 30;
        config.network.num_links = 120;
        config.simulation.max_ticks = 300;
        config.simulation.snapshot_interval = 100;
        config
    }

    #[test]
    fn test_run_reaches_horizon() {
        let mut dynamics = Dynamics::new(&small_config()).unwrap();
        let mut exporter = NullExporter::new();

        let summary = dynamics.run(&mut exporter).unwrap();

        assert_eq!(summary.final_tick, 299);
        assert_eq!(summary.ticks_run, 300);
        assert!(!summary.stopped_early);
        assert_eq!(exporter.messages, 300);
        assert_eq!(exporter.snapshots, vec![0, 100, 200]);
        assert_eq!(exporter.finished_at, Some(299));
        assert_eq!(dynamics.history().len(), 300);
    }

    #[test]
    fn test_invariants_hold_every_tick() {
        let mut config = small_config();
        config.dynamics.rewire_probability = 1.0;
        config.dynamics.reciprocation_threshold = 0.5;
        let mut dynamics = Dynamics::new(&config).unwrap();
        let mut exporter = NullExporter::new();
        let n = config.network.num_agents;
        let edges = dynamics.graph().edge_count();

        for tick in 0..300 {
            let before = dynamics.agents().iter().map(|a| a.opinion).collect::<Vec<_>>();
            let report = dynamics.step(tick, &mut exporter).unwrap();
            let graph = dynamics.graph();

            assert!(!graph.has_self_loops());
            assert!(graph.feed().len() <= n);
            assert_eq!(graph.edge_count(), edges);
            for id in 0..n {
                let d = graph.out_degree(id);
                assert!(d >= 1 && d <= graph.degree_cap());
            }

            let agent = &dynamics.agents()[report.agent];
            let delta = agent.opinion - before[report.agent];
            assert!(delta.abs() <= 1.0);
            assert_eq!(
                agent.concordant().len() + agent.discordant().len(),
                report.screen_len
            );
            assert_eq!(report.message.who_posted, report.agent);
        }
    }

    #[test]
    fn test_no_rewiring_keeps_topology() {
        let mut config = small_config();
        config.dynamics.rewire_probability = 0.0;
        let mut dynamics = Dynamics::new(&config).unwrap();
        let edges_before: Vec<_> = dynamics.graph().edges().collect();

        let summary = dynamics.run(&mut NullExporter::new()).unwrap();

        assert_eq!(summary.rewires, 0);
        assert_eq!(dynamics.graph().edges().collect::<Vec<_>>(), edges_before);
    }

    #[test]
    fn test_epsilon_intervention_applied() {
        let mut config = small_config();
        config.simulation.max_ticks = 20;
        config.interventions = vec![ScheduledIntervention::new(10, Parameter::Epsilon, 0.05)];
        let mut dynamics = Dynamics::new(&config).unwrap();
        let mut exporter = NullExporter::new();

        for tick in 0..10 {
            dynamics.step(tick, &mut exporter).unwrap();
        }
        assert!(dynamics.agents().iter().all(|a| a.epsilon == 0.7));

        dynamics.step(10, &mut exporter).unwrap();
        assert!(dynamics.agents().iter().all(|a| a.epsilon == 0.05));
    }

    struct StopAt(u64);

    impl StationaryCheck for StopAt {
        fn is_stationary(&self, tick: u64, _: &SocialGraph, _: &[Agent], _: &History) -> bool {
            tick >= self.0
        }
    }

    #[test]
    fn test_stationary_check_stops_early() {
        let mut dynamics = Dynamics::new(&small_config())
            .unwrap()
            .with_stationary_check(Box::new(StopAt(49)));
        let mut exporter = NullExporter::new();

        let summary = dynamics.run(&mut exporter).unwrap();

        assert!(summary.stopped_early);
        assert_eq!(summary.final_tick, 49);
        assert_eq!(exporter.finished_at, Some(49));
        assert_eq!(exporter.messages, 50);
    }

    #[test]
    fn test_from_parts_validates_config() {
        let mut config = small_config();
        let mut rng = SmallRng::seed_from_u64(3);
        let graph = SocialGraph::generate(&config.network, &mut rng).unwrap();
        let agents: Vec<Agent> = (0..graph.num_agents())
            .map(|id| Agent::new(id, 0.0, 0.7, 0.2))
            .collect();

        config.dynamics.repost_probability = 1.5;
        let result = Dynamics::from_parts(graph.clone(), agents.clone(), &config, rng.clone());
        assert!(matches!(result, Err(SimError::Config(ConfigError::Invalid(_)))));

        config.dynamics.repost_probability = 0.5;
        let too_few = agents[..5].to_vec();
        let result = Dynamics::from_parts(graph.clone(), too_few, &config, rng.clone());
        assert!(matches!(result, Err(SimError::Config(ConfigError::Invalid(_)))));

        let mut dynamics = Dynamics::from_parts(graph, agents, &config, rng).unwrap();
        assert!(dynamics.step(0, &mut NullExporter::new()).is_ok());
    }

    #[test]
    fn test_initial_screen_diversity_is_empty_screen_entropy() {
        let dynamics = Dynamics::new(&small_config()).unwrap();
        let expected = screen_diversity(&[], 10);
        assert!(dynamics.agents().iter().all(|a| a.screen_diversity == expected));
    }
}
