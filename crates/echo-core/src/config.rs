//! Configuration System
//!
//! Loads simulation parameters from a TOML file so runs can be tuned without
//! recompiling. Every section falls back to the reference parameter set.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

use crate::agent::{RewiringMethod, UnfollowWeighting};
use crate::interventions::{Parameter, ScheduledIntervention};

/// Default configuration file path
pub const DEFAULT_CONFIG_PATH: &str = "echo_chamber.toml";

/// Top-level configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub agents: AgentConfig,
    #[serde(default)]
    pub dynamics: DynamicsConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Scheduled parameter changes, applied at tick boundaries
    #[serde(default)]
    pub interventions: Vec<ScheduledIntervention>,
}

/// Social graph construction parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub num_agents: usize,
    pub num_links: usize,
    /// Number of messages shown on an agent's screen
    pub screen_size: usize,
    /// Upper bound on in-degree and out-degree
    pub degree_cap: usize,
    /// Seed for the topology generator
    pub seed: u64,
}

impl NetworkConfig {
    /// Degree cap actually achievable in a simple digraph of this size
    pub fn effective_degree_cap(&self) -> usize {
        self.degree_cap.min(self.num_agents.saturating_sub(1))
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            num_agents: 100,
            num_links: 400,
            screen_size: 10,
            degree_cap: 50,
            seed: 1,
        }
    }
}

/// Initial agent state parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Bounded-confidence threshold
    pub epsilon: f64,
    /// Restoring force toward the base opinion
    pub k_internal: f64,
    /// Dispersion of the initial opinion distribution
    pub opinion_std: f64,
    /// |base_opinion| above which k_internal is boosted
    pub extreme_opinion_threshold: f64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            epsilon: 0.7,
            k_internal: 0.2,
            opinion_std: 0.6,
            extreme_opinion_threshold: 1.0,
        }
    }
}

/// Per-tick behavioral parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DynamicsConfig {
    /// Social influence strength
    pub mu: f64,
    pub repost_probability: f64,
    pub rewire_probability: f64,
    /// Social capital ratio above which a followed agent follows back
    pub reciprocation_threshold: f64,
    pub damping: f64,
    /// Magnitude of the stochastic opinion perturbation
    pub opinion_noise: f64,
    pub rewiring_methods: Vec<RewiringMethod>,
    pub unfollow_weighting: UnfollowWeighting,
    /// Original posts carry the base opinion instead of the current one
    pub post_base_opinion: bool,
}

impl Default for DynamicsConfig {
    fn default() -> Self {
        Self {
            mu: 0.5,
            repost_probability: 0.5,
            rewire_probability: 0.5,
            reciprocation_threshold: 3.0,
            damping: 0.5,
            opinion_noise: 0.0,
            rewiring_methods: vec![
                RewiringMethod::Random,
                RewiringMethod::Repost,
                RewiringMethod::Recommendation,
            ],
            unfollow_weighting: UnfollowWeighting::Uniform,
            post_base_opinion: false,
        }
    }
}

/// Run control parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub max_ticks: u64,
    /// Seed for per-tick draws and initial opinions
    pub seed: u64,
    /// Interval between graph snapshots (in ticks)
    pub snapshot_interval: u64,
    /// Histogram bins for the screen diversity entropy
    pub diversity_bins: usize,
    pub output_dir: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks: 100,
            seed: 42,
            snapshot_interval: 1000,
            diversity_bins: 10,
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        fs::read_to_string(path.as_ref())?.parse()
    }

    /// Load configuration from default path, or use defaults if not found
    pub fn load_or_default() -> Result<Self, ConfigError> {
        if Path::new(DEFAULT_CONFIG_PATH).exists() {
            Self::load(DEFAULT_CONFIG_PATH)
        } else {
            tracing::warn!(
                "No {} found, using default parameters",
                DEFAULT_CONFIG_PATH
            );
            Ok(Self::default())
        }
    }

    /// Check parameter ranges and cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let net = &self.network;
        if net.num_agents < 2 {
            return Err(ConfigError::invalid("network.num_agents must be at least 2"));
        }
        if net.screen_size == 0 {
            return Err(ConfigError::invalid("network.screen_size must be at least 1"));
        }
        let cap = net.effective_degree_cap();
        if cap == 0 {
            return Err(ConfigError::invalid("network.degree_cap must be at least 1"));
        }
        if net.num_links < net.num_agents || net.num_links > net.num_agents * cap {
            return Err(ConfigError::Invalid(format!(
                "network.num_links must be between {} and {} (got {})",
                net.num_agents,
                net.num_agents * cap,
                net.num_links
            )));
        }

        let agents = &self.agents;
        if agents.opinion_std.is_nan() || agents.opinion_std <= 0.0 {
            return Err(ConfigError::invalid("agents.opinion_std must be positive"));
        }
        if agents.epsilon < 0.0 {
            return Err(ConfigError::invalid("agents.epsilon must not be negative"));
        }

        let dynamics = &self.dynamics;
        check_probability("dynamics.repost_probability", dynamics.repost_probability)?;
        check_probability("dynamics.rewire_probability", dynamics.rewire_probability)?;
        if dynamics.opinion_noise < 0.0 {
            return Err(ConfigError::invalid("dynamics.opinion_noise must not be negative"));
        }
        if dynamics.rewiring_methods.is_empty() {
            return Err(ConfigError::invalid("dynamics.rewiring_methods must not be empty"));
        }

        let sim = &self.simulation;
        if sim.max_ticks == 0 {
            return Err(ConfigError::invalid("simulation.max_ticks must be at least 1"));
        }
        if sim.snapshot_interval == 0 {
            return Err(ConfigError::invalid("simulation.snapshot_interval must be at least 1"));
        }
        if sim.diversity_bins == 0 {
            return Err(ConfigError::invalid("simulation.diversity_bins must be at least 1"));
        }

        for intervention in &self.interventions {
            match intervention.parameter {
                Parameter::RepostProbability | Parameter::RewireProbability => {
                    check_probability("interventions.value", intervention.value)?
                }
                Parameter::Epsilon if intervention.value < 0.0 => {
                    return Err(ConfigError::invalid("interventions epsilon must not be negative"))
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// Parse and validate configuration from a TOML string
impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(content: &str) -> Result<Self, Self::Err> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }
}

fn check_probability(name: &str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} must be within [0, 1] (got {})",
            name, value
        )))
    }
}

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn invalid(message: &str) -> Self {
        ConfigError::Invalid(message.to_string())
    }
}
