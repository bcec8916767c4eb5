//! Echo Chamber Dynamics Engine
//!
//! Agents with scalar opinions read messages from the agents they follow,
//! update their opinions under bounded-confidence influence, repost what they
//! agree with, and rewire away from disagreement. Social capital (out-degree)
//! weights both influence and rewiring.

pub mod agent;
pub mod analysis;
pub mod choice;
pub mod config;
pub mod engine;
pub mod error;
pub mod graph;
pub mod interventions;
pub mod output;

pub use agent::{Agent, Influence, RewiringMethod, UnfollowWeighting};
pub use config::{Config, ConfigError};
pub use engine::{Dynamics, NeverStationary, RunSummary, StationaryCheck, TickReport};
pub use error::{SimError, SimResult};
pub use graph::{Feed, SocialGraph};
pub use interventions::{InterventionSchedule, Parameter, ScheduledIntervention};
pub use output::{Exporter, History, JsonExporter, NullExporter};

pub use echo_events::{AgentId, Message};
