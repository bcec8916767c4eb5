//! Simulation Errors

use echo_events::AgentId;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised while building or running the simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// A random choice was requested from an empty candidate set
    #[error("invalid selection: no candidates for {context}")]
    InvalidSelection { context: &'static str },

    /// The network could not be generated from the configured parameters
    #[error("graph construction failed: {0}")]
    GraphConstruction(String),

    #[error("self-loop rejected at agent {0}")]
    SelfLoop(AgentId),

    #[error("agent {user} does not follow agent {target}")]
    NotFollowing { user: AgentId, target: AgentId },

    #[error("agent {user} already follows agent {target}")]
    AlreadyFollowing { user: AgentId, target: AgentId },

    #[error("unknown agent {0}")]
    UnknownAgent(AgentId),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Graph precondition failures that a tick may skip over.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SimError::SelfLoop(_)
                | SimError::NotFollowing { .. }
                | SimError::AlreadyFollowing { .. }
        )
    }
}

pub type SimResult<T> = Result<T, SimError>;
