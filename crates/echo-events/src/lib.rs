//! Shared record types for the echo chamber simulation.
//!
//! This crate contains pure data structures with no simulation logic.
//! It is a dependency for all other crates in the workspace.

pub mod message;
pub mod snapshot;

/// Identifier of an agent, equal to its node index in the social graph.
pub type AgentId = usize;

// Re-export message types
pub use message::Message;

// Re-export snapshot types
pub use snapshot::{generate_snapshot_id, EdgeSnapshot, GraphSnapshot, NodeSnapshot, TickSeries};
