//! Output
//!
//! Per-tick history collection and the exporters that write snapshots, series
//! and the message log.

pub mod json;
pub mod logger;

pub use json::JsonExporter;
pub use logger::MessageLogger;

use echo_events::{GraphSnapshot, Message, NodeSnapshot, TickSeries};

use crate::agent::Agent;
use crate::error::SimResult;
use crate::graph::SocialGraph;

/// Opinion and screen diversity vectors recorded at the start of every tick
#[derive(Debug, Clone, Default)]
pub struct History {
    pub opinions: Vec<TickSeries>,
    pub screen_diversity: Vec<TickSeries>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, tick: u64, agents: &[Agent]) {
        self.opinions.push(TickSeries {
            tick,
            values: agents.iter().map(|a| a.opinion).collect(),
        });
        self.screen_diversity.push(TickSeries {
            tick,
            values: agents.iter().map(|a| a.screen_diversity).collect(),
        });
    }

    pub fn len(&self) -> usize {
        self.opinions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opinions.is_empty()
    }
}

/// Capture the graph and every agent's opinion at `tick`
pub fn capture_snapshot(tick: u64, graph: &SocialGraph, agents: &[Agent]) -> GraphSnapshot {
    let mut snapshot = GraphSnapshot::new(tick);
    snapshot.nodes = agents
        .iter()
        .map(|a| NodeSnapshot {
            id: a.id,
            opinion: a.opinion,
            base_opinion: a.base_opinion(),
            out_degree: graph.out_degree(a.id),
            in_degree: graph.in_degree(a.id),
        })
        .collect();
    snapshot.edges = graph.edges().collect();
    snapshot
}

/// Sink for everything the engine reports
pub trait Exporter {
    /// Called for every message appended to the feed
    fn record_message(&mut self, msg: &Message) -> SimResult<()>;

    /// Called every snapshot interval. A second call for the same tick
    /// replaces the earlier snapshot.
    fn export_snapshot(
        &mut self,
        tick: u64,
        graph: &SocialGraph,
        agents: &[Agent],
    ) -> SimResult<()>;

    /// Called once when the run terminates
    fn finish(
        &mut self,
        tick: u64,
        history: &History,
        graph: &SocialGraph,
        agents: &[Agent],
    ) -> SimResult<()>;
}

/// Exporter that discards everything (for testing)
#[derive(Debug, Default)]
pub struct NullExporter {
    pub messages: usize,
    pub snapshots: Vec<u64>,
    pub finished_at: Option<u64>,
}

impl NullExporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Exporter for NullExporter {
    fn record_message(&mut self, _msg: &Message) -> SimResult<()> {
        self.messages += 1;
        Ok(())
    }

    fn export_snapshot(&mut self, tick: u64, _: &SocialGraph, _: &[Agent]) -> SimResult<()> {
        self.snapshots.push(tick);
        Ok(())
    }

    fn finish(
        &mut self,
        tick: u64,
        _history: &History,
        _graph: &SocialGraph,
        _agents: &[Agent],
    ) -> SimResult<()> {
        self.finished_at = Some(tick);
        Ok(())
    }
}
