//! Intervention Schedule
//!
//! Ordered table of global parameter changes applied by the engine at tick
//! boundaries. Each entry fires exactly once, at the start of its tick.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;

/// Global parameters an intervention may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    /// Bounded-confidence threshold of every agent
    Epsilon,
    Mu,
    RepostProbability,
    RewireProbability,
    ReciprocationThreshold,
    Damping,
}

/// A single scheduled change: set `parameter` to `value` at `at_tick`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScheduledIntervention {
    pub at_tick: u64,
    pub parameter: Parameter,
    pub value: f64,
}

impl ScheduledIntervention {
    pub fn new(at_tick: u64, parameter: Parameter, value: f64) -> Self {
        Self {
            at_tick,
            parameter,
            value,
        }
    }
}

/// Engine-level parameters that interventions can modify
#[derive(Debug, Clone, PartialEq)]
pub struct TickParameters {
    pub mu: f64,
    pub repost_probability: f64,
    pub rewire_probability: f64,
    pub reciprocation_threshold: f64,
    pub damping: f64,
}

/// Interventions sorted by tick, consumed in order as the run advances
#[derive(Debug, Clone, Default)]
pub struct InterventionSchedule {
    entries: Vec<ScheduledIntervention>,
    cursor: usize,
}

impl InterventionSchedule {
    /// Build a schedule; entries sharing a tick keep their given order
    pub fn new(mut entries: Vec<ScheduledIntervention>) -> Self {
        entries.sort_by_key(|e| e.at_tick);
        Self { entries, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries not yet applied
    pub fn remaining(&self) -> usize {
        self.entries.len() - self.cursor
    }

    /// Apply every entry due at or before `tick` that has not fired yet.
    ///
    /// Returns the entries applied during this call.
    pub fn apply_due(
        &mut self,
        tick: u64,
        agents: &mut [Agent],
        params: &mut TickParameters,
    ) -> Vec<ScheduledIntervention> {
        let mut applied = Vec::new();
        while let Some(entry) = self.entries.get(self.cursor) {
            if entry.at_tick > tick {
                break;
            }
            apply_intervention(entry, agents, params);
            applied.push(*entry);
            self.cursor += 1;
        }
        applied
    }
}

fn apply_intervention(
    entry: &ScheduledIntervention,
    agents: &mut [Agent],
    params: &mut TickParameters,
) {
    tracing::info!(
        "Tick {}: setting {:?} to {}",
        entry.at_tick,
        entry.parameter,
        entry.value
    );
    match entry.parameter {
        Parameter::Epsilon => {
            for agent in agents.iter_mut() {
                agent.epsilon = entry.value;
            }
        }
        Parameter::Mu => params.mu = entry.value,
        Parameter::RepostProbability => params.repost_probability = entry.value,
        Parameter::RewireProbability => params.rewire_probability = entry.value,
        Parameter::ReciprocationThreshold => params.reciprocation_threshold = entry.value,
        Parameter::Damping => params.damping = entry.value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TickParameters {
        TickParameters {
            mu: 0.5,
            repost_probability: 0.5,
            rewire_probability: 0.5,
            reciprocation_threshold: 3.0,
            damping: 0.5,
        }
    }

    fn agents() -> Vec<Agent> {
        (0..3).map(|i| Agent::new(i, 0.0, 0.7, 0.2)).collect()
    }

    #[test]
    fn test_entries_fire_once_in_tick_order() {
        let mut schedule = InterventionSchedule::new(vec![
            ScheduledIntervention::new(15, Parameter::Epsilon, 0.7),
            ScheduledIntervention::new(10, Parameter::Epsilon, 0.4),
        ]);
        let mut agents = agents();
        let mut params = params();

        assert!(schedule.apply_due(9, &mut agents, &mut params).is_empty());

        let applied = schedule.apply_due(10, &mut agents, &mut params);
        assert_eq!(applied.len(), 1);
        assert!(agents.iter().all(|a| a.epsilon == 0.4));

        // Nothing re-fires on later ticks
        assert!(schedule.apply_due(11, &mut agents, &mut params).is_empty());
        assert!(agents.iter().all(|a| a.epsilon == 0.4));

        schedule.apply_due(15, &mut agents, &mut params);
        assert!(agents.iter().all(|a| a.epsilon == 0.7));
        assert_eq!(schedule.remaining(), 0);
    }

    #[test]
    fn test_engine_parameters_updated() {
        let mut schedule = InterventionSchedule::new(vec![
            ScheduledIntervention::new(0, Parameter::Mu, 0.1),
            ScheduledIntervention::new(0, Parameter::RewireProbability, 0.0),
            ScheduledIntervention::new(0, Parameter::Damping, 0.9),
        ]);
        let mut agents = agents();
        let mut params = params();

        let applied = schedule.apply_due(0, &mut agents, &mut params);
        assert_eq!(applied.len(), 3);
        assert_eq!(params.mu, 0.1);
        assert_eq!(params.rewire_probability, 0.0);
        assert_eq!(params.damping, 0.9);
        assert_eq!(params.repost_probability, 0.5);
        assert!(agents.iter().all(|a| a.epsilon == 0.7));
    }
}
