//! Social Graph
//!
//! Directed "follows" network plus the bounded message feed. Edge `u -> v`
//! means `u` follows `v` and sees what `v` posts.

pub mod construction;
pub mod feed;

pub use feed::Feed;

use echo_events::{AgentId, EdgeSnapshot, Message};
use std::collections::BTreeSet;

use crate::error::{SimError, SimResult};

/// Directed social network with per-node successor/predecessor sets
#[derive(Debug, Clone)]
pub struct SocialGraph {
    /// successors[u] = agents that u follows
    successors: Vec<BTreeSet<AgentId>>,
    /// predecessors[v] = agents following v
    predecessors: Vec<BTreeSet<AgentId>>,
    feed: Feed,
    screen_size: usize,
    degree_cap: usize,
}

impl SocialGraph {
    /// Graph with no edges and an empty feed sized to the population
    pub fn empty(num_agents: usize, screen_size: usize, degree_cap: usize) -> Self {
        Self {
            successors: vec![BTreeSet::new(); num_agents],
            predecessors: vec![BTreeSet::new(); num_agents],
            feed: Feed::new(num_agents),
            screen_size,
            degree_cap,
        }
    }

    pub fn num_agents(&self) -> usize {
        self.successors.len()
    }

    pub fn screen_size(&self) -> usize {
        self.screen_size
    }

    pub fn degree_cap(&self) -> usize {
        self.degree_cap
    }

    pub fn edge_count(&self) -> usize {
        self.successors.iter().map(BTreeSet::len).sum()
    }

    /// Number of agents this agent follows; doubles as its social capital
    pub fn out_degree(&self, id: AgentId) -> usize {
        self.successors.get(id).map_or(0, BTreeSet::len)
    }

    pub fn in_degree(&self, id: AgentId) -> usize {
        self.predecessors.get(id).map_or(0, BTreeSet::len)
    }

    pub fn follows(&self, user: AgentId, target: AgentId) -> bool {
        self.successors
            .get(user)
            .is_some_and(|s| s.contains(&target))
    }

    /// Agents followed by `user`, in ascending id order
    pub fn followees(&self, user: AgentId) -> impl Iterator<Item = AgentId> + '_ {
        self.successors.get(user).into_iter().flatten().copied()
    }

    /// Agents following `target`, in ascending id order
    pub fn followers(&self, target: AgentId) -> impl Iterator<Item = AgentId> + '_ {
        self.predecessors.get(target).into_iter().flatten().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = EdgeSnapshot> + '_ {
        self.successors.iter().enumerate().flat_map(|(source, targets)| {
            targets.iter().map(move |&target| EdgeSnapshot { source, target })
        })
    }

    pub fn has_self_loops(&self) -> bool {
        self.successors
            .iter()
            .enumerate()
            .any(|(id, targets)| targets.contains(&id))
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    fn check_agent(&self, id: AgentId) -> SimResult<()> {
        if id < self.num_agents() {
            Ok(())
        } else {
            Err(SimError::UnknownAgent(id))
        }
    }

    /// Add `user -> target`; returns false if the edge already existed
    pub fn add_edge(&mut self, user: AgentId, target: AgentId) -> SimResult<bool> {
        self.check_agent(user)?;
        self.check_agent(target)?;
        if user == target {
            return Err(SimError::SelfLoop(user));
        }
        let inserted = self.successors[user].insert(target);
        if inserted {
            self.predecessors[target].insert(user);
        }
        Ok(inserted)
    }

    /// Remove `user -> target`; returns false if there was no such edge
    pub fn remove_edge(&mut self, user: AgentId, target: AgentId) -> SimResult<bool> {
        self.check_agent(user)?;
        self.check_agent(target)?;
        let removed = self.successors[user].remove(&target);
        if removed {
            self.predecessors[target].remove(&user);
        }
        Ok(removed)
    }

    /// Swap `user -> unfollow` for `user -> follow`, leaving out-degree unchanged.
    ///
    /// All preconditions are checked before the graph is touched.
    pub fn rewire(&mut self, user: AgentId, unfollow: AgentId, follow: AgentId) -> SimResult<()> {
        self.check_agent(user)?;
        self.check_agent(unfollow)?;
        self.check_agent(follow)?;
        if follow == user {
            return Err(SimError::SelfLoop(user));
        }
        if !self.follows(user, unfollow) {
            return Err(SimError::NotFollowing {
                user,
                target: unfollow,
            });
        }
        if self.follows(user, follow) {
            return Err(SimError::AlreadyFollowing {
                user,
                target: follow,
            });
        }

        self.remove_edge(user, unfollow)?;
        self.add_edge(user, follow)?;
        tracing::debug!("Agent {} unfollowed {} and followed {}", user, unfollow, follow);
        Ok(())
    }

    /// Most recent messages posted by followees of `user`, oldest first.
    ///
    /// Messages that `user` originated are never shown back to them.
    pub fn show_screen(&self, user: AgentId) -> Vec<Message> {
        self.feed.recent_matching(self.screen_size, |m| {
            m.who_originated != user && self.follows(user, m.who_posted)
        })
    }

    /// Append a message to the feed, returning evicted messages
    pub fn update_feed(&mut self, msg: Message) -> Vec<Message> {
        self.feed.push(msg)
    }

    /// Authors of recent messages close to `user`'s latest own post.
    ///
    /// Current followees and `user` are excluded. Empty if `user` has no
    /// originated message in the feed.
    pub fn recommend_similar(&self, user: AgentId, epsilon: f64) -> BTreeSet<AgentId> {
        let last_content = match self.feed.iter().rev().find(|m| m.who_originated == user) {
            Some(msg) => msg.content,
            None => return BTreeSet::new(),
        };

        self.feed
            .iter()
            .rev()
            .filter(|m| m.who_originated != user)
            .take(self.num_agents())
            .filter(|m| (last_content - m.content).abs() < epsilon)
            .map(|m| m.who_originated)
            .filter(|&author| !self.follows(user, author))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 10 agents; agent 3 follows 7 and 1
    fn sample_graph() -> SocialGraph {
        let mut graph = SocialGraph::empty(10, 3, 9);
        graph.add_edge(3, 7).unwrap();
        graph.add_edge(3, 1).unwrap();
        graph.add_edge(7, 3).unwrap();
        graph.add_edge(9, 7).unwrap();
        graph
    }

    #[test]
    fn test_rewire_preserves_out_degree() {
        let mut graph = sample_graph();
        let before = graph.out_degree(3);

        graph.rewire(3, 7, 9).unwrap();

        assert!(graph.follows(3, 9));
        assert!(!graph.follows(3, 7));
        assert_eq!(graph.out_degree(3), before);
        assert_eq!(graph.in_degree(9), 1);
        assert_eq!(graph.followers(7).collect::<Vec<_>>(), vec![9]);
    }

    #[test]
    fn test_rewire_precondition_failures_leave_graph_untouched() {
        let mut graph = sample_graph();

        let err = graph.rewire(3, 5, 9).unwrap_err();
        assert!(matches!(err, SimError::NotFollowing { user: 3, target: 5 }));

        let err = graph.rewire(3, 7, 1).unwrap_err();
        assert!(matches!(err, SimError::AlreadyFollowing { user: 3, target: 1 }));

        let err = graph.rewire(3, 7, 3).unwrap_err();
        assert!(matches!(err, SimError::SelfLoop(3)));

        let err = graph.rewire(3, 7, 42).unwrap_err();
        assert!(matches!(err, SimError::UnknownAgent(42)));

        assert!(graph.follows(3, 7));
        assert_eq!(graph.out_degree(3), 2);
    }

    #[test]
    fn test_add_edge_rejects_self_loop() {
        let mut graph = sample_graph();
        assert!(matches!(graph.add_edge(4, 4), Err(SimError::SelfLoop(4))));
        assert!(!graph.has_self_loops());
        assert!(!graph.add_edge(3, 7).unwrap());
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_show_screen_filters_followees_and_own_posts() {
        let mut graph = sample_graph();
        graph.update_feed(Message::original(0, 7, 0.1));
        graph.update_feed(Message::original(1, 2, 0.2)); // not followed
        graph.update_feed(Message::original(2, 1, 0.3));
        let own = Message::original(3, 3, 0.4);
        graph.update_feed(own);
        graph.update_feed(own.repost(4, 7)); // own opinion coming back
        graph.update_feed(Message::original(5, 7, 0.5));
        graph.update_feed(Message::original(6, 1, 0.6));

        let screen = graph.show_screen(3);
        let ids: Vec<u64> = screen.iter().map(|m| m.msg_id).collect();
        // Screen size is 3: the newest three qualifying messages in feed order
        assert_eq!(ids, vec![2, 5, 6]);

        assert!(graph.show_screen(4).is_empty());
    }

    #[test]
    fn test_recommend_similar() {
        let mut graph = sample_graph();
        assert!(graph.recommend_similar(3, 0.5).is_empty());

        graph.update_feed(Message::original(0, 3, 0.0));
        graph.update_feed(Message::original(1, 5, 0.2));
        graph.update_feed(Message::original(2, 6, 0.9));
        graph.update_feed(Message::original(3, 7, 0.1)); // already followed
        graph.update_feed(Message::original(4, 8, -0.3));

        let similar = graph.recommend_similar(3, 0.5);
        assert_eq!(similar.into_iter().collect::<Vec<_>>(), vec![5, 8]);
    }

    #[test]
    fn test_update_feed_bounded_by_population() {
        let mut graph = SocialGraph::empty(4, 2, 3);
        for t in 0..10 {
            graph.update_feed(Message::original(t, 0, 0.0));
            assert!(graph.feed().len() <= 4);
        }
        assert_eq!(graph.feed().oldest().map(|m| m.msg_id), Some(6));
    }

    #[test]
    fn test_edges_listing() {
        let graph = sample_graph();
        let edges: Vec<(usize, usize)> = graph.edges().map(|e| (e.source, e.target)).collect();
        assert_eq!(edges, vec![(3, 1), (3, 7), (7, 3), (9, 7)]);
    }
}
