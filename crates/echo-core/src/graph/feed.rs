//! Message Feed
//!
//! Fixed-capacity history of the most recent messages. Appending past
//! capacity evicts the oldest entries first.

use echo_events::Message;
use std::collections::VecDeque;

/// Bounded FIFO of messages, oldest at the front
#[derive(Debug, Clone)]
pub struct Feed {
    messages: VecDeque<Message>,
    capacity: usize,
}

impl Feed {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append a message, returning whatever was evicted to stay within capacity
    pub fn push(&mut self, msg: Message) -> Vec<Message> {
        self.messages.push_back(msg);
        let mut evicted = Vec::new();
        while self.messages.len() > self.capacity {
            if let Some(oldest) = self.messages.pop_front() {
                evicted.push(oldest);
            }
        }
        evicted
    }

    /// Iterate in feed order (oldest first)
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Message> + '_ {
        self.messages.iter()
    }

    pub fn oldest(&self) -> Option<&Message> {
        self.messages.front()
    }

    pub fn newest(&self) -> Option<&Message> {
        self.messages.back()
    }

    /// The last `limit` messages matching `filter`, returned in feed order
    pub fn recent_matching<F>(&self, limit: usize, mut filter: F) -> Vec<Message>
    where
        F: FnMut(&Message) -> bool,
    {
        let mut window: Vec<Message> = self
            .messages
            .iter()
            .rev()
            .filter(|&m| filter(m))
            .take(limit)
            .copied()
            .collect();
        window.reverse();
        window
    }
}
