//! Message Types
//!
//! A message is the unit that flows through the feed: either an original post
//! carrying its author's opinion, or a repost of someone else's post.

use serde::{Deserialize, Serialize};

use crate::AgentId;

/// Immutable record of a single post or repost event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Identifier of this posting event (the tick it was produced on)
    pub msg_id: u64,
    /// Identifier of the original post; equals `msg_id` for original posts
    pub orig_msg_id: u64,
    /// Agent that put this message in the feed
    pub who_posted: AgentId,
    /// Agent that wrote the original post
    pub who_originated: AgentId,
    /// Opinion value carried by the message
    pub content: f64,
}

impl Message {
    /// Create an original post authored by `author`.
    pub fn original(msg_id: u64, author: AgentId, content: f64) -> Self {
        Self {
            msg_id,
            orig_msg_id: msg_id,
            who_posted: author,
            who_originated: author,
            content,
        }
    }

    /// Repost this message on behalf of `reposter` under a new id.
    ///
    /// Origin and content are carried over unchanged.
    pub fn repost(&self, msg_id: u64, reposter: AgentId) -> Self {
        Self {
            msg_id,
            orig_msg_id: self.orig_msg_id,
            who_posted: reposter,
            who_originated: self.who_originated,
            content: self.content,
        }
    }

    pub fn is_original(&self) -> bool {
        self.msg_id == self.orig_msg_id && self.who_posted == self.who_originated
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_original_message() {
        let msg = Message::original(7, 3, 0.25);
        assert_eq!(msg.orig_msg_id, 7);
        assert_eq!(msg.who_posted, 3);
        assert_eq!(msg.who_originated, 3);
        assert!(msg.is_original());
    }

    #[test]
    fn test_repost_keeps_origin() {
        let msg = Message::original(7, 3, 0.25);
        let repost = msg.repost(12, 5);

        assert_eq!(repost.msg_id, 12);
        assert_eq!(repost.orig_msg_id, 7);
        assert_eq!(repost.who_posted, 5);
        assert_eq!(repost.who_originated, 3);
        assert_eq!(repost.content, 0.25);
        assert!(!repost.is_original());
    }

    #[test]
    fn test_message_json_fields() {
        let msg = Message::original(1, 2, -0.5);
        let json = serde_json::to_value(msg).unwrap();
        assert_eq!(json["msg_id"], 1);
        assert_eq!(json["orig_msg_id"], 1);
        assert_eq!(json["who_posted"], 2);
        assert_eq!(json["who_originated"], 2);
        assert_eq!(json["content"], -0.5);
    }
}
