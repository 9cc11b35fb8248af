//! Per-stream request sequencing.
//!
//! Every dispatched request gets a ticket carrying a monotonically
//! increasing number for its logical stream. In discard mode a response is
//! applied only if its ticket is still the latest issued on that stream.

use crate::api::{CommentId, PostId, UserId};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Feed,
    Suggestions,
    Search,
    ProfilePosts,
    Comments(PostId),
    Like(PostId),
    CommentLike(CommentId),
    Follow(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub stream: Stream,
    pub seq: u64,
}

#[derive(Debug, Clone)]
pub struct Sequencer {
    latest: HashMap<Stream, u64>,
    discard_stale: bool,
}

impl Sequencer {
    pub fn new(discard_stale: bool) -> Self {
        Self {
            latest: HashMap::new(),
            discard_stale,
        }
    }

    pub fn issue(&mut self, stream: Stream) -> Ticket {
        let seq = self.latest.entry(stream).or_insert(0);
        *seq += 1;
        Ticket { stream, seq: *seq }
    }

    pub fn is_latest(&self, ticket: &Ticket) -> bool {
        self.latest.get(&ticket.stream) == Some(&ticket.seq)
    }

    /// Whether a response for `ticket` may be applied.
    pub fn accepts(&self, ticket: &Ticket) -> bool {
        !self.discard_stale || self.is_latest(ticket)
    }
}
