//! # Post Lifecycle
//!
//! The finite state machine deciding what a post under composition may do.
//!
//! ```text
//!   Draft ──SentAllocRequest──▶ Allocating ──AllocAcknowledged──▶ Alloc
//!     │                             │                               │
//!     └────────── Close / Expire ───┴───────────────────────────────┴──▶ Halted
//! ```
//!
//! `Halted` is terminal. An ack arriving after a halt leaves the phase alone.

use serde::{Deserialize, Serialize};

use crate::models::PostId;

/// Editability phase of a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PostPhase {
    /// Not known to the server yet
    Draft,
    /// Allocation request sent, waiting for the id
    Allocating,
    /// Server assigned an id; edits flow as incremental messages
    Alloc,
    /// Closed, abandoned or expired
    Halted,
}

impl PostPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostPhase::Draft => "draft",
            PostPhase::Allocating => "allocating",
            PostPhase::Alloc => "alloc",
            PostPhase::Halted => "halted",
        }
    }
}

/// Inputs to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostEvent {
    SentAllocRequest,
    AllocAcknowledged(PostId),
    Close,
    Expire,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostLifecycle {
    phase: PostPhase,
}

impl Default for PostLifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl PostLifecycle {
    pub fn new() -> Self {
        Self {
            phase: PostPhase::Draft,
        }
    }

    pub fn phase(&self) -> PostPhase {
        self.phase
    }

    /// Body edits are transcribed only in these phases.
    pub fn accepts_edits(&self) -> bool {
        matches!(self.phase, PostPhase::Draft | PostPhase::Alloc)
    }

    /// The single guard every outbound message passes through.
    pub fn may_send(&self) -> bool {
        self.phase != PostPhase::Halted
    }

    pub fn is_halted(&self) -> bool {
        self.phase == PostPhase::Halted
    }

    /// Apply `event`, returning whether the phase changed.
    ///
    /// Events that are not legal in the current phase are ignored.
    pub fn feed(&mut self, event: PostEvent) -> bool {
        let next = match (self.phase, event) {
            (PostPhase::Draft, PostEvent::SentAllocRequest) => PostPhase::Allocating,
            (PostPhase::Allocating, PostEvent::AllocAcknowledged(_)) => PostPhase::Alloc,
            (
                PostPhase::Draft | PostPhase::Allocating | PostPhase::Alloc,
                PostEvent::Close | PostEvent::Expire,
            ) => PostPhase::Halted,
            (phase, event) => {
                log::debug!("ignoring {:?} in phase {}", event, phase.as_str());
                return false;
            }
        };
        log::debug!("post phase {} -> {}", self.phase.as_str(), next.as_str());
        self.phase = next;
        true
    }
}
