//! Collaborators a post form works with, passed in explicitly.

use std::sync::Arc;

use rb_core::{
    BoardConfig, ClientMessage, FormView, Identity, PageState, PostLifecycle, PostRegistry,
    PostStore, Transport,
};

use crate::allocation::AllocationAcks;

#[derive(Clone)]
pub struct ComposeContext {
    pub transport: Arc<dyn Transport>,
    pub registry: Arc<dyn PostRegistry>,
    pub store: Arc<dyn PostStore>,
    pub view: Arc<dyn FormView>,
    pub acks: AllocationAcks,
    pub board: BoardConfig,
    pub page: PageState,
    pub identity: Identity,
}

impl ComposeContext {
    /// Sends `msg` unless the post is halted.
    ///
    /// Every outbound message goes through here. Returns whether the message
    /// reached the transport.
    pub fn send(&self, lifecycle: &PostLifecycle, msg: ClientMessage) -> bool {
        if !lifecycle.may_send() {
            log::debug!("suppressed {} on halted post", msg.kind());
            return false;
        }
        match self.transport.send(&msg) {
            Ok(()) => {
                log::debug!("sent {}", msg.kind());
                true
            }
            Err(e) => {
                log::warn!("failed to send {}: {e:#}", msg.kind());
                false
            }
        }
    }
}
