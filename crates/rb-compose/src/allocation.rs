//! # Allocation
//!
//! The one-time "create this post on the server" handshake.
//!
//! A draft sends a single `insertPost` request carrying whatever it has at
//! that moment (typed text, a processed upload or both) and leaves `Draft`
//! immediately, so nothing can trigger a second request during the round
//! trip. The server's ack is routed back through [`AllocationAcks`], which
//! hands each draft a single-shot receiver keyed by the draft's UUID.

use std::sync::Arc;

use dashmap::DashMap;
use rb_core::{
    ClientMessage, ImageSlot, InsertPostRequest, PostData, PostDraft, PostEvent, PostId,
    PostPhase, UploadDescriptor,
};
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::context::ComposeContext;

/// Pending allocation acks, one per draft.
#[derive(Clone, Default)]
pub struct AllocationAcks {
    pending: Arc<DashMap<Uuid, oneshot::Sender<PostId>>>,
}

impl AllocationAcks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts waiting for the ack of draft `key`.
    pub fn register(&self, key: Uuid) -> oneshot::Receiver<PostId> {
        let (tx, rx) = oneshot::channel();
        if self.pending.insert(key, tx).is_some() {
            log::warn!("draft {key} registered for allocation twice");
        }
        rx
    }

    /// Delivers `id` to the draft waiting under `key`.
    ///
    /// Consumes the registration, so a draft is resolved at most once.
    /// Returns `false` if nobody was waiting.
    pub fn resolve(&self, key: Uuid, id: PostId) -> bool {
        match self.pending.remove(&key) {
            Some((_, tx)) => tx.send(id).is_ok(),
            None => {
                log::debug!("no pending allocation for draft {key}");
                false
            }
        }
    }

    /// Drops the registration; the receiver then observes a closed channel.
    pub fn cancel(&self, key: Uuid) -> bool {
        self.pending.remove(&key).is_some()
    }

    pub fn is_pending(&self, key: Uuid) -> bool {
        self.pending.contains_key(&key)
    }
}

/// Sends the allocation request for a draft and moves it to `Allocating`.
///
/// `body` must already be line-capped. It becomes the synchronized body.
/// Returns `None` without sending anything unless the draft is in `Draft`.
pub fn request_allocation(
    draft: &mut PostDraft,
    ctx: &ComposeContext,
    body: &str,
    image: Option<UploadDescriptor>,
) -> Option<oneshot::Receiver<PostId>> {
    if draft.phase() != PostPhase::Draft {
        return None;
    }

    let (name, password) = if ctx.board.forced_anon {
        (String::new(), String::new())
    } else {
        (ctx.identity.name.clone(), ctx.identity.password.clone())
    };
    let mut req = InsertPostRequest {
        open: true,
        body: None,
        image: None,
        name,
        password,
        sage: ctx.identity.sage,
    };
    if !body.is_empty() {
        draft.body = body.chars().collect();
        req.body = Some(body.to_owned());
    }
    if let Some(img) = image {
        req.image = Some(img.clone());
        draft.image = ImageSlot::Pending(img);
    }

    log::info!(
        "requesting allocation of draft {} ({} chars, image: {})",
        draft.key,
        draft.body.len(),
        req.image.is_some()
    );
    ctx.send(&draft.lifecycle, ClientMessage::InsertPost(req));
    draft.lifecycle.feed(PostEvent::SentAllocRequest);
    Some(ctx.acks.register(draft.key))
}

/// Applies the server's allocation ack.
///
/// The registry and persistence side effects happen even when the post was
/// halted while the request was in flight; the phase then stays `Halted`.
pub async fn receive_id(draft: &mut PostDraft, ctx: &ComposeContext, id: PostId) {
    draft.id = id;
    draft.op = if ctx.page.thread != 0 {
        ctx.page.thread
    } else {
        id
    };
    draft.seen_once = true;
    ctx.registry.add(draft.to_post_data());

    if let Err(e) = ctx.store.store_seen_post(draft.id, draft.op).await {
        log::warn!("failed to record post {id} as seen: {e:#}");
    }
    if let Err(e) = ctx.store.store_mine(draft.id, draft.op).await {
        log::warn!("failed to record post {id} as mine: {e:#}");
    }

    draft.lifecycle.feed(PostEvent::AllocAcknowledged(id));
    log::info!("draft {} allocated as post {id} in thread {}", draft.key, draft.op);
}

/// Hydrates the draft from the server's post data.
pub fn on_allocation(draft: &mut PostDraft, ctx: &ComposeContext, data: PostData) {
    draft.merge(&data);
    ctx.view.render_alloc(draft);
    if let Some(img) = data.image {
        ctx.view.insert_image(&img);
        draft.image = ImageSlot::Attached(img);
    }
    if draft.phase() != PostPhase::Allocating {
        ctx.view.propagate_links(draft);
    }
}
