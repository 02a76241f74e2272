//! # Upload
//!
//! Attaching the single image a post may carry. Processing happens in the
//! upload service; while it runs the user keeps typing, so the outcome is
//! decided against the draft as it is when the result arrives.

use rb_core::{BoardConfig, ClientMessage, ImageSlot, PostDraft, PostPhase, PostId, UploadDescriptor};
use tokio::sync::oneshot;

use crate::allocation;
use crate::context::ComposeContext;

/// What happened to an upload result.
#[derive(Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    /// Failed or canceled upload
    Failed,
    /// Another image got attached while this one was processing
    AlreadyHasImage,
    /// The post left a phase where images can be added
    NotPostable(PostPhase),
    /// Bundled into the allocation request
    Allocating,
    /// Sent as `insertImage` to the allocated post
    Inserted,
    /// `insertImage` never reached the transport; the slot stays empty
    NotSent,
}

/// Whether a new upload may start at all.
pub fn accepts_upload(draft: &PostDraft, board: &BoardConfig) -> bool {
    !board.text_only && !draft.has_image()
}

/// Acts on an upload result.
///
/// `input` is the current, untrimmed input text; it is bundled with the image
/// if the post still needs allocating. A new allocation receiver is placed in
/// `pending_ack` in that case.
pub fn handle_upload_response(
    draft: &mut PostDraft,
    ctx: &ComposeContext,
    input: &str,
    data: Option<UploadDescriptor>,
    pending_ack: &mut Option<oneshot::Receiver<PostId>>,
) -> UploadOutcome {
    let Some(data) = data else {
        return UploadOutcome::Failed;
    };
    if draft.has_image() {
        log::debug!("discarding upload {}: post already has an image", data.token);
        return UploadOutcome::AlreadyHasImage;
    }

    match draft.phase() {
        PostPhase::Draft => {
            let body = crate::form::cap_input(ctx, input);
            *pending_ack = allocation::request_allocation(draft, ctx, &body, Some(data));
            UploadOutcome::Allocating
        }
        PostPhase::Alloc => {
            if !ctx.send(&draft.lifecycle, ClientMessage::InsertImage(data.clone())) {
                return UploadOutcome::NotSent;
            }
            draft.image = ImageSlot::Pending(data);
            UploadOutcome::Inserted
        }
        phase => {
            log::debug!("discarding upload {}: post is {}", data.token, phase.as_str());
            UploadOutcome::NotPostable(phase)
        }
    }
}
