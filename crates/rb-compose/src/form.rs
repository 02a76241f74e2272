//! # Post Form
//!
//! The post being composed together with everything it talks to. All entry
//! points are synchronous and phase-aware: anything that is not allowed in
//! the current phase is a silent no-op, never an error.

use rb_core::{
    ClientMessage, ImageData, ImageSlot, PostData, PostDraft, PostEvent, PostId, PostPhase,
    UploadDescriptor,
};
use tokio::sync::oneshot;

use crate::allocation;
use crate::context::ComposeContext;
use crate::reference::reference_text;
use crate::transcriber::{transcribe, trim_lines, Edit};
use crate::upload::{self, UploadOutcome};

/// What a call to [`PostForm::parse_input`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// Phase does not take edits (allocation in flight or halted)
    Ignored,
    /// Same as the synchronized body
    Unchanged,
    /// First content of a draft; allocation requested
    Allocating,
    Edited(Edit),
}

/// Line-caps `input`, telling the view how much was cut.
pub(crate) fn cap_input(ctx: &ComposeContext, input: &str) -> String {
    let (kept, discarded) = trim_lines(input);
    if discarded > 0 {
        log::debug!("input over line cap, discarding {discarded} chars");
        ctx.view.trim_input(discarded);
    }
    kept.into_owned()
}

pub struct PostForm {
    draft: PostDraft,
    ctx: ComposeContext,
    /// Latest text of the visible input, synchronized or not
    input: String,
    /// Receiver for the ack of an allocation requested but not yet awaited
    pending_ack: Option<oneshot::Receiver<PostId>>,
}

impl PostForm {
    /// Opens a fresh draft in the page's thread.
    pub fn new(ctx: ComposeContext) -> Self {
        Self {
            draft: PostDraft::new(ctx.page.thread),
            ctx,
            input: String::new(),
            pending_ack: None,
        }
    }

    pub fn draft(&self) -> &PostDraft {
        &self.draft
    }

    pub fn context(&self) -> &ComposeContext {
        &self.ctx
    }

    pub fn phase(&self) -> PostPhase {
        self.draft.phase()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    /// Hands out the receiver of a just-requested allocation, once.
    pub fn take_pending_ack(&mut self) -> Option<oneshot::Receiver<PostId>> {
        self.pending_ack.take()
    }

    /// Synchronizes the input's new value `val` with the server.
    pub fn parse_input(&mut self, val: &str) -> InputOutcome {
        self.input = val.to_owned();
        if !self.draft.lifecycle.accepts_edits() {
            log::debug!("dropping input in phase {}", self.phase().as_str());
            return InputOutcome::Ignored;
        }

        let val = cap_input(&self.ctx, val);
        let next: Vec<char> = val.chars().collect();
        if next == self.draft.body {
            return InputOutcome::Unchanged;
        }

        if self.phase() == PostPhase::Draft {
            self.pending_ack = allocation::request_allocation(&mut self.draft, &self.ctx, &val, None);
            return InputOutcome::Allocating;
        }

        let Some(edit) = transcribe(&self.draft.body, &next) else {
            return InputOutcome::Unchanged;
        };
        log::debug!("post {}: {:?}", self.draft.id, edit);
        edit.apply(&mut self.draft.body);
        self.ctx.send(&self.draft.lifecycle, edit.clone().into_message());
        InputOutcome::Edited(edit)
    }

    /// Appends a link to post `id` to the input, quoting `selection` if any.
    ///
    /// A link typed into an empty draft is shown but not synchronized, so a
    /// stray click cannot create an empty post.
    pub fn add_reference(&mut self, id: PostId, selection: Option<&str>) -> InputOutcome {
        if self.draft.lifecycle.is_halted() {
            return InputOutcome::Ignored;
        }
        let old = self.input.clone();
        let text = format!("{old}{}", reference_text(&old, id, selection));
        let commit = self.phase() != PostPhase::Draft || !old.is_empty();

        self.ctx.view.replace_text(&text);
        if commit {
            self.parse_input(&text)
        } else {
            self.input = text;
            InputOutcome::Unchanged
        }
    }

    /// Whether a new upload may start.
    pub fn accepts_upload(&self) -> bool {
        upload::accepts_upload(&self.draft, &self.ctx.board)
    }

    /// Acts on an upload or retry result against the current draft.
    pub fn handle_upload_response(&mut self, data: Option<UploadDescriptor>) -> UploadOutcome {
        let input = self.input.clone();
        upload::handle_upload_response(&mut self.draft, &self.ctx, &input, data, &mut self.pending_ack)
    }

    /// Applies the allocation ack carrying the post's id.
    pub async fn receive_id(&mut self, id: PostId) {
        allocation::receive_id(&mut self.draft, &self.ctx, id).await;
    }

    /// Applies the server's full post data.
    pub fn on_allocation(&mut self, data: PostData) {
        allocation::on_allocation(&mut self.draft, &self.ctx, data);
    }

    /// Records the image the server attached to this post.
    pub fn insert_image(&mut self, image: ImageData) {
        self.ctx.view.insert_image(&image);
        self.draft.image = ImageSlot::Attached(image);
    }

    /// Asks the server to spoiler the post's image.
    pub fn commit_spoiler(&mut self) -> bool {
        if !self.draft.has_image() {
            return false;
        }
        self.ctx.send(&self.draft.lifecycle, ClientMessage::Spoiler)
    }

    /// The user closed the form: close the post on the server and halt.
    pub fn commit_close(&mut self) {
        if self.draft.lifecycle.is_halted() {
            return;
        }
        self.ctx.send(&self.draft.lifecycle, ClientMessage::ClosePost);
        self.halt(PostEvent::Close);
    }

    /// The post expired: demote to a plain post without telling the server.
    pub fn abandon(&mut self) {
        if self.draft.lifecycle.is_halted() {
            return;
        }
        self.halt(PostEvent::Expire);
    }

    fn halt(&mut self, event: PostEvent) {
        self.ctx.view.clean_up();
        self.draft.editing = false;
        self.draft.lifecycle.feed(event);
        log::info!("post {} halted ({:?})", self.draft.id, event);
    }
}
