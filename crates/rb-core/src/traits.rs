//! # Core Traits (Ports)
//!
//! Every collaborator of the composer sits behind one of these traits and is
//! handed in explicitly through a context object.

use async_trait::async_trait;

use crate::message::ClientMessage;
use crate::models::{IdKind, ImageData, PostData, PostDraft, PostId, UploadDescriptor, UploadFile};

/// Ordered, reliable delivery of outbound messages.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait Transport: Send + Sync {
    /// Frames and queues `msg`. Delivery order must match call order.
    fn send(&self, msg: &ClientMessage) -> anyhow::Result<()>;
}

/// Persisted "mine" and "seen" post id sets.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Records `id` in thread `op` as authored by this client.
    async fn store_mine(&self, id: PostId, op: PostId) -> anyhow::Result<()>;
    /// Records `id` in thread `op` as already seen.
    async fn store_seen_post(&self, id: PostId, op: PostId) -> anyhow::Result<()>;
    /// Unexpired ids of `kind` belonging to any of `threads`.
    async fn read_ids(&self, kind: IdKind, threads: &[PostId]) -> anyhow::Result<Vec<PostId>>;
}

/// The collection of posts currently displayed.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait PostRegistry: Send + Sync {
    fn add(&self, post: PostData);
    fn get(&self, id: PostId) -> Option<PostData>;
}

/// File validation, thumbnailing and upload.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UploadService: Send + Sync {
    /// `None` when the upload failed or was canceled.
    async fn upload(&self, file: UploadFile) -> Option<UploadDescriptor>;
    /// Re-runs the last failed upload.
    async fn retry(&self) -> Option<UploadDescriptor>;
}

/// Presentation of the post form.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait FormView: Send + Sync {
    /// The draft was allocated on the server.
    fn render_alloc(&self, draft: &PostDraft);
    fn insert_image(&self, image: &ImageData);
    /// Tear the form down, leaving a plain post.
    fn clean_up(&self);
    /// Replace the visible input text.
    fn replace_text(&self, text: &str);
    /// `discarded` trailing codepoints were cut from the input.
    fn trim_input(&self, discarded: usize);
    /// Re-resolve the body's links against their target posts.
    fn propagate_links(&self, draft: &PostDraft);
}
