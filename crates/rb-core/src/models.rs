//! # Domain Models
//!
//! These structs represent the post being composed and the payloads exchanged
//! with the server about it. Post ids are the server's integer ids; a draft is
//! additionally keyed by a random UUID so an allocation ack can be routed back
//! to it before it has an id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lifecycle::{PostLifecycle, PostPhase};

/// Server-assigned post id. `0` means "not allocated yet".
pub type PostId = u64;

/// Inline markup toggles and counters of the post body parser.
///
/// Owned by the markup parser; carried here so they survive allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattingState {
    pub spoiler: bool,
    pub quote: bool,
    pub code: bool,
    pub bold: bool,
    pub italic: bool,
    pub red: bool,
    pub blue: bool,
    pub have_syncwatch: bool,
    pub successive_newlines: u32,
    pub i_dice: u32,
}

/// Server-side record of an image attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageData {
    /// Content hash, hex encoded
    pub hash: String,
    /// Original file name
    pub name: String,
    /// MIME type of the source file
    pub file_type: String,
    /// Source width, height, thumbnail width, thumbnail height
    pub dims: [u32; 4],
    /// Source size in bytes
    pub size: u64,
    #[serde(default)]
    pub spoiler: bool,
}

/// What the upload service hands back for a processed file. This is what
/// travels on the wire in `insertPost` and `insertImage`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadDescriptor {
    pub token: String,
    pub name: String,
    #[serde(default)]
    pub spoiler: bool,
}

/// A file picked by the user, not processed yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    pub data: Vec<u8>,
    pub spoiler: bool,
}

/// The single image slot of a post.
///
/// `Pending` covers the time between putting a descriptor on the wire and the
/// server echoing the processed image back; the slot already counts as taken.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageSlot {
    #[default]
    Empty,
    Pending(UploadDescriptor),
    Attached(ImageData),
}

impl ImageSlot {
    pub fn is_empty(&self) -> bool {
        matches!(self, ImageSlot::Empty)
    }

    pub fn attached(&self) -> Option<&ImageData> {
        match self {
            ImageSlot::Attached(img) => Some(img),
            _ => None,
        }
    }
}

/// Per-board rules the composer must respect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardConfig {
    /// No images may be attached to any post
    pub text_only: bool,
    /// Names and tripcodes are stripped from allocation requests
    pub forced_anon: bool,
}

/// The page the composer lives on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageState {
    /// Board slug (e.g., "b")
    pub board: String,
    /// Thread being replied to; `0` on a board page (new thread)
    pub thread: PostId,
}

/// Poster identity sent along with the allocation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub name: String,
    pub password: String,
    pub sage: bool,
}

/// Which persisted id set a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IdKind {
    /// Posts this client authored
    Mine,
    /// Posts the user has already seen
    SeenPost,
}

impl IdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::Mine => "mine",
            IdKind::SeenPost => "seenPost",
        }
    }
}

/// Full post payload as delivered by the server.
///
/// Only these fields are ever merged into a draft; anything else the server
/// sends is dropped during deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostData {
    pub id: PostId,
    pub op: PostId,
    pub time: i64,
    pub body: String,
    pub name: String,
    pub trip: String,
    pub auth: String,
    pub editing: bool,
    pub sage: bool,
    pub deleted: bool,
    pub banned: bool,
    pub image: Option<ImageData>,
    /// (target post, target thread) pairs referenced from the body
    pub links: Vec<(PostId, PostId)>,
}

/// The post under composition.
#[derive(Debug, Clone)]
pub struct PostDraft {
    /// Identity of this draft, used to route its allocation ack
    pub key: Uuid,
    pub id: PostId,
    pub op: PostId,
    /// Last body synchronized with the server, as codepoints
    pub body: Vec<char>,
    pub image: ImageSlot,
    pub state: FormattingState,
    pub lifecycle: PostLifecycle,
    pub name: String,
    pub trip: String,
    pub auth: String,
    pub editing: bool,
    pub sage: bool,
    pub deleted: bool,
    pub banned: bool,
    pub links: Vec<(PostId, PostId)>,
    /// Authors never get "new post" notifications for their own posts
    pub seen_once: bool,
    pub created_at: DateTime<Utc>,
}

impl PostDraft {
    /// A fresh, unallocated draft in the given thread (`0` for a new thread).
    pub fn new(op: PostId) -> Self {
        Self {
            key: Uuid::new_v4(),
            id: 0,
            op,
            body: Vec::new(),
            image: ImageSlot::Empty,
            state: FormattingState::default(),
            lifecycle: PostLifecycle::new(),
            name: String::new(),
            trip: String::new(),
            auth: String::new(),
            editing: true,
            sage: false,
            deleted: false,
            banned: false,
            links: Vec::new(),
            seen_once: false,
            created_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> PostPhase {
        self.lifecycle.phase()
    }

    pub fn body_text(&self) -> String {
        self.body.iter().collect()
    }

    pub fn has_image(&self) -> bool {
        !self.image.is_empty()
    }

    /// Copy server-owned fields from `data` onto the draft.
    ///
    /// Body, phase, formatting state, image and creation time belong to the
    /// composer and are never overwritten here. The id is only ever set by
    /// the allocation ack, and a halted post stays out of editing.
    pub fn merge(&mut self, data: &PostData) {
        if data.op != 0 {
            self.op = data.op;
        }
        self.name = data.name.clone();
        self.trip = data.trip.clone();
        self.auth = data.auth.clone();
        if !self.lifecycle.is_halted() {
            self.editing = data.editing;
        }
        self.sage = data.sage;
        self.deleted = data.deleted;
        self.banned = data.banned;
        self.links = data.links.clone();
    }

    /// Snapshot handed to the post registry.
    pub fn to_post_data(&self) -> PostData {
        PostData {
            id: self.id,
            op: self.op,
            time: self.created_at.timestamp(),
            body: self.body_text(),
            name: self.name.clone(),
            trip: self.trip.clone(),
            auth: self.auth.clone(),
            editing: self.editing,
            sage: self.sage,
            deleted: self.deleted,
            banned: self.banned,
            image: self.image.attached().cloned(),
            links: self.links.clone(),
        }
    }
}
