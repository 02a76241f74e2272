//! # Wire Messages
//!
//! Messages exchanged with the server over the live connection. Framing and
//! delivery belong to the transport; these types only fix the shape.
//! Every message serializes as `{"type": "...", "payload": ...}`.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{ImageData, PostData, PostId, UploadDescriptor};

/// "Replace `len` codepoints starting at `start` with `text`".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Splice {
    pub start: usize,
    pub len: usize,
    pub text: String,
}

impl Splice {
    pub fn apply(&self, body: &mut Vec<char>) {
        body.splice(self.start..self.start + self.len, self.text.chars());
    }
}

/// Payload of the one-time post creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertPostRequest {
    pub open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<UploadDescriptor>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub password: String,
    #[serde(skip_serializing_if = "std::ops::Not::not", default)]
    pub sage: bool,
}

/// Client → server messages about the post being composed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    InsertPost(InsertPostRequest),
    /// A single codepoint appended to the body
    Append(u32),
    Backspace,
    Splice(Splice),
    InsertImage(UploadDescriptor),
    Spoiler,
    ClosePost,
}

impl ClientMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::InsertPost(_) => "insertPost",
            ClientMessage::Append(_) => "append",
            ClientMessage::Backspace => "backspace",
            ClientMessage::Splice(_) => "splice",
            ClientMessage::InsertImage(_) => "insertImage",
            ClientMessage::Spoiler => "spoiler",
            ClientMessage::ClosePost => "closePost",
        }
    }

    /// JSON text of the message, ready for framing.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Server → client messages this crate understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    /// Allocation ack carrying the assigned id
    PostId(PostId),
    /// Full post data of the allocated post
    PostData(PostData),
    /// The server finished attaching an image to the post
    InsertImage(ImageData),
}

impl ServerMessage {
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
