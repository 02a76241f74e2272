//! rb-compose
//!
//! Keeps a post that is being typed synchronized with the server: one
//! allocation handshake, then a message per edit, until the post is halted.

pub mod allocation;
pub mod context;
pub mod form;
pub mod reference;
pub mod registry;
pub mod session;
pub mod transcriber;
pub mod upload;

pub use allocation::AllocationAcks;
pub use context::ComposeContext;
pub use form::{InputOutcome, PostForm};
pub use registry::PostCollection;
pub use session::{ComposeEvent, ComposeSession};
pub use transcriber::{Edit, MAX_LINES};
pub use upload::UploadOutcome;
