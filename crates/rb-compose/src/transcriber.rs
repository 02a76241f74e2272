//! # Edit Transcription
//!
//! Turns "the input now reads X" into the cheapest message that reproduces
//! the change server-side. Typing forward and backspacing at the end are
//! single-codepoint messages; everything else is a splice.

use std::borrow::Cow;

use rb_core::{splice_between, ClientMessage, Splice};

/// Input beyond this many lines is cut off.
pub const MAX_LINES: usize = 100;

/// Caps `val` at [`MAX_LINES`] lines.
///
/// Returns the kept text and the number of codepoints discarded.
pub fn trim_lines(val: &str) -> (Cow<'_, str>, usize) {
    match val.match_indices('\n').nth(MAX_LINES - 1) {
        Some((cut, _)) => {
            let discarded = val[cut..].chars().count();
            (Cow::Borrowed(&val[..cut]), discarded)
        }
        None => (Cow::Borrowed(val), 0),
    }
}

/// A single body edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Append(char),
    Backspace,
    Splice(Splice),
}

impl Edit {
    pub fn apply(&self, body: &mut Vec<char>) {
        match self {
            Edit::Append(c) => body.push(*c),
            Edit::Backspace => {
                body.pop();
            }
            Edit::Splice(splice) => splice.apply(body),
        }
    }

    pub fn into_message(self) -> ClientMessage {
        match self {
            Edit::Append(c) => ClientMessage::Append(c as u32),
            Edit::Backspace => ClientMessage::Backspace,
            Edit::Splice(splice) => ClientMessage::Splice(splice),
        }
    }
}

/// Classifies the change from `body` to `val`. `None` when they are equal.
pub fn transcribe(body: &[char], val: &[char]) -> Option<Edit> {
    if body == val {
        return None;
    }
    if val.len() == body.len() + 1 && val.starts_with(body) {
        return Some(Edit::Append(val[body.len()]));
    }
    if body.len() == val.len() + 1 && body.starts_with(val) {
        return Some(Edit::Backspace);
    }
    Some(Edit::Splice(splice_between(body, val)))
}
