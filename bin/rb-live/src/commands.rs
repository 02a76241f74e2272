//! Line-oriented commands read from stdin.
//!
//! ```text
//! type <text>        append to the input (`\n` and `\\` escapes)
//! set <text>         replace the whole input
//! bs                 delete the last character
//! quote <id> [text]  link to post <id>, optionally quoting text
//! upload <path> [spoiler]
//! retry | spoiler | close | expire
//! ack <id>           server allocated the post as <id>
//! {...}              any server message as JSON
//! ```

use std::path::PathBuf;

use rb_core::{AppError, PostId, ServerMessage};

#[derive(Debug, PartialEq)]
pub enum Command {
    Type(String),
    Set(String),
    Backspace,
    Quote { id: PostId, selection: Option<String> },
    Upload { path: PathBuf, spoiler: bool },
    Retry,
    Spoiler,
    Close,
    Expire,
    Server(ServerMessage),
}

/// `Ok(None)` for blank lines.
pub fn parse(line: &str) -> rb_core::Result<Option<Command>> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    if line.trim_start().starts_with('{') {
        return Ok(Some(Command::Server(ServerMessage::decode(line)?)));
    }

    let (word, rest) = line.split_once(' ').unwrap_or((line, ""));
    let cmd = match word {
        "type" => Command::Type(unescape(rest)),
        "set" => Command::Set(unescape(rest)),
        "bs" => Command::Backspace,
        "quote" => {
            let (id, selection) = rest.split_once(' ').unwrap_or((rest, ""));
            Command::Quote {
                id: post_id(id)?,
                selection: (!selection.is_empty()).then(|| unescape(selection)),
            }
        }
        "upload" => {
            let (path, spoiler) = match rest.strip_suffix(" spoiler") {
                Some(path) => (path, true),
                None => (rest, false),
            };
            if path.is_empty() {
                return Err(AppError::Validation("upload needs a path".into()));
            }
            Command::Upload { path: PathBuf::from(path), spoiler }
        }
        "retry" => Command::Retry,
        "spoiler" => Command::Spoiler,
        "close" => Command::Close,
        "expire" => Command::Expire,
        "ack" => Command::Server(ServerMessage::PostId(post_id(rest)?)),
        other => return Err(AppError::Validation(format!("unknown command {other:?}"))),
    };
    Ok(Some(cmd))
}

fn post_id(raw: &str) -> rb_core::Result<PostId> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("bad post id {raw:?}")))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
