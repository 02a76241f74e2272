//! Inserting `>>id` links to other posts, optionally quoting a selection.

use rb_core::PostId;

/// Text to append to the input `old` so it references post `id`.
///
/// The link starts on a fresh line when quoting; otherwise it is separated
/// from preceding text by a space. Quoted lines are prefixed with `>`.
pub fn reference_text(old: &str, id: PostId, selection: Option<&str>) -> String {
    let at_line_start = old.is_empty() || old.ends_with('\n');
    let selection = selection.filter(|s| !s.is_empty());
    let mut s = String::new();

    match selection {
        Some(_) if !at_line_start => s.push('\n'),
        None if !at_line_start && !old.ends_with(' ') => s.push(' '),
        _ => {}
    }
    s.push_str(&format!(">>{id} "));

    match selection {
        None => {
            if at_line_start {
                s.push('\n');
            }
        }
        Some(sel) => {
            s.push('\n');
            for line in sel.split('\n') {
                s.push('>');
                s.push_str(line);
                s.push('\n');
            }
        }
    }
    s
}
