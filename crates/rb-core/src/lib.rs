//! rb-core
//!
//! Domain models, wire messages and port definitions for live post composition.

pub mod diff;
pub mod error;
pub mod lifecycle;
pub mod message;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use diff::*;
pub use error::*;
pub use lifecycle::*;
pub use message::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;

    #[test]
    fn test_new_draft_is_unallocated() {
        let draft = PostDraft::new(7);
        assert_eq!(draft.id, 0);
        assert_eq!(draft.op, 7);
        assert_eq!(draft.phase(), crate::PostPhase::Draft);
        assert!(draft.body.is_empty());
        assert!(!draft.has_image());
        assert!(draft.editing);
    }

    #[test]
    fn test_merge_keeps_composer_fields() {
        let mut draft = PostDraft::new(0);
        draft.body = "typed".chars().collect();
        draft.state.bold = true;

        let data = PostData {
            id: 42,
            op: 9,
            body: "server copy".into(),
            name: "anon".into(),
            trip: "!abc".into(),
            links: vec![(3, 9)],
            image: Some(ImageData {
                hash: "ff".into(),
                name: "a.png".into(),
                file_type: "image/png".into(),
                dims: [1, 1, 1, 1],
                size: 10,
                spoiler: false,
            }),
            ..PostData::default()
        };
        draft.merge(&data);

        assert_eq!(draft.id, 0);
        assert_eq!(draft.op, 9);
        assert_eq!(draft.name, "anon");
        assert_eq!(draft.trip, "!abc");
        assert_eq!(draft.links, vec![(3, 9)]);
        assert_eq!(draft.body_text(), "typed");
        assert!(draft.state.bold);
        assert!(!draft.has_image());
    }

    #[test]
    fn test_merge_never_assigns_id() {
        let mut draft = PostDraft::new(0);
        draft.merge(&PostData { id: 6, ..PostData::default() });
        assert_eq!(draft.id, 0);

        draft.id = 5;
        draft.merge(&PostData { id: 6, ..PostData::default() });
        assert_eq!(draft.id, 5);
    }

    #[test]
    fn test_merge_keeps_halted_post_out_of_editing() {
        let mut draft = PostDraft::new(0);
        draft.editing = false;
        draft.lifecycle.feed(crate::PostEvent::Close);
        assert!(draft.lifecycle.is_halted());

        draft.merge(&PostData { editing: true, sage: true, ..PostData::default() });
        assert!(!draft.editing);
        assert!(draft.sage);
    }
}
