//! In-memory collection of the posts currently displayed.

use dashmap::DashMap;
use rb_core::{PostData, PostId, PostRegistry};

#[derive(Default)]
pub struct PostCollection {
    posts: DashMap<PostId, PostData>,
}

impl PostCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl PostRegistry for PostCollection {
    fn add(&self, post: PostData) {
        self.posts.insert(post.id, post);
    }

    fn get(&self, id: PostId) -> Option<PostData> {
        self.posts.get(&id).map(|p| p.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_replaces_by_id() {
        let posts = PostCollection::new();
        posts.add(PostData { id: 1, body: "a".into(), ..PostData::default() });
        posts.add(PostData { id: 1, body: "b".into(), ..PostData::default() });
        assert_eq!(posts.len(), 1);
        assert_eq!(posts.get(1).map(|p| p.body), Some("b".to_string()));
        assert!(posts.get(2).is_none());
    }
}
