use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::models::Post;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("post {id} was modified concurrently (expected version {expected}, found {found})")]
    VersionConflict { id: String, expected: u64, found: u64 },

    #[error("post {0} does not exist")]
    Missing(String),

    #[error("post {0} already exists")]
    Duplicate(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Keyed collection of post documents.
///
/// `replace` is a compare-and-replace: it must only write when the stored
/// document still carries `expected_version`.
pub trait PostStore: Send + Sync {
    /// All posts, newest `date` first.
    fn list(&self) -> Result<Vec<Post>, StoreError>;

    fn get(&self, id: &str) -> Result<Option<Post>, StoreError>;

    fn insert(&self, post: &Post) -> Result<(), StoreError>;

    fn replace(&self, post: &Post, expected_version: u64) -> Result<(), StoreError>;

    /// Returns false when there was nothing to delete.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

pub(crate) fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.date.cmp(&a.date));
}

#[derive(Default)]
struct Inner {
    posts: HashMap<String, Post>,
    // Insertion order, newest first. Breaks ties between equal timestamps.
    feed: Vec<String>,
}

#[derive(Default)]
pub struct MemoryPostStore {
    inner: RwLock<Inner>,
}

impl MemoryPostStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("post store lock poisoned")))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend(anyhow::anyhow!("post store lock poisoned")))
    }
}

impl PostStore for MemoryPostStore {
    fn list(&self) -> Result<Vec<Post>, StoreError> {
        let inner = self.read()?;
        let mut posts: Vec<Post> = inner
            .feed
            .iter()
            .filter_map(|id| inner.posts.get(id))
            .cloned()
            .collect();
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    fn get(&self, id: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.read()?.posts.get(id).cloned())
    }

    fn insert(&self, post: &Post) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.posts.contains_key(&post.id) {
            return Err(StoreError::Duplicate(post.id.clone()));
        }
        inner.posts.insert(post.id.clone(), post.clone());
        inner.feed.insert(0, post.id.clone());
        Ok(())
    }

    fn replace(&self, post: &Post, expected_version: u64) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let current = inner
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| StoreError::Missing(post.id.clone()))?;

        if current.version != expected_version {
            return Err(StoreError::VersionConflict {
                id: post.id.clone(),
                expected: expected_version,
                found: current.version,
            });
        }

        *current = post.clone();
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut inner = self.write()?;
        if inner.posts.remove(id).is_none() {
            return Ok(false);
        }
        inner.feed.retain(|existing| existing != id);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    fn post(text: &str) -> Post {
        let author = Identity {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            avatar: String::new(),
        };
        Post::new(&author, text.to_string())
    }

    #[test]
    fn insert_get_and_delete() {
        let store = MemoryPostStore::new();
        let p = post("first");

        store.insert(&p).unwrap();
        assert_eq!(store.get(&p.id).unwrap(), Some(p.clone()));
        assert!(matches!(store.insert(&p), Err(StoreError::Duplicate(_))));

        assert!(store.delete(&p.id).unwrap());
        assert!(!store.delete(&p.id).unwrap());
        assert_eq!(store.get(&p.id).unwrap(), None);
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn list_is_newest_first() {
        let store = MemoryPostStore::new();
        let mut older = post("older");
        older.date = older.date - chrono::Duration::minutes(5);
        let newer = post("newer");

        store.insert(&newer).unwrap();
        store.insert(&older).unwrap();

        let texts: Vec<String> = store.list().unwrap().into_iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["newer", "older"]);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order_newest_first() {
        let store = MemoryPostStore::new();
        let first = post("first");
        let mut second = post("second");
        second.date = first.date;

        store.insert(&first).unwrap();
        store.insert(&second).unwrap();

        let texts: Vec<String> = store.list().unwrap().into_iter().map(|p| p.text).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[test]
    fn replace_checks_version() {
        let store = MemoryPostStore::new();
        let original = post("versioned");
        store.insert(&original).unwrap();

        let mut update = original.clone();
        update.add_like("bob");
        update.version = 1;
        store.replace(&update, 0).unwrap();

        let mut stale = original.clone();
        stale.add_like("carol");
        stale.version = 1;
        match store.replace(&stale, 0) {
            Err(StoreError::VersionConflict { expected, found, .. }) => {
                assert_eq!(expected, 0);
                assert_eq!(found, 1);
            }
            other => panic!("expected version conflict, got {:?}", other),
        }

        let stored = store.get(&original.id).unwrap().unwrap();
        assert_eq!(stored.likes.len(), 1);
        assert_eq!(stored.likes[0].user, "bob");
    }

    #[test]
    fn replace_of_missing_post_fails() {
        let store = MemoryPostStore::new();
        let p = post("ghost");
        assert!(matches!(store.replace(&p, 0), Err(StoreError::Missing(_))));
    }
}
