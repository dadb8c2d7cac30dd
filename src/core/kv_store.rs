use anyhow::Context;
use spin_sdk::key_value::Store;
use spin_sdk::wit::wasi::keyvalue::atomics::{self, Cas, CasError};
use spin_sdk::wit::wasi::keyvalue::store::{self as bucket_store, Bucket};

use crate::config::{self, post_key, POST_KEY_PREFIX};
use crate::core::store::{sort_newest_first, PostStore, StoreError};
use crate::models::Post;

const DEFAULT_LABEL: &str = "default";

/// Posts kept as `post:{id}` JSON documents in a Spin key-value store.
///
/// Writes that must not clobber a concurrent writer (`insert`, `replace`) go
/// through the `wasi:keyvalue/atomics` compare-and-swap on the same store, so
/// a document changed by another instance after it was read is never
/// overwritten.
pub struct KvPostStore {
    label: Option<String>,
}

impl KvPostStore {
    pub fn open_default() -> Self {
        KvPostStore { label: None }
    }

    pub fn open(label: impl Into<String>) -> Self {
        KvPostStore {
            label: Some(label.into()),
        }
    }

    pub fn from_env() -> Self {
        match config::kv_store_label() {
            Some(label) => Self::open(label),
            None => Self::open_default(),
        }
    }

    fn store(&self) -> anyhow::Result<Store> {
        match &self.label {
            Some(label) => Store::open(label.as_str())
                .with_context(|| format!("failed to open key-value store {}", label)),
            None => Store::open_default().context("failed to open default key-value store"),
        }
    }

    fn bucket(&self) -> anyhow::Result<Bucket> {
        let label = self.label.as_deref().unwrap_or(DEFAULT_LABEL);
        bucket_store::open(label)
            .map_err(|e| anyhow::anyhow!("failed to open key-value bucket {}: {:?}", label, e))
    }

    fn begin_swap(&self, key: &str) -> Result<PendingSwap, StoreError> {
        let bucket = self.bucket()?;
        let cas = Cas::new(&bucket, key)
            .map_err(|e| anyhow::anyhow!("failed to start swap on {}: {:?}", key, e))?;
        let current = read_cas(&cas, key)?;
        Ok(PendingSwap {
            _bucket: bucket,
            cas,
            key: key.to_string(),
            current,
        })
    }
}

/// An open compare-and-swap on one post key, with the value it saw.
struct PendingSwap {
    _bucket: Bucket,
    cas: Cas,
    key: String,
    current: Option<Post>,
}

enum SwapOutcome {
    Written,
    /// Another writer got there first; carries what it stored.
    Lost(Option<Post>),
}

impl PendingSwap {
    fn commit(self, post: &Post) -> Result<SwapOutcome, StoreError> {
        let bytes = serde_json::to_vec(post).context("failed to encode post")?;
        match atomics::swap(self.cas, &bytes) {
            Ok(()) => Ok(SwapOutcome::Written),
            Err(CasError::CasFailed(latest)) => {
                Ok(SwapOutcome::Lost(read_cas(&latest, &self.key)?))
            }
            Err(CasError::StoreError(e)) => {
                Err(anyhow::anyhow!("failed to write {}: {:?}", self.key, e).into())
            }
        }
    }
}

fn read_cas(cas: &Cas, key: &str) -> Result<Option<Post>, StoreError> {
    let bytes = cas
        .current()
        .map_err(|e| anyhow::anyhow!("failed to read {}: {:?}", key, e))?;
    match bytes {
        Some(bytes) => {
            let post = serde_json::from_slice(&bytes)
                .with_context(|| format!("failed to decode {}", key))?;
            Ok(Some(post))
        }
        None => Ok(None),
    }
}

fn check_version(post: &Post, expected_version: u64, stored: &Post) -> Result<(), StoreError> {
    if stored.version != expected_version {
        return Err(StoreError::VersionConflict {
            id: post.id.clone(),
            expected: expected_version,
            found: stored.version,
        });
    }
    Ok(())
}

impl PostStore for KvPostStore {
    fn list(&self) -> Result<Vec<Post>, StoreError> {
        let store = self.store()?;
        let keys = store.get_keys().context("failed to list keys")?;

        let mut posts = Vec::new();
        for key in keys.iter().filter(|k| k.starts_with(POST_KEY_PREFIX)) {
            if let Some(post) = store.get_json::<Post>(key)? {
                posts.push(post);
            }
        }
        sort_newest_first(&mut posts);
        Ok(posts)
    }

    fn get(&self, id: &str) -> Result<Option<Post>, StoreError> {
        Ok(self.store()?.get_json::<Post>(&post_key(id))?)
    }

    fn insert(&self, post: &Post) -> Result<(), StoreError> {
        let swap = self.begin_swap(&post_key(&post.id))?;
        if swap.current.is_some() {
            return Err(StoreError::Duplicate(post.id.clone()));
        }
        match swap.commit(post)? {
            SwapOutcome::Written => Ok(()),
            SwapOutcome::Lost(_) => Err(StoreError::Duplicate(post.id.clone())),
        }
    }

    fn replace(&self, post: &Post, expected_version: u64) -> Result<(), StoreError> {
        let mut swap = self.begin_swap(&post_key(&post.id))?;
        let current = swap
            .current
            .take()
            .ok_or_else(|| StoreError::Missing(post.id.clone()))?;
        check_version(post, expected_version, &current)?;

        match swap.commit(post)? {
            SwapOutcome::Written => Ok(()),
            // Even at an equal version the document is someone else's write.
            SwapOutcome::Lost(Some(latest)) => Err(StoreError::VersionConflict {
                id: post.id.clone(),
                expected: expected_version,
                found: latest.version,
            }),
            SwapOutcome::Lost(None) => Err(StoreError::Missing(post.id.clone())),
        }
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let store = self.store()?;
        let key = post_key(id);
        if !store.exists(&key).context("failed to check post key")? {
            return Ok(false);
        }
        store.delete(&key).context("failed to delete post")?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;

    fn post_at(version: u64) -> Post {
        let author = Identity {
            id: "alice".to_string(),
            name: "Alice".to_string(),
            avatar: String::new(),
        };
        let mut post = Post::new(&author, "hello".to_string());
        post.version = version;
        post
    }

    #[test]
    fn stale_version_is_a_conflict() {
        let next = post_at(4);
        match check_version(&next, 3, &post_at(4)) {
            Err(StoreError::VersionConflict { expected, found, .. }) => {
                assert_eq!((expected, found), (3, 4));
            }
            other => panic!("expected a version conflict, got {:?}", other),
        }
        assert!(check_version(&next, 3, &post_at(3)).is_ok());
    }
}
