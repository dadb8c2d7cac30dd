use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config;
use crate::core::store::{PostStore, StoreError};
use crate::models::{Identity, Post};
use crate::validation::{validate_text, ValidationErrors};

#[derive(Debug, Error)]
pub enum PostError {
    #[error("invalid input: {0}")]
    Validation(ValidationErrors),

    #[error("post {0} not found")]
    PostNotFound(String),

    #[error("comment {comment_id} not found on post {post_id}")]
    CommentNotFound { post_id: String, comment_id: String },

    #[error("caller may not {0}")]
    NotAuthorised(&'static str),

    #[error("post {0} is already liked by this user")]
    AlreadyLiked(String),

    #[error("post {0} is not liked by this user")]
    NotLiked(String),

    #[error("gave up updating post {0} after repeated concurrent modifications")]
    Contention(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type PostResult<T> = Result<T, PostError>;

/// Runs every read and write on posts.
///
/// Mutations fetch the whole post, apply a change and write the whole post
/// back with a version check. When another writer got there first the change
/// is re-applied to the fresh copy, so concurrent likes and comments on the
/// same post are never lost.
#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    max_retries: usize,
}

impl PostService {
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        PostService {
            store,
            max_retries: config::max_update_retries(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    pub fn list_posts(&self) -> PostResult<Vec<Post>> {
        Ok(self.store.list()?)
    }

    pub fn get_post(&self, post_id: &str) -> PostResult<Post> {
        self.store
            .get(post_id)?
            .ok_or_else(|| PostError::PostNotFound(post_id.to_string()))
    }

    pub fn create_post(&self, caller: &Identity, text: &str) -> PostResult<Post> {
        validate_text(text).map_err(PostError::Validation)?;

        let post = Post::new(caller, text.to_string());
        self.store.insert(&post)?;

        info!(post_id = %post.id, user_id = %caller.id, "post created");
        Ok(post)
    }

    pub fn delete_post(&self, caller: &Identity, post_id: &str) -> PostResult<()> {
        let post = self.get_post(post_id)?;

        if !post.is_owned_by(&caller.id) {
            warn!(post_id, user_id = %caller.id, "refused to delete post owned by another user");
            return Err(PostError::NotAuthorised("delete post"));
        }

        if !self.store.delete(post_id)? {
            return Err(PostError::PostNotFound(post_id.to_string()));
        }

        info!(post_id, user_id = %caller.id, "post deleted");
        Ok(())
    }

    pub fn like_post(&self, caller: &Identity, post_id: &str) -> PostResult<Post> {
        let post = self.update(post_id, |post| {
            if post.add_like(&caller.id) {
                Ok(())
            } else {
                Err(PostError::AlreadyLiked(post_id.to_string()))
            }
        })?;

        info!(post_id, user_id = %caller.id, likes = post.like_count(), "post liked");
        Ok(post)
    }

    pub fn unlike_post(&self, caller: &Identity, post_id: &str) -> PostResult<Post> {
        let post = self.update(post_id, |post| {
            if post.remove_like(&caller.id) {
                Ok(())
            } else {
                Err(PostError::NotLiked(post_id.to_string()))
            }
        })?;

        info!(post_id, user_id = %caller.id, likes = post.like_count(), "post unliked");
        Ok(post)
    }

    pub fn add_comment(&self, caller: &Identity, post_id: &str, text: &str) -> PostResult<Post> {
        validate_text(text).map_err(PostError::Validation)?;

        let post = self.update(post_id, |post| {
            post.add_comment(caller, text.to_string());
            Ok(())
        })?;

        info!(post_id, user_id = %caller.id, comment_id = %post.comments[0].id, "comment added");
        Ok(post)
    }

    // Any authenticated caller may remove any comment; unlike delete_post
    // there is no ownership check here.
    pub fn remove_comment(
        &self,
        caller: &Identity,
        post_id: &str,
        comment_id: &str,
    ) -> PostResult<Post> {
        let post = self.update(post_id, |post| match post.remove_comment(comment_id) {
            Some(_) => Ok(()),
            None => Err(PostError::CommentNotFound {
                post_id: post_id.to_string(),
                comment_id: comment_id.to_string(),
            }),
        })?;

        info!(post_id, comment_id, user_id = %caller.id, "comment removed");
        Ok(post)
    }

    /// Fetch, apply `change`, and write back guarded by the post's version.
    ///
    /// `change` runs against a fresh copy on every attempt, so its checks
    /// always see the latest stored state. Nothing is written when it fails.
    fn update<F>(&self, post_id: &str, mut change: F) -> PostResult<Post>
    where
        F: FnMut(&mut Post) -> PostResult<()>,
    {
        for attempt in 1..=self.max_retries {
            let mut post = self.get_post(post_id)?;
            let expected = post.version;

            change(&mut post)?;
            post.version = expected + 1;

            match self.store.replace(&post, expected) {
                Ok(()) => return Ok(post),
                Err(StoreError::VersionConflict { found, .. }) => {
                    debug!(post_id, attempt, expected, found, "post changed underneath update, retrying");
                }
                Err(StoreError::Missing(_)) => {
                    return Err(PostError::PostNotFound(post_id.to_string()));
                }
                Err(e) => return Err(e.into()),
            }
        }

        warn!(post_id, attempts = self.max_retries, "post update abandoned after version conflicts");
        Err(PostError::Contention(post_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryPostStore;

    fn caller(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            name: id.to_uppercase(),
            avatar: String::new(),
        }
    }

    fn service() -> PostService {
        PostService::new(Arc::new(MemoryPostStore::new()))
    }

    #[test]
    fn create_validates_before_touching_the_store() {
        let svc = service();
        let err = svc.create_post(&caller("alice"), "x").unwrap_err();
        assert!(matches!(err, PostError::Validation(_)));
        assert!(svc.list_posts().unwrap().is_empty());
    }

    #[test]
    fn create_stores_text_as_given() {
        let svc = service();
        for text in ["a < b", "<b></b>", "Tom & Jerry"] {
            let post = svc.create_post(&caller("alice"), text).unwrap();
            assert_eq!(svc.get_post(&post.id).unwrap().text, text);
        }
    }

    #[test]
    fn mutations_bump_the_version() {
        let svc = service();
        let post = svc.create_post(&caller("alice"), "hello").unwrap();
        assert_eq!(post.version, 0);

        let liked = svc.like_post(&caller("bob"), &post.id).unwrap();
        assert_eq!(liked.version, 1);

        let commented = svc.add_comment(&caller("bob"), &post.id, "nice").unwrap();
        assert_eq!(commented.version, 2);
        assert_eq!(svc.get_post(&post.id).unwrap(), commented);
    }

    #[test]
    fn failed_checks_leave_version_untouched() {
        let svc = service();
        let post = svc.create_post(&caller("alice"), "hello").unwrap();

        assert!(matches!(
            svc.unlike_post(&caller("bob"), &post.id),
            Err(PostError::NotLiked(_))
        ));
        assert!(matches!(
            svc.remove_comment(&caller("bob"), &post.id, "nope"),
            Err(PostError::CommentNotFound { .. })
        ));
        assert_eq!(svc.get_post(&post.id).unwrap().version, 0);
    }

    #[test]
    fn mutating_a_missing_post_is_not_found() {
        let svc = service();
        let id = crate::core::helpers::new_id();
        assert!(matches!(
            svc.like_post(&caller("bob"), &id),
            Err(PostError::PostNotFound(_))
        ));
        assert!(matches!(
            svc.add_comment(&caller("bob"), &id, "hello"),
            Err(PostError::PostNotFound(_))
        ));
        assert!(matches!(
            svc.delete_post(&caller("bob"), &id),
            Err(PostError::PostNotFound(_))
        ));
    }
}
