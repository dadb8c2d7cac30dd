use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::helpers::{new_id, now};
use crate::models::identity::Identity;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Like {
    pub user: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Comment {
    pub id: String,
    pub user: String,
    /// Author name at the time the comment was written.
    pub name: String,
    pub avatar: String,
    pub text: String,
    pub date: DateTime<Utc>,
}

/// A post together with its likes and comments. The whole document is read
/// and written as one unit.
///
/// `name` and `avatar` are copied from the author's identity when the post is
/// created and are never refreshed afterwards.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Post {
    pub id: String,
    pub user: String,
    pub name: String,
    pub avatar: String,
    pub text: String,
    pub date: DateTime<Utc>,
    /// Newest first.
    #[serde(default)]
    pub likes: Vec<Like>,
    /// Newest first.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Bumped on every persisted mutation; stores reject replacements made
    /// against a stale version.
    #[serde(default)]
    pub version: u64,
}

impl Post {
    pub fn new(author: &Identity, text: String) -> Self {
        Post {
            id: new_id(),
            user: author.id.clone(),
            name: author.name.clone(),
            avatar: author.avatar.clone(),
            text,
            date: now(),
            likes: Vec::new(),
            comments: Vec::new(),
            version: 0,
        }
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user == user_id
    }

    pub fn is_liked_by(&self, user_id: &str) -> bool {
        self.likes.iter().any(|like| like.user == user_id)
    }

    pub fn like_count(&self) -> usize {
        self.likes.len()
    }

    /// Returns false when the user had already liked the post.
    pub fn add_like(&mut self, user_id: &str) -> bool {
        if self.is_liked_by(user_id) {
            return false;
        }
        self.likes.insert(
            0,
            Like {
                user: user_id.to_string(),
            },
        );
        true
    }

    /// Returns false when there was no like from this user.
    pub fn remove_like(&mut self, user_id: &str) -> bool {
        match self.likes.iter().position(|like| like.user == user_id) {
            Some(idx) => {
                self.likes.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|c| c.id == comment_id)
    }

    pub fn add_comment(&mut self, author: &Identity, text: String) -> &Comment {
        let mut id = new_id();
        while self.comment(&id).is_some() {
            id = new_id();
        }

        self.comments.insert(
            0,
            Comment {
                id,
                user: author.id.clone(),
                name: author.name.clone(),
                avatar: author.avatar.clone(),
                text,
                date: now(),
            },
        );
        &self.comments[0]
    }

    pub fn remove_comment(&mut self, comment_id: &str) -> Option<Comment> {
        let idx = self.comments.iter().position(|c| c.id == comment_id)?;
        Some(self.comments.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(id: &str) -> Identity {
        Identity {
            id: id.to_string(),
            name: format!("{} name", id),
            avatar: format!("https://avatars.example/{}.png", id),
        }
    }

    #[test]
    fn new_post_snapshots_author() {
        let author = identity("alice");
        let post = Post::new(&author, "hello there".to_string());

        assert_eq!(post.user, "alice");
        assert_eq!(post.name, "alice name");
        assert_eq!(post.avatar, "https://avatars.example/alice.png");
        assert!(post.likes.is_empty());
        assert!(post.comments.is_empty());
        assert_eq!(post.version, 0);
    }

    #[test]
    fn likes_are_unique_and_newest_first() {
        let mut post = Post::new(&identity("alice"), "hello".to_string());

        assert!(post.add_like("bob"));
        assert!(post.add_like("carol"));
        assert!(!post.add_like("bob"));

        assert_eq!(post.like_count(), 2);
        assert_eq!(post.likes[0].user, "carol");
        assert_eq!(post.likes[1].user, "bob");
    }

    #[test]
    fn remove_like_only_touches_that_user() {
        let mut post = Post::new(&identity("alice"), "hello".to_string());
        post.add_like("bob");
        post.add_like("carol");

        assert!(post.remove_like("bob"));
        assert!(!post.remove_like("bob"));
        assert_eq!(post.likes, vec![Like { user: "carol".to_string() }]);
    }

    #[test]
    fn comments_are_prepended_and_removable() {
        let mut post = Post::new(&identity("alice"), "hello".to_string());
        let first = post.add_comment(&identity("bob"), "first".to_string()).id.clone();
        let second = post.add_comment(&identity("carol"), "second".to_string()).id.clone();

        assert_ne!(first, second);
        assert_eq!(post.comments[0].id, second);
        assert_eq!(post.comments[0].name, "carol name");

        let removed = post.remove_comment(&first).expect("comment exists");
        assert_eq!(removed.text, "first");
        assert!(post.remove_comment(&first).is_none());
        assert_eq!(post.comments.len(), 1);
    }

    #[test]
    fn missing_collections_deserialize_as_empty() {
        let json = serde_json::json!({
            "id": "p1",
            "user": "alice",
            "name": "Alice",
            "avatar": "",
            "text": "legacy post",
            "date": "2024-01-01T00:00:00Z"
        });
        let post: Post = serde_json::from_value(json).unwrap();
        assert!(post.likes.is_empty());
        assert!(post.comments.is_empty());
        assert_eq!(post.version, 0);
    }
}
