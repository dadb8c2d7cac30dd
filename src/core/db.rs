use tracing::info;

use crate::auth::MemoryIdentityProvider;
use crate::models::Identity;
use crate::posts::PostService;

pub const DEV_TOKEN_ALICE: &str = "dev-token-alice";
pub const DEV_TOKEN_BOB: &str = "dev-token-bob";

fn dev_identity(id: &str, name: &str) -> Identity {
    Identity {
        id: id.to_string(),
        name: name.to_string(),
        avatar: format!("https://www.gravatar.com/avatar/{}?d=identicon", id),
    }
}

/// Registers two demo callers and, when the board is empty, a welcome post.
/// Running it again changes nothing.
pub fn seed_dev_data(posts: &PostService, identities: &MemoryIdentityProvider) -> anyhow::Result<()> {
    let alice = dev_identity("9a8f2c36-2d5e-4b7a-9f61-0c3e5d7b1a42", "Alice");
    let bob = dev_identity("4e1b7d90-6c2a-4f38-8b15-a7d3e9f0c264", "Bob");

    identities.register(DEV_TOKEN_ALICE, alice.clone())?;
    identities.register(DEV_TOKEN_BOB, bob)?;
    info!(alice = DEV_TOKEN_ALICE, bob = DEV_TOKEN_BOB, "dev bearer tokens registered");

    if posts.list_posts()?.is_empty() {
        let post = posts.create_post(&alice, "Welcome to the board! Say hello in the comments.")?;
        info!(post_id = %post.id, "seeded welcome post");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentityProvider;
    use crate::core::store::MemoryPostStore;
    use std::sync::Arc;

    #[test]
    fn seeding_is_idempotent() {
        let posts = PostService::new(Arc::new(MemoryPostStore::new()));
        let identities = MemoryIdentityProvider::new();

        seed_dev_data(&posts, &identities).unwrap();
        seed_dev_data(&posts, &identities).unwrap();

        assert_eq!(posts.list_posts().unwrap().len(), 1);
        let alice = identities.resolve(DEV_TOKEN_ALICE).unwrap().unwrap();
        assert_eq!(alice.name, "Alice");
        assert_eq!(posts.list_posts().unwrap()[0].user, alice.id);
        assert!(identities.resolve(DEV_TOKEN_BOB).unwrap().is_some());
    }
}
