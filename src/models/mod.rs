pub mod identity;
pub mod post;

pub use identity::{Identity, TokenData};
pub use post::{Comment, Like, Post};
