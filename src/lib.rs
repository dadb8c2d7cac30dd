//! Posts, likes and comments for the developer board.
//!
//! The same router serves both as a Spin HTTP component (posts in the Spin
//! key-value store) and behind the native actix-web binary (posts in memory).

pub mod auth;
pub mod config;
pub mod core;
pub mod handlers;
pub mod models;
pub mod posts;
pub mod validation;

#[cfg(target_arch = "wasm32")]
mod component;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;
