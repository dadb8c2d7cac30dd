use std::sync::Arc;

use http::StatusCode;
use spin_sdk::http::{Method, Request, Response};
use tracing::{debug, error};

use crate::auth::{bearer_token, IdentityProvider};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, validate_uuid};
use crate::core::store::PostStore;
use crate::models::Identity;
use crate::posts::PostService;
use crate::validation::TextInput;

type HandlerResult = Result<Response, ApiError>;

/// Shared handles every request needs. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub posts: PostService,
    pub identities: Arc<dyn IdentityProvider>,
}

impl AppState {
    pub fn new(store: Arc<dyn PostStore>, identities: Arc<dyn IdentityProvider>) -> Self {
        AppState {
            posts: PostService::new(store),
            identities,
        }
    }
}

pub fn route(req: &Request, state: &AppState) -> anyhow::Result<Response> {
    let path = req.path();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    let result = match (req.method(), segments.as_slice()) {
        (Method::Get, ["posts"]) => list_posts(state),
        (Method::Get, ["posts", id]) => get_post(state, id),
        (Method::Post, ["posts"]) => create_post(req, state),
        (Method::Delete, ["posts", id]) => delete_post(req, state, id),
        (Method::Post, ["posts", "like", id]) => like_post(req, state, id),
        (Method::Post, ["posts", "unlike", id]) => unlike_post(req, state, id),
        (Method::Post, ["posts", "comment", id]) => add_comment(req, state, id),
        (Method::Delete, ["posts", "comment", id, comment_id]) => {
            remove_comment(req, state, id, comment_id)
        }
        _ => Err(ApiError::route_not_found()),
    };

    match result {
        Ok(resp) => Ok(resp),
        Err(err) => {
            if err.status().is_server_error() {
                error!(path, error = %err, "request failed");
            } else {
                debug!(path, error = %err, "request rejected");
            }
            Ok(err.into())
        }
    }
}

fn authenticate(req: &Request, state: &AppState) -> Result<Identity, ApiError> {
    let token = bearer_token(req).ok_or(ApiError::Unauthorized)?;
    state
        .identities
        .resolve(token)?
        .ok_or(ApiError::Unauthorized)
}

fn parse_text(req: &Request) -> Result<TextInput, ApiError> {
    let body = req.body();
    if body.is_empty() {
        return Ok(TextInput::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {}", e)))
}

// Ids are UUIDs; anything else cannot name a stored post.
fn require_post_id(id: &str) -> Result<(), ApiError> {
    if validate_uuid(id) {
        Ok(())
    } else {
        Err(ApiError::post_not_found())
    }
}

fn list_posts(state: &AppState) -> HandlerResult {
    let posts = state.posts.list_posts()?;
    Ok(json_response(StatusCode::OK, &posts)?)
}

fn get_post(state: &AppState, post_id: &str) -> HandlerResult {
    require_post_id(post_id)?;
    let post = state.posts.get_post(post_id)?;
    Ok(json_response(StatusCode::OK, &post)?)
}

fn create_post(req: &Request, state: &AppState) -> HandlerResult {
    let caller = authenticate(req, state)?;
    let input = parse_text(req)?;

    let post = state
        .posts
        .create_post(&caller, input.text.as_deref().unwrap_or_default())?;
    Ok(json_response(StatusCode::OK, &post)?)
}

fn delete_post(req: &Request, state: &AppState, post_id: &str) -> HandlerResult {
    let caller = authenticate(req, state)?;
    require_post_id(post_id)?;

    state.posts.delete_post(&caller, post_id)?;
    Ok(json_response(StatusCode::OK, &serde_json::json!({ "success": true }))?)
}

fn like_post(req: &Request, state: &AppState, post_id: &str) -> HandlerResult {
    let caller = authenticate(req, state)?;
    require_post_id(post_id)?;

    let post = state.posts.like_post(&caller, post_id)?;
    Ok(json_response(StatusCode::OK, &post)?)
}

fn unlike_post(req: &Request, state: &AppState, post_id: &str) -> HandlerResult {
    let caller = authenticate(req, state)?;
    require_post_id(post_id)?;

    let post = state.posts.unlike_post(&caller, post_id)?;
    Ok(json_response(StatusCode::OK, &post)?)
}

fn add_comment(req: &Request, state: &AppState, post_id: &str) -> HandlerResult {
    let caller = authenticate(req, state)?;
    let input = parse_text(req)?;

    // No id pre-check here: text problems are reported ahead of a bad post id.
    let post = state
        .posts
        .add_comment(&caller, post_id, input.text.as_deref().unwrap_or_default())?;
    Ok(json_response(StatusCode::OK, &post)?)
}

fn remove_comment(req: &Request, state: &AppState, post_id: &str, comment_id: &str) -> HandlerResult {
    let caller = authenticate(req, state)?;
    require_post_id(post_id)?;
    if !validate_uuid(comment_id) {
        return Err(ApiError::comment_not_found());
    }

    let post = state.posts.remove_comment(&caller, post_id, comment_id)?;
    Ok(json_response(StatusCode::OK, &post)?)
}
