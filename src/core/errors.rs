use std::fmt;

use http::StatusCode;
use spin_sdk::http::Response;

use crate::posts::PostError;
use crate::validation::ValidationErrors;

/// Everything a handler can fail with, already shaped for the wire.
///
/// Error bodies are a single-field JSON object whose key names the failing
/// concern, e.g. `{"postNotFound": "No post found"}`. Validation failures use
/// the field names as keys.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Validation(ValidationErrors),
    Unauthorized,
    NotAuthorised(String),
    NotFound { key: &'static str, message: String },
    Rejected { key: &'static str, message: String },
    Conflict(String),
    InternalError(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Validation(_) | ApiError::Rejected { .. } => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Unauthorized | ApiError::NotAuthorised(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> serde_json::Value {
        match self {
            ApiError::BadRequest(msg) => serde_json::json!({ "error": msg }),
            ApiError::Validation(errors) => serde_json::to_value(errors).unwrap_or_default(),
            ApiError::Unauthorized => serde_json::json!({ "error": "Unauthorized" }),
            ApiError::NotAuthorised(msg) => serde_json::json!({ "notAuthorised": msg }),
            ApiError::NotFound { key, message } | ApiError::Rejected { key, message } => {
                let mut body = serde_json::Map::new();
                body.insert((*key).to_string(), serde_json::Value::String(message.clone()));
                serde_json::Value::Object(body)
            }
            ApiError::Conflict(msg) => serde_json::json!({ "conflict": msg }),
            ApiError::InternalError(msg) => serde_json::json!({ "error": msg }),
        }
    }

    pub fn route_not_found() -> Self {
        ApiError::NotFound {
            key: "error",
            message: "No route found".to_string(),
        }
    }

    pub fn post_not_found() -> Self {
        ApiError::NotFound {
            key: "postNotFound",
            message: "No post found".to_string(),
        }
    }

    pub fn comment_not_found() -> Self {
        ApiError::NotFound {
            key: "commentNotFound",
            message: "Comment does not exist".to_string(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Validation(errors) => write!(f, "Validation failed: {}", errors),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::NotAuthorised(msg) => write!(f, "Not authorised: {}", msg),
            ApiError::NotFound { message, .. } => write!(f, "Not Found: {}", message),
            ApiError::Rejected { message, .. } => write!(f, "Rejected: {}", message),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        Response::builder()
            .status(err.status().as_u16())
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&err.body()).unwrap_or_default())
            .build()
    }
}

impl From<PostError> for ApiError {
    fn from(err: PostError) -> Self {
        match err {
            PostError::Validation(errors) => ApiError::Validation(errors),
            PostError::PostNotFound(_) => ApiError::post_not_found(),
            PostError::CommentNotFound { .. } => ApiError::comment_not_found(),
            PostError::NotAuthorised(_) => ApiError::NotAuthorised("User not authorised".to_string()),
            PostError::AlreadyLiked(_) => ApiError::Rejected {
                key: "alreadyLiked",
                message: "User already liked this post".to_string(),
            },
            PostError::NotLiked(_) => ApiError::Rejected {
                key: "notLiked",
                message: "You have not yet liked this post".to_string(),
            },
            PostError::Contention(_) => {
                ApiError::Conflict("Post is busy, please retry".to_string())
            }
            PostError::Store(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

// Anything the router could not classify is a 500.
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}
