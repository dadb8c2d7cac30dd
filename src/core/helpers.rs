use chrono::{DateTime, Utc};
use http::StatusCode;
use serde::Serialize;
use spin_sdk::http::Response;
use uuid::Uuid;

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn validate_uuid(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> anyhow::Result<Response> {
    Ok(Response::builder()
        .status(status.as_u16())
        .header("Content-Type", "application/json")
        .body(serde_json::to_vec(body)?)
        .build())
}
