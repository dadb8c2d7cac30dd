use std::sync::Arc;

use spin_sdk::http::{IntoResponse, Request};
use spin_sdk::http_component;

use crate::auth::KvIdentityProvider;
use crate::core::kv_store::KvPostStore;
use crate::handlers::{route, AppState};

#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let state = AppState::new(
        Arc::new(KvPostStore::from_env()),
        Arc::new(KvIdentityProvider::from_env()),
    );
    route(&req, &state)
}
