use std::net::TcpListener;
use std::sync::Arc;

use actix_web::{dev::Server, web, App, HttpRequest, HttpResponse, HttpServer};
use tracing::{error, info};

use crate::auth::MemoryIdentityProvider;
use crate::config;
use crate::core::db::seed_dev_data;
use crate::core::store::MemoryPostStore;
use crate::handlers::{route, AppState};

mod adapter {
    use actix_web::HttpRequest;
    use spin_sdk::http::{Method, Request};

    pub fn actix_to_spin_request(req: &HttpRequest, body: actix_web::web::Bytes) -> Request {
        let method = match req.method().as_str() {
            "GET" => Method::Get,
            "POST" => Method::Post,
            "PUT" => Method::Put,
            "DELETE" => Method::Delete,
            "HEAD" => Method::Head,
            "OPTIONS" => Method::Options,
            "PATCH" => Method::Patch,
            other => Method::Other(other.to_string()),
        };

        let uri = req.uri().to_string();

        let mut builder = Request::builder();
        builder.method(method).uri(uri.as_str());
        for (name, value) in req.headers() {
            if let Ok(val_str) = value.to_str() {
                builder.header(name.as_str(), val_str);
            }
        }

        builder.body(body.to_vec()).build()
    }

    pub fn spin_to_actix_response(spin_resp: spin_sdk::http::Response) -> actix_web::HttpResponse {
        let status = *spin_resp.status();
        let body = spin_resp.body().to_vec();

        actix_web::HttpResponse::build(
            actix_web::http::StatusCode::from_u16(status)
                .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR),
        )
        .content_type("application/json")
        .body(body)
    }
}

pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,actix_web=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// In-memory state for the native server, seeded with demo data unless
/// `DEVBOARD_SEED_DEV_DATA=false`.
pub fn dev_state() -> anyhow::Result<AppState> {
    let identities = Arc::new(MemoryIdentityProvider::new());
    let state = AppState::new(Arc::new(MemoryPostStore::new()), identities.clone());

    if config::seed_dev_data() {
        seed_dev_data(&state.posts, &identities)?;
    }
    Ok(state)
}

async fn handle_all(req: HttpRequest, body: web::Bytes, state: web::Data<AppState>) -> HttpResponse {
    let spin_req = adapter::actix_to_spin_request(&req, body);

    match route(&spin_req, &state) {
        Ok(spin_resp) => {
            info!(method = %req.method(), path = %req.path(), status = *spin_resp.status(), "handled request");
            adapter::spin_to_actix_response(spin_resp)
        }
        Err(e) => {
            error!(method = %req.method(), path = %req.path(), error = %e, "unhandled error");
            HttpResponse::InternalServerError().json(serde_json::json!({"error": "Internal server error"}))
        }
    }
}

/// Starts serving on an already bound listener. The returned server must be
/// awaited or spawned.
pub fn serve(listener: TcpListener, state: AppState) -> std::io::Result<Server> {
    let data = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .default_service(web::route().to(handle_all))
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub async fn run() -> std::io::Result<()> {
    let state = dev_state().map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
    let addr = config::bind_addr();
    let listener = TcpListener::bind(&addr)?;

    info!("Server listening on http://{}", addr);
    serve(listener, state)?.await
}
