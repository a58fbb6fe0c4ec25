// rest_api/src/lib.rs
//! HTTP surface of the clinic backend: routing, authentication, error
//! rendering and the realtime WebSocket.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method};
use axum::routing::{delete, get, patch, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use lib::clinic_store::ClinicStore;
use lib::config::{AppConfig, DEFAULT_JWT_SECRET};
use lib::notifications::{NotificationHub, DEFAULT_CHANNEL_CAPACITY};
use lib::uploads::{CloudinaryImageStore, ImageStore, MAX_IMAGE_BYTES};
use security::TokenIssuer;

pub mod auth;
pub mod error;
pub mod forms;
pub mod handlers;
pub mod realtime;

pub use error::{ApiResult, RestApiError};

/// Multipart bodies carry one image plus a handful of text fields.
const MAX_BODY_BYTES: usize = MAX_IMAGE_BYTES + 1024 * 1024;

/// Shared state for the Axum application.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ClinicStore>,
    pub notifier: Arc<NotificationHub>,
    pub images: Option<Arc<dyn ImageStore>>,
    pub tokens: TokenIssuer,
    pub cors_origin: String,
}

impl AppState {
    /// Wires the collaborators described by `config` around `store`. Must be
    /// called inside a Tokio runtime, since the notification dispatcher is
    /// spawned here.
    pub fn from_config(config: &AppConfig, store: Arc<dyn ClinicStore>) -> Result<Self> {
        if config.jwt_secret == DEFAULT_JWT_SECRET {
            if config.is_production() {
                anyhow::bail!("JWT_SECRET must be set in production");
            }
            warn!("Using the development JWT secret");
        }

        let images: Option<Arc<dyn ImageStore>> = match config.cloudinary() {
            Some(cloudinary) => {
                let store = CloudinaryImageStore::new(cloudinary).context("Failed to configure image storage")?;
                Some(Arc::new(store))
            }
            None => {
                info!("Cloudinary is not configured; image uploads are disabled");
                None
            }
        };

        Ok(AppState {
            store,
            notifier: NotificationHub::start(DEFAULT_CHANNEL_CAPACITY),
            images,
            tokens: TokenIssuer::new(&config.jwt_secret),
            cors_origin: config.socket_cors_origin.clone(),
        })
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| HeaderValue::from_str(o).ok())
            .collect();
        AllowOrigin::list(origins)
    };
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
        .allow_origin(allow_origin)
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_origin);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/login", post(handlers::login))
        .route("/users/me", get(handlers::me))
        .route("/users", get(handlers::list_users).post(handlers::create_user))
        .route("/departments", get(handlers::list_departments).post(handlers::create_department))
        .route("/departments/:department_id", delete(handlers::delete_department))
        .route(
            "/departments/:department_id/specialties",
            get(handlers::list_specialties).post(handlers::create_specialty),
        )
        .route("/doctors", get(handlers::list_doctors))
        .route("/doctors/create", post(handlers::create_doctor))
        .route("/receptionists", get(handlers::list_receptionists))
        .route("/receptionists/create", post(handlers::create_receptionist))
        .route("/appointments", get(handlers::list_appointments).post(handlers::create_appointment))
        .route("/appointments/patients", get(handlers::find_patient))
        .route("/appointments/stats/today", get(handlers::today_stats))
        .route("/appointments/queue/next", get(handlers::next_patient_queue))
        .route("/appointments/:appointment_id/status", patch(handlers::update_appointment_status))
        .route("/realtime", get(realtime::realtime_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serves the API on `addr` until `shutdown` resolves.
pub async fn start_server<F>(state: AppState, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to address: {}", addr))?;
    info!("Clinic API listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
        .context("Clinic API server failed while running")?;

    info!("Clinic API stopped");
    Ok(())
}
