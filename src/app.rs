//! HTTP router.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{auth, handlers, paths, state::AppState};

/// Room for multipart boundaries and headers on top of the image itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.uploads.max_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(handlers::index))
        .route("/signup/", get(auth::signup_page).post(auth::signup_submit))
        .route("/login/", get(auth::login_page).post(auth::login_submit))
        .route("/logout/", post(auth::logout))
        .route(
            "/dashboard/",
            get(handlers::dashboard)
                .post(handlers::upload_profile_image)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/dashboard/{page}/", get(handlers::dashboard_page))
        .route(
            "/dashboard/facilities/{facility}/",
            get(handlers::facility_detail).post(handlers::submit_facility_report),
        )
        .nest_service("/static", ServeDir::new(paths::STATIC_DIR))
        .nest_service("/media", ServeDir::new(&state.media_dir))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
