use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::middleware::require_auth;
use crate::state::AppState;
use crate::{auth, catalog, likes, og, songs, users};

pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/songs", get(songs::list_songs).post(songs::create_song))
        .route("/api/songs/{id}/like", post(likes::toggle_like))
        .route("/api/spotify/search", get(catalog::search))
        .route("/api/spotify/refresh", get(catalog::refresh))
        .route("/api/auth/callback", get(auth::callback))
        .route("/api/users/check", get(users::check_username))
        .route("/api/users/{username}", get(users::get_profile))
        .route("/api/og", get(og::share_image))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/api/users/claim", post(users::claim_username))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}
