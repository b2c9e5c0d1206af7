use crate::{AppState, handlers::user};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a principal.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // POST /user/register
        // Signs up at the identity provider and mirrors a REGULAR profile.
        .route("/user/register", post(user::register_user))
}
