use crate::{AppState, handlers::admin};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Mounted under `/admin` behind the auth middleware. Each handler delegates to the
/// course service, whose policy rejects anyone but SUPERADMIN with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/stats
        // Users, courses per status, registrations.
        .route("/stats", get(admin::get_admin_stats))
        // PUT /admin/course/{course_id}/registration/{registration_id}
        // Accept, reject or discontinue one registration.
        .route(
            "/course/{course_id}/registration/{registration_id}",
            put(admin::advance_registration),
        )
}
