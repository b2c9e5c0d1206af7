use crate::{
    AppState,
    handlers::{course, user},
    validation::IMAGE_MAX_BYTES,
};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post, put},
};

/// Authenticated Router Module
///
/// Every route here runs after the auth middleware has resolved a `Principal`.
/// Course-level authorization (role matrix, coordinator grant) is enforced by the
/// course service, so handlers stay free of role checks.
pub fn authenticated_routes() -> Router<AppState> {
    // Image bodies are raw bytes; allow them past the default 2 MiB limit.
    let upload_limit = DefaultBodyLimit::max(IMAGE_MAX_BYTES);

    Router::<AppState>::new()
        // --- Courses ---
        // POST /course
        // Creates a DRAFT course. SUPERADMIN only.
        .route("/course", post(course::create_course))
        // GET /course/all
        // Role-projected listing.
        .route("/course/all", get(course::list_courses))
        // GET/PUT /course/{id}
        // Detail view; field update with lifecycle transition (SUPERADMIN).
        .route(
            "/course/{id}",
            get(course::get_course).put(course::update_course),
        )
        // --- Enrollment ---
        .route("/course/enroll/{id}", post(course::enroll))
        .route("/course/unenroll/{id}", post(course::unenroll))
        .route(
            "/course/student/enrolled-courses",
            get(course::list_enrolled_courses),
        )
        .route("/course/{id}/feedback", post(course::leave_feedback))
        // --- Material ---
        .route(
            "/course/{id}/material",
            get(course::list_material).post(course::add_material),
        )
        .route(
            "/course/{id}/material/{material_id}",
            put(course::update_material).delete(course::delete_material),
        )
        // --- Comments ---
        .route(
            "/course/{id}/comments",
            get(course::list_comments).post(course::add_comment),
        )
        // POST /course/upload-image/{id}
        // Raw image body. Refused for archived courses.
        .route(
            "/course/upload-image/{id}",
            post(course::upload_image).layer(upload_limit.clone()),
        )
        // --- Profile ---
        .route("/user/me", get(user::get_me).put(user::update_me))
        .route("/user/{id}/public", get(user::get_public_profile))
        .route("/user/me/{section}", post(user::add_profile_entry))
        .route(
            "/user/me/{section}/{entry_id}",
            put(user::update_profile_entry).delete(user::delete_profile_entry),
        )
        .route(
            "/user/upload-avatar",
            post(user::upload_avatar).layer(upload_limit),
        )
}
