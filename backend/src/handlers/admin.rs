use axum::{
    Json,
    extract::{Path, State},
};
use uuid::Uuid;

use super::{ApiResponse, ApiResult};
use crate::{
    auth::Principal,
    models::{AdminStats, AdvanceRegistrationRequest, Registration},
    service::CourseService,
};

/// get_admin_stats
///
/// [Admin Route] Dashboard counters. The role check happens in the service.
#[utoipa::path(
    get,
    path = "/admin/stats",
    responses(
        (status = 200, description = "Stats", body = AdminStats),
        (status = 403, description = "Not a superadmin")
    )
)]
pub async fn get_admin_stats(
    principal: Principal,
    State(service): State<CourseService>,
) -> ApiResult<AdminStats> {
    Ok(ApiResponse::ok(service.stats(&principal).await?))
}

/// advance_registration
///
/// [Admin Route] Moves a registration forward: REQUESTED to ACCEPTED or REJECTED,
/// ACCEPTED to DISCONTINUED.
#[utoipa::path(
    put,
    path = "/admin/course/{course_id}/registration/{registration_id}",
    params(
        ("course_id" = Uuid, Path, description = "Course ID"),
        ("registration_id" = Uuid, Path, description = "Registration ID")
    ),
    request_body = AdvanceRegistrationRequest,
    responses(
        (status = 200, description = "Advanced", body = Registration),
        (status = 400, description = "Illegal transition"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn advance_registration(
    principal: Principal,
    State(service): State<CourseService>,
    Path((course_id, registration_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<AdvanceRegistrationRequest>,
) -> ApiResult<Registration> {
    let registration = service
        .advance_registration(course_id, registration_id, &principal, payload)
        .await?;
    Ok(ApiResponse::ok(registration))
}
