use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, header},
};
use uuid::Uuid;

use super::{ApiResponse, ApiResult};
use crate::{
    auth::Principal,
    models::{
        Course, CourseComment, CourseView, CreateCommentRequest, CreateCourseRequest,
        CreateMaterialRequest, EnrolledCourseView, FeedbackRequest, ImageUploadResponse, Material,
        UpdateCourseRequest, UpdateMaterialRequest,
    },
    service::CourseService,
};

/// create_course
///
/// [SUPERADMIN] Creates a DRAFT course with the caller as its coordinator.
#[utoipa::path(
    post,
    path = "/course",
    request_body = CreateCourseRequest,
    responses(
        (status = 201, description = "Created", body = Course),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Not a superadmin")
    )
)]
pub async fn create_course(
    principal: Principal,
    State(service): State<CourseService>,
    Json(payload): Json<CreateCourseRequest>,
) -> ApiResult<Course> {
    let course = service.create_course(&principal, payload).await?;
    Ok(ApiResponse::created(course))
}

/// update_course
///
/// [SUPERADMIN] Field update and lifecycle transition in one call. The status change
/// is checked before anything is written.
#[utoipa::path(
    put,
    path = "/course/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = UpdateCourseRequest,
    responses(
        (status = 200, description = "Updated", body = Course),
        (status = 400, description = "Validation failed or illegal transition"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_course(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCourseRequest>,
) -> ApiResult<Course> {
    let course = service.update_course(id, &principal, payload).await?;
    Ok(ApiResponse::ok(course))
}

/// list_courses
///
/// Role-projected listing: full documents for SUPERADMIN, published student views
/// for REGULAR.
#[utoipa::path(
    get,
    path = "/course/all",
    responses(
        (status = 200, description = "Courses", body = [CourseView]),
        (status = 403, description = "Role may not list courses")
    )
)]
pub async fn list_courses(
    principal: Principal,
    State(service): State<CourseService>,
) -> ApiResult<Vec<CourseView>> {
    Ok(ApiResponse::ok(service.list_courses(&principal).await?))
}

#[utoipa::path(
    get,
    path = "/course/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Found", body = CourseView),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_course(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
) -> ApiResult<CourseView> {
    Ok(ApiResponse::ok(service.get_course(id, &principal).await?))
}

/// enroll
///
/// [REGULAR] Requests a seat in the course. A second request yields 400.
#[utoipa::path(
    post,
    path = "/course/enroll/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Registration requested", body = EnrolledCourseView),
        (status = 400, description = "Already enrolled"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn enroll(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
) -> ApiResult<EnrolledCourseView> {
    Ok(ApiResponse::ok(service.enroll(id, &principal).await?))
}

#[utoipa::path(
    post,
    path = "/course/unenroll/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses(
        (status = 200, description = "Registration removed", body = EnrolledCourseView),
        (status = 400, description = "Not enrolled"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn unenroll(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
) -> ApiResult<EnrolledCourseView> {
    Ok(ApiResponse::ok(service.unenroll(id, &principal).await?))
}

#[utoipa::path(
    get,
    path = "/course/student/enrolled-courses",
    responses((status = 200, description = "Courses holding a registration of the caller", body = [EnrolledCourseView]))
)]
pub async fn list_enrolled_courses(
    principal: Principal,
    State(service): State<CourseService>,
) -> ApiResult<Vec<EnrolledCourseView>> {
    Ok(ApiResponse::ok(
        service.list_enrolled_courses(&principal).await?,
    ))
}

/// leave_feedback
///
/// [REGULAR] Scores a course the caller was accepted into and refreshes its rating.
#[utoipa::path(
    post,
    path = "/course/{id}/feedback",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = FeedbackRequest,
    responses(
        (status = 200, description = "Feedback recorded", body = EnrolledCourseView),
        (status = 409, description = "Registration not accepted")
    )
)]
pub async fn leave_feedback(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
    Json(payload): Json<FeedbackRequest>,
) -> ApiResult<EnrolledCourseView> {
    Ok(ApiResponse::ok(
        service.leave_feedback(id, &principal, payload).await?,
    ))
}

// --- Material ---

#[utoipa::path(
    get,
    path = "/course/{id}/material",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses((status = 200, description = "Material", body = [Material]))
)]
pub async fn list_material(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<Material>> {
    Ok(ApiResponse::ok(service.list_material(id, &principal).await?))
}

/// add_material
///
/// [SUPERADMIN or coordinator] Appends one material entry.
#[utoipa::path(
    post,
    path = "/course/{id}/material",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateMaterialRequest,
    responses(
        (status = 201, description = "Added", body = Material),
        (status = 403, description = "Cannot mutate this course")
    )
)]
pub async fn add_material(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateMaterialRequest>,
) -> ApiResult<Material> {
    let material = service.add_material(id, &principal, payload).await?;
    Ok(ApiResponse::created(material))
}

#[utoipa::path(
    put,
    path = "/course/{id}/material/{material_id}",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("material_id" = Uuid, Path, description = "Material ID")
    ),
    request_body = UpdateMaterialRequest,
    responses(
        (status = 200, description = "Updated", body = Material),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_material(
    principal: Principal,
    State(service): State<CourseService>,
    Path((id, material_id)): Path<(Uuid, Uuid)>,
    Json(payload): Json<UpdateMaterialRequest>,
) -> ApiResult<Material> {
    let material = service
        .update_material(id, material_id, &principal, payload)
        .await?;
    Ok(ApiResponse::ok(material))
}

#[utoipa::path(
    delete,
    path = "/course/{id}/material/{material_id}",
    params(
        ("id" = Uuid, Path, description = "Course ID"),
        ("material_id" = Uuid, Path, description = "Material ID")
    ),
    responses(
        (status = 200, description = "Deleted"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_material(
    principal: Principal,
    State(service): State<CourseService>,
    Path((id, material_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<Uuid> {
    service.delete_material(id, material_id, &principal).await?;
    Ok(ApiResponse::ok(material_id))
}

// --- Comments ---

#[utoipa::path(
    get,
    path = "/course/{id}/comments",
    params(("id" = Uuid, Path, description = "Course ID")),
    responses((status = 200, description = "Comments", body = [CourseComment]))
)]
pub async fn list_comments(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<CourseComment>> {
    Ok(ApiResponse::ok(service.list_comments(id, &principal).await?))
}

#[utoipa::path(
    post,
    path = "/course/{id}/comments",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body = CreateCommentRequest,
    responses((status = 201, description = "Comment Added", body = CourseComment))
)]
pub async fn add_comment(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> ApiResult<CourseComment> {
    let comment = service.add_comment(id, &principal, payload).await?;
    Ok(ApiResponse::created(comment))
}

/// upload_image
///
/// [SUPERADMIN or coordinator] Raw image body; the `Content-Type` header selects
/// the stored extension. Archived courses refuse new images.
#[utoipa::path(
    post,
    path = "/course/upload-image/{id}",
    params(("id" = Uuid, Path, description = "Course ID")),
    request_body(content = Vec<u8>, content_type = "image/*"),
    responses(
        (status = 200, description = "Stored", body = ImageUploadResponse),
        (status = 409, description = "Course is archived")
    )
)]
pub async fn upload_image(
    principal: Principal,
    State(service): State<CourseService>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<ImageUploadResponse> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());
    let uploaded = service
        .upload_image(id, &principal, content_type, body.to_vec())
        .await?;
    Ok(ApiResponse::ok(uploaded))
}
