use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Ambient layers: identity, configuration, errors, persistence, object storage.
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod storage;

// Course domain core. Pure rules first, the orchestrating service last.
pub mod enrollment;
pub mod lifecycle;
pub mod policy;
pub mod projection;
pub mod service;
pub mod validation;

// HTTP surface.
pub mod handlers;
pub mod routes;

use auth::Principal;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use error::AppError;
pub use policy::{PolicyState, RoleMatrixPolicy};
pub use repository::{InMemoryRepository, PostgresRepository, RepositoryState};
pub use service::CourseService;
pub use storage::{MockStorageService, S3StorageClient, StorageState};

/// ApiDoc
///
/// OpenAPI document aggregated from the `#[utoipa::path]` annotations on the handlers.
/// Served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::course::create_course, handlers::course::update_course,
        handlers::course::list_courses, handlers::course::get_course,
        handlers::course::enroll, handlers::course::unenroll,
        handlers::course::list_enrolled_courses, handlers::course::leave_feedback,
        handlers::course::list_material, handlers::course::add_material,
        handlers::course::update_material, handlers::course::delete_material,
        handlers::course::list_comments, handlers::course::add_comment,
        handlers::course::upload_image,
        handlers::user::register_user, handlers::user::get_me, handlers::user::update_me,
        handlers::user::get_public_profile, handlers::user::add_profile_entry,
        handlers::user::update_profile_entry, handlers::user::delete_profile_entry,
        handlers::user::upload_avatar,
        handlers::admin::get_admin_stats, handlers::admin::advance_registration,
    ),
    components(
        schemas(
            models::Course, models::CourseView, models::StudentCourseView,
            models::EnrolledCourseView, models::Registration, models::Feedback,
            models::Material, models::Manager, models::CourseComment,
            models::CreateCourseRequest, models::UpdateCourseRequest, models::ManagerInput,
            models::CreateMaterialRequest, models::UpdateMaterialRequest,
            models::CreateCommentRequest, models::FeedbackRequest,
            models::AdvanceRegistrationRequest, models::AdminStats,
            models::ImageUploadResponse, models::User, models::PublicProfile,
            models::UserProfile, models::ProfileEntry, models::ProfileEntryData,
            models::RegisterUserRequest, models::UpdateProfileRequest,
            error::ErrorBody, error::FieldError,
        )
    ),
    tags(
        (name = "edu-portal", description = "Course management API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Single shared container for every service the handlers depend on. Cloning is
/// cheap: each field is an `Arc` or a small config value.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub storage: StorageState,
    pub config: AppConfig,
    pub policy: PolicyState,
}

impl AppState {
    /// State with the default role-matrix policy.
    pub fn new(repo: RepositoryState, storage: StorageState, config: AppConfig) -> Self {
        Self {
            repo,
            storage,
            config,
            policy: Arc::new(RoleMatrixPolicy),
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for StorageState {
    fn from_ref(app_state: &AppState) -> StorageState {
        app_state.storage.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

impl FromRef<AppState> for CourseService {
    fn from_ref(app_state: &AppState) -> CourseService {
        CourseService::new(
            app_state.repo.clone(),
            app_state.storage.clone(),
            app_state.policy.clone(),
        )
    }
}

/// auth_middleware
///
/// Resolves the `Principal` before any protected handler runs. A failed resolution
/// rejects the request with 401; a successful one is cached in the request
/// extensions for the handler's own extractor.
async fn auth_middleware(_principal: Principal, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles the route modules, the auth layer and the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let protected = authenticated::authenticated_routes()
        .nest("/admin", admin::admin_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(protected)
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one HTTP request, tagged with the `x-request-id` set by the layer above
/// so every log line of the request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
