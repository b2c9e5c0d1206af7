use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        AdminStats, Course, CourseComment, CourseStatus, Feedback, Manager, Material,
        ProfileEntry, PublicProfile, Registration, UpdateProfileRequest, User,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Failures of the persistence layer. They never carry a business meaning and are
/// reported to clients as a generic 500.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    /// A unique column already holds the submitted value.
    #[error("duplicate {0}")]
    Duplicate(&'static str),
}

impl From<RepositoryError> for AppError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Duplicate(field) => {
                AppError::invalid_field(field, "is already registered")
            }
            other => AppError::internal(other.to_string()),
        }
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

/// Repository Trait
///
/// Persistence contract for users and courses. Course sub-entities (managers,
/// material, registrations, feedback, comments) are addressed by their own ids:
/// append inserts one element, update replaces the element with the same id, and
/// remove deletes it. Methods returning `bool` report whether an element matched.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>>;
    async fn create_user(&self, user: User) -> RepoResult<User>;
    async fn update_user_profile(
        &self,
        id: Uuid,
        req: &UpdateProfileRequest,
    ) -> RepoResult<Option<User>>;
    async fn set_user_avatar(&self, id: Uuid, key: &str) -> RepoResult<bool>;
    async fn get_public_profiles(&self, ids: &[Uuid]) -> RepoResult<Vec<PublicProfile>>;

    // --- Profile entries ---
    async fn list_profile_entries(&self, user_id: Uuid) -> RepoResult<Vec<ProfileEntry>>;
    async fn add_profile_entry(&self, user_id: Uuid, entry: &ProfileEntry) -> RepoResult<()>;
    async fn update_profile_entry(&self, user_id: Uuid, entry: &ProfileEntry)
    -> RepoResult<bool>;
    async fn delete_profile_entry(&self, user_id: Uuid, entry_id: Uuid) -> RepoResult<bool>;

    // --- Courses ---
    async fn insert_course(&self, course: &Course) -> RepoResult<()>;
    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>>;
    /// All courses, optionally restricted to one status, newest first.
    async fn list_courses(&self, status: Option<CourseStatus>) -> RepoResult<Vec<Course>>;
    /// Courses holding a registration for `user_id`.
    async fn list_courses_with_registrant(&self, user_id: Uuid) -> RepoResult<Vec<Course>>;
    /// Persists the scalar fields of `course` and appends `new_managers`, atomically,
    /// only while the stored status still equals `expected_status`. Returns false when
    /// the course is gone or its status moved on since it was read.
    async fn update_course(
        &self,
        course: &Course,
        expected_status: CourseStatus,
        new_managers: &[Manager],
    ) -> RepoResult<bool>;
    async fn set_course_image(&self, course_id: Uuid, key: &str) -> RepoResult<bool>;
    async fn set_course_rating(&self, course_id: Uuid, rating: f64) -> RepoResult<bool>;

    // --- Registrations ---
    /// Insert-if-absent on (course, user). Returns false if the pair already exists.
    async fn add_registration(
        &self,
        course_id: Uuid,
        registration: &Registration,
    ) -> RepoResult<bool>;
    async fn update_registration(
        &self,
        course_id: Uuid,
        registration: &Registration,
    ) -> RepoResult<bool>;
    async fn remove_registration(&self, course_id: Uuid, registration_id: Uuid)
    -> RepoResult<bool>;
    async fn add_feedback(
        &self,
        course_id: Uuid,
        registration_id: Uuid,
        feedback: &Feedback,
    ) -> RepoResult<bool>;

    // --- Material ---
    async fn add_material(&self, course_id: Uuid, material: &Material) -> RepoResult<()>;
    async fn update_material(&self, course_id: Uuid, material: &Material) -> RepoResult<bool>;
    async fn remove_material(&self, course_id: Uuid, material_id: Uuid) -> RepoResult<bool>;

    // --- Comments ---
    async fn add_comment(&self, course_id: Uuid, comment: &CourseComment) -> RepoResult<()>;

    // --- Admin ---
    async fn get_stats(&self) -> RepoResult<AdminStats>;
}

/// RepositoryState
///
/// Shared handle stored in the application state.
pub type RepositoryState = Arc<dyn Repository>;
