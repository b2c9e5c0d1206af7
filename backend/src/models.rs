use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Enumerations ---

/// Role
///
/// Global role of a user. Gates every course-level operation through the policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum Role {
    #[default]
    Regular,
    Superadmin,
    Manager,
}

/// CourseStatus
///
/// Lifecycle position of a course. Legal moves between these values are kept in
/// `lifecycle::TRANSITIONS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum CourseStatus {
    #[default]
    Draft,
    Published,
    Finished,
    Archived,
}

/// RegistrationState
///
/// State of a single enrollment, serialized and stored by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum RegistrationState {
    #[default]
    Requested,
    Accepted,
    Rejected,
    Discontinued,
}

/// ManagerRole
///
/// Role a manager holds inside one course. Only coordinators may mutate the course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum ManagerRole {
    #[default]
    Coordinator,
    Lecturer,
    Assistant,
}

/// Error returned when a stored enum column holds an unknown value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// Wires `as_str`, `Display` and `FromStr` for the text-backed enums above so the
/// repository can store them as plain TEXT columns.
macro_rules! text_enum {
    ($ty:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = UnknownVariant;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum!(Role, "role", {
    Regular => "REGULAR",
    Superadmin => "SUPERADMIN",
    Manager => "MANAGER",
});

text_enum!(CourseStatus, "course status", {
    Draft => "DRAFT",
    Published => "PUBLISHED",
    Finished => "FINISHED",
    Archived => "ARCHIVED",
});

text_enum!(RegistrationState, "registration state", {
    Requested => "REQUESTED",
    Accepted => "ACCEPTED",
    Rejected => "REJECTED",
    Discontinued => "DISCONTINUED",
});

text_enum!(ManagerRole, "manager role", {
    Coordinator => "COORDINATOR",
    Lecturer => "LECTURER",
    Assistant => "ASSISTANT",
});

// --- Users & Profiles ---

/// User
///
/// Canonical identity record stored in the `profiles` table. Credentials live with the
/// external identity provider; nothing secret is ever held here.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub surname: String,
    pub role: Role,
    pub bio: Option<String>,
    pub avatar_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// PublicProfile
///
/// The subset of a user that may be shown to other users: no email, no role.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct PublicProfile {
    pub id: Uuid,
    pub name: String,
    pub surname: String,
    pub bio: Option<String>,
    pub avatar_key: Option<String>,
}

impl From<&User> for PublicProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            surname: user.surname.clone(),
            bio: user.bio.clone(),
            avatar_key: user.avatar_key.clone(),
        }
    }
}

/// ProfileSection
///
/// CV-style sections of a profile. Used as a path segment (`/user/me/{section}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum ProfileSection {
    Education,
    Experience,
    Project,
    Award,
}

text_enum!(ProfileSection, "profile section", {
    Education => "education",
    Experience => "experience",
    Project => "project",
    Award => "award",
});

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub field_of_study: Option<String>,
    pub start_date: chrono::NaiveDate,
    pub end_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Experience {
    pub company: String,
    pub position: String,
    pub description: Option<String>,
    pub start_date: chrono::NaiveDate,
    pub end_date: Option<chrono::NaiveDate>,
}

/// A portfolio project listed on a profile (not to be confused with a course).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ProjectEntry {
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Award {
    pub title: String,
    pub issuer: String,
    pub awarded_on: chrono::NaiveDate,
    pub description: Option<String>,
}

/// ProfileEntryData
///
/// Payload of one CV entry, tagged with the section it belongs to.
/// Serialized as `{ "section": "education", "data": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[serde(tag = "section", content = "data", rename_all = "lowercase")]
#[ts(export)]
pub enum ProfileEntryData {
    Education(Education),
    Experience(Experience),
    Project(ProjectEntry),
    Award(Award),
}

impl ProfileEntryData {
    pub const fn section(&self) -> ProfileSection {
        match self {
            Self::Education(_) => ProfileSection::Education,
            Self::Experience(_) => ProfileSection::Experience,
            Self::Project(_) => ProfileSection::Project,
            Self::Award(_) => ProfileSection::Award,
        }
    }

    /// Decodes a raw request body into the payload type matching `section`.
    pub fn from_section(
        section: ProfileSection,
        body: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match section {
            ProfileSection::Education => Self::Education(serde_json::from_value(body)?),
            ProfileSection::Experience => Self::Experience(serde_json::from_value(body)?),
            ProfileSection::Project => Self::Project(serde_json::from_value(body)?),
            ProfileSection::Award => Self::Award(serde_json::from_value(body)?),
        })
    }
}

/// ProfileEntry
///
/// One stored CV entry. The id is stable across updates so entries can be
/// replaced in place.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct ProfileEntry {
    pub id: Uuid,
    pub entry: ProfileEntryData,
    pub updated_at: DateTime<Utc>,
}

/// UserProfile
///
/// Output schema for `GET /user/me`: the user plus every CV entry they own.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserProfile {
    pub user: User,
    pub entries: Vec<ProfileEntry>,
}

// --- Course Aggregate ---

/// Manager
///
/// A user holding course-scoped administrative capability.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Manager {
    pub id: Uuid,
    pub manager_id: Uuid,
    pub role: ManagerRole,
}

/// Material
///
/// A link attached to a course by one of its managers.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Material {
    pub id: Uuid,
    pub url: String,
    pub added_by: Uuid,
    pub description: String,
    pub added_on: DateTime<Utc>,
}

/// Feedback
///
/// A scored entry left by an accepted student on their own registration.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Feedback {
    pub id: Uuid,
    pub score: i16,
    pub comment: Option<String>,
    pub given_at: DateTime<Utc>,
}

/// Registration
///
/// A user's enrollment record. At most one exists per (course, user) pair; the
/// timestamps only ever move forward together with `state`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct Registration {
    pub id: Uuid,
    pub user_id: Uuid,
    pub state: RegistrationState,
    pub requested_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub discontinued_at: Option<DateTime<Utc>>,
    pub feedback: Vec<Feedback>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct CourseComment {
    pub id: Uuid,
    pub author_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Course
///
/// The full course document as seen by a SUPERADMIN. Sub-entities each carry their
/// own id so they can be located and replaced in place.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub tags: Vec<String>,
    pub status: CourseStatus,
    pub created_by: Uuid,
    pub managers: Vec<Manager>,
    pub material: Vec<Material>,
    pub registrations: Vec<Registration>,
    pub rating: f64,
    pub comments: Vec<CourseComment>,
    pub image_key: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    /// True if `user_id` is listed as a COORDINATOR of this course.
    pub fn is_coordinator(&self, user_id: Uuid) -> bool {
        self.managers
            .iter()
            .any(|m| m.manager_id == user_id && m.role == ManagerRole::Coordinator)
    }
}

// --- Request Payloads (Input Schemas) ---

/// CreateCourseRequest
///
/// Input for `POST /course`. `tags` is kept as raw JSON so a malformed value is
/// reported as a validation error rather than a body rejection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCourseRequest {
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "Array<string> | null")]
    #[schema(value_type = Option<Vec<String>>)]
    pub tags: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq, Eq)]
#[ts(export)]
pub struct ManagerInput {
    pub manager_id: Uuid,
    pub role: ManagerRole,
}

/// UpdateCourseRequest
///
/// Partial update for `PUT /course/{id}`. Every field is optional; `managers` is
/// appended to the existing list, never replacing it.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateCourseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "Array<string> | null")]
    #[schema(value_type = Option<Vec<String>>)]
    pub tags: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<CourseStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub managers: Option<Vec<ManagerInput>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateMaterialRequest {
    pub url: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateMaterialRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCommentRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct FeedbackRequest {
    pub score: i16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Administrative move of a registration to a later state.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdvanceRegistrationRequest {
    pub state: RegistrationState,
}

/// RegisterUserRequest
///
/// Input for the public registration endpoint. The password is only forwarded to
/// the identity provider and never persisted or logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterUserRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    pub surname: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub surname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

// --- Projections (Output) ---

/// RegistrationView
///
/// What a student sees of someone else's accepted registration.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct RegistrationView {
    pub user_id: Uuid,
    pub accepted_at: Option<DateTime<Utc>>,
    pub feedback: Vec<Feedback>,
}

/// StudentCourseView
///
/// Course as returned to a REGULAR principal: no status, tags, managers, material,
/// rating or creation date, and the creator reduced to their public profile.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct StudentCourseView {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub image_key: Option<String>,
    pub created_by: Option<PublicProfile>,
    pub registrations: Vec<RegistrationView>,
    pub comments: Vec<CourseComment>,
}

/// EnrolledCourseView
///
/// Entry of `GET /course/student/enrolled-courses`. Registrations are limited to the
/// caller's own.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct EnrolledCourseView {
    pub id: Uuid,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub rating: f64,
    pub registrations: Vec<Registration>,
}

/// CourseView
///
/// Role-dependent shape of a course. Serialized untagged: the caller receives either
/// the full document or the student view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(untagged)]
pub enum CourseView {
    Full(Course),
    Student(StudentCourseView),
}

/// AdminStats
///
/// Output schema for `GET /admin/stats`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct AdminStats {
    pub total_users: i64,
    pub total_courses: i64,
    pub draft_courses: i64,
    pub published_courses: i64,
    pub finished_courses: i64,
    pub archived_courses: i64,
    pub total_registrations: i64,
}

/// ImageUploadResponse
///
/// Returned by the upload endpoints: the object key now recorded on the entity.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImageUploadResponse {
    pub key: String,
}
