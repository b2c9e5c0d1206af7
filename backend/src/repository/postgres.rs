use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, types::Json};
use std::collections::HashMap;
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    AdminStats, Course, CourseComment, CourseStatus, Feedback, Manager, Material, ProfileEntry,
    ProfileEntryData, PublicProfile, Registration, UpdateProfileRequest, User,
};

const USER_COLUMNS: &str = "id, email, name, surname, role, bio, avatar_key, created_at";
const COURSE_COLUMNS: &str = "id, title, subtitle, description, tags, status, created_by, \
                              rating, image_key, created_at, updated_at";

// --- Row Mappings ---

#[derive(FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    surname: String,
    role: String,
    bio: Option<String>,
    avatar_key: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            name: row.name,
            surname: row.surname,
            role: parse(&row.role)?,
            bio: row.bio,
            avatar_key: row.avatar_key,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct PublicProfileRow {
    id: Uuid,
    name: String,
    surname: String,
    bio: Option<String>,
    avatar_key: Option<String>,
}

#[derive(FromRow)]
struct EntryRow {
    id: Uuid,
    payload: Json<ProfileEntryData>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CourseRow {
    id: Uuid,
    title: String,
    subtitle: String,
    description: String,
    tags: Vec<String>,
    status: String,
    created_by: Uuid,
    rating: f64,
    image_key: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct ManagerRow {
    id: Uuid,
    course_id: Uuid,
    manager_id: Uuid,
    role: String,
}

#[derive(FromRow)]
struct MaterialRow {
    id: Uuid,
    course_id: Uuid,
    url: String,
    description: String,
    added_by: Uuid,
    added_on: DateTime<Utc>,
}

#[derive(FromRow)]
struct RegistrationRow {
    id: Uuid,
    course_id: Uuid,
    user_id: Uuid,
    state: String,
    requested_at: DateTime<Utc>,
    accepted_at: Option<DateTime<Utc>>,
    rejected_at: Option<DateTime<Utc>>,
    discontinued_at: Option<DateTime<Utc>>,
}

#[derive(FromRow)]
struct FeedbackRow {
    id: Uuid,
    registration_id: Uuid,
    score: i16,
    comment: Option<String>,
    given_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    course_id: Uuid,
    author_id: Uuid,
    text: String,
    created_at: DateTime<Utc>,
}

fn parse<T>(value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| RepositoryError::Corrupt(e.to_string()))
}

/// PostgresRepository
///
/// `Repository` backed by Postgres. Courses live in `courses`; each sub-entity list
/// lives in its own child table keyed by the element id and ordered by `seq`.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// hydrate
    ///
    /// Loads every sub-entity list for `rows` with one query per child table and
    /// assembles full course documents, preserving the order of `rows`.
    async fn hydrate(&self, rows: Vec<CourseRow>) -> RepoResult<Vec<Course>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let managers = sqlx::query_as::<_, ManagerRow>(
            "SELECT id, course_id, manager_id, role FROM course_managers \
             WHERE course_id = ANY($1) ORDER BY seq",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let material = sqlx::query_as::<_, MaterialRow>(
            "SELECT id, course_id, url, description, added_by, added_on FROM course_material \
             WHERE course_id = ANY($1) ORDER BY seq",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let registrations = sqlx::query_as::<_, RegistrationRow>(
            "SELECT id, course_id, user_id, state, requested_at, accepted_at, rejected_at, \
             discontinued_at FROM course_registrations \
             WHERE course_id = ANY($1) ORDER BY requested_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let feedback = sqlx::query_as::<_, FeedbackRow>(
            "SELECT f.id, f.registration_id, f.score, f.comment, f.given_at \
             FROM registration_feedback f \
             JOIN course_registrations r ON r.id = f.registration_id \
             WHERE r.course_id = ANY($1) ORDER BY f.given_at",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let comments = sqlx::query_as::<_, CommentRow>(
            "SELECT id, course_id, author_id, text, created_at FROM course_comments \
             WHERE course_id = ANY($1) ORDER BY seq",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut managers_by_course: HashMap<Uuid, Vec<Manager>> = HashMap::new();
        for row in managers {
            managers_by_course
                .entry(row.course_id)
                .or_default()
                .push(Manager {
                    id: row.id,
                    manager_id: row.manager_id,
                    role: parse(&row.role)?,
                });
        }

        let mut material_by_course: HashMap<Uuid, Vec<Material>> = HashMap::new();
        for row in material {
            material_by_course
                .entry(row.course_id)
                .or_default()
                .push(Material {
                    id: row.id,
                    url: row.url,
                    added_by: row.added_by,
                    description: row.description,
                    added_on: row.added_on,
                });
        }

        let mut feedback_by_registration: HashMap<Uuid, Vec<Feedback>> = HashMap::new();
        for row in feedback {
            feedback_by_registration
                .entry(row.registration_id)
                .or_default()
                .push(Feedback {
                    id: row.id,
                    score: row.score,
                    comment: row.comment,
                    given_at: row.given_at,
                });
        }

        let mut registrations_by_course: HashMap<Uuid, Vec<Registration>> = HashMap::new();
        for row in registrations {
            registrations_by_course
                .entry(row.course_id)
                .or_default()
                .push(Registration {
                    id: row.id,
                    user_id: row.user_id,
                    state: parse(&row.state)?,
                    requested_at: row.requested_at,
                    accepted_at: row.accepted_at,
                    rejected_at: row.rejected_at,
                    discontinued_at: row.discontinued_at,
                    feedback: feedback_by_registration.remove(&row.id).unwrap_or_default(),
                });
        }

        let mut comments_by_course: HashMap<Uuid, Vec<CourseComment>> = HashMap::new();
        for row in comments {
            comments_by_course
                .entry(row.course_id)
                .or_default()
                .push(CourseComment {
                    id: row.id,
                    author_id: row.author_id,
                    text: row.text,
                    created_at: row.created_at,
                });
        }

        rows.into_iter()
            .map(|row| {
                Ok(Course {
                    id: row.id,
                    title: row.title,
                    subtitle: row.subtitle,
                    description: row.description,
                    tags: row.tags,
                    status: parse(&row.status)?,
                    created_by: row.created_by,
                    managers: managers_by_course.remove(&row.id).unwrap_or_default(),
                    material: material_by_course.remove(&row.id).unwrap_or_default(),
                    registrations: registrations_by_course.remove(&row.id).unwrap_or_default(),
                    rating: row.rating,
                    comments: comments_by_course.remove(&row.id).unwrap_or_default(),
                    image_key: row.image_key,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn create_user(&self, user: User) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO profiles (id, email, name, surname, role, bio, avatar_key, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(user.role.as_str())
        .bind(&user.bio)
        .bind(&user.avatar_key)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e.as_database_error() {
            Some(db) if db.is_unique_violation() => RepositoryError::Duplicate("email"),
            _ => RepositoryError::Database(e),
        })?;

        User::try_from(row)
    }

    /// Partial update: `COALESCE` keeps the stored value for every field left `None`.
    async fn update_user_profile(
        &self,
        id: Uuid,
        req: &UpdateProfileRequest,
    ) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE profiles \
             SET name = COALESCE($2, name), \
                 surname = COALESCE($3, surname), \
                 bio = COALESCE($4, bio) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&req.name)
        .bind(&req.surname)
        .bind(&req.bio)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn set_user_avatar(&self, id: Uuid, key: &str) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE profiles SET avatar_key = $2 WHERE id = $1")
            .bind(id)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_public_profiles(&self, ids: &[Uuid]) -> RepoResult<Vec<PublicProfile>> {
        let rows = sqlx::query_as::<_, PublicProfileRow>(
            "SELECT id, name, surname, bio, avatar_key FROM profiles WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| PublicProfile {
                id: row.id,
                name: row.name,
                surname: row.surname,
                bio: row.bio,
                avatar_key: row.avatar_key,
            })
            .collect())
    }

    async fn list_profile_entries(&self, user_id: Uuid) -> RepoResult<Vec<ProfileEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            "SELECT id, payload, updated_at FROM profile_entries \
             WHERE user_id = $1 ORDER BY seq",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ProfileEntry {
                id: row.id,
                entry: row.payload.0,
                updated_at: row.updated_at,
            })
            .collect())
    }

    async fn add_profile_entry(&self, user_id: Uuid, entry: &ProfileEntry) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO profile_entries (id, user_id, section, payload, updated_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(entry.id)
        .bind(user_id)
        .bind(entry.entry.section().as_str())
        .bind(Json(&entry.entry))
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_profile_entry(
        &self,
        user_id: Uuid,
        entry: &ProfileEntry,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE profile_entries SET section = $3, payload = $4, updated_at = $5 \
             WHERE id = $1 AND user_id = $2",
        )
        .bind(entry.id)
        .bind(user_id)
        .bind(entry.entry.section().as_str())
        .bind(Json(&entry.entry))
        .bind(entry.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_profile_entry(&self, user_id: Uuid, entry_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM profile_entries WHERE id = $1 AND user_id = $2")
            .bind(entry_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Inserts the course row and its initial managers in one transaction.
    async fn insert_course(&self, course: &Course) -> RepoResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO courses (id, title, subtitle, description, tags, status, created_by, \
             rating, image_key, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.subtitle)
        .bind(&course.description)
        .bind(&course.tags)
        .bind(course.status.as_str())
        .bind(course.created_by)
        .bind(course.rating)
        .bind(&course.image_key)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&mut *tx)
        .await?;

        for manager in &course.managers {
            sqlx::query(
                "INSERT INTO course_managers (id, course_id, manager_id, role) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(manager.id)
            .bind(course.id)
            .bind(manager.manager_id)
            .bind(manager.role.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        let row = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn list_courses(&self, status: Option<CourseStatus>) -> RepoResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses \
             WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY created_at DESC"
        ))
        .bind(status.map(CourseStatus::as_str))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn list_courses_with_registrant(&self, user_id: Uuid) -> RepoResult<Vec<Course>> {
        let rows = sqlx::query_as::<_, CourseRow>(&format!(
            "SELECT {COURSE_COLUMNS} FROM courses c \
             WHERE EXISTS (SELECT 1 FROM course_registrations r \
                           WHERE r.course_id = c.id AND r.user_id = $1) \
             ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows).await
    }

    async fn update_course(
        &self,
        course: &Course,
        expected_status: CourseStatus,
        new_managers: &[Manager],
    ) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE courses SET title = $2, subtitle = $3, description = $4, tags = $5, \
             status = $6, updated_at = $7 WHERE id = $1 AND status = $8",
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.subtitle)
        .bind(&course.description)
        .bind(&course.tags)
        .bind(course.status.as_str())
        .bind(course.updated_at)
        .bind(expected_status.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for manager in new_managers {
            sqlx::query(
                "INSERT INTO course_managers (id, course_id, manager_id, role) \
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(manager.id)
            .bind(course.id)
            .bind(manager.manager_id)
            .bind(manager.role.as_str())
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn set_course_image(&self, course_id: Uuid, key: &str) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE courses SET image_key = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(course_id)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_course_rating(&self, course_id: Uuid, rating: f64) -> RepoResult<bool> {
        let result = sqlx::query("UPDATE courses SET rating = $2 WHERE id = $1")
            .bind(course_id)
            .bind(rating)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// `ON CONFLICT DO NOTHING` on the (course_id, user_id) unique key makes this an
    /// atomic insert-if-absent, closing the race between two concurrent enrolls.
    async fn add_registration(
        &self,
        course_id: Uuid,
        registration: &Registration,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT INTO course_registrations (id, course_id, user_id, state, requested_at, \
             accepted_at, rejected_at, discontinued_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             ON CONFLICT (course_id, user_id) DO NOTHING",
        )
        .bind(registration.id)
        .bind(course_id)
        .bind(registration.user_id)
        .bind(registration.state.as_str())
        .bind(registration.requested_at)
        .bind(registration.accepted_at)
        .bind(registration.rejected_at)
        .bind(registration.discontinued_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_registration(
        &self,
        course_id: Uuid,
        registration: &Registration,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE course_registrations \
             SET state = $3, accepted_at = $4, rejected_at = $5, discontinued_at = $6 \
             WHERE id = $1 AND course_id = $2",
        )
        .bind(registration.id)
        .bind(course_id)
        .bind(registration.state.as_str())
        .bind(registration.accepted_at)
        .bind(registration.rejected_at)
        .bind(registration.discontinued_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_registration(
        &self,
        course_id: Uuid,
        registration_id: Uuid,
    ) -> RepoResult<bool> {
        let result =
            sqlx::query("DELETE FROM course_registrations WHERE id = $1 AND course_id = $2")
                .bind(registration_id)
                .bind(course_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_feedback(
        &self,
        course_id: Uuid,
        registration_id: Uuid,
        feedback: &Feedback,
    ) -> RepoResult<bool> {
        let result = sqlx::query(
            "INSERT INTO registration_feedback (id, registration_id, score, comment, given_at) \
             SELECT $1, r.id, $3, $4, $5 FROM course_registrations r \
             WHERE r.id = $2 AND r.course_id = $6",
        )
        .bind(feedback.id)
        .bind(registration_id)
        .bind(feedback.score)
        .bind(&feedback.comment)
        .bind(feedback.given_at)
        .bind(course_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_material(&self, course_id: Uuid, material: &Material) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO course_material (id, course_id, url, description, added_by, added_on) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(material.id)
        .bind(course_id)
        .bind(&material.url)
        .bind(&material.description)
        .bind(material.added_by)
        .bind(material.added_on)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_material(&self, course_id: Uuid, material: &Material) -> RepoResult<bool> {
        let result = sqlx::query(
            "UPDATE course_material SET url = $3, description = $4 \
             WHERE id = $1 AND course_id = $2",
        )
        .bind(material.id)
        .bind(course_id)
        .bind(&material.url)
        .bind(&material.description)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn remove_material(&self, course_id: Uuid, material_id: Uuid) -> RepoResult<bool> {
        let result = sqlx::query("DELETE FROM course_material WHERE id = $1 AND course_id = $2")
            .bind(material_id)
            .bind(course_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn add_comment(&self, course_id: Uuid, comment: &CourseComment) -> RepoResult<()> {
        sqlx::query(
            "INSERT INTO course_comments (id, course_id, author_id, text, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(comment.id)
        .bind(course_id)
        .bind(comment.author_id)
        .bind(&comment.text)
        .bind(comment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_stats(&self) -> RepoResult<AdminStats> {
        let (
            total_users,
            total_courses,
            draft_courses,
            published_courses,
            finished_courses,
            archived_courses,
            total_registrations,
        ) = sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64, i64)>(
            "SELECT \
                (SELECT COUNT(*) FROM profiles), \
                COUNT(*), \
                COUNT(*) FILTER (WHERE status = 'DRAFT'), \
                COUNT(*) FILTER (WHERE status = 'PUBLISHED'), \
                COUNT(*) FILTER (WHERE status = 'FINISHED'), \
                COUNT(*) FILTER (WHERE status = 'ARCHIVED'), \
                (SELECT COUNT(*) FROM course_registrations) \
             FROM courses",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(AdminStats {
            total_users,
            total_courses,
            draft_courses,
            published_courses,
            finished_courses,
            archived_courses,
            total_registrations,
        })
    }
}
