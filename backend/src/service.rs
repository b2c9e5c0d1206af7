//! Course service.
//!
//! Orchestrates one request against one course: authorize, load, validate, apply the
//! lifecycle or ledger rule, persist, and return the role-appropriate shape.
//! Preconditions are checked in a fixed order (role, existence, validation,
//! business rule) and the first failure is returned.

use chrono::Utc;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    auth::Principal,
    enrollment, lifecycle,
    error::AppError,
    models::{
        AdminStats, AdvanceRegistrationRequest, Course, CourseComment, CourseStatus, CourseView,
        CreateCommentRequest, CreateCourseRequest, CreateMaterialRequest, EnrolledCourseView,
        FeedbackRequest, ImageUploadResponse, Material, Registration, Role, UpdateCourseRequest,
        UpdateMaterialRequest,
    },
    policy::{Action, PolicyState, Resource},
    projection,
    repository::RepositoryState,
    storage::StorageState,
    validation::{self, validate},
};

/// CourseService
///
/// Cheap to clone: every field is an `Arc`. Handlers receive it through `FromRef`.
#[derive(Clone)]
pub struct CourseService {
    repo: RepositoryState,
    storage: StorageState,
    policy: PolicyState,
}

impl CourseService {
    pub fn new(repo: RepositoryState, storage: StorageState, policy: PolicyState) -> Self {
        Self {
            repo,
            storage,
            policy,
        }
    }

    fn authorize(
        &self,
        principal: &Principal,
        action: Action,
        resource: Resource<'_>,
    ) -> Result<(), AppError> {
        if self.policy.allows(principal, action, resource) {
            Ok(())
        } else {
            tracing::debug!(principal = %principal.id, role = %principal.role, ?action, "denied");
            Err(AppError::forbidden(format!(
                "role {} may not perform this action",
                principal.role
            )))
        }
    }

    async fn load(&self, course_id: Uuid) -> Result<Course, AppError> {
        self.repo
            .get_course(course_id)
            .await?
            .ok_or(AppError::NotFound("course"))
    }

    /// A REGULAR principal only sees published courses; anything else is reported as
    /// missing rather than forbidden.
    fn ensure_visible(&self, principal: &Principal, course: &Course) -> Result<(), AppError> {
        self.authorize(principal, Action::ViewCourse, Resource::Course(course))?;
        let privileged =
            principal.role == Role::Superadmin || course.is_coordinator(principal.id);
        if !privileged && course.status != CourseStatus::Published {
            return Err(AppError::NotFound("course"));
        }
        Ok(())
    }

    // --- Lifecycle ---

    /// createCourse
    pub async fn create_course(
        &self,
        principal: &Principal,
        req: CreateCourseRequest,
    ) -> Result<Course, AppError> {
        self.authorize(principal, Action::CreateCourse, Resource::Global)?;
        let fields = validation::validate_new_course(&req)?;

        let course = lifecycle::new_course(principal.id, fields, Utc::now());
        self.repo.insert_course(&course).await?;

        tracing::info!(course = %course.id, creator = %principal.id, "course created");
        Ok(course)
    }

    /// updateCourse
    ///
    /// The patch is applied to an in-memory copy first; nothing is written if the
    /// status transition is illegal.
    pub async fn update_course(
        &self,
        course_id: Uuid,
        principal: &Principal,
        req: UpdateCourseRequest,
    ) -> Result<Course, AppError> {
        self.authorize(principal, Action::UpdateCourse, Resource::Global)?;
        let mut course = self.load(course_id).await?;
        let patch = validation::validate_course_update(&req)?;

        let previous = course.status;
        let new_managers = lifecycle::apply_patch(&mut course, patch, Utc::now())?;

        if !self
            .repo
            .update_course(&course, previous, &new_managers)
            .await?
        {
            // Another update moved the status after our read.
            let current = self.load(course_id).await?;
            return Err(AppError::InvalidTransition {
                entity: "course",
                from: current.status.to_string(),
                to: course.status.to_string(),
            });
        }

        if previous != course.status {
            tracing::info!(
                course = %course.id,
                from = %previous,
                to = %course.status,
                "course status changed"
            );
        }
        Ok(course)
    }

    pub async fn list_courses(&self, principal: &Principal) -> Result<Vec<CourseView>, AppError> {
        self.authorize(principal, Action::ListCourses, Resource::Global)?;

        let filter = match principal.role {
            Role::Superadmin => None,
            _ => Some(CourseStatus::Published),
        };
        let courses = self.repo.list_courses(filter).await?;

        let mut creator_ids: Vec<Uuid> = courses.iter().map(|c| c.created_by).collect();
        creator_ids.sort_unstable();
        creator_ids.dedup();
        let creators: HashMap<_, _> = self
            .repo
            .get_public_profiles(&creator_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        projection::project_course_list(principal, courses, &creators)
    }

    pub async fn get_course(
        &self,
        course_id: Uuid,
        principal: &Principal,
    ) -> Result<CourseView, AppError> {
        let course = self.load(course_id).await?;
        self.ensure_visible(principal, &course)?;

        let creator = self
            .repo
            .get_public_profiles(&[course.created_by])
            .await?
            .into_iter()
            .next();
        projection::project_course(principal, course, creator)
    }

    // --- Enrollment ---

    /// enroll
    pub async fn enroll(
        &self,
        course_id: Uuid,
        principal: &Principal,
    ) -> Result<EnrolledCourseView, AppError> {
        self.authorize(principal, Action::Enroll, Resource::Global)?;
        let mut course = self.load(course_id).await?;

        let registration = enrollment::new_registration(&course, principal.id, Utc::now())?;
        // Lost a race with a concurrent enroll for the same user.
        if !self.repo.add_registration(course_id, &registration).await? {
            return Err(AppError::AlreadyEnrolled);
        }

        tracing::info!(course = %course_id, user = %principal.id, "enrollment requested");
        course.registrations.push(registration);
        Ok(projection::enrolled_view(course, principal.id))
    }

    /// unenroll
    ///
    /// Hard-deletes the caller's registration. Retrying yields NotEnrolled.
    pub async fn unenroll(
        &self,
        course_id: Uuid,
        principal: &Principal,
    ) -> Result<EnrolledCourseView, AppError> {
        self.authorize(principal, Action::Unenroll, Resource::Global)?;
        let mut course = self.load(course_id).await?;

        let registration_id = enrollment::registration_to_remove(&course, principal.id)?;
        if !self
            .repo
            .remove_registration(course_id, registration_id)
            .await?
        {
            return Err(AppError::NotEnrolled);
        }

        tracing::info!(course = %course_id, user = %principal.id, "unenrolled");
        course.registrations.retain(|r| r.id != registration_id);
        Ok(projection::enrolled_view(course, principal.id))
    }

    /// listEnrolledCourses
    pub async fn list_enrolled_courses(
        &self,
        principal: &Principal,
    ) -> Result<Vec<EnrolledCourseView>, AppError> {
        self.authorize(principal, Action::ListEnrolled, Resource::Global)?;
        let courses = self.repo.list_courses_with_registrant(principal.id).await?;
        Ok(courses
            .into_iter()
            .map(|c| projection::enrolled_view(c, principal.id))
            .collect())
    }

    /// Feedback on the caller's own, accepted registration. Recomputes the course
    /// rating from every feedback entry afterwards.
    pub async fn leave_feedback(
        &self,
        course_id: Uuid,
        principal: &Principal,
        req: FeedbackRequest,
    ) -> Result<EnrolledCourseView, AppError> {
        self.authorize(principal, Action::LeaveFeedback, Resource::Global)?;
        let mut course = self.load(course_id).await?;
        validate(&req)?;

        let registration = enrollment::find_registration(&course, principal.id)
            .ok_or(AppError::NotEnrolled)?;
        let registration_id = registration.id;
        let feedback =
            enrollment::new_feedback(registration, req.score, req.comment, Utc::now())?;

        if !self
            .repo
            .add_feedback(course_id, registration_id, &feedback)
            .await?
        {
            return Err(AppError::NotEnrolled);
        }

        if let Some(r) = course
            .registrations
            .iter_mut()
            .find(|r| r.id == registration_id)
        {
            r.feedback.push(feedback);
        }
        course.rating = enrollment::average_rating(&course);
        self.repo.set_course_rating(course_id, course.rating).await?;

        Ok(projection::enrolled_view(course, principal.id))
    }

    /// Administrative state change of one registration, located by its own id.
    pub async fn advance_registration(
        &self,
        course_id: Uuid,
        registration_id: Uuid,
        principal: &Principal,
        req: AdvanceRegistrationRequest,
    ) -> Result<Registration, AppError> {
        self.authorize(principal, Action::ManageRegistrations, Resource::Global)?;
        let course = self.load(course_id).await?;

        let mut registration = course
            .registrations
            .into_iter()
            .find(|r| r.id == registration_id)
            .ok_or(AppError::NotFound("registration"))?;
        let from = registration.state;
        enrollment::advance(&mut registration, req.state, Utc::now())?;

        if !self
            .repo
            .update_registration(course_id, &registration)
            .await?
        {
            return Err(AppError::NotFound("registration"));
        }

        tracing::info!(
            course = %course_id,
            registration = %registration_id,
            %from,
            to = %registration.state,
            "registration advanced"
        );
        Ok(registration)
    }

    // --- Material ---

    pub async fn list_material(
        &self,
        course_id: Uuid,
        principal: &Principal,
    ) -> Result<Vec<Material>, AppError> {
        let course = self.load(course_id).await?;
        self.ensure_visible(principal, &course)?;
        Ok(course.material)
    }

    pub async fn add_material(
        &self,
        course_id: Uuid,
        principal: &Principal,
        req: CreateMaterialRequest,
    ) -> Result<Material, AppError> {
        let course = self.load(course_id).await?;
        self.authorize(principal, Action::MutateCourse, Resource::Course(&course))?;
        validate(&req)?;

        let material = Material {
            id: Uuid::new_v4(),
            url: req.url.trim().to_string(),
            added_by: principal.id,
            description: req.description.trim().to_string(),
            added_on: Utc::now(),
        };
        self.repo.add_material(course_id, &material).await?;
        Ok(material)
    }

    pub async fn update_material(
        &self,
        course_id: Uuid,
        material_id: Uuid,
        principal: &Principal,
        req: UpdateMaterialRequest,
    ) -> Result<Material, AppError> {
        let course = self.load(course_id).await?;
        self.authorize(principal, Action::MutateCourse, Resource::Course(&course))?;

        let mut material = course
            .material
            .into_iter()
            .find(|m| m.id == material_id)
            .ok_or(AppError::NotFound("material"))?;
        validate(&req)?;

        if let Some(url) = req.url {
            material.url = url.trim().to_string();
        }
        if let Some(description) = req.description {
            material.description = description.trim().to_string();
        }

        if !self.repo.update_material(course_id, &material).await? {
            return Err(AppError::NotFound("material"));
        }
        Ok(material)
    }

    pub async fn delete_material(
        &self,
        course_id: Uuid,
        material_id: Uuid,
        principal: &Principal,
    ) -> Result<(), AppError> {
        let course = self.load(course_id).await?;
        self.authorize(principal, Action::MutateCourse, Resource::Course(&course))?;

        if !self.repo.remove_material(course_id, material_id).await? {
            return Err(AppError::NotFound("material"));
        }
        Ok(())
    }

    // --- Image ---

    /// Writes the image to object storage, then records its key on the course.
    /// There is no rollback: a failed database write leaves the stored object behind.
    pub async fn upload_image(
        &self,
        course_id: Uuid,
        principal: &Principal,
        content_type: Option<&str>,
        body: Vec<u8>,
    ) -> Result<ImageUploadResponse, AppError> {
        let course = self.load(course_id).await?;
        self.authorize(principal, Action::MutateCourse, Resource::Course(&course))?;
        let extension = validation::validate_image(content_type, body.len())?;
        lifecycle::ensure_not_archived(&course)?;

        let key = format!("courses/{course_id}/{}.{extension}", Uuid::new_v4());
        let content_type = content_type.unwrap_or("application/octet-stream");
        let key = self
            .storage
            .put_object(&key, body, content_type)
            .await
            .map_err(|e| AppError::internal(e.to_string()))?;

        if !self.repo.set_course_image(course_id, &key).await? {
            return Err(AppError::NotFound("course"));
        }
        Ok(ImageUploadResponse { key })
    }

    // --- Comments ---

    pub async fn list_comments(
        &self,
        course_id: Uuid,
        principal: &Principal,
    ) -> Result<Vec<CourseComment>, AppError> {
        let course = self.load(course_id).await?;
        self.ensure_visible(principal, &course)?;
        Ok(course.comments)
    }

    pub async fn add_comment(
        &self,
        course_id: Uuid,
        principal: &Principal,
        req: CreateCommentRequest,
    ) -> Result<CourseComment, AppError> {
        let course = self.load(course_id).await?;
        self.ensure_visible(principal, &course)?;
        self.authorize(principal, Action::Comment, Resource::Course(&course))?;
        validate(&req)?;

        let comment = CourseComment {
            id: Uuid::new_v4(),
            author_id: principal.id,
            text: req.text.trim().to_string(),
            created_at: Utc::now(),
        };
        self.repo.add_comment(course_id, &comment).await?;
        Ok(comment)
    }

    // --- Admin ---

    pub async fn stats(&self, principal: &Principal) -> Result<AdminStats, AppError> {
        self.authorize(principal, Action::ViewStats, Resource::Global)?;
        Ok(self.repo.get_stats().await?)
    }
}
