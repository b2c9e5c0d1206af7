//! Role-dependent projection of course documents.

use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    auth::Principal,
    error::AppError,
    models::{
        Course, CourseStatus, CourseView, EnrolledCourseView, PublicProfile, RegistrationState,
        RegistrationView, Role, StudentCourseView,
    },
};

/// Shapes the course list for `principal`.
///
/// SUPERADMIN gets every document in full; REGULAR gets only PUBLISHED courses in
/// their student form; every other role is refused.
pub fn project_course_list(
    principal: &Principal,
    courses: Vec<Course>,
    creators: &HashMap<Uuid, PublicProfile>,
) -> Result<Vec<CourseView>, AppError> {
    match principal.role {
        Role::Superadmin => Ok(courses.into_iter().map(CourseView::Full).collect()),
        Role::Regular => Ok(courses
            .into_iter()
            .filter(|c| c.status == CourseStatus::Published)
            .map(|c| {
                let creator = creators.get(&c.created_by).cloned();
                CourseView::Student(student_view(c, creator))
            })
            .collect()),
        Role::Manager => Err(AppError::forbidden(
            "course listing is not available for this role",
        )),
    }
}

/// Shapes a single course for `principal`.
///
/// Coordinators see their own course in full whatever their global role. A
/// REGULAR principal asking for an unpublished course gets NotFound, so drafts do
/// not leak their existence.
pub fn project_course(
    principal: &Principal,
    course: Course,
    creator: Option<PublicProfile>,
) -> Result<CourseView, AppError> {
    if principal.role == Role::Superadmin || course.is_coordinator(principal.id) {
        return Ok(CourseView::Full(course));
    }
    match principal.role {
        Role::Regular if course.status == CourseStatus::Published => {
            Ok(CourseView::Student(student_view(course, creator)))
        }
        Role::Regular => Err(AppError::NotFound("course")),
        _ => Err(AppError::forbidden("course is not visible to this role")),
    }
}

pub fn student_view(course: Course, creator: Option<PublicProfile>) -> StudentCourseView {
    let registrations = course
        .registrations
        .into_iter()
        .filter(|r| r.state == RegistrationState::Accepted)
        .map(|r| RegistrationView {
            user_id: r.user_id,
            accepted_at: r.accepted_at,
            feedback: r.feedback,
        })
        .collect();

    StudentCourseView {
        id: course.id,
        title: course.title,
        subtitle: course.subtitle,
        description: course.description,
        image_key: course.image_key,
        created_by: creator,
        registrations,
        comments: course.comments,
    }
}

/// Enrolled-course entry for `user_id`, keeping only their own registrations.
pub fn enrolled_view(course: Course, user_id: Uuid) -> EnrolledCourseView {
    EnrolledCourseView {
        id: course.id,
        title: course.title,
        subtitle: course.subtitle,
        description: course.description,
        rating: course.rating,
        registrations: course
            .registrations
            .into_iter()
            .filter(|r| r.user_id == user_id)
            .collect(),
    }
}
