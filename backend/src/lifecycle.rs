//! Course lifecycle engine.
//!
//! The status table below is the only place course transitions are decided.
//! It is exhaustive rather than hierarchical: DRAFT may jump straight to FINISHED
//! or ARCHIVED, and ARCHIVED may only be reopened as DRAFT.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{Course, CourseStatus, Manager, ManagerRole},
    validation::{CoursePatch, NewCourse},
};

/// Current status → statuses reachable from it.
pub const TRANSITIONS: &[(CourseStatus, &[CourseStatus])] = &[
    (
        CourseStatus::Draft,
        &[
            CourseStatus::Published,
            CourseStatus::Finished,
            CourseStatus::Archived,
        ],
    ),
    (
        CourseStatus::Published,
        &[CourseStatus::Finished, CourseStatus::Archived],
    ),
    (CourseStatus::Finished, &[CourseStatus::Archived]),
    (CourseStatus::Archived, &[CourseStatus::Draft]),
];

pub fn allowed_transitions(from: CourseStatus) -> &'static [CourseStatus] {
    TRANSITIONS
        .iter()
        .find(|(status, _)| *status == from)
        .map(|(_, next)| *next)
        .unwrap_or(&[])
}

pub fn can_transition(from: CourseStatus, to: CourseStatus) -> bool {
    allowed_transitions(from).contains(&to)
}

pub fn check_transition(from: CourseStatus, to: CourseStatus) -> Result<(), AppError> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            entity: "course",
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

/// new_course
///
/// Builds a course in DRAFT with its creator registered as COORDINATOR.
pub fn new_course(creator: Uuid, fields: NewCourse, now: DateTime<Utc>) -> Course {
    Course {
        id: Uuid::new_v4(),
        title: fields.title,
        subtitle: fields.subtitle,
        description: fields.description,
        tags: fields.tags,
        status: CourseStatus::Draft,
        created_by: creator,
        managers: vec![Manager {
            id: Uuid::new_v4(),
            manager_id: creator,
            role: ManagerRole::Coordinator,
        }],
        material: Vec::new(),
        registrations: Vec::new(),
        rating: 0.0,
        comments: Vec::new(),
        image_key: None,
        created_at: now,
        updated_at: now,
    }
}

/// apply_patch
///
/// Applies a validated update to `course` in memory. The status check happens before
/// any field is touched, so a rejected transition leaves the course unchanged.
///
/// Managers are appended as given; duplicates are kept. Returns the newly appended
/// managers so the caller can persist them.
pub fn apply_patch(
    course: &mut Course,
    patch: CoursePatch,
    now: DateTime<Utc>,
) -> Result<Vec<Manager>, AppError> {
    if let Some(next) = patch.status {
        check_transition(course.status, next)?;
    }

    if let Some(title) = patch.title {
        course.title = title;
    }
    if let Some(subtitle) = patch.subtitle {
        course.subtitle = subtitle;
    }
    if let Some(description) = patch.description {
        course.description = description;
    }
    if let Some(tags) = patch.tags {
        course.tags = tags;
    }
    if let Some(next) = patch.status {
        course.status = next;
    }

    let appended: Vec<Manager> = patch
        .managers
        .into_iter()
        .map(|input| Manager {
            id: Uuid::new_v4(),
            manager_id: input.manager_id,
            role: input.role,
        })
        .collect();
    course.managers.extend(appended.iter().cloned());
    course.updated_at = now;

    Ok(appended)
}

/// Image uploads are refused once a course is archived.
pub fn ensure_not_archived(course: &Course) -> Result<(), AppError> {
    if course.status == CourseStatus::Archived {
        return Err(AppError::conflict("course is archived"));
    }
    Ok(())
}
