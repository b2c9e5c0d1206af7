use chrono::Utc;
use edu_portal::{
    error::AppError,
    lifecycle::{self, TRANSITIONS},
    models::{CourseStatus, ManagerInput, ManagerRole},
    validation::{CoursePatch, NewCourse},
};
use uuid::Uuid;

const ALL: [CourseStatus; 4] = [
    CourseStatus::Draft,
    CourseStatus::Published,
    CourseStatus::Finished,
    CourseStatus::Archived,
];

fn fields() -> NewCourse {
    NewCourse {
        title: "Compilers".to_string(),
        subtitle: String::new(),
        description: String::new(),
        tags: vec!["rust".to_string()],
    }
}

#[test]
fn test_transition_table_is_exhaustive() {
    let expected = [
        (CourseStatus::Draft, CourseStatus::Published, true),
        (CourseStatus::Draft, CourseStatus::Finished, true),
        (CourseStatus::Draft, CourseStatus::Archived, true),
        (CourseStatus::Published, CourseStatus::Finished, true),
        (CourseStatus::Published, CourseStatus::Archived, true),
        (CourseStatus::Published, CourseStatus::Draft, false),
        (CourseStatus::Finished, CourseStatus::Archived, true),
        (CourseStatus::Finished, CourseStatus::Published, false),
        (CourseStatus::Finished, CourseStatus::Draft, false),
        (CourseStatus::Archived, CourseStatus::Draft, true),
        (CourseStatus::Archived, CourseStatus::Published, false),
        (CourseStatus::Archived, CourseStatus::Finished, false),
    ];
    for (from, to, allowed) in expected {
        assert_eq!(
            lifecycle::can_transition(from, to),
            allowed,
            "{from} -> {to}"
        );
    }

    // Every status appears once as a source.
    assert_eq!(TRANSITIONS.len(), ALL.len());
}

#[test]
fn test_no_self_transitions() {
    for status in ALL {
        assert!(!lifecycle::can_transition(status, status), "{status}");
    }
}

#[test]
fn test_check_transition_reports_both_ends() {
    let err = lifecycle::check_transition(CourseStatus::Published, CourseStatus::Draft)
        .unwrap_err();
    assert_eq!(
        err,
        AppError::InvalidTransition {
            entity: "course",
            from: "PUBLISHED".to_string(),
            to: "DRAFT".to_string(),
        }
    );
}

#[test]
fn test_new_course_starts_as_draft_with_creator_as_coordinator() {
    let creator = Uuid::new_v4();
    let course = lifecycle::new_course(creator, fields(), Utc::now());

    assert_eq!(course.status, CourseStatus::Draft);
    assert_eq!(course.created_by, creator);
    assert_eq!(course.managers.len(), 1);
    assert_eq!(course.managers[0].role, ManagerRole::Coordinator);
    assert!(course.is_coordinator(creator));
    assert!(course.registrations.is_empty());
    assert_eq!(course.rating, 0.0);
}

#[test]
fn test_apply_patch_rejects_illegal_transition_without_touching_fields() {
    let mut course = lifecycle::new_course(Uuid::new_v4(), fields(), Utc::now());
    course.status = CourseStatus::Finished;
    let before = course.clone();

    let patch = CoursePatch {
        title: Some("Renamed".to_string()),
        status: Some(CourseStatus::Published),
        managers: vec![ManagerInput {
            manager_id: Uuid::new_v4(),
            role: ManagerRole::Lecturer,
        }],
        ..Default::default()
    };

    let result = lifecycle::apply_patch(&mut course, patch, Utc::now());
    assert!(matches!(result, Err(AppError::InvalidTransition { .. })));
    assert_eq!(course, before);
}

#[test]
fn test_apply_patch_appends_managers_without_dedup() {
    let mut course = lifecycle::new_course(Uuid::new_v4(), fields(), Utc::now());
    let lecturer = Uuid::new_v4();
    let input = ManagerInput {
        manager_id: lecturer,
        role: ManagerRole::Lecturer,
    };
    let patch = CoursePatch {
        managers: vec![input.clone(), input],
        ..Default::default()
    };

    let appended = lifecycle::apply_patch(&mut course, patch, Utc::now()).unwrap();

    assert_eq!(appended.len(), 2);
    assert_ne!(appended[0].id, appended[1].id);
    assert_eq!(course.managers.len(), 3);
    assert_eq!(
        course
            .managers
            .iter()
            .filter(|m| m.manager_id == lecturer)
            .count(),
        2
    );
}

#[test]
fn test_apply_patch_updates_fields_and_status() {
    let mut course = lifecycle::new_course(Uuid::new_v4(), fields(), Utc::now());
    let patch = CoursePatch {
        title: Some("Advanced Compilers".to_string()),
        tags: Some(vec!["llvm".to_string()]),
        status: Some(CourseStatus::Published),
        ..Default::default()
    };

    lifecycle::apply_patch(&mut course, patch, Utc::now()).unwrap();

    assert_eq!(course.title, "Advanced Compilers");
    assert_eq!(course.tags, vec!["llvm".to_string()]);
    assert_eq!(course.status, CourseStatus::Published);
    // Untouched fields survive.
    assert_eq!(course.subtitle, "");
}

#[test]
fn test_archived_course_is_a_conflict() {
    let mut course = lifecycle::new_course(Uuid::new_v4(), fields(), Utc::now());
    assert!(lifecycle::ensure_not_archived(&course).is_ok());

    course.status = CourseStatus::Archived;
    let err = lifecycle::ensure_not_archived(&course).unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
}
