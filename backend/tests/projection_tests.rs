use chrono::Utc;
use edu_portal::{
    auth::Principal,
    enrollment,
    error::AppError,
    lifecycle,
    models::{Course, CourseStatus, CourseView, PublicProfile, RegistrationState, Role},
    projection,
    validation::NewCourse,
};
use std::collections::HashMap;
use uuid::Uuid;

fn as_role(role: Role) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        role,
    }
}

fn course(status: CourseStatus) -> Course {
    let fields = NewCourse {
        title: format!("{status} course"),
        subtitle: "sub".to_string(),
        description: "desc".to_string(),
        tags: vec!["tag".to_string()],
    };
    let mut course = lifecycle::new_course(Uuid::new_v4(), fields, Utc::now());
    course.status = status;
    course
}

/// Adds one registration per given state.
fn with_registrations(mut course: Course, states: &[RegistrationState]) -> Course {
    for state in states {
        let mut reg = enrollment::new_registration(&course, Uuid::new_v4(), Utc::now()).unwrap();
        if *state != RegistrationState::Requested {
            let first = match state {
                RegistrationState::Discontinued => RegistrationState::Accepted,
                other => *other,
            };
            enrollment::advance(&mut reg, first, Utc::now()).unwrap();
            if *state == RegistrationState::Discontinued {
                enrollment::advance(&mut reg, *state, Utc::now()).unwrap();
            }
        }
        course.registrations.push(reg);
    }
    course
}

#[test]
fn test_superadmin_sees_every_course_in_full() {
    let courses = vec![course(CourseStatus::Draft), course(CourseStatus::Published)];
    let views =
        projection::project_course_list(&as_role(Role::Superadmin), courses.clone(), &HashMap::new())
            .unwrap();

    assert_eq!(views.len(), 2);
    for (view, original) in views.into_iter().zip(courses) {
        assert_eq!(view, CourseView::Full(original));
    }
}

#[test]
fn test_regular_sees_only_published_student_views() {
    let published = with_registrations(
        course(CourseStatus::Published),
        &[
            RegistrationState::Requested,
            RegistrationState::Accepted,
            RegistrationState::Rejected,
            RegistrationState::Discontinued,
        ],
    );
    let creator = PublicProfile {
        id: published.created_by,
        name: "Ada".to_string(),
        surname: "Lovelace".to_string(),
        bio: None,
        avatar_key: None,
    };
    let creators = HashMap::from([(creator.id, creator.clone())]);
    let courses = vec![
        course(CourseStatus::Draft),
        published.clone(),
        course(CourseStatus::Archived),
    ];

    let views = projection::project_course_list(&as_role(Role::Regular), courses, &creators)
        .unwrap();

    assert_eq!(views.len(), 1);
    let CourseView::Student(view) = &views[0] else {
        panic!("expected a student view");
    };
    assert_eq!(view.id, published.id);
    assert_eq!(view.created_by, Some(creator));
    assert_eq!(view.registrations.len(), 1, "only ACCEPTED registrations");

    // Stripped fields never reach the wire.
    let json = serde_json::to_value(&views[0]).unwrap();
    for field in ["status", "tags", "managers", "material", "rating", "created_at"] {
        assert!(json.get(field).is_none(), "{field} leaked");
    }
    let reg = &json["registrations"][0];
    for field in ["id", "state", "requested_at"] {
        assert!(reg.get(field).is_none(), "registration {field} leaked");
    }
    assert!(json["created_by"].get("email").is_none());
}

#[test]
fn test_other_roles_are_forbidden_from_the_list() {
    let result = projection::project_course_list(
        &as_role(Role::Manager),
        vec![course(CourseStatus::Published)],
        &HashMap::new(),
    );
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[test]
fn test_detail_projection() {
    let draft = course(CourseStatus::Draft);
    let coordinator = Principal {
        id: draft.created_by,
        role: Role::Manager,
    };

    assert!(matches!(
        projection::project_course(&coordinator, draft.clone(), None),
        Ok(CourseView::Full(_))
    ));
    assert_eq!(
        projection::project_course(&as_role(Role::Regular), draft.clone(), None),
        Err(AppError::NotFound("course"))
    );
    assert!(matches!(
        projection::project_course(&as_role(Role::Manager), draft, None),
        Err(AppError::Forbidden(_))
    ));
    assert!(matches!(
        projection::project_course(&as_role(Role::Regular), course(CourseStatus::Published), None),
        Ok(CourseView::Student(_))
    ));
}

#[test]
fn test_enrolled_view_keeps_only_own_registrations() {
    let mut course = course(CourseStatus::Published);
    let me = Uuid::new_v4();
    let mine = enrollment::new_registration(&course, me, Utc::now()).unwrap();
    course.registrations.push(mine.clone());
    course = with_registrations(course, &[RegistrationState::Accepted]);

    let view = projection::enrolled_view(course, me);
    assert_eq!(view.registrations, vec![mine]);
}
