use chrono::Utc;
use edu_portal::{
    auth::Principal,
    lifecycle,
    models::{Course, ManagerInput, ManagerRole, Role},
    policy::{self, Action, Policy, Resource, RoleMatrixPolicy},
    validation::{CoursePatch, NewCourse},
};
use uuid::Uuid;

fn as_role(role: Role) -> Principal {
    Principal {
        id: Uuid::new_v4(),
        role,
    }
}

fn course_with(managers: Vec<ManagerInput>) -> Course {
    let fields = NewCourse {
        title: "Databases".to_string(),
        subtitle: String::new(),
        description: String::new(),
        tags: Vec::new(),
    };
    let mut course = lifecycle::new_course(Uuid::new_v4(), fields, Utc::now());
    let patch = CoursePatch {
        managers,
        ..Default::default()
    };
    lifecycle::apply_patch(&mut course, patch, Utc::now()).unwrap();
    course
}

#[test]
fn test_only_superadmin_creates_courses() {
    assert!(policy::can_create_course(&as_role(Role::Superadmin)));
    assert!(!policy::can_create_course(&as_role(Role::Regular)));
    assert!(!policy::can_create_course(&as_role(Role::Manager)));
}

#[test]
fn test_only_regular_enrolls() {
    assert!(policy::can_enroll(&as_role(Role::Regular)));
    assert!(!policy::can_enroll(&as_role(Role::Superadmin)));
    assert!(!policy::can_enroll(&as_role(Role::Manager)));
}

#[test]
fn test_can_mutate_course_grants_superadmin_and_coordinators() {
    let coordinator = as_role(Role::Manager);
    let lecturer = as_role(Role::Manager);
    let course = course_with(vec![
        ManagerInput {
            manager_id: coordinator.id,
            role: ManagerRole::Coordinator,
        },
        ManagerInput {
            manager_id: lecturer.id,
            role: ManagerRole::Lecturer,
        },
    ]);

    assert!(policy::can_mutate_course(&as_role(Role::Superadmin), &course));
    assert!(policy::can_mutate_course(&coordinator, &course));
    assert!(!policy::can_mutate_course(&lecturer, &course));
    assert!(!policy::can_mutate_course(&as_role(Role::Regular), &course));
}

#[test]
fn test_coordinator_grant_is_course_scoped() {
    let coordinator = as_role(Role::Regular);
    let theirs = course_with(vec![ManagerInput {
        manager_id: coordinator.id,
        role: ManagerRole::Coordinator,
    }]);
    let other = course_with(Vec::new());

    assert!(policy::can_mutate_course(&coordinator, &theirs));
    assert!(!policy::can_mutate_course(&coordinator, &other));
}

#[test]
fn test_coordinator_grant_does_not_apply_to_global_actions() {
    let coordinator = as_role(Role::Manager);
    let course = course_with(vec![ManagerInput {
        manager_id: coordinator.id,
        role: ManagerRole::Coordinator,
    }]);
    let policy = RoleMatrixPolicy;

    // Status transitions stay SUPERADMIN-only even for the course's own coordinator.
    assert!(!policy.allows(&coordinator, Action::UpdateCourse, Resource::Course(&course)));
    assert!(!policy.allows(&coordinator, Action::ViewStats, Resource::Global));
    assert!(policy.allows(&coordinator, Action::ViewCourse, Resource::Course(&course)));
}

#[test]
fn test_role_matrix() {
    let policy = RoleMatrixPolicy;
    let admin = as_role(Role::Superadmin);
    let student = as_role(Role::Regular);
    let manager = as_role(Role::Manager);

    let cases = [
        (Action::ListCourses, [true, true, false]),
        (Action::ManageRegistrations, [true, false, false]),
        (Action::LeaveFeedback, [false, true, false]),
        (Action::Unenroll, [true, true, true]),
        (Action::ListEnrolled, [true, true, true]),
    ];
    for (action, [a, s, m]) in cases {
        assert_eq!(policy.allows(&admin, action, Resource::Global), a, "{action:?}");
        assert_eq!(policy.allows(&student, action, Resource::Global), s, "{action:?}");
        assert_eq!(policy.allows(&manager, action, Resource::Global), m, "{action:?}");
    }
}
