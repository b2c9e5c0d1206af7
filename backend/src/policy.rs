//! Authorization policy.
//!
//! Role checks are data, not inline comparisons: [`RULES`] lists which global roles
//! may perform each [`Action`], and whether a course coordinator is granted the
//! action on their own course regardless of global role.

use std::sync::Arc;

use crate::{
    auth::Principal,
    models::{Course, Role},
};

/// Action
///
/// Every operation the core authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    CreateCourse,
    UpdateCourse,
    ListCourses,
    ViewCourse,
    MutateCourse,
    Enroll,
    Unenroll,
    ListEnrolled,
    Comment,
    LeaveFeedback,
    ManageRegistrations,
    ViewStats,
}

/// Resource
///
/// What the action is performed on. Course-scoped grants only apply to `Course`.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Global,
    Course(&'a Course),
}

/// One row of the role matrix.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub action: Action,
    pub roles: &'static [Role],
    pub coordinator: bool,
}

const ALL_ROLES: &[Role] = &[Role::Regular, Role::Superadmin, Role::Manager];

pub const RULES: &[Rule] = &[
    Rule { action: Action::CreateCourse, roles: &[Role::Superadmin], coordinator: false },
    Rule { action: Action::UpdateCourse, roles: &[Role::Superadmin], coordinator: false },
    Rule { action: Action::ListCourses, roles: &[Role::Superadmin, Role::Regular], coordinator: false },
    Rule { action: Action::ViewCourse, roles: &[Role::Superadmin, Role::Regular], coordinator: true },
    Rule { action: Action::MutateCourse, roles: &[Role::Superadmin], coordinator: true },
    Rule { action: Action::Enroll, roles: &[Role::Regular], coordinator: false },
    Rule { action: Action::Unenroll, roles: ALL_ROLES, coordinator: false },
    Rule { action: Action::ListEnrolled, roles: ALL_ROLES, coordinator: false },
    Rule { action: Action::Comment, roles: &[Role::Superadmin, Role::Regular], coordinator: true },
    Rule { action: Action::LeaveFeedback, roles: &[Role::Regular], coordinator: false },
    Rule { action: Action::ManageRegistrations, roles: &[Role::Superadmin], coordinator: false },
    Rule { action: Action::ViewStats, roles: &[Role::Superadmin], coordinator: false },
];

/// Policy
///
/// The single authorization predicate consulted by the core service.
pub trait Policy: Send + Sync {
    fn allows(&self, principal: &Principal, action: Action, resource: Resource<'_>) -> bool;
}

/// Shared handle stored in the application state.
pub type PolicyState = Arc<dyn Policy>;

/// RoleMatrixPolicy
///
/// Default policy backed by [`RULES`]. Actions missing from the table are denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleMatrixPolicy;

impl Policy for RoleMatrixPolicy {
    fn allows(&self, principal: &Principal, action: Action, resource: Resource<'_>) -> bool {
        let Some(rule) = RULES.iter().find(|rule| rule.action == action) else {
            return false;
        };

        if rule.roles.contains(&principal.role) {
            return true;
        }

        match resource {
            Resource::Course(course) if rule.coordinator => course.is_coordinator(principal.id),
            _ => false,
        }
    }
}

/// SUPERADMIN, or COORDINATOR of this course.
pub fn can_mutate_course(principal: &Principal, course: &Course) -> bool {
    RoleMatrixPolicy.allows(principal, Action::MutateCourse, Resource::Course(course))
}

pub fn can_create_course(principal: &Principal) -> bool {
    RoleMatrixPolicy.allows(principal, Action::CreateCourse, Resource::Global)
}

pub fn can_enroll(principal: &Principal) -> bool {
    RoleMatrixPolicy.allows(principal, Action::Enroll, Resource::Global)
}
