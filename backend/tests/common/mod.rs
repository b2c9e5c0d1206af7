//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use chrono::Utc;
use edu_portal::{
    AppConfig, AppState, CourseService, InMemoryRepository, MockStorageService,
    auth::Principal,
    models::{CourseStatus, CreateCourseRequest, Role, UpdateCourseRequest, User},
    repository::RepositoryState,
    storage::StorageState,
};
use std::sync::Arc;
use uuid::Uuid;

pub fn user(role: Role, name: &str) -> User {
    User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", name.to_lowercase()),
        name: name.to_string(),
        surname: "Tester".to_string(),
        role,
        bio: None,
        avatar_key: None,
        created_at: Utc::now(),
    }
}

pub fn principal(user: &User) -> Principal {
    Principal {
        id: user.id,
        role: user.role,
    }
}

/// One superadmin, two regular users and a global manager, all persisted.
pub struct Fixture {
    pub admin: User,
    pub student: User,
    pub other_student: User,
    pub manager: User,
    pub repo: Arc<InMemoryRepository>,
    pub storage: MockStorageService,
    pub state: AppState,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_storage(MockStorageService::new())
    }

    pub fn with_storage(storage: MockStorageService) -> Self {
        let admin = user(Role::Superadmin, "Ada");
        let student = user(Role::Regular, "Sam");
        let other_student = user(Role::Regular, "Rin");
        let manager = user(Role::Manager, "Max");

        let repo = Arc::new(InMemoryRepository::with_users([
            admin.clone(),
            student.clone(),
            other_student.clone(),
            manager.clone(),
        ]));
        let state = AppState::new(
            repo.clone() as RepositoryState,
            Arc::new(storage.clone()) as StorageState,
            AppConfig::default(),
        );

        Self {
            admin,
            student,
            other_student,
            manager,
            repo,
            storage,
            state,
        }
    }

    pub fn service(&self) -> CourseService {
        axum::extract::FromRef::from_ref(&self.state)
    }

    pub fn admin(&self) -> Principal {
        principal(&self.admin)
    }

    pub fn student(&self) -> Principal {
        principal(&self.student)
    }

    pub fn other_student(&self) -> Principal {
        principal(&self.other_student)
    }

    pub fn manager(&self) -> Principal {
        principal(&self.manager)
    }

    /// Creates a course as the superadmin and moves it to `status` (DRAFT if none).
    pub async fn course(&self, title: &str, status: Option<CourseStatus>) -> Uuid {
        let service = self.service();
        let course = service
            .create_course(&self.admin(), course_request(title))
            .await
            .expect("create course");
        if let Some(status) = status {
            service
                .update_course(
                    course.id,
                    &self.admin(),
                    UpdateCourseRequest {
                        status: Some(status),
                        ..Default::default()
                    },
                )
                .await
                .expect("transition course");
        }
        course.id
    }
}

pub fn course_request(title: &str) -> CreateCourseRequest {
    CreateCourseRequest {
        title: title.to_string(),
        subtitle: "An introduction".to_string(),
        description: "Everything you need to know.".to_string(),
        tags: Some(serde_json::json!(["rust", "systems"])),
    }
}
