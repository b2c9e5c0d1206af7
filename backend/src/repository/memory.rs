use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{RepoResult, Repository, RepositoryError};
use crate::models::{
    AdminStats, Course, CourseComment, CourseStatus, Feedback, Manager, Material, ProfileEntry,
    PublicProfile, Registration, UpdateProfileRequest, User,
};

#[derive(Default)]
struct Store {
    users: HashMap<Uuid, User>,
    entries: Vec<(Uuid, ProfileEntry)>,
    // Insertion order doubles as creation order.
    courses: Vec<Course>,
}

impl Store {
    fn course_mut(&mut self, id: Uuid) -> Option<&mut Course> {
        self.courses.iter_mut().find(|c| c.id == id)
    }
}

/// InMemoryRepository
///
/// `Repository` over a single lock-protected store. Each call takes the lock once,
/// so every method is atomic with respect to the others. Used by the test suite and
/// for database-free local runs.
#[derive(Default)]
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a repository pre-populated with `users`.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        let store = Store {
            users: users.into_iter().map(|u| (u.id, u)).collect(),
            ..Store::default()
        };
        Self {
            store: RwLock::new(store),
        }
    }

    pub async fn course_count(&self) -> usize {
        self.store.read().await.courses.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
        Ok(self.store.read().await.users.get(&id).cloned())
    }

    async fn create_user(&self, user: User) -> RepoResult<User> {
        let mut store = self.store.write().await;
        if store.users.values().any(|u| u.email == user.email) {
            return Err(RepositoryError::Duplicate("email"));
        }
        store.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        req: &UpdateProfileRequest,
    ) -> RepoResult<Option<User>> {
        let mut store = self.store.write().await;
        let Some(user) = store.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &req.name {
            user.name = name.clone();
        }
        if let Some(surname) = &req.surname {
            user.surname = surname.clone();
        }
        if let Some(bio) = &req.bio {
            user.bio = Some(bio.clone());
        }
        Ok(Some(user.clone()))
    }

    async fn set_user_avatar(&self, id: Uuid, key: &str) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        Ok(store
            .users
            .get_mut(&id)
            .map(|user| user.avatar_key = Some(key.to_string()))
            .is_some())
    }

    async fn get_public_profiles(&self, ids: &[Uuid]) -> RepoResult<Vec<PublicProfile>> {
        let store = self.store.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| store.users.get(id))
            .map(PublicProfile::from)
            .collect())
    }

    async fn list_profile_entries(&self, user_id: Uuid) -> RepoResult<Vec<ProfileEntry>> {
        let store = self.store.read().await;
        Ok(store
            .entries
            .iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    async fn add_profile_entry(&self, user_id: Uuid, entry: &ProfileEntry) -> RepoResult<()> {
        self.store
            .write()
            .await
            .entries
            .push((user_id, entry.clone()));
        Ok(())
    }

    async fn update_profile_entry(
        &self,
        user_id: Uuid,
        entry: &ProfileEntry,
    ) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let slot = store
            .entries
            .iter_mut()
            .find(|(owner, e)| *owner == user_id && e.id == entry.id);
        Ok(slot.map(|(_, e)| *e = entry.clone()).is_some())
    }

    async fn delete_profile_entry(&self, user_id: Uuid, entry_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let before = store.entries.len();
        store
            .entries
            .retain(|(owner, e)| !(*owner == user_id && e.id == entry_id));
        Ok(store.entries.len() < before)
    }

    async fn insert_course(&self, course: &Course) -> RepoResult<()> {
        self.store.write().await.courses.push(course.clone());
        Ok(())
    }

    async fn get_course(&self, id: Uuid) -> RepoResult<Option<Course>> {
        let store = self.store.read().await;
        Ok(store.courses.iter().find(|c| c.id == id).cloned())
    }

    async fn list_courses(&self, status: Option<CourseStatus>) -> RepoResult<Vec<Course>> {
        let store = self.store.read().await;
        Ok(store
            .courses
            .iter()
            .rev()
            .filter(|c| status.is_none_or(|s| c.status == s))
            .cloned()
            .collect())
    }

    async fn list_courses_with_registrant(&self, user_id: Uuid) -> RepoResult<Vec<Course>> {
        let store = self.store.read().await;
        Ok(store
            .courses
            .iter()
            .rev()
            .filter(|c| c.registrations.iter().any(|r| r.user_id == user_id))
            .cloned()
            .collect())
    }

    async fn update_course(
        &self,
        course: &Course,
        expected_status: CourseStatus,
        new_managers: &[Manager],
    ) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let Some(stored) = store.course_mut(course.id) else {
            return Ok(false);
        };
        if stored.status != expected_status {
            return Ok(false);
        }
        stored.title = course.title.clone();
        stored.subtitle = course.subtitle.clone();
        stored.description = course.description.clone();
        stored.tags = course.tags.clone();
        stored.status = course.status;
        stored.updated_at = course.updated_at;
        stored.managers.extend(new_managers.iter().cloned());
        Ok(true)
    }

    async fn set_course_image(&self, course_id: Uuid, key: &str) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        Ok(store
            .course_mut(course_id)
            .map(|c| c.image_key = Some(key.to_string()))
            .is_some())
    }

    async fn set_course_rating(&self, course_id: Uuid, rating: f64) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        Ok(store
            .course_mut(course_id)
            .map(|c| c.rating = rating)
            .is_some())
    }

    async fn add_registration(
        &self,
        course_id: Uuid,
        registration: &Registration,
    ) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let Some(course) = store.course_mut(course_id) else {
            return Ok(false);
        };
        if course
            .registrations
            .iter()
            .any(|r| r.user_id == registration.user_id)
        {
            return Ok(false);
        }
        course.registrations.push(registration.clone());
        Ok(true)
    }

    async fn update_registration(
        &self,
        course_id: Uuid,
        registration: &Registration,
    ) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let slot = store
            .course_mut(course_id)
            .and_then(|c| c.registrations.iter_mut().find(|r| r.id == registration.id));
        Ok(slot.map(|r| *r = registration.clone()).is_some())
    }

    async fn remove_registration(
        &self,
        course_id: Uuid,
        registration_id: Uuid,
    ) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let Some(course) = store.course_mut(course_id) else {
            return Ok(false);
        };
        let before = course.registrations.len();
        course.registrations.retain(|r| r.id != registration_id);
        Ok(course.registrations.len() < before)
    }

    async fn add_feedback(
        &self,
        course_id: Uuid,
        registration_id: Uuid,
        feedback: &Feedback,
    ) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let slot = store
            .course_mut(course_id)
            .and_then(|c| c.registrations.iter_mut().find(|r| r.id == registration_id));
        Ok(slot.map(|r| r.feedback.push(feedback.clone())).is_some())
    }

    async fn add_material(&self, course_id: Uuid, material: &Material) -> RepoResult<()> {
        let mut store = self.store.write().await;
        if let Some(course) = store.course_mut(course_id) {
            course.material.push(material.clone());
        }
        Ok(())
    }

    async fn update_material(&self, course_id: Uuid, material: &Material) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let slot = store
            .course_mut(course_id)
            .and_then(|c| c.material.iter_mut().find(|m| m.id == material.id));
        Ok(slot.map(|m| *m = material.clone()).is_some())
    }

    async fn remove_material(&self, course_id: Uuid, material_id: Uuid) -> RepoResult<bool> {
        let mut store = self.store.write().await;
        let Some(course) = store.course_mut(course_id) else {
            return Ok(false);
        };
        let before = course.material.len();
        course.material.retain(|m| m.id != material_id);
        Ok(course.material.len() < before)
    }

    async fn add_comment(&self, course_id: Uuid, comment: &CourseComment) -> RepoResult<()> {
        let mut store = self.store.write().await;
        if let Some(course) = store.course_mut(course_id) {
            course.comments.push(comment.clone());
        }
        Ok(())
    }

    async fn get_stats(&self) -> RepoResult<AdminStats> {
        let store = self.store.read().await;
        let count = |status: CourseStatus| {
            store.courses.iter().filter(|c| c.status == status).count() as i64
        };
        Ok(AdminStats {
            total_users: store.users.len() as i64,
            total_courses: store.courses.len() as i64,
            draft_courses: count(CourseStatus::Draft),
            published_courses: count(CourseStatus::Published),
            finished_courses: count(CourseStatus::Finished),
            archived_courses: count(CourseStatus::Archived),
            total_registrations: store
                .courses
                .iter()
                .map(|c| c.registrations.len() as i64)
                .sum(),
        })
    }
}
