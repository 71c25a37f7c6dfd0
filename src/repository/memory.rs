use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use std::collections::BTreeMap;

use super::{Repository, RepositoryError};
use crate::models::{Note, User};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    notes: BTreeMap<i64, Note>,
    last_user_id: i64,
    last_note_id: i64,
}

/// Process-local store, used when no database is configured.
#[derive(Default)]
pub struct MemoryRepository {
    tables: RwLock<Tables>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .iter()
            .any(|user| user.username == username || user.email == email)
        {
            return Err(RepositoryError::Duplicate);
        }

        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            username: username.to_string(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|user| user.username == username)
            .cloned())
    }

    async fn create_note(
        &self,
        user_id: i64,
        title: &str,
        body: &str,
    ) -> Result<Note, RepositoryError> {
        let mut tables = self.tables.write().await;

        tables.last_note_id += 1;
        let now = Utc::now();
        let note = Note {
            id: tables.last_note_id,
            user_id,
            title: title.to_string(),
            body: body.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.notes.insert(note.id, note.clone());

        Ok(note)
    }

    async fn update_note(
        &self,
        user_id: i64,
        id: i64,
        title: &str,
        body: &str,
    ) -> Result<Option<Note>, RepositoryError> {
        let mut tables = self.tables.write().await;

        Ok(tables
            .notes
            .get_mut(&id)
            .filter(|note| note.user_id == user_id)
            .map(|note| {
                note.title = title.to_string();
                note.body = body.to_string();
                note.updated_at = Utc::now();
                note.clone()
            }))
    }

    async fn delete_note(&self, user_id: i64, id: i64) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.write().await;

        if tables.notes.get(&id).is_some_and(|note| note.user_id == user_id) {
            tables.notes.remove(&id);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    async fn count_notes(&self, user_id: i64) -> Result<u64, RepositoryError> {
        let tables = self.tables.read().await;
        let count = tables
            .notes
            .values()
            .filter(|note| note.user_id == user_id)
            .count();

        Ok(count as u64)
    }

    async fn list_notes(
        &self,
        user_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Note>, RepositoryError> {
        let tables = self.tables.read().await;

        Ok(tables
            .notes
            .values()
            .filter(|note| note.user_id == user_id)
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_username_or_email_is_rejected() {
        let repo = MemoryRepository::new();
        repo.create_user("ada", "ada@example.com", "hash").await.unwrap();

        let err = repo
            .create_user("ada", "other@example.com", "hash")
            .await
            .expect_err("should fail");
        assert!(matches!(err, RepositoryError::Duplicate), "wrong error type: {err:#?}");

        let err = repo
            .create_user("grace", "ada@example.com", "hash")
            .await
            .expect_err("should fail");
        assert!(matches!(err, RepositoryError::Duplicate), "wrong error type: {err:#?}");
    }

    #[tokio::test]
    async fn notes_are_scoped_to_their_owner() {
        let repo = MemoryRepository::new();
        let note = repo.create_note(1, "mine", "body").await.unwrap();

        assert_eq!(repo.update_note(2, note.id, "x", "y").await.unwrap(), None);
        assert!(!repo.delete_note(2, note.id).await.unwrap());
        assert_eq!(repo.count_notes(2).await.unwrap(), 0);

        let updated = repo.update_note(1, note.id, "new", "text").await.unwrap().unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.body, "text");
        assert!(updated.updated_at >= note.updated_at);

        assert!(repo.delete_note(1, note.id).await.unwrap());
        assert!(!repo.delete_note(1, note.id).await.unwrap());
    }

    #[tokio::test]
    async fn listing_pages_in_creation_order() {
        let repo = MemoryRepository::new();
        for i in 0..5 {
            repo.create_note(1, &format!("note {i}"), "b").await.unwrap();
            repo.create_note(2, "other", "b").await.unwrap();
        }

        let titles: Vec<_> = repo
            .list_notes(1, 2, 2)
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.title)
            .collect();
        assert_eq!(titles, vec!["note 2", "note 3"]);
        assert_eq!(repo.count_notes(1).await.unwrap(), 5);
    }
}
