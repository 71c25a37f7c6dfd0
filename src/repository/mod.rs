mod embedded;
mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PgRepository;

use async_trait::async_trait;
use thiserror::Error;
use tokio_postgres::error::SqlState;

use crate::models::{Note, User};

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Duplicate,

    #[error("database error: {0}")]
    Postgres(tokio_postgres::Error),

    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),
}

impl From<tokio_postgres::Error> for RepositoryError {
    fn from(e: tokio_postgres::Error) -> Self {
        if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
            Self::Duplicate
        } else {
            Self::Postgres(e)
        }
    }
}

/// Storage of users and their notes.
///
/// Note operations take the owner's id and never touch another user's
/// notes.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;

    async fn find_user_by_username(&self, username: &str)
    -> Result<Option<User>, RepositoryError>;

    async fn create_note(
        &self,
        user_id: i64,
        title: &str,
        body: &str,
    ) -> Result<Note, RepositoryError>;

    async fn update_note(
        &self,
        user_id: i64,
        id: i64,
        title: &str,
        body: &str,
    ) -> Result<Option<Note>, RepositoryError>;

    async fn delete_note(&self, user_id: i64, id: i64) -> Result<bool, RepositoryError>;

    async fn count_notes(&self, user_id: i64) -> Result<u64, RepositoryError>;

    /// Notes in creation order.
    async fn list_notes(
        &self,
        user_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Note>, RepositoryError>;
}
