use thiserror::Error;

use std::sync::Arc;

use crate::{
    hasher::{Hasher, HasherError},
    models::{Note, User},
    repository::{Repository, RepositoryError},
};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("a user with that username or email already exists")]
    AlreadyExists,

    #[error(transparent)]
    Repository(RepositoryError),

    #[error(transparent)]
    Hasher(#[from] HasherError),

    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl From<RepositoryError> for ServiceError {
    fn from(e: RepositoryError) -> Self {
        match e {
            RepositoryError::Duplicate => Self::AlreadyExists,
            e => Self::Repository(e),
        }
    }
}

/// One page of a paginated listing. Page numbers start at 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub total: u64,
}

impl<T> Page<T> {
    pub const fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub const fn has_next(&self) -> bool {
        self.number < self.num_pages
    }
}

/// Picks the page to show for a requested page number: anything that is not
/// a number shows the first page, anything out of range shows the last.
pub fn resolve_page_number(requested: Option<&str>, num_pages: u64) -> u64 {
    match requested.map(str::trim).map(str::parse::<i64>) {
        None | Some(Err(_)) => 1,
        Some(Ok(number)) => match u64::try_from(number) {
            Ok(number) if (1..=num_pages).contains(&number) => number,
            _ => num_pages,
        },
    }
}

#[derive(Clone)]
pub struct NoteService {
    repo: Arc<dyn Repository>,
    page_size: u64,
}

impl NoteService {
    pub fn new(repo: Arc<dyn Repository>, page_size: u64) -> Self {
        Self {
            repo,
            page_size: page_size.max(1),
        }
    }

    pub async fn create_note(
        &self,
        user_id: i64,
        title: &str,
        body: &str,
    ) -> Result<Note, ServiceError> {
        Ok(self.repo.create_note(user_id, title, body).await?)
    }

    pub async fn update_note(
        &self,
        user_id: i64,
        id: i64,
        title: &str,
        body: &str,
    ) -> Result<Option<Note>, ServiceError> {
        Ok(self.repo.update_note(user_id, id, title, body).await?)
    }

    pub async fn delete_note(&self, user_id: i64, id: i64) -> Result<bool, ServiceError> {
        Ok(self.repo.delete_note(user_id, id).await?)
    }

    pub async fn page(
        &self,
        user_id: i64,
        requested: Option<&str>,
    ) -> Result<Page<Note>, ServiceError> {
        let total = self.repo.count_notes(user_id).await?;
        let num_pages = total.div_ceil(self.page_size).max(1);
        let number = resolve_page_number(requested, num_pages);

        let items = self
            .repo
            .list_notes(user_id, (number - 1) * self.page_size, self.page_size)
            .await?;

        Ok(Page {
            items,
            number,
            num_pages,
            total,
        })
    }
}

#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn Repository>,
    hasher: Arc<dyn Hasher>,
}

impl UserService {
    pub fn new(repo: Arc<dyn Repository>, hasher: Arc<dyn Hasher>) -> Self {
        Self { repo, hasher }
    }

    pub async fn username_taken(&self, username: &str) -> Result<bool, ServiceError> {
        Ok(self.repo.find_user_by_username(username).await?.is_some())
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, ServiceError> {
        let hasher = Arc::clone(&self.hasher);
        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || hasher.generate_hash(&password)).await??;

        Ok(self.repo.create_user(username, email, &hash).await?)
    }

    /// Returns the user when the password matches.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, ServiceError> {
        let Some(user) = self.repo.find_user_by_username(username).await? else {
            return Ok(None);
        };

        let hasher = Arc::clone(&self.hasher);
        let hash = user.password_hash.clone();
        let password = password.to_string();
        let matches =
            tokio::task::spawn_blocking(move || hasher.check_hash(&hash, &password)).await??;

        Ok(matches.then_some(user))
    }
}
