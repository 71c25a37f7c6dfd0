use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, Row};

use super::{Repository, RepositoryError, embedded::migrations};
use crate::models::{Note, User};

const NOTE_COLUMNS: &str = "id, user_id, title, body, created_at, updated_at";

pub struct PgRepository {
    client: Client,
}

fn note_from_row(row: &Row) -> Note {
    Note {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        body: row.get("body"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn user_from_row(row: &Row) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

impl PgRepository {
    pub async fn connect(database_dsn: &str) -> Result<Self, RepositoryError> {
        let (client, con) = tokio_postgres::connect(database_dsn, NoTls).await?;

        tokio::spawn(async move {
            if let Err(e) = con.await {
                tracing::error!("connection error: {}", e);
            }
        });

        Ok(Self { client })
    }

    pub async fn migrate(&mut self) -> Result<(), RepositoryError> {
        let migrations_report = migrations::runner().run_async(&mut self.client).await?;

        for migration in migrations_report.applied_migrations() {
            tracing::info!(
                "Migration Applied -  Name: {}, Version: {}",
                migration.name(),
                migration.version()
            );
        }

        tracing::info!("DB migrations finished!");

        Ok(())
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let row = self
            .client
            .query_one(
                "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) \
                 RETURNING id, username, email, password_hash",
                &[&username, &email, &password_hash],
            )
            .await?;

        Ok(user_from_row(&row))
    }

    async fn find_user_by_username(
        &self,
        username: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = self
            .client
            .query_opt(
                "SELECT id, username, email, password_hash FROM users WHERE username = $1",
                &[&username],
            )
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    async fn create_note(
        &self,
        user_id: i64,
        title: &str,
        body: &str,
    ) -> Result<Note, RepositoryError> {
        let row = self
            .client
            .query_one(
                &format!(
                    "INSERT INTO notes (user_id, title, body) VALUES ($1, $2, $3) \
                     RETURNING {NOTE_COLUMNS}"
                ),
                &[&user_id, &title, &body],
            )
            .await?;

        Ok(note_from_row(&row))
    }

    async fn update_note(
        &self,
        user_id: i64,
        id: i64,
        title: &str,
        body: &str,
    ) -> Result<Option<Note>, RepositoryError> {
        let row = self
            .client
            .query_opt(
                &format!(
                    "UPDATE notes SET title = $1, body = $2, updated_at = NOW() \
                     WHERE id = $3 AND user_id = $4 RETURNING {NOTE_COLUMNS}"
                ),
                &[&title, &body, &id, &user_id],
            )
            .await?;

        Ok(row.as_ref().map(note_from_row))
    }

    async fn delete_note(&self, user_id: i64, id: i64) -> Result<bool, RepositoryError> {
        let rows = self
            .client
            .execute(
                "DELETE FROM notes WHERE id = $1 AND user_id = $2",
                &[&id, &user_id],
            )
            .await?;

        Ok(rows == 1)
    }

    async fn count_notes(&self, user_id: i64) -> Result<u64, RepositoryError> {
        let row = self
            .client
            .query_one(
                "SELECT COUNT(*) AS count FROM notes WHERE user_id = $1",
                &[&user_id],
            )
            .await?;

        let count: i64 = row.get("count");
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn list_notes(
        &self,
        user_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Note>, RepositoryError> {
        let rows = self
            .client
            .query(
                &format!(
                    "SELECT {NOTE_COLUMNS} FROM notes WHERE user_id = $1 \
                     ORDER BY id OFFSET $2 LIMIT $3"
                ),
                &[&user_id, &to_sql_int(offset), &to_sql_int(limit)],
            )
            .await?;

        Ok(rows.iter().map(note_from_row).collect())
    }
}
