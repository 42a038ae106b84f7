/// User model and database operations
///
/// Users are keyed by the `sub` claim of the identity provider. Nothing here
/// stores credentials; authentication happens upstream.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     subject TEXT NOT NULL UNIQUE,
///     display_name TEXT NOT NULL,
///     created_at TEXT NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

/// User account provisioned from identity claims
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Database id
    pub id: i64,

    /// External identity (`sub` claim), unique
    pub subject: String,

    /// Name shown next to uploads and annotations
    pub display_name: String,

    /// When the user row was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// External identity (`sub` claim)
    pub subject: String,

    /// Display name
    pub display_name: String,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a database error if the subject already exists (unique
    /// constraint) or the connection fails.
    pub async fn create(pool: &SqlitePool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (subject, display_name, created_at)
            VALUES (?, ?, ?)
            RETURNING id, subject, display_name, created_at
            "#,
        )
        .bind(data.subject)
        .bind(data.display_name)
        .bind(Utc::now())
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by external identity
    pub async fn find_by_subject(
        pool: &SqlitePool,
        subject: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, subject, display_name, created_at
            FROM users
            WHERE subject = ?
            "#,
        )
        .bind(subject)
        .fetch_optional(pool)
        .await
    }

    /// Counts all users
    pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await?;

        Ok(count)
    }
}
