/// Provisioning users from identity claims

use super::{ServiceError, ServiceResult};
use crate::auth::middleware::AuthContext;
use crate::models::user::{CreateUser, User};
use sqlx::SqlitePool;
use tracing::info;

/// User operations over the database
#[derive(Debug, Clone)]
pub struct UserService {
    db: SqlitePool,
}

impl UserService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// The user registered for the caller's subject, if any
    pub async fn try_find_user(&self, principal: &AuthContext) -> ServiceResult<Option<User>> {
        Ok(User::find_by_subject(&self.db, &principal.subject).await?)
    }

    /// Registers the caller
    ///
    /// The display name comes from the `name` claim, else `email`, else the
    /// subject.
    ///
    /// # Errors
    ///
    /// `Conflict` if a user already exists for the subject
    pub async fn create_user(&self, principal: &AuthContext) -> ServiceResult<User> {
        if self.try_find_user(principal).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "User '{}' is already registered",
                principal.subject
            )));
        }

        let user = User::create(
            &self.db,
            CreateUser {
                subject: principal.subject.clone(),
                display_name: principal.display_name(),
            },
        )
        .await
        .map_err(|e| match e {
            // Lost a race with a concurrent registration
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                ServiceError::Conflict(format!(
                    "User '{}' is already registered",
                    principal.subject
                ))
            }
            other => ServiceError::Database(other),
        })?;

        info!(user_id = user.id, subject = %user.subject, "User registered");
        Ok(user)
    }
}
