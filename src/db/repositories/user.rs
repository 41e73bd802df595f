//! User account repository.
//!
//! Uniqueness on `username` and `email` is case-insensitive but storage is
//! case-preserving. The precise error (which field collided) comes from a
//! pre-check inside the write transaction; the store's `COLLATE NOCASE`
//! UNIQUE constraints are the backstop for races, and a constraint violation
//! that slips past the pre-check is translated into the same error instead
//! of leaking a driver fault.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use serde::Serialize;
use thiserror::Error;
use tokio::task;
use uuid::Uuid;

use crate::config::SecurityConfig;
use crate::entities::users;
use crate::password::{self, PasswordError};

/// Capabilities granted to a freshly registered, unactivated account.
const INITIAL_FEATURES: [&str; 1] = ["read:activation_token"];

#[derive(Debug, Error)]
pub enum UserError {
    #[error("username already in use")]
    UsernameTaken,

    #[error("email already in use")]
    EmailTaken,

    #[error("user not found")]
    NotFound,

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("database error: {0}")]
    Database(#[from] DbErr),

    #[error("{0}")]
    Internal(String),
}

/// User record as exposed by the repository. `password` carries the stored
/// digest, never a plaintext.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub features: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            email: model.email,
            password: model.password_hash,
            features: serde_json::from_value(model.features).unwrap_or_default(),
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Partial update; absent fields are left unchanged.
#[derive(Debug, Default, Clone)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl UserPatch {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }
}

pub struct UserRepository {
    conn: DatabaseConnection,
    security: SecurityConfig,
}

impl UserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection, security: SecurityConfig) -> Self {
        Self { conn, security }
    }

    /// Create a user. The password is hashed before anything touches the
    /// store; the uniqueness pre-checks and the insert share one transaction.
    pub async fn create(
        &self,
        username: &str,
        email: &str,
        plaintext_password: &str,
    ) -> Result<User, UserError> {
        let digest = self.hash_password(plaintext_password.to_string()).await?;

        let txn = self.conn.begin().await?;

        if users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(UserError::UsernameTaken);
        }

        if users::Entity::find()
            .filter(users::Column::Email.eq(email))
            .one(&txn)
            .await?
            .is_some()
        {
            return Err(UserError::EmailTaken);
        }

        let now = Utc::now();
        let model = users::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set(digest),
            features: Set(serde_json::json!(INITIAL_FEATURES)),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(translate_unique_violation)?;

        txn.commit().await?;

        Ok(model.into())
    }

    /// Case-insensitive exact lookup; the stored casing is returned.
    pub async fn find_one_by_username(&self, username: &str) -> Result<User, UserError> {
        let model = users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.conn)
            .await?
            .ok_or(UserError::NotFound)?;

        Ok(model.into())
    }

    /// Apply a partial update to the user currently known by
    /// `current_username`. A patched username/email may collide only with a
    /// *different* user; re-casing a user's own username or email is allowed.
    /// Any accepted change strictly advances `updated_at`.
    pub async fn update(
        &self,
        current_username: &str,
        patch: UserPatch,
    ) -> Result<User, UserError> {
        let txn = self.conn.begin().await?;

        let current = users::Entity::find()
            .filter(users::Column::Username.eq(current_username))
            .one(&txn)
            .await?
            .ok_or(UserError::NotFound)?;

        if let Some(new_username) = &patch.username {
            let clash = users::Entity::find()
                .filter(users::Column::Username.eq(new_username))
                .filter(users::Column::Id.ne(current.id.clone()))
                .one(&txn)
                .await?;
            if clash.is_some() {
                return Err(UserError::UsernameTaken);
            }
        }

        if let Some(new_email) = &patch.email {
            let clash = users::Entity::find()
                .filter(users::Column::Email.eq(new_email))
                .filter(users::Column::Id.ne(current.id.clone()))
                .one(&txn)
                .await?;
            if clash.is_some() {
                return Err(UserError::EmailTaken);
            }
        }

        if patch.is_empty() {
            txn.commit().await?;
            return Ok(current.into());
        }

        let previous_updated_at = current.updated_at;
        let mut active: users::ActiveModel = current.into();

        if let Some(username) = patch.username {
            active.username = Set(username);
        }
        if let Some(email) = patch.email {
            active.email = Set(email);
        }
        if let Some(plaintext) = patch.password {
            // The previous digest is fully replaced
            active.password_hash = Set(self.hash_password(plaintext).await?);
        }

        active.updated_at = Set(strictly_after(previous_updated_at));

        let model = active
            .update(&txn)
            .await
            .map_err(translate_unique_violation)?;

        txn.commit().await?;

        Ok(model.into())
    }

    /// Argon2 is CPU-bound, so hashing runs on the blocking pool instead of
    /// stalling the async workers.
    async fn hash_password(&self, plaintext: String) -> Result<String, UserError> {
        let security = self.security.clone();

        let digest = task::spawn_blocking(move || password::hash(&plaintext, &security))
            .await
            .map_err(|e| UserError::Internal(format!("password hashing task panicked: {e}")))??;

        Ok(digest)
    }
}

/// `updated_at` must compare strictly greater than its previous value even
/// if the clock reads the same instant twice.
fn strictly_after(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + chrono::Duration::milliseconds(1)
    }
}

/// A unique-constraint fault that won a race against the pre-check gets the
/// same treatment as the pre-check itself.
fn translate_unique_violation(err: DbErr) -> UserError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => {
            if detail.contains("email") {
                UserError::EmailTaken
            } else {
                UserError::UsernameTaken
            }
        }
        _ => UserError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Migrator, Store};

    async fn test_repo() -> UserRepository {
        let store = Store::new("sqlite::memory:", &Migrator::new())
            .await
            .unwrap();

        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
        };

        store.user_repo(&security)
    }

    #[tokio::test]
    async fn create_assigns_id_features_and_timestamps() {
        let repo = test_repo().await;

        let user = repo
            .create("RegistrationFlow", "registration.flow@example.com", "RegistrationFlowPassword")
            .await
            .unwrap();

        let id = Uuid::parse_str(&user.id).unwrap();
        assert_eq!(id.get_version_num(), 4);
        assert_eq!(user.username, "RegistrationFlow");
        assert_eq!(user.features, vec!["read:activation_token"]);
        assert_ne!(user.password, "RegistrationFlowPassword");
        assert!(user.updated_at >= user.created_at);
    }

    #[tokio::test]
    async fn username_uniqueness_is_case_insensitive() {
        let repo = test_repo().await;

        repo.create("sameCase", "same.case@example.com", "securePassword123")
            .await
            .unwrap();

        let err = repo
            .create("SAMECASE", "other@example.com", "securePassword123")
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::UsernameTaken));
    }

    #[tokio::test]
    async fn email_uniqueness_is_case_insensitive() {
        let repo = test_repo().await;

        repo.create("firstUser", "shared@example.com", "securePassword123")
            .await
            .unwrap();

        let err = repo
            .create("secondUser", "Shared@Example.com", "securePassword123")
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive_and_case_preserving() {
        let repo = test_repo().await;

        repo.create("DifferentCase", "different.case@example.com", "securePassword123")
            .await
            .unwrap();

        let found = repo.find_one_by_username("differentcase").await.unwrap();
        assert_eq!(found.username, "DifferentCase");

        let err = repo.find_one_by_username("nonexistentUser").await.unwrap_err();
        assert!(matches!(err, UserError::NotFound));
    }

    #[tokio::test]
    async fn update_rejects_collision_with_another_user() {
        let repo = test_repo().await;

        repo.create("targetUser", "target@example.com", "securePassword123")
            .await
            .unwrap();
        let victim = repo
            .create("victimUser", "victim@example.com", "securePassword123")
            .await
            .unwrap();

        let err = repo
            .update(
                "victimUser",
                UserPatch {
                    username: Some("TARGETUSER".to_string()),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::UsernameTaken));

        let err = repo
            .update(
                "victimUser",
                UserPatch {
                    email: Some("Target@example.com".to_string()),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::EmailTaken));

        // The failed patches left the victim untouched
        let unchanged = repo.find_one_by_username("victimUser").await.unwrap();
        assert_eq!(unchanged.email, "victim@example.com");
        assert_eq!(unchanged.updated_at, victim.updated_at);
    }

    #[tokio::test]
    async fn update_allows_recasing_own_username() {
        let repo = test_repo().await;

        let before = repo
            .create("reCase", "re.case@example.com", "securePassword123")
            .await
            .unwrap();

        let after = repo
            .update(
                "reCase",
                UserPatch {
                    username: Some("ReCase".to_string()),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(after.username, "ReCase");
        assert_eq!(after.id, before.id);
        assert!(after.updated_at > before.updated_at);
    }

    #[tokio::test]
    async fn update_replaces_the_password_digest() {
        let repo = test_repo().await;

        let before = repo
            .create("newPassword1", "new.password@example.com", "newPassword1")
            .await
            .unwrap();

        let after = repo
            .update(
                "newPassword1",
                UserPatch {
                    password: Some("newPassword2".to_string()),
                    ..UserPatch::default()
                },
            )
            .await
            .unwrap();

        assert!(password::verify("newPassword2", &after.password));
        assert!(!password::verify("newPassword1", &after.password));
        assert!(after.updated_at > before.updated_at);
    }

    fn raw_row(username: &str, email: &str) -> users::ActiveModel {
        let now = Utc::now();
        users::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            username: Set(username.to_string()),
            email: Set(email.to_string()),
            password_hash: Set("digest".to_string()),
            features: Set(serde_json::json!([])),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    #[tokio::test]
    async fn constraint_violation_maps_to_the_colliding_field() {
        // Writes that land behind the repository's back, the way a racing
        // request would, must still come out as the field-specific error.
        let repo = test_repo().await;

        users::Entity::insert(raw_row("racedUser", "raced@example.com"))
            .exec(&repo.conn)
            .await
            .unwrap();

        let err = users::Entity::insert(raw_row("racedUser", "unrelated@example.com"))
            .exec(&repo.conn)
            .await
            .unwrap_err();
        assert!(matches!(
            translate_unique_violation(err),
            UserError::UsernameTaken
        ));

        let err = users::Entity::insert(raw_row("unrelatedUser", "raced@example.com"))
            .exec(&repo.conn)
            .await
            .unwrap_err();
        assert!(matches!(
            translate_unique_violation(err),
            UserError::EmailTaken
        ));
    }

    #[test]
    fn non_constraint_faults_stay_database_errors() {
        let err = translate_unique_violation(DbErr::Custom("connection lost".to_string()));
        assert!(matches!(err, UserError::Database(_)));
    }

    #[tokio::test]
    async fn empty_patch_changes_nothing() {
        let repo = test_repo().await;

        let before = repo
            .create("noopUser", "noop@example.com", "securePassword123")
            .await
            .unwrap();

        let after = repo.update("noopUser", UserPatch::default()).await.unwrap();

        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(after.username, "noopUser");
    }
}
