//! # User Repository
//!
//! Database operations for user accounts and login checks.
//!
//! ## Password Handling
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create_user / set_password                                             │
//! │      plain password ──► argon2 PHC string ──► users.password_hash       │
//! │                         (salt embedded, one per hash)                   │
//! │                                                                         │
//! │  authenticate(username, password)                                       │
//! │      unknown user      ──► Ok(None)     ┐                               │
//! │      deactivated user  ──► Ok(None)     ├── indistinguishable to the    │
//! │      wrong password    ──► Ok(None)     ┘   caller, by intent           │
//! │      success           ──► stamps last_login_at, Ok(Some(user))         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! `Err` from authenticate means the check itself could not run (broken
//! stored hash, connection trouble), never that the password was wrong.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use meridian_core::validation::{
    validate_email, validate_name, validate_password, validate_username,
};
use meridian_core::{NewUser, User, UserRole};

/// Username of the bootstrap account created on an empty users table.
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";

/// Starting password of the bootstrap account. Meant to be changed at
/// first login.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Repository for user database operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Creates a new UserRepository.
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Creates a user account. The plain password from the draft is hashed
    /// here and discarded; only the PHC string is stored.
    ///
    /// ## Returns
    /// * `Ok(User)` - Created account, active, with assigned id
    /// * `Err(DbError::Validation)` - Bad username, password, name, or email
    /// * `Err(DbError::UniqueViolation)` - Username already taken
    pub async fn create_user(&self, draft: NewUser) -> DbResult<User> {
        validate_username(&draft.username)?;
        validate_password(&draft.password)?;
        validate_name(&draft.full_name)?;
        if let Some(email) = &draft.email {
            validate_email(email)?;
        }

        let password_hash = hash_password(&draft.password)?;
        let created_at = Utc::now();

        debug!(username = %draft.username, role = %draft.role.as_str(), "Creating user");

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, full_name, email, role, is_active, last_login_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, NULL, ?6)
            "#,
        )
        .bind(&draft.username)
        .bind(&password_hash)
        .bind(&draft.full_name)
        .bind(&draft.email)
        .bind(draft.role)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: draft.username,
            password_hash,
            full_name: draft.full_name,
            email: draft.email,
            role: draft.role,
            is_active: true,
            last_login_at: None,
            created_at,
        })
    }

    /// Checks a username/password pair.
    ///
    /// Unknown username, deactivated account, and wrong password all come
    /// back as `Ok(None)` so the caller can show one uniform "login failed"
    /// message. On success the account's `last_login_at` is stamped and
    /// the user returned.
    pub async fn authenticate(&self, username: &str, password: &str) -> DbResult<Option<User>> {
        let user = match self.get_by_username(username).await? {
            Some(user) => user,
            None => {
                debug!(username = %username, "Login failed: unknown username");
                return Ok(None);
            }
        };

        if !user.is_active {
            debug!(username = %username, "Login failed: account deactivated");
            return Ok(None);
        }

        if !verify_password(password, &user.password_hash)? {
            debug!(username = %username, "Login failed: wrong password");
            return Ok(None);
        }

        let now = Utc::now();
        sqlx::query("UPDATE users SET last_login_at = ?2 WHERE id = ?1")
            .bind(user.id)
            .bind(now)
            .execute(&self.pool)
            .await?;

        debug!(username = %username, id = %user.id, "Login succeeded");

        Ok(Some(User {
            last_login_at: Some(now),
            ..user
        }))
    }

    /// Gets a user by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, full_name, email, role, is_active, last_login_at, created_at
            FROM users
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Gets a user by username.
    pub async fn get_by_username(&self, username: &str) -> DbResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, full_name, email, role, is_active, last_login_at, created_at
            FROM users
            WHERE username = ?1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Lists all users, by username.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, full_name, email, role, is_active, last_login_at, created_at
            FROM users
            ORDER BY username
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    /// Updates a user's display fields and role. Username, password, and
    /// activation go through their own operations.
    pub async fn update_profile(
        &self,
        id: i64,
        full_name: &str,
        email: Option<&str>,
        role: UserRole,
    ) -> DbResult<User> {
        validate_name(full_name)?;
        if let Some(email) = email {
            validate_email(email)?;
        }

        debug!(id = %id, "Updating user profile");

        let result = sqlx::query(
            r#"
            UPDATE users SET
                full_name = ?2,
                email = ?3,
                role = ?4
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(full_name)
        .bind(email)
        .bind(role)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id.to_string()));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("User", id.to_string()))
    }

    /// Replaces a user's password with a fresh hash of the new one.
    pub async fn set_password(&self, id: i64, new_password: &str) -> DbResult<()> {
        validate_password(new_password)?;

        let password_hash = hash_password(new_password)?;

        debug!(id = %id, "Setting user password");

        let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
            .bind(id)
            .bind(&password_hash)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id.to_string()));
        }

        Ok(())
    }

    /// Activates or deactivates an account. A deactivated account keeps
    /// its data but can no longer log in.
    pub async fn set_active(&self, id: i64, active: bool) -> DbResult<()> {
        debug!(id = %id, active, "Setting user active flag");

        let result = sqlx::query("UPDATE users SET is_active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id.to_string()));
        }

        Ok(())
    }

    /// Deletes a user account.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id = %id, "Deleting user");

        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id.to_string()));
        }

        Ok(())
    }

    /// Counts users (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Creates the default admin account when the users table is empty,
    /// so a fresh installation has a way in. Returns `true` when the
    /// account was created on this call.
    pub async fn ensure_default_admin(&self) -> DbResult<bool> {
        if self.count().await? > 0 {
            return Ok(false);
        }

        warn!(
            username = %DEFAULT_ADMIN_USERNAME,
            "No user accounts exist; creating default admin. Change its password at first login."
        );

        self.create_user(NewUser {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
            full_name: "Administrator".to_string(),
            email: None,
            role: UserRole::Admin,
        })
        .await?;

        Ok(true)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Hashes a password for storage as an argon2 PHC string.
fn hash_password(password: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::PasswordHash(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored PHC string.
///
/// A wrong password is `Ok(false)`. `Err` means the check could not run,
/// e.g. the stored hash is malformed.
fn verify_password(password: &str, hash: &str) -> DbResult<bool> {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed = PasswordHash::new(hash)
        .map_err(|e| DbError::PasswordHash(format!("Stored hash is unusable: {}", e)))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(DbError::PasswordHash(e.to_string())),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
