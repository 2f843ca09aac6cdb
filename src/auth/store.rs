/// Credential store
///
/// Account persistence and password authentication. Lookups key on the
/// normalized (lowercased) email; callers are expected to pass emails
/// through `validators::is_valid_email` first.

use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::password::verify_password;
use crate::auth::revocation::generate_jti;
use crate::error::{AppError, AuthError};

/// A stored user account
///
/// `jti` is the account's current revocation identifier: tokens embedding
/// any other value are rejected.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAccount {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub jti: String,
}

/// Create an account with a freshly generated jti
///
/// # Errors
/// Returns error on duplicate email (unique constraint) or other
/// database failures
pub async fn create_account(
    pool: &PgPool,
    email: &str,
    name: &str,
    password_hash: &str,
) -> Result<UserAccount, AppError> {
    let account = UserAccount {
        id: Uuid::new_v4(),
        email: email.to_string(),
        name: name.to_string(),
        password_hash: password_hash.to_string(),
        jti: generate_jti(),
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, email, name, password_hash, jti, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(account.id)
    .bind(&account.email)
    .bind(&account.name)
    .bind(&account.password_hash)
    .bind(&account.jti)
    .bind(Utc::now())
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(account)
}

/// Load an account by ID
///
/// # Errors
/// Returns `AccountNotFound` if no such account exists
pub async fn find_account(pool: &PgPool, user_id: Uuid) -> Result<UserAccount, AppError> {
    sqlx::query_as::<_, UserAccount>(
        "SELECT id, email, name, password_hash, jti FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Auth(AuthError::AccountNotFound))
}

/// Authenticate an account by email and password.
///
/// No side effects on success. The two failure causes are distinguished
/// internally (and in logs) but map to one external response.
///
/// # Errors
/// - `AccountNotFound` if the email is unknown
/// - `InvalidCredentials` if the password does not match
pub async fn authenticate(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<UserAccount, AppError> {
    let account = sqlx::query_as::<_, UserAccount>(
        "SELECT id, email, name, password_hash, jti FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| {
        tracing::warn!("Login attempt for unknown email");
        AppError::Auth(AuthError::AccountNotFound)
    })?;

    if !verify_password(password, &account.password_hash)? {
        tracing::warn!(user_id = %account.id, "Login attempt with wrong password");
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    Ok(account)
}

/// Store a new password hash and rotate the jti in one statement, so the
/// password change and the mass revocation are atomically visible.
///
/// Returns the new jti.
///
/// # Errors
/// Returns error if the database update fails
pub async fn update_password(
    pool: &PgPool,
    user_id: Uuid,
    password_hash: &str,
) -> Result<String, AppError> {
    let new_jti = generate_jti();

    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $1, jti = $2, updated_at = $3
        WHERE id = $4
        "#,
    )
    .bind(password_hash)
    .bind(&new_jti)
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, "Password updated, outstanding tokens revoked");
    Ok(new_jti)
}
