/// jti-based token revocation
///
/// Each account stores exactly one current jti; every issued token embeds
/// the jti current at issuance. Rotating the stored jti invalidates every
/// outstanding token for that account in one column update, with no token
/// blacklist to maintain. The match check runs on every authenticated
/// request and re-reads the stored value, so a rotation is visible to the
/// next check.

use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::error::AppError;

const JTI_LENGTH: usize = 32;

/// Generate a fresh random revocation identifier
pub fn generate_jti() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(JTI_LENGTH)
        .map(char::from)
        .collect()
}

/// Check whether a token's claims are still current for its account.
///
/// Loads the account named by `sub` and compares its stored jti against
/// the one embedded in the token. A missing account counts as revoked
/// (deleting an account implicitly invalidates its tokens).
///
/// # Errors
/// Returns error on a malformed subject claim or a database failure
pub async fn is_token_current(pool: &PgPool, claims: &Claims) -> Result<bool, AppError> {
    let user_id = claims.user_id()?;

    let stored = sqlx::query_scalar::<_, String>("SELECT jti FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

    match stored {
        None => {
            tracing::warn!(user_id = %user_id, "Token presented for unknown account");
            Ok(false)
        }
        Some(current) => Ok(current == claims.jti),
    }
}

/// Rotate an account's jti, revoking every outstanding token at once.
///
/// Used for logout-all and after a password change. Returns the new jti;
/// tokens issued afterwards embed it and validate normally.
///
/// # Errors
/// Returns error if the database update fails
pub async fn rotate_jti(pool: &PgPool, user_id: Uuid) -> Result<String, AppError> {
    let new_jti = generate_jti();

    sqlx::query(
        r#"
        UPDATE users
        SET jti = $1, updated_at = $2
        WHERE id = $3
        "#,
    )
    .bind(&new_jti)
    .bind(chrono::Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;

    tracing::info!(user_id = %user_id, "All outstanding tokens revoked for user");
    Ok(new_jti)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_jti_has_expected_shape() {
        let jti = generate_jti();

        assert_eq!(jti.len(), JTI_LENGTH);
        assert!(jti.chars().all(|c| c.is_alphanumeric()));
    }

    #[test]
    fn consecutive_jtis_differ() {
        assert_ne!(generate_jti(), generate_jti());
    }
}
