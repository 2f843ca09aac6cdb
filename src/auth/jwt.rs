/// JWT issuance and validation
///
/// `TokenIssuer` signs access tokens and fires the dispatch hook once per
/// issued token. Validation is a free function used by the middleware.

use std::sync::Arc;

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::auth::store::UserAccount;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Callback invoked with `(token, claims)` after each successful issuance.
///
/// Lets the transport layer observe freshly issued tokens (attach to a
/// response header, audit, ...) without the issuer knowing about it.
/// Errors are logged and swallowed: the token is already signed and valid.
pub type DispatchHook = Arc<dyn Fn(&str, &Claims) -> Result<(), AppError> + Send + Sync>;

fn no_op_hook() -> DispatchHook {
    Arc::new(|_token, _claims| Ok(()))
}

/// Builds and signs access tokens for authenticated accounts.
#[derive(Clone)]
pub struct TokenIssuer {
    config: JwtSettings,
    on_dispatch: DispatchHook,
}

impl TokenIssuer {
    pub fn new(config: JwtSettings) -> Self {
        Self {
            config,
            on_dispatch: no_op_hook(),
        }
    }

    pub fn with_dispatch_hook(config: JwtSettings, hook: DispatchHook) -> Self {
        Self {
            config,
            on_dispatch: hook,
        }
    }

    /// Lifetime of issued tokens in seconds
    pub fn access_token_expiry(&self) -> i64 {
        self.config.access_token_expiry
    }

    /// Issue a signed access token for an account.
    ///
    /// The payload embeds the account's current jti plus the statically
    /// configured extra claims. The dispatch hook runs synchronously after
    /// signing, before the token is returned.
    ///
    /// # Errors
    /// Returns error if signing fails (secret/configuration problem);
    /// this is fatal to the request and not retried.
    pub fn issue(&self, account: &UserAccount) -> Result<String, AppError> {
        let extra = self
            .config
            .extra_claims
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect();

        let claims = Claims::new(
            account.id,
            account.email.clone(),
            account.jti.clone(),
            self.config.access_token_expiry,
            self.config.issuer.clone(),
            extra,
        );

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))?;

        if let Err(e) = (self.on_dispatch)(&token, &claims) {
            tracing::warn!(
                user_id = %claims.sub,
                error = %e,
                "Dispatch hook failed; token already issued"
            );
        }

        Ok(token)
    }
}

/// Validate an access token and extract its claims
///
/// Checks the signature, expiry, and issuer. Revocation is a separate
/// database-backed check (`is_token_current`).
///
/// # Errors
/// Returns error if the token is expired, tampered with, or malformed
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                AppError::Auth(AuthError::TokenExpired)
            }
            _ => AppError::Auth(AuthError::TokenInvalid),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use uuid::Uuid;

    fn get_test_config() -> JwtSettings {
        JwtSettings {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            access_token_expiry: 3600,
            issuer: "test".to_string(),
            extra_claims: HashMap::new(),
        }
    }

    fn test_account(jti: &str) -> UserAccount {
        UserAccount {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            name: "Test".to_string(),
            password_hash: "$2b$12$unused".to_string(),
            jti: jti.to_string(),
        }
    }

    #[test]
    fn issued_token_round_trips_subject_and_jti() {
        let config = get_test_config();
        let issuer = TokenIssuer::new(config.clone());
        let account = test_account("abc");

        let token = issuer.issue(&account).expect("Failed to issue token");
        let claims = validate_access_token(&token, &config).expect("Failed to validate token");

        assert_eq!(claims.sub, account.id.to_string());
        assert_eq!(claims.email, account.email);
        assert_eq!(claims.jti, "abc");
        assert_eq!(claims.iss, "test");
    }

    #[test]
    fn extra_claims_from_config_appear_in_payload() {
        let mut config = get_test_config();
        config
            .extra_claims
            .insert("client".to_string(), "web".to_string());
        let issuer = TokenIssuer::new(config.clone());

        let token = issuer.issue(&test_account("abc")).expect("Failed to issue token");
        let claims = validate_access_token(&token, &config).expect("Failed to validate token");

        assert_eq!(
            claims.extra.get("client"),
            Some(&serde_json::Value::String("web".to_string()))
        );
    }

    #[test]
    fn dispatch_hook_fires_exactly_once_per_issue() {
        let config = get_test_config();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let issuer = TokenIssuer::with_dispatch_hook(
            config,
            Arc::new(move |token, claims| {
                assert!(!token.is_empty());
                assert_eq!(claims.jti, "abc");
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }),
        );

        issuer.issue(&test_account("abc")).expect("Failed to issue token");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        issuer.issue(&test_account("abc")).expect("Failed to issue token");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn dispatch_hook_error_does_not_fail_issuance() {
        let config = get_test_config();
        let issuer = TokenIssuer::with_dispatch_hook(
            config.clone(),
            Arc::new(|_, _| Err(AppError::Internal("hook exploded".to_string()))),
        );

        let token = issuer
            .issue(&test_account("abc"))
            .expect("Issuance must survive a failing hook");
        assert!(validate_access_token(&token, &config).is_ok());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = get_test_config();
        let account = test_account("abc");

        // Build claims two hours in the past, beyond any leeway
        let mut claims = Claims::new(
            account.id,
            account.email.clone(),
            account.jti.clone(),
            -7200,
            config.issuer.clone(),
            serde_json::Map::new(),
        );
        claims.iat -= 7200;

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap();

        let result = validate_access_token(&token, &config);
        assert!(matches!(
            result,
            Err(AppError::Auth(AuthError::TokenExpired))
        ));
    }

    #[test]
    fn tampered_token_is_rejected() {
        let config = get_test_config();
        let issuer = TokenIssuer::new(config.clone());

        let token = issuer.issue(&test_account("abc")).expect("Failed to issue token");
        let tampered = format!("{}X", token);

        assert!(validate_access_token(&tampered, &config).is_err());
    }

    #[test]
    fn wrong_issuer_is_rejected() {
        let mut config = get_test_config();
        let issuer = TokenIssuer::new(config.clone());

        let token = issuer.issue(&test_account("abc")).expect("Failed to issue token");

        config.issuer = "wrong-issuer".to_string();
        assert!(validate_access_token(&token, &config).is_err());
    }
}
