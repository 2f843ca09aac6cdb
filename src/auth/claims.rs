/// JWT Claims structure
///
/// Payload of an access token: standard claims (RFC 7519), the account's
/// revocation identifier, and any statically configured extra claims.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Claims carried by every access token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// User email
    pub email: String,
    /// Revocation identifier; must match the account's current jti
    pub jti: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Issuer
    pub iss: String,
    /// Static extra claims merged into the payload at issuance
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Claims {
    pub fn new(
        user_id: Uuid,
        email: String,
        jti: String,
        expiry_seconds: i64,
        issuer: String,
        extra: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            jti,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
            extra,
        }
    }

    /// Extract the user ID from the subject claim
    ///
    /// # Errors
    /// Returns error if the subject is not a valid UUID
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::TokenInvalid))
    }

    /// Check if the token has expired
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        self.exp < now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> Claims {
        Claims::new(
            Uuid::new_v4(),
            "test@example.com".to_string(),
            "jti-sample".to_string(),
            3600,
            "test".to_string(),
            serde_json::Map::new(),
        )
    }

    #[test]
    fn claims_carry_subject_and_jti() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(
            user_id,
            "test@example.com".to_string(),
            "abc123".to_string(),
            3600,
            "test".to_string(),
            serde_json::Map::new(),
        );

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.jti, "abc123");
        assert_eq!(claims.iss, "test");
        assert!(!claims.is_expired());
    }

    #[test]
    fn user_id_round_trips() {
        let user_id = Uuid::new_v4();
        let mut claims = sample_claims();
        claims.sub = user_id.to_string();

        assert_eq!(claims.user_id().unwrap(), user_id);
    }

    #[test]
    fn invalid_subject_is_an_error() {
        let mut claims = sample_claims();
        claims.sub = "not-a-uuid".to_string();

        assert!(claims.user_id().is_err());
    }

    #[test]
    fn extra_claims_flatten_into_payload() {
        let mut extra = serde_json::Map::new();
        extra.insert(
            "client".to_string(),
            serde_json::Value::String("web".to_string()),
        );
        let mut claims = sample_claims();
        claims.extra = extra;

        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["client"], "web");
        assert!(json.get("extra").is_none());
    }
}
