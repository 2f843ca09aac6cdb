/// JWT authentication middleware
///
/// Validates the bearer token from the Authorization header, then checks
/// that the token's jti still matches the account's stored jti. The
/// revocation check runs on every request so a rotation takes effect
/// immediately. Valid claims are injected into request extensions for
/// route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use sqlx::PgPool;
use std::rc::Rc;

use crate::auth::{is_token_current, validate_access_token};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Middleware guarding routes that require authentication
pub struct JwtMiddleware {
    pool: PgPool,
    jwt_config: JwtSettings,
}

impl JwtMiddleware {
    pub fn new(pool: PgPool, jwt_config: JwtSettings) -> Self {
        Self { pool, jwt_config }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            pool: self.pool.clone(),
            jwt_config: self.jwt_config.clone(),
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    pool: PgPool,
    jwt_config: JwtSettings,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        let service = self.service.clone();
        let pool = self.pool.clone();
        let jwt_config = self.jwt_config.clone();

        Box::pin(async move {
            let token = match bearer {
                Some(token) => token,
                None => {
                    tracing::warn!("Missing or malformed Authorization header");
                    return Err(AppError::Auth(AuthError::MissingToken).into());
                }
            };

            let claims = validate_access_token(&token, &jwt_config)?;

            if !is_token_current(&pool, &claims).await? {
                tracing::warn!(user_id = %claims.sub, "Rejected token with stale jti");
                return Err(AppError::Auth(AuthError::TokenRevoked).into());
            }

            tracing::debug!(
                user_id = %claims.sub,
                email = %claims.email,
                "JWT validated and current"
            );
            req.extensions_mut().insert(claims);

            service.call(req).await
        })
    }
}
