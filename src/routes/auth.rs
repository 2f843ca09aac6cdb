/// Authentication routes
///
/// Registration, login, logout-all, password change, and current user.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{
    authenticate, create_account, find_account, hash_password, rotate_jti, update_password,
    verify_password, Claims, TokenIssuer,
};
use crate::error::{AppError, AuthError};
use crate::validators::{is_valid_email, is_valid_name};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Response carrying a freshly issued access token
#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// POST /auth/register
///
/// Create an account and sign the new user in: the response carries an
/// access token, as a successful login would.
///
/// # Errors
/// - 400: invalid email, name, or password strength
/// - 409: email already registered
/// - 500: internal server error
pub async fn register(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let email = is_valid_email(&form.email)?;
    let name = is_valid_name(&form.name)?;
    let password_hash = hash_password(&form.password)?;

    let account = create_account(pool.get_ref(), &email, &name, &password_hash).await?;
    let token = issuer.issue(&account)?;

    tracing::info!(user_id = %account.id, "User registered");

    Ok(HttpResponse::Created().json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: issuer.access_token_expiry(),
    }))
}

/// POST /auth/login
///
/// Authenticate with email and password, returning an access token.
///
/// Unknown email and wrong password produce the same 401 body, so the
/// endpoint cannot be used to enumerate accounts.
///
/// # Errors
/// - 401: invalid credentials
/// - 500: internal server error
pub async fn login(
    form: web::Json<LoginRequest>,
    pool: web::Data<PgPool>,
    issuer: web::Data<TokenIssuer>,
) -> Result<HttpResponse, AppError> {
    let email = match is_valid_email(&form.email) {
        Ok(email) => email,
        // A malformed email cannot belong to an account; answer as if unknown
        Err(_) => return Err(AppError::Auth(AuthError::AccountNotFound)),
    };

    let account = authenticate(pool.get_ref(), &email, &form.password).await?;
    let token = issuer.issue(&account)?;

    tracing::info!(user_id = %account.id, "User logged in");

    Ok(HttpResponse::Ok().json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: issuer.access_token_expiry(),
    }))
}

/// POST /auth/logout
///
/// Logout-all: rotates the caller's jti so every outstanding token,
/// including the one used for this request, stops validating.
///
/// # Errors
/// - 401: missing, invalid, or revoked token (middleware)
/// - 500: internal server error
pub async fn logout(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    rotate_jti(pool.get_ref(), user_id).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// POST /auth/password
///
/// Change the caller's password. The stored jti rotates in the same
/// update, so all outstanding tokens are revoked; the client must log in
/// again with the new password.
///
/// # Errors
/// - 400: new password fails strength validation
/// - 401: wrong current password, or token problems (middleware)
/// - 500: internal server error
pub async fn change_password(
    claims: web::ReqData<Claims>,
    form: web::Json<ChangePasswordRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let account = find_account(pool.get_ref(), user_id).await?;

    if !verify_password(&form.current_password, &account.password_hash)? {
        tracing::warn!(user_id = %user_id, "Password change with wrong current password");
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let password_hash = hash_password(&form.new_password)?;
    update_password(pool.get_ref(), user_id, &password_hash).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// GET /auth/me
///
/// Current authenticated user's profile. Claims are injected by the JWT
/// middleware, which has already checked signature, expiry, and jti.
///
/// # Errors
/// - 401: missing, invalid, or revoked token (middleware)
/// - 500: internal server error
pub async fn get_current_user(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;
    let account = find_account(pool.get_ref(), user_id).await?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: account.id.to_string(),
        email: account.email,
        name: account.name,
    }))
}
