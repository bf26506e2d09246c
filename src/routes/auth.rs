/// Authentication Routes
///
/// Registration, login, refresh-token redemption, and the caller's own
/// identity context.

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::{
    issue_tokens, record_issued_tokens, validate_refresh_token, Identity, Role, TokenPair,
    ACCESS_TOKEN_TTL_HOURS,
};
use crate::configuration::AuthConfig;
use crate::error::{AppError, AuthError, DuplicateIdentity, ErrorContext, StorageError};
use crate::routes::UserResponse;
use crate::store::{NewUser, UserStore};
use crate::validators::{
    is_valid_email, is_valid_name, is_valid_password, is_valid_phone, is_valid_role,
};

/// User registration request
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub password: String,
    pub phone_number: String,
    /// `ADMIN` or `USER`; defaults to `USER`
    pub user_type: Option<String>,
}

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email_address: String,
    pub password: String,
}

/// Refresh-token redemption request. `user_id` must match the token's subject.
#[derive(Deserialize)]
pub struct RefreshRequest {
    pub user_id: String,
    pub refresh_token: String,
}

/// Issued token pair
#[derive(Serialize)]
pub struct AuthResponse {
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

impl AuthResponse {
    fn new(user_id: String, tokens: TokenPair) -> Self {
        Self {
            user_id,
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            token_type: "Bearer".to_string(),
            expires_in: ACCESS_TOKEN_TTL_HOURS * 3600,
        }
    }
}

/// Login response: the stored user plus the freshly issued pair
#[derive(Serialize)]
pub struct LoginResponse {
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: AuthResponse,
}

/// POST /auth/register
///
/// # Errors
/// - 400: Validation errors
/// - 409: Email or phone number already registered. Nothing is inserted.
/// - 500: Hashing or store failure
pub async fn register(
    form: web::Json<RegisterRequest>,
    store: web::Data<dyn UserStore>,
    auth: web::Data<AuthConfig>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let email_address = is_valid_email(&form.email_address)?;
    let first_name = is_valid_name("first_name", &form.first_name)?;
    let last_name = is_valid_name("last_name", &form.last_name)?;
    let phone_number = is_valid_phone(&form.phone_number)?;
    is_valid_password(&form.password)?;
    let user_type = match form.user_type.as_deref() {
        Some(user_type) => is_valid_role(user_type)?,
        None => Role::User,
    };

    if store.count_by_email(&email_address).await? > 0 {
        return Err(DuplicateIdentity::Email.into());
    }
    if store.count_by_phone(&phone_number).await? > 0 {
        return Err(DuplicateIdentity::Phone.into());
    }

    let password_hash = auth.hasher().hash(&form.password)?;
    let now = Utc::now();

    let user_id = store
        .insert(NewUser {
            first_name: first_name.clone(),
            last_name: last_name.clone(),
            email_address: email_address.clone(),
            phone_number,
            password_hash,
            user_type,
            created_at: now,
        })
        .await?;

    let identity = Identity {
        email_address,
        first_name,
        last_name,
        user_type,
        user_id: user_id.clone(),
    };
    let tokens = issue_tokens(auth.keys(), &identity, now)?;
    record_issued_tokens(store.get_ref(), &user_id, &tokens, now).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        user_type = %user_type,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(AuthResponse::new(user_id, tokens)))
}

/// POST /auth/login
///
/// Unknown email and wrong password get the same answer and no tokens.
///
/// # Errors
/// - 400: Malformed email
/// - 401: Email or password is incorrect
/// - 500: Store failure
pub async fn login(
    form: web::Json<LoginRequest>,
    store: web::Data<dyn UserStore>,
    auth: web::Data<AuthConfig>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let email_address = is_valid_email(&form.email_address)?;

    let user = store
        .find_by_email(&email_address)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !auth.hasher().verify(&user.password_hash, &form.password) {
        return Err(AuthError::InvalidCredentials.into());
    }

    let now = Utc::now();
    let tokens = issue_tokens(auth.keys(), &user.identity(), now)?;
    record_issued_tokens(store.get_ref(), &user.user_id, &tokens, now).await?;

    let user = store
        .find_by_id(&user.user_id)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("user {}", user.user_id)))?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.user_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        user: UserResponse::from(&user),
        tokens: AuthResponse::new(user.user_id.clone(), tokens),
    }))
}

/// POST /auth/refresh
///
/// The refresh token must validate, must name `user_id` as its subject, and
/// must equal the pair currently stored for that user. A new pair replaces it.
///
/// # Errors
/// - 401: Invalid or expired refresh token, one issued to another user, or
///   one that is no longer current
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    store: web::Data<dyn UserStore>,
    auth: web::Data<AuthConfig>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh").with_user_id(&form.user_id);
    let now = Utc::now();

    let claims = validate_refresh_token(auth.keys(), &form.refresh_token, now.timestamp())?;
    if claims.user_id != form.user_id {
        return Err(AuthError::StaleRefreshToken.into());
    }

    let user = match store.find_by_id(&claims.user_id).await? {
        Some(user) if user.refresh_token.as_deref() == Some(form.refresh_token.as_str()) => user,
        _ => return Err(AuthError::StaleRefreshToken.into()),
    };

    let tokens = issue_tokens(auth.keys(), &user.identity(), now)?;
    record_issued_tokens(store.get_ref(), &user.user_id, &tokens, now).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user.user_id,
        "Token pair refreshed"
    );

    Ok(HttpResponse::Ok().json(AuthResponse::new(user.user_id, tokens)))
}

/// GET /auth/me
///
/// Echoes the identity context the auth guard attached.
pub async fn current_identity(identity: web::ReqData<Identity>) -> HttpResponse {
    HttpResponse::Ok().json(identity.into_inner())
}
