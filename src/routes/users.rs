/// User Routes

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::{require_self_or_role, Identity, Role};
use crate::error::{AppError, StorageError};
use crate::store::{UserRecord, UserStore};

/// Public view of a stored user. Never carries the password hash or tokens.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user_id: String,
    pub first_name: String,
    pub last_name: String,
    pub email_address: String,
    pub phone_number: String,
    pub user_type: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&UserRecord> for UserResponse {
    fn from(user: &UserRecord) -> Self {
        Self {
            user_id: user.user_id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email_address: user.email_address.clone(),
            phone_number: user.phone_number.clone(),
            user_type: user.user_type,
            created_at: user.created_at.to_rfc3339(),
            updated_at: user.updated_at.to_rfc3339(),
        }
    }
}

/// GET /users/{user_id}
///
/// Users may fetch only themselves; admins may fetch anyone.
///
/// # Errors
/// - 401: Missing or invalid token (auth guard)
/// - 403: Caller is neither the owner nor an admin
/// - 404: No such user
pub async fn get_user(
    path: web::Path<String>,
    identity: web::ReqData<Identity>,
    store: web::Data<dyn UserStore>,
) -> Result<HttpResponse, AppError> {
    let user_id = path.into_inner();

    require_self_or_role(&identity, &user_id, Role::Admin)?;

    let user = store
        .find_by_id(&user_id)
        .await?
        .ok_or_else(|| StorageError::NotFound(format!("user {}", user_id)))?;

    Ok(HttpResponse::Ok().json(UserResponse::from(&user)))
}
