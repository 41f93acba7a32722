// src/utils/identity.rs

use uuid::Uuid;

use crate::{error::AppError, models::user::User, store::ForumStore, utils::jwt::Claims};

/// Resolves token claims to a stored user.
///
/// Lookup order: the subject as an internal UUID, then the subject as a
/// federated provider id, then the token's email.
pub async fn resolve_user(store: &dyn ForumStore, claims: &Claims) -> Result<Option<User>, AppError> {
    if let Ok(id) = claims.sub.parse::<Uuid>() {
        if let Some(user) = store.find_user_by_id(id).await? {
            return Ok(Some(user));
        }
    }

    if let Some(user) = store.find_user_by_provider_id(&claims.sub).await? {
        return Ok(Some(user));
    }

    if let Some(email) = &claims.email {
        return store.find_user_by_email(&email.to_lowercase()).await;
    }

    Ok(None)
}

/// Viewer id for read endpoints. Unknown or missing identities read as
/// anonymous.
pub async fn resolve_viewer(
    store: &dyn ForumStore,
    claims: Option<&Claims>,
) -> Result<Option<Uuid>, AppError> {
    match claims {
        Some(claims) => Ok(resolve_user(store, claims).await?.map(|u| u.id)),
        None => Ok(None),
    }
}

/// Acting user for write endpoints. Fails with 401 when the token does not
/// map to a user, and for banned accounts.
pub async fn require_user(store: &dyn ForumStore, claims: &Claims) -> Result<User, AppError> {
    let user = resolve_user(store, claims)
        .await?
        .ok_or(AppError::AuthError("User not found".to_string()))?;

    if user.is_banned {
        return Err(AppError::AuthError("Account is banned".to_string()));
    }

    Ok(user)
}

/// Acting user for admin writes. The stored role decides, so a demoted or
/// banned admin loses access before their token expires.
pub async fn require_admin(store: &dyn ForumStore, claims: &Claims) -> Result<User, AppError> {
    let user = require_user(store, claims).await?;

    if !user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(user)
}
