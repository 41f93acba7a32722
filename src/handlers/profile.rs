use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{error::AppError, state::DynStore, utils::{identity::require_user, jwt::Claims}};

/// Get the current user's profile.
pub async fn get_me(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(store.as_ref(), &claims).await?;
    Ok(Json(user))
}
