use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::community::post_id_by_slug,
    models::{
        comment::{CommentListResponse, CreateCommentRequest, NewComment},
        reaction::{
            ReactionAction, ReactionKind, ReactionRequest, ReactionResponse, ReactionSummary,
            ReactionTally, ReactionTarget, TargetKind,
        },
    },
    state::DynStore,
    utils::{
        comment_tree::build_tree,
        identity::{require_user, resolve_viewer},
        jwt::Claims,
    },
};

/// List the comments of a post as a reply tree.
/// Each node carries like/dislike totals and the viewer's own reaction.
pub async fn list_comments(
    State(store): State<DynStore>,
    claims: Option<Extension<Claims>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post_id = post_id_by_slug(&store, &slug).await?;
    let viewer = resolve_viewer(store.as_ref(), claims.as_ref().map(|Extension(c)| c)).await?;

    let comments = store.list_comments(post_id).await?;
    let ids: Vec<Uuid> = comments.iter().map(|c| c.comment.id).collect();
    let reactions = store
        .list_reactions(TargetKind::Comment, &ids)
        .await?;

    Ok(Json(CommentListResponse {
        comments: build_tree(comments, &reactions, viewer),
        me: viewer,
    }))
}

/// Create a new comment, optionally as a reply.
/// The parent must already exist on the same post.
pub async fn create_comment(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let author = require_user(store.as_ref(), &claims).await?;

    let content = payload.content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::BadRequest("Comment must not be empty".to_string()));
    }

    let post_id = post_id_by_slug(&store, &slug).await?;

    if let Some(parent_id) = payload.parent_id {
        let parent = store.find_comment(parent_id).await?;
        if parent.is_none_or(|p| p.post_id != post_id) {
            return Err(AppError::BadRequest("Invalid parent_id".to_string()));
        }
    }

    let comment = store
        .create_comment(NewComment {
            post_id,
            author_id: author.id,
            parent_id: payload.parent_id,
            content,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "success": true, "comment": comment })),
    ))
}

/// Delete a comment.
/// Requires: Login + (Author OR Admin). Replies stay, promoted to roots.
pub async fn delete_comment(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(store.as_ref(), &claims).await?;

    let comment = store
        .find_comment(comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    if comment.author_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "You are not allowed to delete this comment".to_string(),
        ));
    }

    store.delete_comment(comment_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn summarize(
    store: &DynStore,
    target: ReactionTarget,
    viewer: Uuid,
) -> Result<ReactionSummary, AppError> {
    let reactions = store.list_reactions(target.kind(), &[target.id()]).await?;
    Ok(ReactionTally::new(&reactions, Some(viewer)).summary(&target.id()))
}

/// React to a post. Anything other than `"dislike"` counts as a like.
pub async fn react_to_post(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(store.as_ref(), &claims).await?;
    let target = ReactionTarget::Post(post_id_by_slug(&store, &slug).await?);

    // missing or malformed bodies fall back to a like
    let payload = serde_json::from_slice::<ReactionRequest>(&body).ok();
    let kind = match payload.and_then(|p| p.kind).as_deref() {
        Some("dislike") => ReactionKind::Dislike,
        _ => ReactionKind::Like,
    };

    let action = store.apply_reaction(target, user.id, kind).await?;
    let summary = summarize(&store, target, user.id).await?;

    Ok(Json(ReactionResponse {
        action,
        kind,
        summary,
    }))
}

/// React to a comment. The body must name `like` or `dislike`.
pub async fn react_to_comment(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<Uuid>,
    Json(payload): Json<ReactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(store.as_ref(), &claims).await?;

    let kind = payload
        .kind
        .as_deref()
        .unwrap_or_default()
        .parse::<ReactionKind>()
        .map_err(AppError::BadRequest)?;

    store
        .find_comment(comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    let target = ReactionTarget::Comment(comment_id);
    let action = store.apply_reaction(target, user.id, kind).await?;
    let summary = summarize(&store, target, user.id).await?;

    Ok(Json(ReactionResponse {
        action,
        kind,
        summary,
    }))
}

/// Toggle Like on a post.
pub async fn toggle_post_like(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(store.as_ref(), &claims).await?;
    let target = ReactionTarget::Post(post_id_by_slug(&store, &slug).await?);

    let action = store.apply_reaction(target, user.id, ReactionKind::Like).await?;

    Ok(Json(serde_json::json!({ "liked": action != ReactionAction::Removed })))
}

/// Toggle Like on a comment.
pub async fn toggle_comment_like(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Path(comment_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let user = require_user(store.as_ref(), &claims).await?;

    store
        .find_comment(comment_id)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;

    let action = store
        .apply_reaction(ReactionTarget::Comment(comment_id), user.id, ReactionKind::Like)
        .await?;

    Ok(Json(serde_json::json!({ "liked": action != ReactionAction::Removed })))
}
