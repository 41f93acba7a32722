use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        forum::{CategoryDetailResponse, CreateCategoryRequest, CreateTagRequest},
        post::{CreatePostRequest, NewPost, PostDetailResponse, PostListParams, PostListResponse},
        reaction::{ReactionTally, TargetKind},
    },
    state::DynStore,
    utils::{
        html::clean_html,
        identity::{require_admin, require_user, resolve_viewer},
        jwt::Claims,
        slug::{CATEGORY_SLUG_LEN, slugify, truncate_slug, unique_post_slug},
    },
};

/// Create a new post.
/// Requires: Login. Content is sanitized and a unique slug is derived from the title.
pub async fn create_post(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let author = require_user(store.as_ref(), &claims).await?;

    let title = payload.title.trim().to_string();
    let content = clean_html(payload.content.trim());
    if title.is_empty() || content.is_empty() {
        return Err(AppError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }

    if let Some(category_id) = payload.category_id {
        let known = store
            .list_categories()
            .await?
            .iter()
            .any(|c| c.id == category_id);
        if !known {
            return Err(AppError::BadRequest("Unknown category".to_string()));
        }
    }

    let mut tag_ids = payload.tag_ids;
    tag_ids.sort();
    tag_ids.dedup();
    if store.find_tags(&tag_ids).await?.len() != tag_ids.len() {
        return Err(AppError::BadRequest("Unknown tag".to_string()));
    }

    let slug = unique_post_slug(store.as_ref(), &title).await?;

    let post = store
        .create_post(NewPost {
            author_id: author.id,
            category_id: payload.category_id,
            title,
            slug,
            content,
            cover_image: payload.cover_image,
            is_published: payload.is_published.unwrap_or(true),
            tag_ids,
        })
        .await?;

    tracing::info!("User {} created post {}", author.username, post.slug);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "id": post.id, "slug": post.slug })),
    ))
}

/// List published posts (Recent first).
/// `?category=<slug>` narrows the list to one category.
pub async fn list_posts(
    State(store): State<DynStore>,
    Query(params): Query<PostListParams>,
) -> Result<impl IntoResponse, AppError> {
    let category_id = match params.category {
        Some(slug) => Some(
            store
                .find_category_by_slug(&slug)
                .await?
                .ok_or(AppError::NotFound("Category not found".to_string()))?
                .id,
        ),
        None => None,
    };

    let posts = store.list_published_posts(category_id).await?;

    Ok(Json(PostListResponse { posts }))
}

/// Get a single post by slug, with reaction totals and the viewer's own reaction.
pub async fn get_post(
    State(store): State<DynStore>,
    claims: Option<Extension<Claims>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post = store
        .find_post_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound("Post not found".to_string()))?;

    let viewer = resolve_viewer(store.as_ref(), claims.as_ref().map(|Extension(c)| c)).await?;
    let reactions = store.list_reactions(TargetKind::Post, &[post.id]).await?;
    let summary = ReactionTally::new(&reactions, viewer).summary(&post.id);

    Ok(Json(PostDetailResponse {
        post,
        reactions: summary,
    }))
}

/// List all categories (alphabetical).
pub async fn list_categories(
    State(store): State<DynStore>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_categories().await?))
}

/// Get a category together with its published posts.
pub async fn get_category(
    State(store): State<DynStore>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let category = store
        .find_category_by_slug(&slug)
        .await?
        .ok_or(AppError::NotFound("Category not found".to_string()))?;

    let posts = store.list_published_posts(Some(category.id)).await?;

    Ok(Json(CategoryDetailResponse { category, posts }))
}

/// Create a category.
/// Admin only.
pub async fn create_category(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin = require_admin(store.as_ref(), &claims).await?;
    payload.validate()?;

    let slug = truncate_slug(
        &slugify(payload.slug.as_deref().unwrap_or(&payload.title)),
        CATEGORY_SLUG_LEN,
    );
    if slug.is_empty() {
        return Err(AppError::BadRequest("Slug must not be empty".to_string()));
    }

    let category = store
        .create_category(payload.title.trim(), &slug, payload.description.as_deref())
        .await?;
    tracing::info!("Admin {} created category {}", admin.username, category.slug);

    Ok((StatusCode::CREATED, Json(category)))
}

/// List all tags.
pub async fn list_tags(State(store): State<DynStore>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(store.list_tags().await?))
}

/// Create a tag.
/// Admin only.
pub async fn create_tag(
    State(store): State<DynStore>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTagRequest>,
) -> Result<impl IntoResponse, AppError> {
    let admin = require_admin(store.as_ref(), &claims).await?;
    payload.validate()?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Tag name must not be empty".to_string()));
    }

    let tag = store.create_tag(name).await?;
    tracing::info!("Admin {} created tag {}", admin.username, tag.name);

    Ok((StatusCode::CREATED, Json(tag)))
}

/// Looks up a post id by slug or fails with 404.
pub(crate) async fn post_id_by_slug(store: &DynStore, slug: &str) -> Result<Uuid, AppError> {
    store
        .find_post_by_slug(slug)
        .await?
        .map(|p| p.id)
        .ok_or(AppError::NotFound("Post not found".to_string()))
}
