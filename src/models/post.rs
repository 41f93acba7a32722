use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use url::Url;
use uuid::Uuid;
use validator::Validate;

use crate::models::{
    forum::{CategoryRef, Tag},
    reaction::ReactionSummary,
    user::AuthorInfo,
};

/// Represents the 'posts' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub views: i32,
    pub is_published: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Data needed to insert a post row and its tag links.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: Uuid,
    pub category_id: Option<Uuid>,
    pub title: String,
    pub slug: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub is_published: bool,
    pub tag_ids: Vec<Uuid>,
}

/// A post with its author, category and tags resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostView {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub cover_image: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub author: AuthorInfo,
    pub category: Option<CategoryRef>,
    pub tags: Vec<Tag>,
}

/// Single post page: the post plus its reaction summary for the viewer.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostDetailResponse {
    pub post: PostView,
    pub reactions: ReactionSummary,
}

/// DTO for creating a new post.
#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(
        max = 200,
        message = "Title must be at most 200 chars"
    ))]
    pub title: String,

    #[validate(length(
        max = 100000,
        message = "Content must be at most 100000 chars"
    ))]
    pub content: String,

    pub category_id: Option<Uuid>,

    #[serde(default)]
    pub tag_ids: Vec<Uuid>,

    #[validate(length(max = 500), custom(function = validate_url_string))]
    pub cover_image: Option<String>,

    /// Defaults to published.
    pub is_published: Option<bool>,
}

/// Validates that a string is a correctly formatted URL.
fn validate_url_string(url: &str) -> Result<(), validator::ValidationError> {
    if Url::parse(url).is_err() {
        return Err(validator::ValidationError::new("invalid_url"));
    }
    Ok(())
}

/// Query parameters for listing posts.
#[derive(Debug, Deserialize)]
pub struct PostListParams {
    /// Only posts in the category with this slug.
    pub category: Option<String>,
}

/// Response body of the post listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct PostListResponse {
    pub posts: Vec<PostView>,
}

