use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::{reaction::ReactionSummary, user::AuthorInfo};

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    /// Self-reference for threaded replies. `None` means a root comment.
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A comment joined with its author, as fetched for one post.
#[derive(Debug, Clone)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author: AuthorInfo,
}

/// Read-side projection of a comment: reaction aggregates, the viewer's own
/// reaction and nested replies. Built per request, never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    pub id: Uuid,
    pub post_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub author: AuthorInfo,

    #[serde(flatten)]
    pub reactions: ReactionSummary,

    pub replies: Vec<CommentNode>,
}

/// Data needed to insert a comment row.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
}

/// DTO for creating a new comment.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[validate(length(
        max = 5000,
        message = "Comment must be at most 5000 characters"
    ))]
    pub content: String,

    /// Optional: the ID of the comment being replied to.
    pub parent_id: Option<Uuid>,
}

/// Response body of the comment listing.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentNode>,
    /// Resolved viewer id, `null` for anonymous requests.
    pub me: Option<Uuid>,
}
