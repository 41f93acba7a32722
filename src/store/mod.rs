// src/store/mod.rs

//! Storage interface consumed by the handlers.
//!
//! `PgStore` talks to PostgreSQL through sqlx; `MemoryStore` keeps everything
//! in process and backs the integration tests.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, CommentWithAuthor, NewComment},
        forum::{Category, Tag},
        post::{NewPost, Post, PostView},
        reaction::{Reaction, ReactionAction, ReactionKind, ReactionTarget, TargetKind},
        user::{NewUser, User},
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait ForumStore: Send + Sync {
    // Users
    async fn create_user(&self, user: NewUser) -> Result<User, AppError>;
    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_provider_id(&self, provider_id: &str) -> Result<Option<User>, AppError>;

    // Categories and tags
    async fn list_categories(&self) -> Result<Vec<Category>, AppError>;
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError>;
    async fn create_category(
        &self,
        title: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError>;
    async fn list_tags(&self) -> Result<Vec<Tag>, AppError>;
    async fn find_tags(&self, ids: &[Uuid]) -> Result<Vec<Tag>, AppError>;
    async fn create_tag(&self, name: &str) -> Result<Tag, AppError>;

    // Posts
    /// Published posts, newest first, optionally limited to one category.
    async fn list_published_posts(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<PostView>, AppError>;
    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostView>, AppError>;
    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError>;
    async fn create_post(&self, post: NewPost) -> Result<Post, AppError>;

    // Comments
    /// All comments of a post with their authors, oldest first.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, AppError>;
    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError>;
    async fn create_comment(&self, comment: NewComment) -> Result<Comment, AppError>;
    /// Removes a comment and its reactions. Direct replies lose their parent.
    async fn delete_comment(&self, id: Uuid) -> Result<(), AppError>;

    // Reactions
    async fn list_reactions(
        &self,
        kind: TargetKind,
        target_ids: &[Uuid],
    ) -> Result<Vec<Reaction>, AppError>;
    /// Adds, switches or removes the user's reaction on `target` following
    /// `ReactionAction::decide`. Atomic per (target, user).
    async fn apply_reaction(
        &self,
        target: ReactionTarget,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> Result<ReactionAction, AppError>;
}
