// src/store/memory.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        comment::{Comment, CommentWithAuthor, NewComment},
        forum::{Category, CategoryRef, Tag},
        post::{NewPost, Post, PostView},
        reaction::{Reaction, ReactionAction, ReactionKind, ReactionTarget, TargetKind},
        user::{AuthorInfo, NewUser, User},
    },
    store::ForumStore,
};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    tags: Vec<Tag>,
    posts: Vec<Post>,
    post_tags: Vec<(Uuid, Uuid)>,
    comments: Vec<Comment>,
    reactions: HashMap<TargetKind, Vec<Reaction>>,
}

impl Tables {
    fn author(&self, id: Uuid) -> Result<AuthorInfo, AppError> {
        self.users
            .iter()
            .find(|u| u.id == id)
            .map(AuthorInfo::from)
            .ok_or_else(|| AppError::InternalServerError(format!("Dangling author {}", id)))
    }

    fn post_view(&self, post: &Post) -> Result<PostView, AppError> {
        let category = post
            .category_id
            .and_then(|cid| self.categories.iter().find(|c| c.id == cid))
            .map(CategoryRef::from);

        let tags = self
            .post_tags
            .iter()
            .filter(|(pid, _)| *pid == post.id)
            .filter_map(|(_, tid)| self.tags.iter().find(|t| t.id == *tid).cloned())
            .collect();

        Ok(PostView {
            id: post.id,
            slug: post.slug.clone(),
            title: post.title.clone(),
            content: post.content.clone(),
            cover_image: post.cover_image.clone(),
            created_at: post.created_at,
            author: self.author(post.author_id)?,
            category,
            tags,
        })
    }
}

/// In-process store. Every table lives behind one lock, so each call is
/// atomic with respect to the others.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ForumStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        if let Some(email) = &user.email {
            if tables.users.iter().any(|u| u.email.as_ref() == Some(email)) {
                return Err(AppError::Conflict(format!("Email '{}' already exists", email)));
            }
        }

        let created = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            provider: user.provider.as_str().to_string(),
            provider_id: user.provider_id,
            role: user.role,
            avatar_url: user.avatar_url,
            is_banned: false,
            created_at: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.email.as_deref() == Some(email))
            .cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_provider_id(&self, provider_id: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.provider_id.as_deref() == Some(provider_id))
            .cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let tables = self.tables.read().await;
        let mut list = tables.categories.clone();
        list.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(list)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.slug == slug).cloned())
    }

    async fn create_category(
        &self,
        title: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError> {
        let mut tables = self.tables.write().await;

        if tables.categories.iter().any(|c| c.slug == slug) {
            return Err(AppError::Conflict(format!("Category '{}' already exists", slug)));
        }

        let category = Category {
            id: Uuid::new_v4(),
            title: title.to_string(),
            slug: slug.to_string(),
            description: description.map(str::to_string),
            created_at: Utc::now(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let tables = self.tables.read().await;
        let mut list = tables.tags.clone();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }

    async fn find_tags(&self, ids: &[Uuid]) -> Result<Vec<Tag>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .tags
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn create_tag(&self, name: &str) -> Result<Tag, AppError> {
        let mut tables = self.tables.write().await;

        if tables.tags.iter().any(|t| t.name == name) {
            return Err(AppError::Conflict(format!("Tag '{}' already exists", name)));
        }

        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };
        tables.tags.push(tag.clone());
        Ok(tag)
    }

    async fn list_published_posts(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<PostView>, AppError> {
        let tables = self.tables.read().await;

        let mut posts: Vec<&Post> = tables
            .posts
            .iter()
            .filter(|p| p.is_published)
            .filter(|p| category_id.is_none() || p.category_id == category_id)
            .collect();
        // newest insert first on equal timestamps
        posts.reverse();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        posts.into_iter().map(|p| tables.post_view(p)).collect()
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostView>, AppError> {
        let tables = self.tables.read().await;
        tables
            .posts
            .iter()
            .find(|p| p.slug == slug)
            .map(|p| tables.post_view(p))
            .transpose()
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.posts.iter().any(|p| p.slug == slug))
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        let mut tables = self.tables.write().await;

        if tables.posts.iter().any(|p| p.slug == post.slug) {
            return Err(AppError::Conflict(format!("Slug '{}' already exists", post.slug)));
        }

        let now = Utc::now();
        let created = Post {
            id: Uuid::new_v4(),
            author_id: post.author_id,
            category_id: post.category_id,
            title: post.title,
            slug: post.slug,
            content: post.content,
            cover_image: post.cover_image,
            views: 0,
            is_published: post.is_published,
            created_at: now,
            updated_at: now,
        };

        for tag_id in post.tag_ids {
            if !tables.post_tags.contains(&(created.id, tag_id)) {
                tables.post_tags.push((created.id, tag_id));
            }
        }
        tables.posts.push(created.clone());
        Ok(created)
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, AppError> {
        let tables = self.tables.read().await;

        let mut comments: Vec<&Comment> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .collect();
        comments.sort_by_key(|c| c.created_at);

        comments
            .into_iter()
            .map(|c| {
                Ok(CommentWithAuthor {
                    comment: c.clone(),
                    author: tables.author(c.author_id)?,
                })
            })
            .collect()
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|c| c.id == id).cloned())
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, AppError> {
        let mut tables = self.tables.write().await;

        let created = Comment {
            id: Uuid::new_v4(),
            post_id: comment.post_id,
            author_id: comment.author_id,
            parent_id: comment.parent_id,
            content: comment.content,
            created_at: Utc::now(),
        };
        tables.comments.push(created.clone());
        Ok(created)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        tables.comments.retain(|c| c.id != id);
        for reply in tables.comments.iter_mut().filter(|c| c.parent_id == Some(id)) {
            reply.parent_id = None;
        }
        if let Some(rows) = tables.reactions.get_mut(&TargetKind::Comment) {
            rows.retain(|r| r.target_id != id);
        }
        Ok(())
    }

    async fn list_reactions(
        &self,
        kind: TargetKind,
        target_ids: &[Uuid],
    ) -> Result<Vec<Reaction>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .reactions
            .get(&kind)
            .map(|rows| {
                rows.iter()
                    .filter(|r| target_ids.contains(&r.target_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn apply_reaction(
        &self,
        target: ReactionTarget,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> Result<ReactionAction, AppError> {
        let mut tables = self.tables.write().await;
        let rows = tables.reactions.entry(target.kind()).or_default();

        let existing = rows
            .iter()
            .position(|r| r.target_id == target.id() && r.user_id == user_id);

        let action = ReactionAction::decide(existing.map(|i| rows[i].kind), kind);
        match (action, existing) {
            (ReactionAction::Added, _) => rows.push(Reaction {
                id: Uuid::new_v4(),
                target_id: target.id(),
                user_id,
                kind,
                created_at: Utc::now(),
            }),
            (ReactionAction::Updated, Some(i)) => {
                rows[i].kind = kind;
                rows[i].created_at = Utc::now();
            }
            (ReactionAction::Removed, Some(i)) => {
                rows.remove(i);
            }
            (_, None) => {}
        }

        Ok(action)
    }
}
