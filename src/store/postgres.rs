// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{FromRow, PgPool};
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

const USER_COLUMNS: &str = r#"
    id, username, email, password_hash, provider, provider_id,
    role, avatar_url, is_banned, created_at
"#;

const POST_VIEW_SELECT: &str = r#"
    SELECT
        p.id, p.slug, p.title, p.content, p.cover_image, p.created_at,
        u.id AS author_id, u.username AS author_username, u.avatar_url AS author_avatar_url,
        c.id AS category_id, c.title AS category_title
    FROM posts p
    JOIN users u ON p.author_id = u.id
    LEFT JOIN categories c ON p.category_id = c.id
"#;

/// Helper struct for the post/author/category join.
#[derive(FromRow)]
struct PostViewRow {
    id: Uuid,
    slug: String,
    title: String,
    content: String,
    cover_image: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    author_id: Uuid,
    author_username: String,
    author_avatar_url: Option<String>,
    category_id: Option<Uuid>,
    category_title: Option<String>,
}

#[derive(FromRow)]
struct PostTagRow {
    post_id: Uuid,
    id: Uuid,
    name: String,
}

#[derive(FromRow)]
struct CommentRow {
    id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    parent_id: Option<Uuid>,
    content: String,
    created_at: chrono::DateTime<chrono::Utc>,
    author_username: String,
    author_avatar_url: Option<String>,
}

#[derive(FromRow)]
struct ReactionRow {
    id: Uuid,
    target_id: Uuid,
    user_id: Uuid,
    kind: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<ReactionRow> for Reaction {
    type Error = AppError;

    fn try_from(row: ReactionRow) -> Result<Self, Self::Error> {
        Ok(Reaction {
            id: row.id,
            target_id: row.target_id,
            user_id: row.user_id,
            kind: row.kind.parse().map_err(AppError::InternalServerError)?,
            created_at: row.created_at,
        })
    }
}

/// (table, target column) for each reaction target.
fn reaction_table(kind: TargetKind) -> (&'static str, &'static str) {
    match kind {
        TargetKind::Post => ("post_reactions", "post_id"),
        TargetKind::Comment => ("comment_reactions", "comment_id"),
    }
}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn find_user_where(&self, column: &str, value: &str) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Attaches tags to joined post rows, keeping row order.
    async fn assemble_posts(&self, rows: Vec<PostViewRow>) -> Result<Vec<PostView>, AppError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

        let tag_rows = sqlx::query_as::<_, PostTagRow>(
            r#"
            SELECT pt.post_id, t.id, t.name
            FROM post_tags pt
            JOIN tags t ON pt.tag_id = t.id
            WHERE pt.post_id = ANY($1)
            ORDER BY t.name ASC
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        let mut tags_by_post: HashMap<Uuid, Vec<Tag>> = HashMap::new();
        for row in tag_rows {
            tags_by_post.entry(row.post_id).or_default().push(Tag {
                id: row.id,
                name: row.name,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| PostView {
                tags: tags_by_post.remove(&row.id).unwrap_or_default(),
                category: match (row.category_id, row.category_title) {
                    (Some(id), Some(title)) => Some(CategoryRef { id, title }),
                    _ => None,
                },
                author: AuthorInfo {
                    id: row.author_id,
                    username: row.author_username,
                    avatar_url: row.author_avatar_url,
                },
                id: row.id,
                slug: row.slug,
                title: row.title,
                content: row.content,
                cover_image: row.cover_image,
                created_at: row.created_at,
            })
            .collect())
    }
}

#[async_trait]
impl ForumStore for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            r#"
            INSERT INTO users (username, email, password_hash, provider, provider_id, role, avatar_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.provider.as_str())
            .bind(&user.provider_id)
            .bind(&user.role)
            .bind(&user.avatar_url)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Conflict(_) => {
                    AppError::Conflict(format!("Username '{}' or email already exists", user.username))
                }
                other => {
                    tracing::error!("Failed to create user: {:?}", other);
                    other
                }
            })?;

        Ok(created)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.find_user_where("email", email).await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        self.find_user_where("username", username).await
    }

    async fn find_user_by_provider_id(&self, provider_id: &str) -> Result<Option<User>, AppError> {
        self.find_user_where("provider_id", provider_id).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        let list = sqlx::query_as::<_, Category>(
            "SELECT id, title, slug, description, created_at FROM categories ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(list)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, AppError> {
        let category = sqlx::query_as::<_, Category>(
            "SELECT id, title, slug, description, created_at FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    async fn create_category(
        &self,
        title: &str,
        slug: &str,
        description: Option<&str>,
    ) -> Result<Category, AppError> {
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (title, slug, description)
            VALUES ($1, $2, $3)
            RETURNING id, title, slug, description, created_at
            "#,
        )
        .bind(title)
        .bind(slug)
        .bind(description)
        .fetch_one(&self.pool)
        .await?;
        Ok(category)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, AppError> {
        let list = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags ORDER BY name ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(list)
    }

    async fn find_tags(&self, ids: &[Uuid]) -> Result<Vec<Tag>, AppError> {
        let list = sqlx::query_as::<_, Tag>("SELECT id, name FROM tags WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        Ok(list)
    }

    async fn create_tag(&self, name: &str) -> Result<Tag, AppError> {
        let tag = sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES ($1) RETURNING id, name")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(tag)
    }

    async fn list_published_posts(
        &self,
        category_id: Option<Uuid>,
    ) -> Result<Vec<PostView>, AppError> {
        let sql = format!(
            r#"
            {}
            WHERE p.is_published = TRUE
              AND ($1::UUID IS NULL OR p.category_id = $1)
            ORDER BY p.created_at DESC
            "#,
            POST_VIEW_SELECT
        );

        let rows = sqlx::query_as::<_, PostViewRow>(&sql)
            .bind(category_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to list posts: {:?}", e);
                AppError::InternalServerError(e.to_string())
            })?;

        self.assemble_posts(rows).await
    }

    async fn find_post_by_slug(&self, slug: &str) -> Result<Option<PostView>, AppError> {
        let sql = format!("{} WHERE p.slug = $1", POST_VIEW_SELECT);

        let row = sqlx::query_as::<_, PostViewRow>(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(self.assemble_posts(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn slug_exists(&self, slug: &str) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE slug = $1)")
            .bind(slug)
            .fetch_one(&self.pool)
            .await?;
        Ok(exists)
    }

    async fn create_post(&self, post: NewPost) -> Result<Post, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (author_id, category_id, title, slug, content, cover_image, is_published)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, author_id, category_id, title, slug, content, cover_image,
                      views, is_published, created_at, updated_at
            "#,
        )
        .bind(post.author_id)
        .bind(post.category_id)
        .bind(&post.title)
        .bind(&post.slug)
        .bind(&post.content)
        .bind(&post.cover_image)
        .bind(post.is_published)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create post: {:?}", e);
            AppError::from(e)
        })?;

        if !post.tag_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO post_tags (post_id, tag_id)
                SELECT $1, UNNEST($2::UUID[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(created.id)
            .bind(&post.tag_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(created)
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<CommentWithAuthor>, AppError> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT
                c.id, c.post_id, c.author_id, c.parent_id, c.content, c.created_at,
                u.username AS author_username, u.avatar_url AS author_avatar_url
            FROM comments c
            JOIN users u ON c.author_id = u.id
            WHERE c.post_id = $1
            ORDER BY c.created_at ASC, c.id ASC
            "#,
        )
        .bind(post_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CommentWithAuthor {
                author: AuthorInfo {
                    id: row.author_id,
                    username: row.author_username,
                    avatar_url: row.author_avatar_url,
                },
                comment: Comment {
                    id: row.id,
                    post_id: row.post_id,
                    author_id: row.author_id,
                    parent_id: row.parent_id,
                    content: row.content,
                    created_at: row.created_at,
                },
            })
            .collect())
    }

    async fn find_comment(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, author_id, parent_id, content, created_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(comment)
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Comment, AppError> {
        let created = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (post_id, author_id, parent_id, content)
            VALUES ($1, $2, $3, $4)
            RETURNING id, post_id, author_id, parent_id, content, created_at
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(comment.parent_id)
        .bind(&comment.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create comment: {:?}", e);
            AppError::from(e)
        })?;
        Ok(created)
    }

    async fn delete_comment(&self, id: Uuid) -> Result<(), AppError> {
        // replies are detached by ON DELETE SET NULL, reactions cascade
        sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_reactions(
        &self,
        kind: TargetKind,
        target_ids: &[Uuid],
    ) -> Result<Vec<Reaction>, AppError> {
        if target_ids.is_empty() {
            return Ok(Vec::new());
        }

        let (table, column) = reaction_table(kind);
        let sql = format!(
            "SELECT id, {column} AS target_id, user_id, kind, created_at FROM {table} WHERE {column} = ANY($1)"
        );

        let rows = sqlx::query_as::<_, ReactionRow>(&sql)
            .bind(target_ids)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(Reaction::try_from).collect()
    }

    async fn apply_reaction(
        &self,
        target: ReactionTarget,
        user_id: Uuid,
        kind: ReactionKind,
    ) -> Result<ReactionAction, AppError> {
        let (table, column) = reaction_table(target.kind());
        let mut tx = self.pool.begin().await?;

        // A first reaction has no row to lock. If a concurrent request
        // inserts it first, ON CONFLICT waits for that commit and the
        // decision is taken again against the now visible row.
        let mut attempts = 0;
        let action = loop {
            attempts += 1;

            let existing: Option<(Uuid, String)> = sqlx::query_as(&format!(
                "SELECT id, kind FROM {table} WHERE {column} = $1 AND user_id = $2 FOR UPDATE"
            ))
            .bind(target.id())
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

            let existing_kind = existing
                .as_ref()
                .map(|(_, k)| k.parse::<ReactionKind>())
                .transpose()
                .map_err(AppError::InternalServerError)?;

            let action = ReactionAction::decide(existing_kind, kind);
            match (action, existing) {
                (ReactionAction::Added, _) => {
                    let inserted: Option<(Uuid,)> = sqlx::query_as(&format!(
                        "INSERT INTO {table} ({column}, user_id, kind) VALUES ($1, $2, $3)
                         ON CONFLICT ({column}, user_id) DO NOTHING
                         RETURNING id"
                    ))
                    .bind(target.id())
                    .bind(user_id)
                    .bind(kind.as_str())
                    .fetch_optional(&mut *tx)
                    .await?;

                    if inserted.is_none() {
                        if attempts >= 3 {
                            return Err(AppError::Conflict(
                                "Reaction changed concurrently, try again".to_string(),
                            ));
                        }
                        tracing::debug!("Reaction row appeared concurrently, re-deciding");
                        continue;
                    }
                }
                (ReactionAction::Updated, Some((id, _))) => {
                    sqlx::query(&format!(
                        "UPDATE {table} SET kind = $1, created_at = NOW() WHERE id = $2"
                    ))
                    .bind(kind.as_str())
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                }
                (ReactionAction::Removed, Some((id, _))) => {
                    sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
                (_, None) => {}
            }

            break action;
        };

        tx.commit().await?;

        Ok(action)
    }
}
