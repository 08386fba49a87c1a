//! # ql-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational model
//! and the `ql-core` domain models.

use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use ql_core::error::AppError;
use ql_core::models::{
    Comment, CommentEntry, FeedEntry, Follow, FollowStats, Group, Post, PostFilter, Session, User,
};
use ql_core::traits::BlogRepo;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use uuid::Uuid;

pub struct SqliteBlogRepo {
    pool: SqlitePool,
}

// Helper for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> anyhow::Result<Uuid> {
    Uuid::from_slice(blob).with_context(|| format!("malformed uuid blob of {} bytes", blob.len()))
}

fn uuid_column(row: &SqliteRow, column: &str) -> anyhow::Result<Uuid> {
    let blob: Vec<u8> = row.try_get(column)?;
    blob_to_uuid(&blob).with_context(|| format!("column {column}"))
}

fn opt_uuid_column(row: &SqliteRow, column: &str) -> anyhow::Result<Option<Uuid>> {
    let blob: Option<Vec<u8>> = row.try_get(column)?;
    blob.as_deref()
        .map(blob_to_uuid)
        .transpose()
        .with_context(|| format!("column {column}"))
}

/// Turns a unique-constraint failure into `AppError::Conflict`.
fn map_unique(err: sqlx::Error, what: &str) -> anyhow::Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return anyhow::Error::new(AppError::Conflict(what.to_string()));
        }
    }
    anyhow::Error::new(err).context(format!("insert {what}"))
}

const ENTRY_SELECT: &str = "
    SELECT p.id, p.text, p.pub_date, p.author_id, p.group_id, p.image,
           u.username AS author_username,
           u.first_name AS author_first_name,
           u.last_name AS author_last_name,
           g.title AS group_title,
           g.slug AS group_slug,
           g.description AS group_description,
           (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN post_groups g ON g.id = p.group_id";

/// SQL predicate for a feed filter and the id it binds, if any.
fn filter_clause(filter: PostFilter) -> (&'static str, Option<Uuid>) {
    match filter {
        PostFilter::All => ("1 = 1", None),
        PostFilter::Group(id) => ("p.group_id = ?", Some(id)),
        PostFilter::Author(id) => ("p.author_id = ?", Some(id)),
        PostFilter::FollowedBy(id) => (
            "p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ?)",
            Some(id),
        ),
    }
}

fn user_from_row(row: &SqliteRow) -> anyhow::Result<User> {
    Ok(User {
        id: uuid_column(row, "id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        date_joined: row.try_get("date_joined")?,
    })
}

fn group_from_row(row: &SqliteRow) -> anyhow::Result<Group> {
    Ok(Group {
        id: uuid_column(row, "id")?,
        title: row.try_get("title")?,
        slug: row.try_get("slug")?,
        description: row.try_get("description")?,
    })
}

fn post_from_row(row: &SqliteRow) -> anyhow::Result<Post> {
    Ok(Post {
        id: uuid_column(row, "id")?,
        text: row.try_get("text")?,
        pub_date: row.try_get("pub_date")?,
        author_id: uuid_column(row, "author_id")?,
        group_id: opt_uuid_column(row, "group_id")?,
        image: row.try_get("image")?,
    })
}

fn entry_from_row(row: &SqliteRow) -> anyhow::Result<FeedEntry> {
    let post = post_from_row(row)?;
    let group = match post.group_id {
        Some(id) => Some(Group {
            id,
            title: row.try_get("group_title")?,
            slug: row.try_get("group_slug")?,
            description: row.try_get("group_description")?,
        }),
        None => None,
    };
    let first: String = row.try_get("author_first_name")?;
    let last: String = row.try_get("author_last_name")?;
    let username: String = row.try_get("author_username")?;
    let full = format!("{first} {last}").trim().to_string();

    Ok(FeedEntry {
        post,
        author_name: if full.is_empty() { username.clone() } else { full },
        author_username: username,
        group,
        comment_count: row.try_get("comment_count")?,
    })
}

impl SqliteBlogRepo {
    /// Opens (creating if needed) the database and applies migrations.
    pub async fn new(url: &str) -> anyhow::Result<Self> {
        Self::connect(url, 5).await
    }

    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url {url}"))?
            .create_if_missing(true)
            .foreign_keys(true);

        // Every connection to `:memory:` is its own database, so keep exactly
        // one alive for the pool's lifetime.
        let in_memory = url.contains(":memory:");
        let mut pool_options = SqlitePoolOptions::new();
        pool_options = if in_memory {
            pool_options
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            pool_options.max_connections(max_connections.max(1))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .with_context(|| format!("connect to {url}"))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;

        log::debug!("sqlite repository ready at {url}");
        Ok(Self { pool })
    }
}

const USER_SELECT: &str =
    "SELECT id, username, password_hash, first_name, last_name, date_joined FROM users";

#[async_trait]
impl BlogRepo for SqliteBlogRepo {
    async fn create_user(&self, user: User) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, first_name, last_name, date_joined) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(user.id))
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.date_joined)
        .execute(&self.pool)
        .await
        .map_err(|e| map_unique(e, &format!("user {}", user.username)))?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE username = ?");
        let row = sqlx::query(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn create_session(&self, session: Session) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO sessions (token_hash, user_id, expires_at) VALUES (?, ?, ?)")
            .bind(&session.token_hash)
            .bind(uuid_to_blob(session.user_id))
            .bind(session.expires_at)
            .execute(&self.pool)
            .await
            .context("insert session")?;
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> anyhow::Result<Option<Session>> {
        let row = sqlx::query("SELECT token_hash, user_id, expires_at FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(Session {
                token_hash: row.try_get("token_hash")?,
                user_id: uuid_column(&row, "user_id")?,
                expires_at: row.try_get("expires_at")?,
            })),
            None => Ok(None),
        }
    }

    async fn delete_session(&self, token_hash: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_group(&self, group: Group) -> anyhow::Result<()> {
        sqlx::query("INSERT INTO post_groups (id, title, slug, description) VALUES (?, ?, ?, ?)")
            .bind(uuid_to_blob(group.id))
            .bind(&group.title)
            .bind(&group.slug)
            .bind(&group.description)
            .execute(&self.pool)
            .await
            .map_err(|e| map_unique(e, &format!("group {}", group.slug)))?;
        Ok(())
    }

    /// Retrieves a group by its slug.
    async fn get_group(&self, slug: &str) -> anyhow::Result<Option<Group>> {
        let row = sqlx::query("SELECT id, title, slug, description FROM post_groups WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(group_from_row).transpose()
    }

    async fn list_groups(&self) -> anyhow::Result<Vec<Group>> {
        let rows = sqlx::query("SELECT id, title, slug, description FROM post_groups ORDER BY title")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(group_from_row).collect()
    }

    async fn create_post(&self, post: Post) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO posts (id, text, pub_date, author_id, group_id, image) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(post.id))
        .bind(&post.text)
        .bind(post.pub_date)
        .bind(uuid_to_blob(post.author_id))
        .bind(post.group_id.map(uuid_to_blob))
        .bind(&post.image)
        .execute(&self.pool)
        .await
        .context("insert post")?;
        Ok(())
    }

    async fn update_post(&self, post: &Post) -> anyhow::Result<()> {
        let result = sqlx::query("UPDATE posts SET text = ?, group_id = ?, image = ? WHERE id = ?")
            .bind(&post.text)
            .bind(post.group_id.map(uuid_to_blob))
            .bind(&post.image)
            .bind(uuid_to_blob(post.id))
            .execute(&self.pool)
            .await
            .context("update post")?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("post", post.id).into());
        }
        Ok(())
    }

    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<Post>> {
        let row = sqlx::query(
            "SELECT id, text, pub_date, author_id, group_id, image FROM posts WHERE id = ?",
        )
        .bind(uuid_to_blob(id))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(post_from_row).transpose()
    }

    async fn get_entry(&self, id: Uuid) -> anyhow::Result<Option<FeedEntry>> {
        let sql = format!("{ENTRY_SELECT} WHERE p.id = ?");
        let row = sqlx::query(&sql)
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(entry_from_row).transpose()
    }

    async fn count_posts(&self, filter: PostFilter) -> anyhow::Result<i64> {
        let (clause, arg) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM posts p WHERE {clause}");
        let mut query = sqlx::query(&sql);
        if let Some(id) = arg {
            query = query.bind(uuid_to_blob(id));
        }
        let row = query.fetch_one(&self.pool).await?;
        Ok(row.try_get::<i64, _>(0)?)
    }

    /// Newest first; the id (UUID v7) breaks ties between equal timestamps.
    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<FeedEntry>> {
        let (clause, arg) = filter_clause(filter);
        let sql = format!(
            "{ENTRY_SELECT} WHERE {clause} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?"
        );
        let mut query = sqlx::query(&sql);
        if let Some(id) = arg {
            query = query.bind(uuid_to_blob(id));
        }
        let rows = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(entry_from_row).collect()
    }

    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO comments (id, post_id, author_id, text, created) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(comment.id))
        .bind(uuid_to_blob(comment.post_id))
        .bind(uuid_to_blob(comment.author_id))
        .bind(&comment.text)
        .bind(comment.created)
        .execute(&self.pool)
        .await
        .context("insert comment")?;
        Ok(())
    }

    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentEntry>> {
        let rows = sqlx::query(
            "SELECT c.id, c.post_id, c.author_id, c.text, c.created, u.username \
             FROM comments c JOIN users u ON u.id = c.author_id \
             WHERE c.post_id = ? ORDER BY c.created ASC, c.id ASC",
        )
        .bind(uuid_to_blob(post_id))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok::<_, anyhow::Error>(CommentEntry {
                    comment: Comment {
                        id: uuid_column(row, "id")?,
                        post_id: uuid_column(row, "post_id")?,
                        author_id: uuid_column(row, "author_id")?,
                        text: row.try_get("text")?,
                        created: row.try_get("created")?,
                    },
                    author_username: row.try_get("username")?,
                })
            })
            .collect()
    }

    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        if user_id == author_id {
            return Ok(false);
        }
        let edge = Follow {
            id: Uuid::now_v7(),
            user_id,
            author_id,
        };
        // The unique_follow constraint turns a repeat into a no-op.
        let result =
            sqlx::query("INSERT OR IGNORE INTO follows (id, user_id, author_id) VALUES (?, ?, ?)")
                .bind(uuid_to_blob(edge.id))
                .bind(uuid_to_blob(edge.user_id))
                .bind(uuid_to_blob(edge.author_id))
                .execute(&self.pool)
                .await
                .context("insert follow")?;
        Ok(result.rows_affected() == 1)
    }

    async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(uuid_to_blob(user_id))
            .bind(uuid_to_blob(author_id))
            .execute(&self.pool)
            .await
            .context("delete follow")?;
        Ok(result.rows_affected() > 0)
    }

    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT COUNT(*) FROM follows WHERE user_id = ? AND author_id = ?")
            .bind(uuid_to_blob(user_id))
            .bind(uuid_to_blob(author_id))
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get::<i64, _>(0)? > 0)
    }

    async fn follow_stats(&self, user_id: Uuid) -> anyhow::Result<FollowStats> {
        let row = sqlx::query(
            "SELECT \
               (SELECT COUNT(*) FROM follows WHERE author_id = ?) AS followers, \
               (SELECT COUNT(*) FROM follows WHERE user_id = ?) AS following",
        )
        .bind(uuid_to_blob(user_id))
        .bind(uuid_to_blob(user_id))
        .fetch_one(&self.pool)
        .await?;

        Ok(FollowStats {
            followers: row.try_get("followers")?,
            following: row.try_get("following")?,
        })
    }
}
