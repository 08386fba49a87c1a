//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{
    Comment, CommentEntry, FeedEntry, FollowStats, Group, Post, PostFilter, Session, User,
};

/// Data persistence contract for users, groups, posts, comments and follows.
///
/// Inserts that violate a uniqueness rule fail with an `AppError::Conflict`
/// inside the `anyhow::Error`, so callers can `downcast_ref` it.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait BlogRepo: Send + Sync {
    // User Operations
    async fn create_user(&self, user: User) -> anyhow::Result<()>;
    async fn get_user(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> anyhow::Result<Option<User>>;

    // Session Operations
    async fn create_session(&self, session: Session) -> anyhow::Result<()>;
    async fn get_session(&self, token_hash: &str) -> anyhow::Result<Option<Session>>;
    async fn delete_session(&self, token_hash: &str) -> anyhow::Result<()>;

    // Group Operations
    async fn create_group(&self, group: Group) -> anyhow::Result<()>;
    async fn get_group(&self, slug: &str) -> anyhow::Result<Option<Group>>;
    async fn list_groups(&self) -> anyhow::Result<Vec<Group>>;

    // Post Operations
    async fn create_post(&self, post: Post) -> anyhow::Result<()>;
    /// Overwrites text, group and image. Author and date never change.
    async fn update_post(&self, post: &Post) -> anyhow::Result<()>;
    async fn get_post(&self, id: Uuid) -> anyhow::Result<Option<Post>>;
    async fn get_entry(&self, id: Uuid) -> anyhow::Result<Option<FeedEntry>>;
    async fn count_posts(&self, filter: PostFilter) -> anyhow::Result<i64>;
    /// Newest first.
    async fn list_posts(
        &self,
        filter: PostFilter,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<FeedEntry>>;

    // Comment Operations
    async fn create_comment(&self, comment: Comment) -> anyhow::Result<()>;
    /// Oldest first.
    async fn list_comments(&self, post_id: Uuid) -> anyhow::Result<Vec<CommentEntry>>;

    // Follow Operations
    /// Get-or-create. Returns true when a new edge was inserted.
    async fn follow(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool>;
    /// Returns true when an edge was removed.
    async fn unfollow(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool>;
    async fn is_following(&self, user_id: Uuid, author_id: Uuid) -> anyhow::Result<bool>;
    async fn follow_stats(&self, user_id: Uuid) -> anyhow::Result<FollowStats>;
}

/// Media storage contract for handling uploads and thumbnails.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Rejects bytes that do not decode as an image.
    fn check_image(&self, data: &[u8]) -> crate::Result<()>;
    /// Saves raw bytes and returns a media_id for the Post model.
    async fn save_upload(&self, data: Vec<u8>, filename: &str) -> anyhow::Result<String>;
    /// Returns the URL or path to the original media.
    async fn get_url(&self, media_id: &str) -> String;
    /// Returns the URL or path to the thumbnail.
    async fn get_thumbnail_url(&self, media_id: &str) -> String;
}

/// Password and session-token contract.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Produces a PHC string suitable for `User::password_hash`.
    fn hash_password(&self, password: &str) -> anyhow::Result<String>;

    /// Fails with `AppError::Unauthorized` on mismatch.
    async fn verify_password(&self, password: &str, hash: &str) -> crate::Result<()>;

    /// A fresh random token to hand to the browser.
    fn new_session_token(&self) -> anyhow::Result<String>;

    /// The value stored server-side for a browser token.
    fn digest_token(&self, token: &str) -> String;
}
