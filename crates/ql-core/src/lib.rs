//! quill/crates/ql-core/src/lib.rs
//!
//! The central domain logic and interface definitions for Quill.

pub mod error;
pub mod forms;
pub mod models;
pub mod pagination;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use pagination::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::models::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn user(first: &str, last: &str) -> User {
        User {
            id: Uuid::now_v7(),
            username: "leo".to_string(),
            password_hash: String::new(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            date_joined: Utc::now(),
        }
    }

    #[test]
    fn test_post_creation_v7() {
        let id = Uuid::now_v7();
        let post = Post {
            id,
            text: "Hello Rust! This is longer than fifteen".to_string(),
            pub_date: Utc::now(),
            author_id: Uuid::now_v7(),
            group_id: None,
            image: None,
        };
        assert_eq!(post.id, id);
        assert_eq!(post.excerpt(), "Hello Rust! Thi");
    }

    #[test]
    fn display_name_falls_back_to_username() {
        assert_eq!(user("", "").display_name(), "leo");
        assert_eq!(user("Leo", "Tolstoy").display_name(), "Leo Tolstoy");
    }

    #[test]
    fn linebreaks_escape_then_break() {
        assert_eq!(linebreaks("<b>hi\nthere"), "&lt;b&gt;hi<br />there");
    }

    #[test]
    fn session_expiry() {
        let now = Utc::now();
        let session = Session {
            token_hash: "x".into(),
            user_id: Uuid::now_v7(),
            expires_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - chrono::Duration::seconds(1)));
    }
}
