//! # Forms
//!
//! Bound user input and its validation. A form either cleans into typed
//! values or yields per-field error messages for re-rendering; it never
//! touches persistence.

use std::collections::BTreeMap;

use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Group;
use crate::traits::MediaStore;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";
pub const INVALID_IMAGE: &str = "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";
pub const INVALID_USERNAME: &str = "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const RESERVED_USERNAME: &str = "This username is not available.";
pub const DUPLICATE_USERNAME: &str = "A user with that username already exists.";
pub const PASSWORD_TOO_SHORT: &str =
    "This password is too short. It must contain at least 8 characters.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";
pub const INVALID_LOGIN: &str = "Please enter a correct username and password. Note that both fields may be case-sensitive.";

/// Key for errors that belong to the whole form.
pub const NON_FIELD: &str = "__all__";

pub const USERNAME_MAX_LEN: usize = 150;
pub const PASSWORD_MIN_LEN: usize = 8;

/// First path segments the router claims; a profile can't shadow them.
pub const RESERVED_USERNAMES: &[&str] = &[
    "about", "admin", "auth", "follow", "group", "media", "new", "static",
];

/// Field name → messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has(&self, field: &str) -> bool {
        !self.get(field).is_empty()
    }

    /// All messages of a field joined for display.
    pub fn message(&self, field: &str) -> String {
        self.get(field).join(" ")
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An uploaded file, fully buffered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
}

/// Bound input of the new/edit post form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostForm {
    pub text: String,
    /// Raw `<select>` value; empty means no group.
    pub group: String,
    pub image: Option<Upload>,
    pub clear_image: bool,
}

/// A post form that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanPost {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<Upload>,
    pub clear_image: bool,
}

impl PostForm {
    /// Validates against the known groups and the media store's decoder.
    /// On success the upload is moved out of the form.
    pub fn clean(
        &mut self,
        groups: &[Group],
        media: &dyn MediaStore,
    ) -> std::result::Result<CleanPost, FormErrors> {
        let mut errors = FormErrors::default();

        if self.text.trim().is_empty() {
            errors.add("text", REQUIRED);
        }

        let group_id = match parse_group_choice(&self.group, groups) {
            Ok(id) => id,
            Err(message) => {
                errors.add("group", message);
                None
            }
        };

        if let Some(upload) = &self.image {
            if let Err(err) = media.check_image(&upload.data) {
                log::debug!("rejected upload {:?}: {}", upload.filename, err);
                errors.add("image", INVALID_IMAGE);
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(CleanPost {
            text: self.text.trim().to_string(),
            group_id,
            image: self.image.take(),
            clear_image: self.clear_image,
        })
    }
}

fn parse_group_choice(raw: &str, groups: &[Group]) -> std::result::Result<Option<Uuid>, &'static str> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    let id = Uuid::parse_str(raw).map_err(|_| INVALID_CHOICE)?;
    if groups.iter().any(|g| g.id == id) {
        Ok(Some(id))
    } else {
        Err(INVALID_CHOICE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub text: String,
}

impl CommentForm {
    pub fn clean(&self) -> std::result::Result<String, FormErrors> {
        let text = self.text.trim();
        if text.is_empty() {
            let mut errors = FormErrors::default();
            errors.add("text", REQUIRED);
            return Err(errors);
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SignupForm {
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: String,
    pub password2: String,
}

impl SignupForm {
    /// Checks everything that doesn't need the database.
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();

        if self.username.is_empty() {
            errors.add("username", REQUIRED);
        } else if let Err(AppError::ValidationError(message)) = validate_username(&self.username) {
            errors.add("username", message);
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        } else if self.password1 != self.password2 {
            errors.add("password2", PASSWORD_MISMATCH);
        } else if self.password1.chars().count() < PASSWORD_MIN_LEN {
            errors.add("password2", PASSWORD_TOO_SHORT);
        }

        errors
    }
}

/// Letters, digits and `@.+-_`, at most 150 characters, not a route word.
pub fn validate_username(username: &str) -> Result<()> {
    let allowed = |c: char| c.is_alphanumeric() || "@.+-_".contains(c);
    if username.is_empty()
        || username.chars().count() > USERNAME_MAX_LEN
        || !username.chars().all(allowed)
    {
        return Err(AppError::ValidationError(INVALID_USERNAME.to_string()));
    }
    if RESERVED_USERNAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(username))
    {
        return Err(AppError::ValidationError(RESERVED_USERNAME.to_string()));
    }
    Ok(())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub next: String,
}

impl LoginForm {
    pub fn validate(&self) -> FormErrors {
        let mut errors = FormErrors::default();
        if self.username.trim().is_empty() {
            errors.add("username", REQUIRED);
        }
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors
    }
}

/// Only same-site absolute paths are followed after login.
pub fn safe_next(next: &str) -> Option<&str> {
    let local = next.starts_with('/') && !next.starts_with("//") && !next.contains('\\');
    local.then_some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::MockMediaStore;

    fn group() -> Group {
        Group {
            id: Uuid::now_v7(),
            title: "Rust".into(),
            slug: "rust".into(),
            description: "Systems".into(),
        }
    }

    #[test]
    fn valid_post_form_cleans() {
        let g = group();
        let mut media = MockMediaStore::new();
        media.expect_check_image().times(1).returning(|_| Ok(()));

        let mut form = PostForm {
            text: "  hello\n".into(),
            group: g.id.to_string(),
            image: Some(Upload {
                filename: "a.png".into(),
                data: vec![1, 2, 3],
            }),
            clear_image: false,
        };
        let clean = form.clean(&[g.clone()], &media).expect("form should be valid");
        assert_eq!(clean.text, "hello");
        assert_eq!(clean.group_id, Some(g.id));
        assert!(clean.image.is_some());
        assert!(form.image.is_none());
    }

    #[test]
    fn non_image_upload_gets_fixed_message() {
        let mut media = MockMediaStore::new();
        media
            .expect_check_image()
            .returning(|_| Err(AppError::ValidationError("bad magic".into())));

        let mut form = PostForm {
            text: "hello".into(),
            image: Some(Upload {
                filename: "small.txt".into(),
                data: vec![0xED, 0x95, 0x9C],
            }),
            ..Default::default()
        };
        let errors = form.clean(&[], &media).unwrap_err();
        assert_eq!(errors.get("image"), [INVALID_IMAGE.to_string()]);
        assert!(form.image.is_some());
    }

    #[test]
    fn blank_text_and_unknown_group_are_rejected() {
        let media = MockMediaStore::new();
        let mut form = PostForm {
            text: "   ".into(),
            group: Uuid::now_v7().to_string(),
            ..Default::default()
        };
        let errors = form.clean(&[group()], &media).unwrap_err();
        assert_eq!(errors.get("text"), [REQUIRED.to_string()]);
        assert_eq!(errors.get("group"), [INVALID_CHOICE.to_string()]);
    }

    #[test]
    fn comment_requires_text() {
        assert!(CommentForm { text: " ".into() }.clean().is_err());
        assert_eq!(
            CommentForm { text: " nice ".into() }.clean().unwrap(),
            "nice"
        );
    }

    #[test]
    fn usernames() {
        assert!(validate_username("leo.tolstoy+1").is_ok());
        assert!(validate_username("with space").is_err());
        assert!(validate_username("Follow").is_err());
        assert!(validate_username(&"a".repeat(151)).is_err());
    }

    #[test]
    fn signup_password_rules() {
        let form = SignupForm {
            username: "leo".into(),
            password1: "short".into(),
            password2: "short".into(),
            ..Default::default()
        };
        assert_eq!(form.validate().get("password2"), [PASSWORD_TOO_SHORT.to_string()]);

        let form = SignupForm {
            password2: "different-one".into(),
            password1: "long-enough".into(),
            ..form
        };
        assert_eq!(form.validate().get("password2"), [PASSWORD_MISMATCH.to_string()]);
    }

    #[test]
    fn next_must_be_local() {
        assert_eq!(safe_next("/follow/"), Some("/follow/"));
        assert_eq!(safe_next("//evil.example"), None);
        assert_eq!(safe_next("https://evil.example"), None);
    }
}
