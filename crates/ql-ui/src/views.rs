//! Render-ready shapes of domain models. Everything a template prints is
//! precomputed here so templates stay free of logic.

use ql_core::models::{linebreaks, CommentEntry, FeedEntry, Group};
use uuid::Uuid;

const DATE_FORMAT: &str = "%d %b %Y %H:%M";

/// One post as shown in feeds and on its own page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostCard {
    pub id: Uuid,
    pub text_html: String,
    pub pub_date: String,
    pub author_username: String,
    pub author_name: String,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image_url: Option<String>,
    pub thumb_url: Option<String>,
    pub comment_count: i64,
    /// The viewer wrote this post and may edit it
    pub is_author: bool,
}

/// Public URLs of a post's image: (original, thumbnail).
pub type ImageUrls = Option<(String, String)>;

impl PostCard {
    pub fn new(entry: &FeedEntry, viewer: Option<Uuid>, image: ImageUrls) -> Self {
        let (image_url, thumb_url) = match image {
            Some((full, thumb)) => (Some(full), Some(thumb)),
            None => (None, None),
        };
        Self {
            id: entry.post.id,
            text_html: linebreaks(&entry.post.text),
            pub_date: entry.post.pub_date.format(DATE_FORMAT).to_string(),
            author_username: entry.author_username.clone(),
            author_name: entry.author_name.clone(),
            group_slug: entry.group.as_ref().map(|g| g.slug.clone()),
            group_title: entry.group.as_ref().map(|g| g.title.clone()),
            image_url,
            thumb_url,
            comment_count: entry.comment_count,
            is_author: viewer == Some(entry.post.author_id),
        }
    }

    pub fn url(&self) -> String {
        format!("/{}/{}/", self.author_username, self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
    pub author_username: String,
    pub text_html: String,
    pub created: String,
}

impl From<&CommentEntry> for CommentView {
    fn from(entry: &CommentEntry) -> Self {
        Self {
            author_username: entry.author_username.clone(),
            text_html: linebreaks(&entry.comment.text),
            created: entry.comment.created.format(DATE_FORMAT).to_string(),
        }
    }
}

/// An `<option>` of the group select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupOption {
    pub id: String,
    pub title: String,
    pub selected: bool,
}

impl GroupOption {
    /// `selected` is the raw submitted value, compared as text.
    pub fn list(groups: &[Group], selected: &str) -> Vec<Self> {
        groups
            .iter()
            .map(|g| {
                let id = g.id.to_string();
                Self {
                    selected: id == selected,
                    id,
                    title: g.title.clone(),
                }
            })
            .collect()
    }
}
