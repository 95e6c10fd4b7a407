//! Internal post types.

use chrono::{DateTime, Utc};

/// A post from the internal content store.
#[derive(Debug, Clone)]
pub struct Post {
    /// Post ID.
    pub id: i64,
    /// Title; may be empty.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Attached image.
    pub image_url: Option<String>,
    /// Display name of the author.
    pub author_name: Option<String>,
    /// Only verified posts are ingested.
    pub is_verified: bool,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
}

/// New post for creation.
#[derive(Debug, Clone)]
pub struct NewPost {
    /// Title.
    pub title: String,
    /// Body text.
    pub content: String,
    /// Attached image.
    pub image_url: Option<String>,
    /// Display name of the author.
    pub author_name: Option<String>,
    /// Whether the post starts verified.
    pub is_verified: bool,
    /// Creation time; `None` means now.
    pub created_at: Option<DateTime<Utc>>,
}

impl NewPost {
    /// Create a new unverified post.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            image_url: None,
            author_name: None,
            is_verified: false,
            created_at: None,
        }
    }

    /// Set the image URL.
    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Set the author name.
    pub fn with_author_name(mut self, author_name: impl Into<String>) -> Self {
        self.author_name = Some(author_name.into());
        self
    }

    /// Set the creation time.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Create the post already verified.
    pub fn verified(mut self) -> Self {
        self.is_verified = true;
        self
    }
}
