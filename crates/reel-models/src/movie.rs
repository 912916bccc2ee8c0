use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Where a movie's artwork comes from: a bundled asset name or a fully
/// qualified CDN URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageRef {
    Asset(String),
    Remote(String),
}

impl ImageRef {
    pub fn as_str(&self) -> &str {
        match self {
            ImageRef::Asset(name) => name,
            ImageRef::Remote(url) => url,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Movie {
    /// Local identity for UI list diffing only. Never sent to the backend;
    /// `tmdb_id` is the only key used for dedup and backend calls.
    pub id: Uuid,
    pub tmdb_id: u32,
    pub title: String,
    /// Genre string, " · "-joined.
    pub subtitle: String,
    pub image: ImageRef,
    pub friend_initials: Vec<String>,
    pub date_added: DateTime<Utc>,
    pub date_watched: Option<DateTime<Utc>>,
}

impl Movie {
    pub fn new(tmdb_id: u32, title: impl Into<String>, subtitle: impl Into<String>, image: ImageRef) -> Self {
        Self {
            id: Uuid::new_v4(),
            tmdb_id,
            title: title.into(),
            subtitle: subtitle.into(),
            image,
            friend_initials: Vec::new(),
            date_added: Utc::now(),
            date_watched: None,
        }
    }

    /// Genre tokens from the subtitle, trimmed, empties dropped.
    pub fn genre_tokens(&self) -> impl Iterator<Item = &str> {
        self.subtitle
            .split(" · ")
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}
