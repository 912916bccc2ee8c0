use serde::{Deserialize, Serialize};

/// A user's rating for a movie. A movie holds at most one rating at a time;
/// re-rating replaces the prior categorization.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRating {
    Like,
    Neutral,
    Dislike,
}

impl UserRating {
    /// Wire form expected by the ratings endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRating::Like => "like",
            UserRating::Neutral => "neutral",
            UserRating::Dislike => "dislike",
        }
    }
}

impl std::fmt::Display for UserRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
