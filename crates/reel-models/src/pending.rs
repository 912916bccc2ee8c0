use crate::rating::UserRating;

/// A durable, queued representation of a not-yet-confirmed mutating backend
/// call. Created at the moment of an optimistic local mutation; lives until
/// the corresponding backend call succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingAction {
    Rate {
        movie_id: u32,
        rating: UserRating,
        title: String,
    },
    WatchlistAdd {
        movie_id: u32,
        title: String,
    },
    WatchlistRemove {
        movie_id: u32,
        title: String,
    },
    SyncShown {
        movie_ids: Vec<u32>,
    },
}

impl PendingAction {
    /// Short tag for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PendingAction::Rate { .. } => "rate",
            PendingAction::WatchlistAdd { .. } => "watchlist_add",
            PendingAction::WatchlistRemove { .. } => "watchlist_remove",
            PendingAction::SyncShown { .. } => "sync_shown",
        }
    }
}
