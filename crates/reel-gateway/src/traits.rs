use async_trait::async_trait;
use reel_models::{Movie, Persona, UserRating};

use crate::dto::UserProfileDto;
use crate::error::GatewayError;

/// Network-access facade over the recommendation backend.
///
/// Every operation performs exactly one HTTP round trip; none retry
/// internally. Retry of mutating calls is the pending-action queue's job.
/// Implementations are stateless and safely shared across callers.
#[async_trait]
pub trait RecommendationGateway: Send + Sync {
    /// Profile record for a user: name, genre list, and the id lists of
    /// everything they have rated, watchlisted, or seen.
    async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfileDto, GatewayError>;

    /// Ordered recommendation candidates for a user, already converted to
    /// displayable movies. Candidates without usable artwork are dropped.
    async fn fetch_recommendations(&self, user_id: &str) -> Result<Vec<Movie>, GatewayError>;

    /// Batch hydration: turn bare backend ids into displayable movies.
    async fn fetch_movies_by_ids(&self, ids: &[u32]) -> Result<Vec<Movie>, GatewayError>;

    /// Create or wholesale-overwrite a user profile. Used for onboarding
    /// submission and later bulk profile sync.
    async fn create_or_update_profile(
        &self,
        name: &str,
        genres: &[String],
        movie_ids: &[u32],
        personas: &[String],
    ) -> Result<(), GatewayError>;

    /// Idempotent from the caller's perspective: retrying a successful add
    /// must not corrupt backend state.
    async fn add_to_watchlist(&self, user_id: &str, movie_id: u32) -> Result<(), GatewayError>;

    async fn remove_from_watchlist(&self, user_id: &str, movie_id: u32) -> Result<(), GatewayError>;

    /// Last-write-wins: rating the same movie again overwrites.
    async fn rate_movie(
        &self,
        user_id: &str,
        movie_id: u32,
        rating: UserRating,
    ) -> Result<(), GatewayError>;

    /// Report which candidates were displayed so the backend excludes them
    /// from future recommendation responses.
    async fn sync_shown_movies(&self, user_id: &str, movie_ids: &[u32]) -> Result<(), GatewayError>;

    async fn fetch_personas(&self) -> Result<Vec<Persona>, GatewayError>;
}
