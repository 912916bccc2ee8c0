use reel_models::{ImageRef, Movie, Persona, UserRating};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Recommendation candidate as served by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDto {
    pub movie_id: String,
    pub title: String,
    pub genres: Option<Vec<String>>,
    pub score: Option<f64>,
    pub backdrop_path: Option<String>,
}

impl MovieDto {
    /// Convert to a displayable movie.
    ///
    /// Returns `None` for DTOs without a usable backdrop (the feed is
    /// image-led) and for unparseable ids, which would otherwise collide
    /// under dedup by backend id.
    pub fn into_movie(self, cdn_prefix: &str, fallback_subtitle: &str) -> Option<Movie> {
        let backdrop = match self.backdrop_path.as_deref() {
            Some(path) if !path.is_empty() => path,
            _ => return None,
        };
        let tmdb_id = match self.movie_id.parse::<u32>() {
            Ok(id) => id,
            Err(_) => {
                warn!(movie_id = %self.movie_id, title = %self.title, "Dropping DTO with unparseable movie id");
                return None;
            }
        };
        let subtitle = match &self.genres {
            Some(genres) if !genres.is_empty() => genres.join(" · "),
            _ => fallback_subtitle.to_string(),
        };
        Some(Movie::new(
            tmdb_id,
            self.title,
            subtitle,
            ImageRef::Remote(format!("{}{}", cdn_prefix, backdrop)),
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaDto {
    pub title: String,
    pub description: String,
    pub color: String,
    pub icon: String,
    pub image: String,
}

impl From<PersonaDto> for Persona {
    fn from(dto: PersonaDto) -> Self {
        Persona {
            title: dto.title,
            description: dto.description,
            color_name: dto.color,
            icon: dto.icon,
            image: dto.image,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfileDto {
    pub name: String,
    pub genres: Option<Vec<String>>,
    pub movie_ids: Option<Vec<u32>>,
    pub data: UserDataDto,
}

/// Bare id lists; hydrated into movies via `fetch_movies_by_ids`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserDataDto {
    pub liked: Vec<u32>,
    pub disliked: Vec<u32>,
    pub neutral: Vec<u32>,
    pub watchlist: Vec<u32>,
    pub history: Vec<u32>,
}

impl UserDataDto {
    /// Every id the profile references, deduplicated.
    pub fn all_ids(&self) -> Vec<u32> {
        let mut ids: Vec<u32> = self
            .liked
            .iter()
            .chain(&self.disliked)
            .chain(&self.neutral)
            .chain(&self.watchlist)
            .chain(&self.history)
            .copied()
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

// Request bodies.

#[derive(Debug, Serialize)]
pub struct CreateProfileRequest<'a> {
    pub name: &'a str,
    pub genres: &'a [String],
    pub movie_ids: &'a [u32],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personas: Option<&'a [String]>,
}

#[derive(Debug, Serialize)]
pub struct WatchlistRequest {
    pub movie_id: u32,
}

#[derive(Debug, Serialize)]
pub struct RatingRequest {
    pub movie_id: u32,
    pub rating: UserRating,
}

#[derive(Debug, Serialize)]
pub struct SyncShownRequest<'a> {
    pub shown_ids: &'a [u32],
}
