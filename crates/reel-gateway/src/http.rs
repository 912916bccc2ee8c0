use async_trait::async_trait;
use reel_models::{Movie, Persona, UserRating};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::dto::{
    CreateProfileRequest, MovieDto, PersonaDto, RatingRequest, SyncShownRequest, UserProfileDto,
    WatchlistRequest,
};
use crate::error::GatewayError;
use crate::traits::RecommendationGateway;

/// Concrete gateway over the recommendation backend's HTTP API.
///
/// Stateless apart from the connection pool; safe to share behind an `Arc`
/// and reuse across calls.
#[derive(Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
    cdn_prefix: String,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>, cdn_prefix: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            cdn_prefix: cdn_prefix.into(),
        }
    }

    /// Use a preconfigured client (custom timeouts, proxies).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn user_segment(user_id: &str) -> Result<String, GatewayError> {
        if user_id.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("empty user id".to_string()));
        }
        Ok(urlencoding::encode(user_id).into_owned())
    }

    async fn expect_success(response: Response) -> Result<Response, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Server { status: status.as_u16() });
        }
        Ok(response)
    }

    async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let body = response.bytes().await.map_err(GatewayError::Network)?;
        serde_json::from_slice(&body).map_err(GatewayError::Decoding)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, GatewayError> {
        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(GatewayError::Network)?;
        Self::decode_json(Self::expect_success(response).await?).await
    }

    async fn post_json<B: serde::Serialize>(&self, url: String, body: &B) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(GatewayError::Network)?;
        Self::expect_success(response).await?;
        Ok(())
    }

    fn convert_movies(&self, dtos: Vec<MovieDto>, fallback_subtitle: &str) -> Vec<Movie> {
        let total = dtos.len();
        let movies: Vec<Movie> = dtos
            .into_iter()
            .filter_map(|dto| dto.into_movie(&self.cdn_prefix, fallback_subtitle))
            .collect();
        if movies.len() < total {
            debug!(dropped = total - movies.len(), "Dropped candidates without usable artwork");
        }
        movies
    }
}

#[async_trait]
impl RecommendationGateway for HttpGateway {
    async fn fetch_user_profile(&self, user_id: &str) -> Result<UserProfileDto, GatewayError> {
        let user = Self::user_segment(user_id)?;
        self.get_json(format!("{}/users/{}", self.base_url, user)).await
    }

    async fn fetch_recommendations(&self, user_id: &str) -> Result<Vec<Movie>, GatewayError> {
        let user = Self::user_segment(user_id)?;
        let url = format!("{}/users/{}/recommendations?language=en", self.base_url, user);
        let dtos: Vec<MovieDto> = self.get_json(url).await?;
        Ok(self.convert_movies(dtos, "Recommended"))
    }

    async fn fetch_movies_by_ids(&self, ids: &[u32]) -> Result<Vec<Movie>, GatewayError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/movies?ids={}", self.base_url, joined);
        let dtos: Vec<MovieDto> = self.get_json(url).await?;
        Ok(self.convert_movies(dtos, "Movie"))
    }

    async fn create_or_update_profile(
        &self,
        name: &str,
        genres: &[String],
        movie_ids: &[u32],
        personas: &[String],
    ) -> Result<(), GatewayError> {
        if name.trim().is_empty() {
            return Err(GatewayError::InvalidRequest("empty profile name".to_string()));
        }
        let body = CreateProfileRequest {
            name,
            genres,
            movie_ids,
            personas: if personas.is_empty() { None } else { Some(personas) },
        };
        self.post_json(format!("{}/encode", self.base_url), &body).await
    }

    async fn add_to_watchlist(&self, user_id: &str, movie_id: u32) -> Result<(), GatewayError> {
        let user = Self::user_segment(user_id)?;
        let url = format!("{}/users/{}/watchlist", self.base_url, user);
        self.post_json(url, &WatchlistRequest { movie_id }).await
    }

    async fn remove_from_watchlist(&self, user_id: &str, movie_id: u32) -> Result<(), GatewayError> {
        let user = Self::user_segment(user_id)?;
        let url = format!("{}/users/{}/watchlist/{}", self.base_url, user, movie_id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .map_err(GatewayError::Network)?;
        Self::expect_success(response).await?;
        Ok(())
    }

    async fn rate_movie(
        &self,
        user_id: &str,
        movie_id: u32,
        rating: UserRating,
    ) -> Result<(), GatewayError> {
        let user = Self::user_segment(user_id)?;
        let url = format!("{}/users/{}/ratings", self.base_url, user);
        self.post_json(url, &RatingRequest { movie_id, rating }).await
    }

    async fn sync_shown_movies(&self, user_id: &str, movie_ids: &[u32]) -> Result<(), GatewayError> {
        if movie_ids.is_empty() {
            warn!("sync_shown_movies called with no ids");
            return Ok(());
        }
        let user = Self::user_segment(user_id)?;
        let url = format!("{}/users/{}/sync", self.base_url, user);
        self.post_json(url, &SyncShownRequest { shown_ids: movie_ids }).await
    }

    async fn fetch_personas(&self) -> Result<Vec<Persona>, GatewayError> {
        let dtos: Vec<PersonaDto> =
            self.get_json(format!("{}/onboarding/personas", self.base_url)).await?;
        Ok(dtos.into_iter().map(Persona::from).collect())
    }
}
