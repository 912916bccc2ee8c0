pub mod dto;
pub mod error;
pub mod http;
pub mod traits;

pub use dto::{MovieDto, PersonaDto, UserDataDto, UserProfileDto};
pub use error::GatewayError;
pub use http::HttpGateway;
pub use traits::RecommendationGateway;
