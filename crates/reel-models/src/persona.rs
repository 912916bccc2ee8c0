use serde::{Deserialize, Serialize};

/// Onboarding persona descriptor as served by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Persona {
    pub title: String,
    pub description: String,
    /// Named UI color ("red", "purple", ...); mapping to a concrete color is
    /// a presentation concern.
    pub color_name: String,
    pub icon: String,
    pub image: String,
}
