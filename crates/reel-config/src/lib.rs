pub mod config;
pub mod paths;

pub use config::{BackendConfig, Config, FeedTuning, UserConfig};
pub use paths::PathManager;
