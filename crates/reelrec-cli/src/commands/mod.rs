pub mod config;
pub mod feed;
pub mod profile;
pub mod rate;
pub mod shown;
pub mod watchlist;
