use sea_orm::DatabaseConnection;

use crate::spotify::{SpotifyClient, TokenStore};

/// Application state shared across handlers
pub struct AppState {
    pub db: DatabaseConnection,
    pub spotify: SpotifyClient,
    pub tokens: TokenStore,
}
