pub mod client;
pub mod error;
pub mod token;

pub use client::{SpotifyClient, TimeRange};
pub use error::SpotifyError;
pub use token::{ensure_access_token, SpotifyTokens, TokenStore};
