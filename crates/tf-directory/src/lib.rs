//! Gamertag directory client for the tagfinder tools
//!
//! Resolves human-readable gamertags to XUIDs and profile records through the
//! Xbox Live peoplehub search endpoint, authorizing every request with an
//! XSTS token obtained from [`tf_auth`].
//!
//! Search matching is case- and space-insensitive: a query for "Player One"
//! matches the profile "PlayerOne" exactly. When no normalized exact match
//! exists, all of the provider's fuzzy results are reported and the query is
//! flagged as fuzzy-only.

pub mod client;
pub mod errors;
pub mod models;

// Re-export main types
pub use client::{BatchLookup, DirectoryClient};
pub use errors::DirectoryError;
pub use models::{Profile, ProfileDetail, SearchResponse};
