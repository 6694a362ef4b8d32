//! Xbox Live authentication for the tagfinder tools
//!
//! This crate implements the device-code sign-in flow against the Microsoft
//! identity platform and the two Xbox Live token escalations needed to call
//! directory APIs, with a durable on-disk credential cache in between.
//!
//! # Token chain
//!
//! 1. Device-code OAuth grant -> access token + refresh token
//! 2. Access token -> Xbox Live user token
//! 3. User token -> XSTS token + user hash
//!
//! Each link is cached with its expiry and re-derived only when missing or
//! expired; a fully warm cache answers without touching the network.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tf_auth::{Authenticator, FileTokenStore, TfAuthConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(FileTokenStore::open_default().await?);
//!     let auth = Authenticator::new(TfAuthConfig::new("your-client-id"), store)?;
//!
//!     // First run: prints a verification URL + code and waits for the user.
//!     auth.authenticate(&CancellationToken::new()).await?;
//!
//!     // Later calls reuse the cache and refresh links transparently.
//!     let xsts = auth.ensure_xsts_token().await?;
//!     println!("Authorization: {}", xsts.authorization_header());
//!     Ok(())
//! }
//! ```
//!
//! # Token storage
//!
//! Tokens persist through the [`TokenStore`] trait. [`FileTokenStore`] is the
//! default durable implementation (one JSON file, owner-only permissions);
//! [`MemoryTokenStore`] is a drop-in substitute for tests. A store holds one
//! cached identity; use distinct cache paths for distinct accounts.

pub mod authenticator;
pub mod client;
pub mod config;
mod device_flow;
pub mod errors;
pub mod file_store;
pub mod models;
pub mod store;
pub mod tokens;

// Re-export main types
pub use authenticator::Authenticator;
pub use client::TfAuthClient;
pub use config::{HttpTimeouts, TfAuthConfig};
pub use errors::{Result, TfAuthError, XstsError};
pub use file_store::FileTokenStore;
pub use store::{MemoryTokenStore, TokenStore};
pub use tokens::{CachedTokens, XstsToken};
