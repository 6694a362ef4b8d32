use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use crate::errors::{Result, TfAuthError};
use crate::tokens::{CachedTokens, XstsToken};

/// Storage for the four cached token kinds.
///
/// The `get` side returns only tokens that are currently usable (non-empty
/// and unexpired); the `set` side persists durably before returning. `clear`
/// removes everything and is safe to call when nothing is stored.
#[async_trait::async_trait]
pub trait TokenStore: Send + Sync {
    /// Valid access token, if any.
    async fn access_token(&self) -> Option<String>;

    /// Refresh token, if one is stored. Refresh tokens carry no expiry.
    async fn refresh_token(&self) -> Option<String>;

    /// Valid user token, if any.
    async fn user_token(&self) -> Option<String>;

    /// Valid XSTS token together with its user hash, if any.
    async fn xsts_token(&self) -> Option<XstsToken>;

    async fn set_access_token(&self, token: &str, not_after: DateTime<Utc>) -> Result<()>;

    async fn set_refresh_token(&self, token: &str) -> Result<()>;

    async fn set_user_token(&self, token: &str, not_after: DateTime<Utc>) -> Result<()>;

    async fn set_xsts_token(
        &self,
        token: &str,
        user_hash: &str,
        not_after: DateTime<Utc>,
    ) -> Result<()>;

    /// Remove all stored tokens.
    async fn clear(&self) -> Result<()>;
}

/// In-memory token store for testing and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    tokens: Arc<RwLock<CachedTokens>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Option<CachedTokens> {
        self.tokens.read().ok().map(|t| t.clone())
    }

    fn mutate(&self, f: impl FnOnce(&mut CachedTokens)) -> Result<()> {
        let mut tokens = self
            .tokens
            .write()
            .map_err(|_| TfAuthError::InvalidResponse("token store lock poisoned".to_string()))?;
        f(&mut tokens);
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenStore for MemoryTokenStore {
    async fn access_token(&self) -> Option<String> {
        self.read()?.valid_access_token().map(str::to_string)
    }

    async fn refresh_token(&self) -> Option<String> {
        self.read()?.present_refresh_token().map(str::to_string)
    }

    async fn user_token(&self) -> Option<String> {
        self.read()?.valid_user_token().map(str::to_string)
    }

    async fn xsts_token(&self) -> Option<XstsToken> {
        self.read()?.valid_xsts_token()
    }

    async fn set_access_token(&self, token: &str, not_after: DateTime<Utc>) -> Result<()> {
        self.mutate(|t| {
            t.access_token = token.to_string();
            t.access_token_expiry = Some(not_after);
        })
    }

    async fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.mutate(|t| t.refresh_token = token.to_string())
    }

    async fn set_user_token(&self, token: &str, not_after: DateTime<Utc>) -> Result<()> {
        self.mutate(|t| {
            t.user_token = token.to_string();
            t.user_token_expiry = Some(not_after);
        })
    }

    async fn set_xsts_token(
        &self,
        token: &str,
        user_hash: &str,
        not_after: DateTime<Utc>,
    ) -> Result<()> {
        self.mutate(|t| {
            t.xsts_token = token.to_string();
            t.user_hash = user_hash.to_string();
            t.xsts_token_expiry = Some(not_after);
        })
    }

    async fn clear(&self) -> Result<()> {
        self.mutate(|t| *t = CachedTokens::default())
    }
}
