use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::client::TfAuthClient;
use crate::config::TfAuthConfig;
use crate::device_flow;
use crate::errors::{Result, TfAuthError};
use crate::store::TokenStore;
use crate::tokens::XstsToken;

/// Entry point for authentication: owns the exchange client and the token
/// store, and walks the token chain on demand.
pub struct Authenticator {
    client: TfAuthClient,
    store: Arc<dyn TokenStore>,
}

impl Authenticator {
    pub fn new(config: TfAuthConfig, store: Arc<dyn TokenStore>) -> Result<Self> {
        Ok(Self {
            client: TfAuthClient::new(config)?,
            store,
        })
    }

    pub fn store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    /// Run the interactive device sign-in flow to completion.
    pub async fn authenticate(&self, cancel: &CancellationToken) -> Result<()> {
        device_flow::run(&self.client, self.store.as_ref(), cancel).await
    }

    /// Remove all cached tokens.
    pub async fn clear_cache(&self) -> Result<()> {
        self.store.clear().await
    }

    /// Produce a valid XSTS token, walking the token chain only as far as
    /// needed.
    ///
    /// A warm cache costs zero network calls; each missing or expired link
    /// adds one exchange. When the chain cannot be completed without user
    /// interaction this fails with [`TfAuthError::NotAuthenticated`] and the
    /// caller should run [`Authenticator::authenticate`].
    #[instrument(skip(self))]
    pub async fn ensure_xsts_token(&self) -> Result<XstsToken> {
        if let Some(xsts) = self.store.xsts_token().await {
            debug!("using cached XSTS token");
            return Ok(xsts);
        }

        if let Some(user_token) = self.store.user_token().await {
            match self.client.xsts_authorize(&user_token).await {
                Ok(response) => {
                    let user_hash = response.user_hash();
                    self.store
                        .set_xsts_token(&response.token, &user_hash, response.not_after)
                        .await?;
                    return Ok(XstsToken {
                        token: response.token,
                        user_hash,
                    });
                }
                // The cached user token may be stale server-side even though
                // its expiry has not passed; rebuild the chain from the top.
                Err(e) => warn!("cached user token rejected, rebuilding the chain: {e}"),
            }
        }

        let access_token = match self.store.access_token().await {
            Some(token) => token,
            None => self.refresh_access_token().await?,
        };

        let user = self.client.user_authenticate(&access_token).await?;
        self.store
            .set_user_token(&user.token, user.not_after)
            .await?;

        let response = self.client.xsts_authorize(&user.token).await?;
        let user_hash = response.user_hash();
        self.store
            .set_xsts_token(&response.token, &user_hash, response.not_after)
            .await?;

        Ok(XstsToken {
            token: response.token,
            user_hash,
        })
    }

    async fn refresh_access_token(&self) -> Result<String> {
        let refresh_token = self
            .store
            .refresh_token()
            .await
            .ok_or(TfAuthError::NotAuthenticated)?;

        let token = match self.client.refresh_access_token(&refresh_token).await {
            Ok(token) => token,
            Err(e) => {
                warn!("refresh-token exchange failed: {e}");
                return Err(TfAuthError::NotAuthenticated);
            }
        };

        let not_after = Utc::now() + chrono::Duration::seconds(token.expires_in as i64);
        self.store
            .set_access_token(&token.access_token, not_after)
            .await?;
        if let Some(rotated) = token.refresh_token.as_deref()
            && !rotated.is_empty()
        {
            self.store.set_refresh_token(rotated).await?;
        }

        Ok(token.access_token)
    }
}
