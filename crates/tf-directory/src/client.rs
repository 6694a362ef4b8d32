use std::collections::HashMap;
use std::sync::Arc;

use reqwest::Client;
use tf_auth::tokens::XstsToken;
use tf_auth::{Authenticator, FileTokenStore, TfAuthConfig, TokenStore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::errors::{DirectoryError, Result};
use crate::models::{Profile, SearchResponse};

const PEOPLEHUB_BASE: &str = "https://peoplehub.xboxlive.com";

/// Result of a batch gamertag lookup.
#[derive(Debug, Clone, Default)]
pub struct BatchLookup {
    /// Gamertag (as spelled in the matched profile) to XUID.
    pub xuids: HashMap<String, String>,
    /// Queries that had no normalized exact match; their fuzzy results are
    /// still included in `xuids`.
    pub fuzzy_only: Vec<String>,
}

/// Client for the gamertag directory.
///
/// Wraps an [`Authenticator`] and derives a valid XSTS token before every
/// search, so a warm token cache costs nothing and an expired chain is
/// rebuilt transparently.
pub struct DirectoryClient {
    auth: Authenticator,
    http: Client,
    search_base: String,
}

impl DirectoryClient {
    /// Create a client for the given configuration.
    ///
    /// `store` defaults to the durable [`FileTokenStore`] at the standard
    /// per-user cache location.
    pub async fn new(config: TfAuthConfig, store: Option<Arc<dyn TokenStore>>) -> Result<Self> {
        if config.client_id.is_empty() {
            return Err(tf_auth::TfAuthError::MissingClientId.into());
        }

        let store: Arc<dyn TokenStore> = match store {
            Some(store) => store,
            None => Arc::new(FileTokenStore::open_default().await?),
        };

        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or("tagfinder"))
            .build()
            .map_err(DirectoryError::Network)?;

        let auth = Authenticator::new(config, store)?;

        Ok(Self {
            auth,
            http,
            search_base: PEOPLEHUB_BASE.to_string(),
        })
    }

    /// Run the interactive device sign-in flow.
    pub async fn authenticate(&self, cancel: &CancellationToken) -> Result<()> {
        Ok(self.auth.authenticate(cancel).await?)
    }

    /// Remove all cached tokens.
    pub async fn clear_cache(&self) -> Result<()> {
        Ok(self.auth.clear_cache().await?)
    }

    /// Resolve a single gamertag to its XUID.
    #[instrument(skip(self))]
    pub async fn gamertag_to_xuid(&self, gamertag: &str) -> Result<String> {
        if gamertag.is_empty() {
            return Err(DirectoryError::EmptyGamertag);
        }

        let query = [gamertag.to_string()];
        let (profiles, _) = self.search(&query).await?;

        profiles
            .into_iter()
            .next()
            .map(|p| p.xuid)
            .ok_or_else(|| DirectoryError::NotFound(gamertag.to_string()))
    }

    /// Fetch the full profile for a gamertag; fails unless there is exactly
    /// one match.
    #[instrument(skip(self))]
    pub async fn lookup_profile(&self, gamertag: &str) -> Result<Profile> {
        if gamertag.is_empty() {
            return Err(DirectoryError::EmptyGamertag);
        }

        let query = [gamertag.to_string()];
        let (mut profiles, _) = self.search(&query).await?;

        match profiles.len() {
            0 => Err(DirectoryError::NotFound(gamertag.to_string())),
            1 => Ok(profiles.remove(0)),
            count => Err(DirectoryError::Ambiguous {
                gamertag: gamertag.to_string(),
                count,
            }),
        }
    }

    /// Batch lookup of gamertags to XUIDs.
    #[instrument(skip(self, gamertags), fields(count = gamertags.len()))]
    pub async fn gamertags_to_xuids(&self, gamertags: &[String]) -> Result<BatchLookup> {
        if gamertags.is_empty() {
            return Ok(BatchLookup::default());
        }

        let (profiles, fuzzy_only) = self.search(gamertags).await?;

        let mut xuids = HashMap::new();
        for profile in profiles {
            xuids.insert(profile.gamertag, profile.xuid);
        }

        Ok(BatchLookup { xuids, fuzzy_only })
    }

    /// Search each gamertag, keeping normalized exact matches when any exist
    /// and falling back to all fuzzy results otherwise.
    async fn search(&self, gamertags: &[String]) -> Result<(Vec<Profile>, Vec<String>)> {
        let xsts = self.auth.ensure_xsts_token().await?;

        let mut all_profiles = Vec::new();
        let mut fuzzy_only = Vec::new();

        for gamertag in gamertags {
            let response = self.search_one(&xsts, gamertag).await?;

            let normalized_query = normalize(gamertag);
            let mut matched = false;
            let mut fuzzy = Vec::new();

            for profile in response.people {
                if normalize(&profile.gamertag) == normalized_query {
                    all_profiles.push(profile);
                    matched = true;
                } else {
                    fuzzy.push(profile);
                }
            }

            if !matched {
                // No exact match - report all fuzzy results instead.
                debug!(gamertag, "no normalized exact match, keeping fuzzy results");
                all_profiles.extend(fuzzy);
                fuzzy_only.push(gamertag.clone());
            }
        }

        Ok((all_profiles, fuzzy_only))
    }

    async fn search_one(&self, xsts: &XstsToken, gamertag: &str) -> Result<SearchResponse> {
        let url = format!("{}/users/me/people/search/decoration/detail", self.search_base);

        let response = self
            .http
            .get(&url)
            .query(&[("q", gamertag)])
            .header("x-xbl-contract-version", "3")
            .header("Accept-Language", "en-us")
            .header("Authorization", xsts.authorization_header())
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DirectoryError::Http {
                status,
                body_snippet: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Case- and space-insensitive gamertag comparison key.
fn normalize(gamertag: &str) -> String {
    gamertag.to_lowercase().replace(' ', "")
}
