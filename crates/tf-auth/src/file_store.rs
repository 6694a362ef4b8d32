use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::warn;

use crate::errors::{Result, TfAuthError};
use crate::store::TokenStore;
use crate::tokens::{CachedTokens, XstsToken};

/// File-based token store.
///
/// Persists the whole credential record as one JSON file in a per-user,
/// owner-only location. Every mutation rewrites the file (read-modify-write);
/// an advisory lock file guards against a second process mutating the same
/// cache. Not safe for concurrent mutation from multiple flows - use distinct
/// paths for distinct identities.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
    lock_path: PathBuf,
    tokens: RwLock<CachedTokens>,
}

impl FileTokenStore {
    /// Open (or create) the store backed by `path`.
    ///
    /// The parent directory is created with owner-only permissions. An
    /// unreadable or corrupt file is treated as an empty cache.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o700);
                std::fs::set_permissions(dir, perms)?;
            }
        }

        let tokens = match Self::load(&path).await {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("unreadable token cache at {}, starting empty: {}", path.display(), e);
                CachedTokens::default()
            }
        };

        let lock_path = path.with_extension("lock");

        Ok(Self {
            path,
            lock_path,
            tokens: RwLock::new(tokens),
        })
    }

    /// Default cache location: `<config dir>/tagfinder/tokens.json`.
    pub fn default_cache_path() -> Result<PathBuf> {
        let project_dirs = directories::ProjectDirs::from("", "", "tagfinder").ok_or_else(|| {
            TfAuthError::InvalidResponse("could not determine config directory".to_string())
        })?;

        Ok(project_dirs.config_dir().join("tokens.json"))
    }

    /// Open the store at the default cache location.
    pub async fn open_default() -> Result<Self> {
        Self::new(Self::default_cache_path()?).await
    }

    async fn load(path: &Path) -> Result<CachedTokens> {
        let content = match fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(CachedTokens::default());
            }
            Err(e) => return Err(e.into()),
        };

        Ok(serde_json::from_str(&content)?)
    }

    fn acquire_lock(&self) -> Result<std::fs::File> {
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| TfAuthError::CacheLocked)?;

        Ok(lock_file)
    }

    async fn persist(&self, tokens: &CachedTokens) -> Result<()> {
        let _lock = self.acquire_lock()?;

        let json = serde_json::to_string_pretty(tokens)?;

        // Write to a temp file and rename so a crash never leaves a torn record.
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, json).await?;

        let file = std::fs::File::open(&temp_path)?;
        file.sync_all()?;

        fs::rename(&temp_path, &self.path).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }

    /// Apply a mutation and persist it. The in-memory record is only replaced
    /// after the durable write succeeds.
    async fn update(&self, f: impl FnOnce(&mut CachedTokens)) -> Result<()> {
        let mut guard = self.tokens.write().await;
        let mut next = guard.clone();
        f(&mut next);
        self.persist(&next).await?;
        *guard = next;
        Ok(())
    }
}

#[async_trait::async_trait]
impl TokenStore for FileTokenStore {
    async fn access_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .valid_access_token()
            .map(str::to_string)
    }

    async fn refresh_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .present_refresh_token()
            .map(str::to_string)
    }

    async fn user_token(&self) -> Option<String> {
        self.tokens
            .read()
            .await
            .valid_user_token()
            .map(str::to_string)
    }

    async fn xsts_token(&self) -> Option<XstsToken> {
        self.tokens.read().await.valid_xsts_token()
    }

    async fn set_access_token(&self, token: &str, not_after: DateTime<Utc>) -> Result<()> {
        self.update(|t| {
            t.access_token = token.to_string();
            t.access_token_expiry = Some(not_after);
        })
        .await
    }

    async fn set_refresh_token(&self, token: &str) -> Result<()> {
        self.update(|t| t.refresh_token = token.to_string()).await
    }

    async fn set_user_token(&self, token: &str, not_after: DateTime<Utc>) -> Result<()> {
        self.update(|t| {
            t.user_token = token.to_string();
            t.user_token_expiry = Some(not_after);
        })
        .await
    }

    async fn set_xsts_token(
        &self,
        token: &str,
        user_hash: &str,
        not_after: DateTime<Utc>,
    ) -> Result<()> {
        self.update(|t| {
            t.xsts_token = token.to_string();
            t.user_hash = user_hash.to_string();
            t.xsts_token_expiry = Some(not_after);
        })
        .await
    }

    async fn clear(&self) -> Result<()> {
        let mut guard = self.tokens.write().await;

        match fs::remove_file(&self.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        *guard = CachedTokens::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    async fn create_test_store() -> (FileTokenStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(temp_dir.path().join("tokens.json"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn tokens_survive_reopening() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.json");
        let not_after = Utc::now() + Duration::hours(1);

        {
            let store = FileTokenStore::new(&path).await.unwrap();
            store.set_access_token("AT", not_after).await.unwrap();
            store.set_refresh_token("RT").await.unwrap();
            store.set_xsts_token("XT", "uhs", not_after).await.unwrap();
        }

        let reopened = FileTokenStore::new(&path).await.unwrap();
        assert_eq!(reopened.access_token().await.as_deref(), Some("AT"));
        assert_eq!(reopened.refresh_token().await.as_deref(), Some("RT"));
        let xsts = reopened.xsts_token().await.unwrap();
        assert_eq!(xsts.token, "XT");
        assert_eq!(xsts.user_hash, "uhs");
    }

    #[tokio::test]
    async fn corrupt_cache_file_is_treated_as_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.json");
        tokio::fs::write(&path, "not json {{{").await.unwrap();

        let store = FileTokenStore::new(&path).await.unwrap();
        assert_eq!(store.access_token().await, None);
        assert_eq!(store.refresh_token().await, None);

        // The store still works after starting from a corrupt file.
        store.set_refresh_token("RT").await.unwrap();
        assert_eq!(store.refresh_token().await.as_deref(), Some("RT"));
    }

    #[tokio::test]
    async fn clear_removes_the_file_and_is_idempotent() {
        let (store, temp_dir) = create_test_store().await;
        let path = temp_dir.path().join("tokens.json");
        let not_after = Utc::now() + Duration::hours(1);

        store.set_access_token("AT", not_after).await.unwrap();
        assert!(path.exists());

        store.clear().await.unwrap();
        assert!(!path.exists());
        assert_eq!(store.access_token().await, None);

        // Clearing an already-empty store is not an error.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn expired_tokens_are_absent_after_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("tokens.json");

        {
            let store = FileTokenStore::new(&path).await.unwrap();
            store
                .set_access_token("AT", Utc::now() - Duration::seconds(1))
                .await
                .unwrap();
        }

        let reopened = FileTokenStore::new(&path).await.unwrap();
        assert_eq!(reopened.access_token().await, None);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn cache_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (store, temp_dir) = create_test_store().await;
        store
            .set_access_token("AT", Utc::now() + Duration::hours(1))
            .await
            .unwrap();

        let path = temp_dir.path().join("tokens.json");
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
