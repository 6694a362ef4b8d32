use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::TfAuthClient;
use crate::errors::{Result, TfAuthError};
use crate::store::TokenStore;

/// Run the device authorization flow to completion.
///
/// Requests a device code, shows the user where to enter it, then polls the
/// token endpoint at the provider interval until the user finishes signing in,
/// the code expires, or `cancel` fires. On success the access and refresh
/// tokens are persisted; user/XSTS tokens are left for the chain resolver to
/// derive on first use.
pub(crate) async fn run(
    client: &TfAuthClient,
    store: &dyn TokenStore,
    cancel: &CancellationToken,
) -> Result<()> {
    let grant = client.request_device_code().await?;

    println!();
    println!("To sign in, use a web browser to open the page:");
    println!("    {}", grant.verification_uri);
    println!();
    println!("And enter the code:");
    println!("    {}", grant.user_code);
    println!();

    info!(
        interval = grant.interval,
        expires_in = grant.expires_in,
        "waiting for the user to complete the sign-in"
    );

    let deadline = Instant::now() + Duration::from_secs(grant.expires_in);
    let mut interval = Duration::from_secs(grant.interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("device flow cancelled");
                return Err(TfAuthError::Cancelled);
            }
            _ = tokio::time::sleep(interval) => {}
        }

        if Instant::now() >= deadline {
            return Err(TfAuthError::DeviceCodeExpired);
        }

        match client.redeem_device_code(&grant.device_code).await {
            Ok(token) => {
                let not_after = Utc::now() + chrono::Duration::seconds(token.expires_in as i64);
                store.set_access_token(&token.access_token, not_after).await?;
                if let Some(refresh) = token.refresh_token.as_deref()
                    && !refresh.is_empty()
                {
                    store.set_refresh_token(refresh).await?;
                }

                info!("device sign-in completed");
                return Ok(());
            }
            Err(TfAuthError::AuthorizationPending) => {
                debug!("authorization pending, polling again");
            }
            Err(TfAuthError::SlowDown) => {
                interval += Duration::from_secs(5);
                warn!(
                    interval_secs = interval.as_secs(),
                    "provider asked us to slow down"
                );
            }
            Err(e) => return Err(e),
        }
    }
}
