use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::config::{RP_USER_AUTH, RP_XBOXLIVE, SANDBOX_RETAIL, SCOPES, TfAuthConfig};
use crate::errors::{Result, TfAuthError, XstsError};
use crate::models::*;

const GRANT_DEVICE_CODE: &str = "urn:ietf:params:oauth:grant-type:device_code";
const GRANT_REFRESH_TOKEN: &str = "refresh_token";

/// Stateless client for the four token-exchange operations.
///
/// Each operation is a single HTTP call with no retry; the device-flow poll
/// loop owns the only built-in retry in the system.
#[derive(Debug, Clone)]
pub struct TfAuthClient {
    config: TfAuthConfig,
    http: Client,
}

impl TfAuthClient {
    pub fn new(config: TfAuthConfig) -> Result<Self> {
        if config.client_id.is_empty() {
            return Err(TfAuthError::MissingClientId);
        }

        let http = Client::builder()
            .connect_timeout(config.http_timeouts.connect)
            .timeout(config.http_timeouts.request)
            .user_agent(config.user_agent.as_deref().unwrap_or("tagfinder"))
            .build()?;

        Ok(Self { config, http })
    }

    /// Request a device code from the identity provider.
    #[instrument(skip(self))]
    pub async fn request_device_code(&self) -> Result<DeviceCodeResponse> {
        debug!("requesting device code");
        let response = self
            .http
            .post(&self.config.endpoints.device_code)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("scope", SCOPES),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TfAuthError::Http {
                status,
                body_snippet: snippet(&body),
            });
        }

        Ok(response.json().await?)
    }

    /// Attempt to exchange the device code for tokens.
    ///
    /// Returns [`TfAuthError::AuthorizationPending`] / [`TfAuthError::SlowDown`]
    /// while the user has not finished signing in; other provider errors are
    /// terminal and surface verbatim.
    #[instrument(skip(self, device_code))]
    pub async fn redeem_device_code(&self, device_code: &str) -> Result<TokenResponse> {
        let response = self
            .http
            .post(&self.config.endpoints.token)
            .form(&[
                ("grant_type", GRANT_DEVICE_CODE),
                ("client_id", self.config.client_id.as_str()),
                ("device_code", device_code),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_oauth_error(status, &body));
        }

        Ok(response.json().await?)
    }

    /// Exchange a refresh token for a fresh access token.
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenResponse> {
        debug!("refreshing access token");
        let response = self
            .http
            .post(&self.config.endpoints.token)
            .form(&[
                ("grant_type", GRANT_REFRESH_TOKEN),
                ("client_id", self.config.client_id.as_str()),
                ("refresh_token", refresh_token),
                ("scope", SCOPES),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(classify_oauth_error(status, &body));
        }

        Ok(response.json().await?)
    }

    /// Exchange an access token for an Xbox Live user token.
    #[instrument(skip(self, access_token))]
    pub async fn user_authenticate(&self, access_token: &str) -> Result<XboxTokenResponse> {
        let request = XblAuthRequest {
            properties: XblAuthProperties {
                auth_method: "RPS".to_string(),
                site_name: "user.auth.xboxlive.com".to_string(),
                rps_ticket: format!("d={access_token}"),
            },
            relying_party: RP_USER_AUTH.to_string(),
            token_type: "JWT".to_string(),
        };

        debug!("exchanging access token for user token");
        self.post_xbox(&self.config.endpoints.user_authenticate, &request)
            .await
    }

    /// Exchange a user token for an XSTS token.
    ///
    /// The response's display claims carry the user hash needed to authorize
    /// directory calls.
    #[instrument(skip(self, user_token))]
    pub async fn xsts_authorize(&self, user_token: &str) -> Result<XboxTokenResponse> {
        let request = XstsAuthRequest {
            properties: XstsAuthProperties {
                sandbox_id: SANDBOX_RETAIL.to_string(),
                user_tokens: vec![user_token.to_string()],
            },
            relying_party: RP_XBOXLIVE.to_string(),
            token_type: "JWT".to_string(),
        };

        debug!("exchanging user token for XSTS token");
        self.post_xbox(&self.config.endpoints.xsts_authorize, &request)
            .await
    }

    async fn post_xbox(&self, url: &str, body: &impl Serialize) -> Result<XboxTokenResponse> {
        let response = self
            .http
            .post(url)
            .header("Accept", "application/json")
            .header("x-xbl-contract-version", "1")
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();

            if let Ok(err) = serde_json::from_str::<XboxErrorResponse>(&body)
                && err.xerr != 0
            {
                return Err(XstsError::from_xerr(err.xerr, err.message).into());
            }

            return Err(TfAuthError::Http {
                status,
                body_snippet: snippet(&body),
            });
        }

        Ok(response.json().await?)
    }
}

fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}

fn classify_oauth_error(status: reqwest::StatusCode, body: &str) -> TfAuthError {
    match serde_json::from_str::<OAuthErrorResponse>(body) {
        Ok(err) => match err.error.as_str() {
            "authorization_pending" => TfAuthError::AuthorizationPending,
            "slow_down" => TfAuthError::SlowDown,
            _ => TfAuthError::OAuth {
                code: err.error,
                description: err.error_description.unwrap_or_default(),
            },
        },
        Err(_) => TfAuthError::Http {
            status,
            body_snippet: snippet(body),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> TfAuthClient {
        TfAuthClient::new(TfAuthConfig::for_tests(&server.uri())).unwrap()
    }

    #[test]
    fn empty_client_id_is_rejected() {
        let result = TfAuthClient::new(TfAuthConfig::new(""));
        assert!(matches!(result, Err(TfAuthError::MissingClientId)));
    }

    #[tokio::test]
    async fn device_code_request_parses_the_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devicecode"))
            .and(body_string_contains("client_id=test-client-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "user_code": "ABC-123",
                "device_code": "xyz",
                "verification_uri": "https://www.microsoft.com/link",
                "expires_in": 900,
                "interval": 5,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let grant = client_for(&server).await.request_device_code().await.unwrap();
        assert_eq!(grant.user_code, "ABC-123");
        assert_eq!(grant.device_code, "xyz");
        assert_eq!(grant.expires_in, 900);
        assert_eq!(grant.interval, 5);
    }

    #[tokio::test]
    async fn device_code_request_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/devicecode"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.request_device_code().await.unwrap_err();
        assert!(matches!(err, TfAuthError::Http { status, .. } if status.as_u16() == 500));
    }

    #[tokio::test]
    async fn pending_and_slow_down_are_distinguished_signals() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code=pending-code"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "authorization_pending",
                "error_description": "user has not signed in yet",
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code=slow-code"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "slow_down",
            })))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        assert!(matches!(
            client.redeem_device_code("pending-code").await,
            Err(TfAuthError::AuthorizationPending)
        ));
        assert!(matches!(
            client.redeem_device_code("slow-code").await,
            Err(TfAuthError::SlowDown)
        ));
    }

    #[tokio::test]
    async fn terminal_oauth_errors_surface_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "authorization_declined",
                "error_description": "the user declined the request",
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .redeem_device_code("xyz")
            .await
            .unwrap_err();
        match err {
            TfAuthError::OAuth { code, description } => {
                assert_eq!(code, "authorization_declined");
                assert_eq!(description, "the user declined the request");
            }
            other => panic!("expected OAuth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn successful_redeem_parses_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("device_code=xyz"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_type": "Bearer",
                "access_token": "AT1",
                "refresh_token": "RT1",
                "expires_in": 3600,
            })))
            .mount(&server)
            .await;

        let token = client_for(&server)
            .await
            .redeem_device_code("xyz")
            .await
            .unwrap();
        assert_eq!(token.access_token, "AT1");
        assert_eq!(token.refresh_token.as_deref(), Some("RT1"));
        assert_eq!(token.expires_in, 3600);
    }

    #[tokio::test]
    async fn refresh_sends_the_refresh_grant() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=RT1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "AT2",
                "refresh_token": "RT2",
                "expires_in": 3600,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = client_for(&server)
            .await
            .refresh_access_token("RT1")
            .await
            .unwrap();
        assert_eq!(token.access_token, "AT2");
        assert_eq!(token.refresh_token.as_deref(), Some("RT2"));
    }

    #[tokio::test]
    async fn user_authenticate_sends_the_rps_ticket() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/user/authenticate"))
            .and(header("x-xbl-contract-version", "1"))
            .and(body_json(json!({
                "Properties": {
                    "AuthMethod": "RPS",
                    "SiteName": "user.auth.xboxlive.com",
                    "RpsTicket": "d=AT1",
                },
                "RelyingParty": "http://auth.xboxlive.com",
                "TokenType": "JWT",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "IssueInstant": "2024-01-01T00:00:00Z",
                "NotAfter": "2024-01-01T16:00:00Z",
                "Token": "UT1",
                "DisplayClaims": {"xui": [{"uhs": "hash1"}]},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let user = client_for(&server)
            .await
            .user_authenticate("AT1")
            .await
            .unwrap();
        assert_eq!(user.token, "UT1");
        assert_eq!(user.user_hash(), "hash1");
    }

    #[tokio::test]
    async fn xsts_authorize_extracts_the_user_hash() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .and(body_json(json!({
                "Properties": {
                    "SandboxId": "RETAIL",
                    "UserTokens": ["UT1"],
                },
                "RelyingParty": "http://xboxlive.com",
                "TokenType": "JWT",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "NotAfter": "2024-01-01T16:00:00Z",
                "Token": "XT1",
                "DisplayClaims": {"xui": [{"uhs": "hash1"}]},
            })))
            .mount(&server)
            .await;

        let xsts = client_for(&server).await.xsts_authorize("UT1").await.unwrap();
        assert_eq!(xsts.token, "XT1");
        assert_eq!(xsts.user_hash(), "hash1");
    }

    #[tokio::test]
    async fn xsts_known_error_codes_map_to_conditions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "Identity": "0",
                "XErr": 2148916233u64,
                "Message": "",
                "Redirect": "https://start.ui.xboxlive.com/CreateAccount",
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).await.xsts_authorize("UT1").await.unwrap_err();
        assert!(matches!(
            err,
            TfAuthError::XstsDenied(XstsError::NoXboxAccount)
        ));
    }

    #[tokio::test]
    async fn xsts_unknown_error_code_keeps_code_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "XErr": 123456u64,
                "Message": "something else",
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).await.xsts_authorize("UT1").await.unwrap_err();
        match err {
            TfAuthError::XstsDenied(XstsError::Other { code, message }) => {
                assert_eq!(code, 123456);
                assert_eq!(message, "something else");
            }
            other => panic!("expected XstsDenied, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn xsts_unparsable_error_body_surfaces_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/xsts/authorize"))
            .respond_with(ResponseTemplate::new(503).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let err = client_for(&server).await.xsts_authorize("UT1").await.unwrap_err();
        assert!(matches!(err, TfAuthError::Http { status, .. } if status.as_u16() == 503));
    }
}
