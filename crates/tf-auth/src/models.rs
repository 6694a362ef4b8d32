use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response from the device authorization endpoint (RFC 8628).
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceCodeResponse {
    pub user_code: String,
    pub device_code: String,
    pub verification_uri: String,
    /// Total validity window of the device code, in seconds.
    pub expires_in: u64,
    /// Polling interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub interval: u64,
    #[serde(default)]
    pub message: Option<String>,
}

fn default_poll_interval() -> u64 {
    5
}

/// OAuth token response (device-code and refresh-token grants).
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token lifetime in seconds.
    pub expires_in: u64,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

/// OAuth error body from the identity provider.
#[derive(Debug, Clone, Deserialize)]
pub struct OAuthErrorResponse {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Xbox Live user.authenticate request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XblAuthRequest {
    pub properties: XblAuthProperties,
    pub relying_party: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XblAuthProperties {
    pub auth_method: String,
    pub site_name: String,
    pub rps_ticket: String,
}

/// XSTS authorize request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsAuthRequest {
    pub properties: XstsAuthProperties,
    pub relying_party: String,
    pub token_type: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct XstsAuthProperties {
    pub sandbox_id: String,
    pub user_tokens: Vec<String>,
}

/// Response from both Xbox token endpoints (user.authenticate and
/// xsts/authorize share a shape).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XboxTokenResponse {
    pub token: String,
    /// Absolute expiry instant.
    pub not_after: DateTime<Utc>,
    #[serde(default)]
    pub issue_instant: Option<DateTime<Utc>>,
    pub display_claims: DisplayClaims,
}

impl XboxTokenResponse {
    /// User hash from the first `xui` claim, empty string when absent.
    pub fn user_hash(&self) -> String {
        self.display_claims
            .xui
            .first()
            .and_then(|claim| claim.uhs.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayClaims {
    #[serde(default)]
    pub xui: Vec<XuiClaim>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct XuiClaim {
    #[serde(default)]
    pub uhs: Option<String>,
}

/// Error body from the Xbox token endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct XboxErrorResponse {
    #[serde(rename = "XErr", default)]
    pub xerr: u64,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub redirect: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_code_interval_defaults_to_five() {
        let resp: DeviceCodeResponse = serde_json::from_str(
            r#"{"user_code":"ABC-123","device_code":"xyz","verification_uri":"https://microsoft.com/devicelogin","expires_in":900}"#,
        )
        .unwrap();
        assert_eq!(resp.interval, 5);
    }

    #[test]
    fn xbox_response_parses_not_after_and_user_hash() {
        let resp: XboxTokenResponse = serde_json::from_str(
            r#"{
                "IssueInstant": "2024-01-01T00:00:00.0000000Z",
                "NotAfter": "2024-01-01T16:00:00.0000000Z",
                "Token": "tok",
                "DisplayClaims": {"xui": [{"uhs": "hash123"}]}
            }"#,
        )
        .unwrap();
        assert_eq!(resp.user_hash(), "hash123");
        assert_eq!(resp.not_after.to_rfc3339(), "2024-01-01T16:00:00+00:00");
    }

    #[test]
    fn user_hash_is_empty_when_claims_missing() {
        let resp: XboxTokenResponse = serde_json::from_str(
            r#"{"NotAfter": "2024-01-01T16:00:00Z", "Token": "tok", "DisplayClaims": {"xui": []}}"#,
        )
        .unwrap();
        assert_eq!(resp.user_hash(), "");
    }
}
