use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// XSTS token paired with the user hash that authorizes directory calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XstsToken {
    pub token: String,
    pub user_hash: String,
}

impl XstsToken {
    /// `Authorization` header value for Xbox Live APIs.
    pub fn authorization_header(&self) -> String {
        format!("XBL3.0 x={};{}", self.user_hash, self.token)
    }
}

/// The full cached credential record, persisted as one JSON object.
///
/// Empty strings mean "absent"; a token is usable only while the current time
/// is strictly before its expiry. The refresh token carries no expiry.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedTokens {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub access_token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub user_token: String,
    #[serde(default)]
    pub user_token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub xsts_token: String,
    #[serde(default)]
    pub xsts_token_expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_hash: String,
}

fn live(token: &str, expiry: Option<DateTime<Utc>>) -> bool {
    !token.is_empty() && expiry.is_some_and(|e| Utc::now() < e)
}

impl CachedTokens {
    pub fn valid_access_token(&self) -> Option<&str> {
        live(&self.access_token, self.access_token_expiry).then_some(self.access_token.as_str())
    }

    pub fn present_refresh_token(&self) -> Option<&str> {
        (!self.refresh_token.is_empty()).then_some(self.refresh_token.as_str())
    }

    pub fn valid_user_token(&self) -> Option<&str> {
        live(&self.user_token, self.user_token_expiry).then_some(self.user_token.as_str())
    }

    /// The XSTS token is usable only together with its user hash.
    pub fn valid_xsts_token(&self) -> Option<XstsToken> {
        (live(&self.xsts_token, self.xsts_token_expiry) && !self.user_hash.is_empty()).then(|| {
            XstsToken {
                token: self.xsts_token.clone(),
                user_hash: self.user_hash.clone(),
            }
        })
    }
}
