use std::time::Duration;

/// Microsoft identity and Xbox Live endpoints.
pub mod endpoints {
    pub const DEVICE_CODE: &str =
        "https://login.microsoftonline.com/consumers/oauth2/v2.0/devicecode";
    pub const TOKEN: &str = "https://login.microsoftonline.com/consumers/oauth2/v2.0/token";
    pub const USER_AUTHENTICATE: &str = "https://user.auth.xboxlive.com/user/authenticate";
    pub const XSTS_AUTHORIZE: &str = "https://xsts.auth.xboxlive.com/xsts/authorize";
}

/// OAuth scopes requested from the identity provider.
pub const SCOPES: &str = "Xboxlive.signin Xboxlive.offline_access";

/// Relying party for the user-token exchange.
pub const RP_USER_AUTH: &str = "http://auth.xboxlive.com";

/// Relying party for the XSTS exchange.
pub const RP_XBOXLIVE: &str = "http://xboxlive.com";

/// Sandbox requested from XSTS.
pub const SANDBOX_RETAIL: &str = "RETAIL";

/// HTTP client timeouts.
#[derive(Debug, Clone)]
pub struct HttpTimeouts {
    pub connect: Duration,
    pub request: Duration,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(15),
            request: Duration::from_secs(30),
        }
    }
}

/// Resolved endpoint set. Production values are fixed; tests swap in a mock
/// server through the crate-private constructor.
#[derive(Debug, Clone)]
pub(crate) struct Endpoints {
    pub(crate) device_code: String,
    pub(crate) token: String,
    pub(crate) user_authenticate: String,
    pub(crate) xsts_authorize: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            device_code: endpoints::DEVICE_CODE.to_string(),
            token: endpoints::TOKEN.to_string(),
            user_authenticate: endpoints::USER_AUTHENTICATE.to_string(),
            xsts_authorize: endpoints::XSTS_AUTHORIZE.to_string(),
        }
    }
}

#[cfg(test)]
impl Endpoints {
    pub(crate) fn with_base(base: &str) -> Self {
        Self {
            device_code: format!("{base}/devicecode"),
            token: format!("{base}/token"),
            user_authenticate: format!("{base}/user/authenticate"),
            xsts_authorize: format!("{base}/xsts/authorize"),
        }
    }
}

/// Configuration for the authentication client.
#[derive(Debug, Clone)]
pub struct TfAuthConfig {
    /// Microsoft Entra ID application client ID (required).
    pub client_id: String,

    /// HTTP client timeouts.
    pub http_timeouts: HttpTimeouts,

    /// Custom user agent (optional).
    pub user_agent: Option<String>,

    pub(crate) endpoints: Endpoints,
}

impl TfAuthConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some("tagfinder".to_string()),
            endpoints: Endpoints::default(),
        }
    }

    #[cfg(test)]
    pub(crate) fn for_tests(base: &str) -> Self {
        Self {
            client_id: "test-client-id".to_string(),
            http_timeouts: HttpTimeouts::default(),
            user_agent: Some("tagfinder-tests".to_string()),
            endpoints: Endpoints::with_base(base),
        }
    }
}
