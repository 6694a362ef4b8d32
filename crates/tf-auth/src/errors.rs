use thiserror::Error;

/// Authentication error types.
#[derive(Error, Debug)]
pub enum TfAuthError {
    #[error("client ID is required")]
    MissingClientId,

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP error {status}: {body_snippet}")]
    Http {
        status: reqwest::StatusCode,
        body_snippet: String,
    },

    /// The user has not completed the device sign-in yet. Consumed by the
    /// polling loop, never surfaced to callers.
    #[error("authorization pending")]
    AuthorizationPending,

    /// The provider asked us to poll less often. Consumed by the polling loop.
    #[error("provider requested slower polling")]
    SlowDown,

    /// Terminal OAuth error from the identity provider, surfaced verbatim.
    #[error("{code}: {description}")]
    OAuth { code: String, description: String },

    #[error("device code expired before the sign-in was completed")]
    DeviceCodeExpired,

    #[error("authentication cancelled")]
    Cancelled,

    #[error("not authenticated - run the sign-in flow first")]
    NotAuthenticated,

    #[error(transparent)]
    XstsDenied(#[from] XstsError),

    #[error("token cache I/O error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("token cache is locked by another process")]
    CacheLocked,

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Known error codes from the XErr field of Xbox token responses.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XstsError {
    #[error(
        "this Microsoft account has no Xbox Live profile - create one at https://www.xbox.com/"
    )]
    NoXboxAccount,

    #[error("Xbox Live is not available in this country or region")]
    RegionNotAvailable,

    #[error("the account needs adult verification at https://account.microsoft.com/")]
    AdultVerificationRequired,

    #[error("this is a child account and cannot proceed without parental consent")]
    ChildAccountBlocked,

    #[error("Xbox Live error {code}: {message}")]
    Other { code: u64, message: String },
}

impl XstsError {
    /// Map an XErr code (and optional message) to a known condition.
    pub fn from_xerr(code: u64, message: Option<String>) -> Self {
        match code {
            2148916233 => Self::NoXboxAccount,
            2148916235 => Self::RegionNotAvailable,
            2148916236 | 2148916237 => Self::AdultVerificationRequired,
            2148916238 => Self::ChildAccountBlocked,
            code => Self::Other {
                code,
                message: message.unwrap_or_default(),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, TfAuthError>;
