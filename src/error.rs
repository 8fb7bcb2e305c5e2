use thiserror::Error;

/// Failures returned by [`crate::gateway::Gateway::checkout`] and
/// [`crate::gateway::Gateway::process`].
///
/// The set is closed: every validation gate and every provider failure maps to
/// exactly one variant, and nothing else escapes the public API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("Invalid public or private keys.")]
    InvalidCredentials,

    #[error("Invalid return or cancel URL.")]
    InvalidUrls,

    #[error("Invalid amount.")]
    InvalidAmount,

    #[error("Invalid Order ID.")]
    InvalidOrderId,

    /// The client capability failed; carries its message untouched.
    #[error("{0}")]
    Broke(String),

    #[error("Failed processing paypal response data!")]
    EmptyResponse,

    #[error("Failed processing paypal response url!")]
    EmptyApproveUrl,
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::InvalidUrls => ErrorKind::InvalidUrls,
            Self::InvalidAmount => ErrorKind::InvalidAmount,
            Self::InvalidOrderId => ErrorKind::InvalidOrderId,
            Self::Broke(_) => ErrorKind::Broke,
            Self::EmptyResponse => ErrorKind::EmptyResponse,
            Self::EmptyApproveUrl => ErrorKind::EmptyApproveUrl,
        }
    }

    /// Human-readable message, identical to the `Display` output.
    pub fn message(&self) -> String {
        self.to_string()
    }
}

/// Tag of a [`GatewayError`], with a stable machine code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidCredentials,
    InvalidUrls,
    InvalidAmount,
    InvalidOrderId,
    Broke,
    EmptyResponse,
    EmptyApproveUrl,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "invalid_keys",
            Self::InvalidUrls => "invalid_urls",
            Self::InvalidAmount => "invalid_amount",
            Self::InvalidOrderId => "invalid_order_id",
            Self::Broke => "broke",
            Self::EmptyResponse => "empty_response",
            Self::EmptyApproveUrl => "empty_approve",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}
