use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::environment::Environment;
use crate::orders::CreateOrderBody;

const ORDERS_PATH: &str = "/v2/checkout/orders";
const TOKEN_PATH: &str = "/v1/oauth2/token";
const PREFER_REPRESENTATION: &str = "return=representation";

/// Refresh the bearer token this long before the provider says it expires.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Which Orders API call a request is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    Capture,
}

/// A single call to the provider's Orders API.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderRequest {
    Create {
        body: CreateOrderBody,
        prefer_full_representation: bool,
    },
    Capture {
        order_id: String,
        prefer_full_representation: bool,
    },
}

impl OrderRequest {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Create { .. } => Operation::Create,
            Self::Capture { .. } => Operation::Capture,
        }
    }

    /// Path relative to the environment's base URL.
    pub fn path(&self) -> String {
        match self {
            Self::Create { .. } => ORDERS_PATH.to_string(),
            Self::Capture { order_id, .. } => format!("{ORDERS_PATH}/{order_id}/capture"),
        }
    }

    pub fn prefer_full_representation(&self) -> bool {
        match self {
            Self::Create {
                prefer_full_representation,
                ..
            }
            | Self::Capture {
                prefer_full_representation,
                ..
            } => *prefer_full_representation,
        }
    }
}

/// A successful (2xx) provider response with its decoded JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status_code: u16,
    pub result: Value,
}

impl HttpResponse {
    pub fn new(status_code: u16, result: Value) -> Self {
        Self {
            status_code,
            result,
        }
    }
}

/// Failure raised by an [`HttpClient`]. The display text is the bare message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("{0}")]
    Network(String),

    #[error("{0}")]
    Decode(String),

    #[error("{0}")]
    Auth(String),
}

/// Capability that delivers an [`OrderRequest`] to the provider.
///
/// Any timeout policy belongs to the implementation.
pub trait HttpClient: Send + Sync {
    fn execute(&self, request: &OrderRequest) -> Result<HttpResponse, TransportError>;
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

/// Blocking REST client for the provider, authenticating with OAuth2 client
/// credentials and caching the bearer token until shortly before it expires.
pub struct PayPalHttpClient {
    environment: Environment,
    base_url: String,
    http: reqwest::blocking::Client,
    token: Mutex<Option<AccessToken>>,
}

impl std::fmt::Debug for PayPalHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalHttpClient")
            .field("environment", &self.environment.as_str())
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl PayPalHttpClient {
    pub fn new(environment: Environment) -> Self {
        Self {
            base_url: environment.base_url().to_string(),
            environment,
            http: reqwest::blocking::Client::new(),
            token: Mutex::new(None),
        }
    }

    /// Point the client at another host (a proxy or a local test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, TransportError> {
        self.http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        Ok(self)
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn access_token(&self) -> Result<String, TransportError> {
        let mut cached = self.token.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let credentials = self.environment.credentials();
        let url = format!("{}{TOKEN_PATH}", self.base_url);
        debug!(url = %url, "requesting access token");

        let response = self
            .http
            .post(&url)
            .basic_auth(&credentials.public_key, Some(&credentials.private_key))
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", "client_credentials")])
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        if !status.is_success() {
            return Err(TransportError::Auth(text));
        }

        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(0));
        let value = token.access_token;
        *cached = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime.saturating_sub(TOKEN_EXPIRY_MARGIN),
        });
        Ok(value)
    }
}

impl HttpClient for PayPalHttpClient {
    fn execute(&self, request: &OrderRequest) -> Result<HttpResponse, TransportError> {
        let token = self.access_token()?;
        let url = format!("{}{}", self.base_url, request.path());
        debug!(url = %url, operation = ?request.operation(), "sending order request");

        let mut builder = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json");
        if request.prefer_full_representation() {
            builder = builder.header("Prefer", PREFER_REPRESENTATION);
        }
        builder = match request {
            OrderRequest::Create { body, .. } => builder.json(body),
            OrderRequest::Capture { .. } => builder.body("{}"),
        };

        let response = builder
            .send()
            .map_err(|e| TransportError::Network(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                message: text,
            });
        }

        let result = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| TransportError::Decode(e.to_string()))?
        };
        Ok(HttpResponse::new(status.as_u16(), result))
    }
}
