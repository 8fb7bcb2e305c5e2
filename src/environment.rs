use crate::error::GatewayError;

pub const SANDBOX_BASE_URL: &str = "https://api-m.sandbox.paypal.com";
pub const PRODUCTION_BASE_URL: &str = "https://api-m.paypal.com";

/// Client credentials for the provider's REST API.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub public_key: String,
    pub private_key: String,
}

// Keys must never end up in logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials").finish_non_exhaustive()
    }
}

/// Which provider endpoints to talk to, with the credentials for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Sandbox(Credentials),
    Production(Credentials),
}

impl Environment {
    pub fn credentials(&self) -> &Credentials {
        match self {
            Self::Sandbox(c) | Self::Production(c) => c,
        }
    }

    pub fn base_url(&self) -> &'static str {
        match self {
            Self::Sandbox(_) => SANDBOX_BASE_URL,
            Self::Production(_) => PRODUCTION_BASE_URL,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, Self::Production(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sandbox(_) => "sandbox",
            Self::Production(_) => "production",
        }
    }
}

/// Validate the key pair and pick the environment from the live flag alone.
pub fn resolve_environment(
    public_key: &str,
    private_key: &str,
    is_live: bool,
) -> Result<Environment, GatewayError> {
    if public_key.is_empty() || private_key.is_empty() {
        return Err(GatewayError::InvalidCredentials);
    }

    let credentials = Credentials {
        public_key: public_key.to_string(),
        private_key: private_key.to_string(),
    };

    Ok(if is_live {
        Environment::Production(credentials)
    } else {
        Environment::Sandbox(credentials)
    })
}
