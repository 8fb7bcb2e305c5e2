use clap::{Args, Parser, Subcommand};

use paypal_gateway::config::GatewayConfig;

#[derive(Debug, Parser)]
#[command(name = "paypal-gateway")]
#[command(about = "Create, approve and capture PayPal checkout orders.")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,
}

/// Gateway settings. Flags override values from `--config`.
#[derive(Debug, Args)]
pub struct SettingsArgs {
    /// JSON config file
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// REST API client id
    #[arg(long, global = true)]
    pub public_key: Option<String>,

    /// REST API client secret
    #[arg(long, global = true)]
    pub private_key: Option<String>,

    /// Use production endpoints instead of the sandbox
    #[arg(long, global = true)]
    pub live: bool,

    /// Where the provider sends the buyer after approval
    #[arg(long, global = true)]
    pub return_url: Option<String>,

    /// Where the provider sends the buyer after cancelling
    #[arg(long, global = true)]
    pub cancel_url: Option<String>,

    /// Pending-checkout store path
    #[arg(long, global = true)]
    pub store: Option<String>,

    /// Keep running after emitting a checkout redirect
    #[arg(long, global = true)]
    pub no_exit: bool,
}

impl SettingsArgs {
    /// Load the config file (if any) and apply flag overrides.
    pub fn resolve(&self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::load(path)?,
            None => GatewayConfig::default(),
        };
        if let Some(key) = &self.public_key {
            config.public_key = key.clone();
        }
        if let Some(key) = &self.private_key {
            config.private_key = key.clone();
        }
        if self.live {
            config.live = true;
        }
        if let Some(url) = &self.return_url {
            config.return_url = url.clone();
        }
        if let Some(url) = &self.cancel_url {
            config.cancel_url = url.clone();
        }
        if let Some(path) = &self.store {
            config.store_path = path.clone();
        }
        if self.no_exit {
            config.suppress_termination = true;
        }
        Ok(config)
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create an order and print the redirect to its approval page
    Checkout {
        /// Amount to charge, e.g. 100 or 12.50
        #[arg(long)]
        amount: String,

        /// ISO currency code
        #[arg(long, default_value = "USD")]
        currency: String,

        /// Invoice the order belongs to
        #[arg(long)]
        invoice_id: Option<String>,

        /// Form identifier stored with the pending checkout
        #[arg(long)]
        form: Option<String>,
    },

    /// Capture an approved order
    Process {
        /// Provider order id (looked up from --invoice-id when omitted)
        #[arg(long)]
        order_id: Option<String>,

        /// Invoice whose pending checkout should be captured and cleared
        #[arg(long)]
        invoice_id: Option<String>,
    },

    /// Show the pending checkout recorded for an invoice
    Pending {
        /// Invoice id
        invoice_id: String,
    },

    /// Remove expired pending checkouts
    Purge,
}
