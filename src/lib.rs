pub mod client;
pub mod config;
pub mod environment;
pub mod error;
pub mod gateway;
pub mod orders;
pub mod store;
pub mod types;

pub use client::{
    HttpClient, HttpResponse, Operation, OrderRequest, PayPalHttpClient, TransportError,
};
pub use config::GatewayConfig;
pub use environment::{resolve_environment, Environment};
pub use error::{ErrorKind, GatewayError};
pub use gateway::{Gateway, Redirect};
pub use store::{CorrelationStore, SqliteStore, CHECKOUT_TTL};
pub use types::{Payment, PendingCheckout, Transaction, TransactionStatus};
