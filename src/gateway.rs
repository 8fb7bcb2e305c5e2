use std::io::Write;
use std::sync::{Arc, Mutex};

use bigdecimal::{BigDecimal, Zero};
use tracing::{debug, info, warn};

use crate::client::{HttpClient, OrderRequest, PayPalHttpClient};
use crate::config::GatewayConfig;
use crate::environment::{resolve_environment, Environment};
use crate::error::GatewayError;
use crate::orders::{CaptureOrderResponse, CreateOrderBody, CreateOrderResponse};
use crate::store::{CorrelationStore, CHECKOUT_TTL};
use crate::types::{Payment, PendingCheckout, Transaction, TransactionStatus};

pub const DEFAULT_CURRENCY: &str = "USD";

/// HTTP "See Other": the buyer's browser follows it with a GET.
pub const REDIRECT_STATUS: u16 = 303;

/// Instruction to send the buyer to the provider's approval page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub location: String,
    terminate: bool,
}

impl Redirect {
    pub fn new(location: impl Into<String>, terminate: bool) -> Self {
        Self {
            location: location.into(),
            terminate,
        }
    }

    pub fn status_code(&self) -> u16 {
        REDIRECT_STATUS
    }

    pub fn reason(&self) -> &'static str {
        "See Other"
    }

    pub fn headers(&self) -> Vec<(&'static str, &str)> {
        vec![("Location", self.location.as_str())]
    }

    /// Whether the embedding handler must end the request cycle right after
    /// emitting this redirect.
    pub fn terminate(&self) -> bool {
        self.terminate
    }

    /// Write the status line and headers.
    pub fn write_to<W: Write>(&self, mut out: W) -> std::io::Result<()> {
        write!(out, "HTTP/1.1 {} {}\r\n", self.status_code(), self.reason())?;
        for (name, value) in self.headers() {
            write!(out, "{name}: {value}\r\n")?;
        }
        write!(out, "\r\n")?;
        out.flush()
    }
}

/// Two-phase checkout against the provider's Orders API: `checkout` creates an
/// order and redirects the buyer, `process` captures it afterwards.
///
/// Setters never validate; every check happens in the workflow methods, before
/// any network call.
pub struct Gateway {
    payment: Payment,
    public_key: String,
    private_key: String,
    is_live: bool,
    return_url: String,
    cancel_url: String,
    order_id: String,
    suppress_termination: bool,
    client: Option<Arc<dyn HttpClient>>,
    /// Built on first use when no client is injected, so its token cache
    /// outlives a single call. Rebuilt when the environment changes.
    default_client: Mutex<Option<Arc<PayPalHttpClient>>>,
    store: Option<Arc<dyn CorrelationStore>>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("payment", &self.payment)
            .field("is_live", &self.is_live)
            .field("return_url", &self.return_url)
            .field("cancel_url", &self.cancel_url)
            .field("order_id", &self.order_id)
            .field("suppress_termination", &self.suppress_termination)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    pub fn new(public_key: impl Into<String>, private_key: impl Into<String>, live: bool) -> Self {
        Self {
            payment: Payment::new(BigDecimal::zero(), DEFAULT_CURRENCY),
            public_key: public_key.into(),
            private_key: private_key.into(),
            is_live: live,
            return_url: String::new(),
            cancel_url: String::new(),
            order_id: String::new(),
            suppress_termination: false,
            client: None,
            default_client: Mutex::new(None),
            store: None,
        }
    }

    /// Build a gateway from loaded configuration.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let mut gateway = Self::new(&config.public_key, &config.private_key, config.live);
        gateway
            .set_return_url(&config.return_url)
            .set_cancel_url(&config.cancel_url)
            .set_suppress_termination(config.suppress_termination);
        gateway
    }

    /// Use this client instead of building one from the environment.
    pub fn with_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Record pending checkouts in this store.
    pub fn with_store(mut self, store: Arc<dyn CorrelationStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Resolve the provider environment from the current keys and live flag.
    pub fn environment(&self) -> Result<Environment, GatewayError> {
        resolve_environment(&self.public_key, &self.private_key, self.is_live)
    }

    fn http_client(&self, environment: &Environment) -> Arc<dyn HttpClient> {
        match &self.client {
            Some(client) => Arc::clone(client),
            None => self.paypal_client(environment),
        }
    }

    fn paypal_client(&self, environment: &Environment) -> Arc<PayPalHttpClient> {
        let mut cached = self.default_client.lock().unwrap_or_else(|e| e.into_inner());
        match cached.as_ref() {
            Some(client) if client.environment() == environment => Arc::clone(client),
            _ => {
                debug!(environment = environment.as_str(), "building provider client");
                let client = Arc::new(PayPalHttpClient::new(environment.clone()));
                *cached = Some(Arc::clone(&client));
                client
            }
        }
    }

    /// Phase one: create an order and return the redirect to its approval page.
    ///
    /// Checks run in order (credentials, URLs, amount) and the first failure is
    /// returned. On success the provider's order id is kept on the gateway and,
    /// when both an invoice id and `form` are present, a pending-checkout record
    /// is written under the invoice id for [`CHECKOUT_TTL`].
    pub fn checkout(&mut self, form: Option<&str>) -> Result<Redirect, GatewayError> {
        let environment = self.environment()?;

        if self.return_url.is_empty() || self.cancel_url.is_empty() {
            return Err(GatewayError::InvalidUrls);
        }
        if self.payment.amount <= BigDecimal::zero() {
            return Err(GatewayError::InvalidAmount);
        }

        let request = OrderRequest::Create {
            body: CreateOrderBody::capture(
                &self.payment.invoice_id,
                &self.payment.amount,
                &self.payment.currency,
                &self.return_url,
                &self.cancel_url,
            ),
            prefer_full_representation: true,
        };
        debug!(
            environment = environment.as_str(),
            invoice_id = %self.payment.invoice_id,
            "creating order"
        );

        let response = self
            .http_client(&environment)
            .execute(&request)
            .map_err(|e| GatewayError::Broke(e.to_string()))?;
        let order = CreateOrderResponse::validate(&response.result)?;
        info!(order_id = %order.id, "order created");

        let form = form.unwrap_or_default();
        if !self.payment.invoice_id.is_empty() && !form.is_empty() {
            let record = PendingCheckout::new(form, self.payment.amount.clone(), &order.id);
            self.remember(&record);
        }

        self.order_id = order.id;
        info!(location = %order.approve_url, "redirecting buyer for approval");
        Ok(Redirect::new(order.approve_url, !self.suppress_termination))
    }

    /// Phase two: capture the order named by `order_id`.
    ///
    /// The transaction is `Paid` only when the provider reports `COMPLETED`;
    /// any other status leaves it `Pending`. The pending-checkout record for
    /// the invoice is removed whatever the status.
    pub fn process(&self) -> Result<Transaction, GatewayError> {
        let environment = self.environment()?;

        if self.order_id.is_empty() {
            return Err(GatewayError::InvalidOrderId);
        }

        let mut transaction = Transaction::new()
            .with_status(TransactionStatus::Pending)
            .with_reference_id(&self.order_id);

        let request = OrderRequest::Capture {
            order_id: self.order_id.clone(),
            prefer_full_representation: true,
        };
        debug!(environment = environment.as_str(), order_id = %self.order_id, "capturing order");

        let response = self
            .http_client(&environment)
            .execute(&request)
            .map_err(|e| GatewayError::Broke(e.to_string()))?;
        let capture = CaptureOrderResponse::decode(&response.result);

        if capture.is_completed() {
            transaction = transaction.with_status(TransactionStatus::Paid);
        }
        transaction = transaction.with_message(format!("Transaction is {}", capture.status()));

        if !self.payment.invoice_id.is_empty() {
            self.forget(&self.payment.invoice_id);
        }

        info!(
            order_id = %self.order_id,
            provider_status = capture.status(),
            status = %transaction.status,
            "order captured"
        );
        Ok(transaction)
    }

    fn remember(&self, record: &PendingCheckout) {
        let Some(store) = &self.store else {
            debug!("no correlation store configured, skipping pending record");
            return;
        };
        if let Err(e) = store.set(&self.payment.invoice_id, record, CHECKOUT_TTL) {
            warn!(
                error = %e,
                invoice_id = %self.payment.invoice_id,
                "failed to store pending checkout"
            );
        }
    }

    fn forget(&self, invoice_id: &str) {
        let Some(store) = &self.store else {
            return;
        };
        if let Err(e) = store.delete(invoice_id) {
            warn!(error = %e, invoice_id = %invoice_id, "failed to delete pending checkout");
        }
    }

    // ── Accessors ──

    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    pub fn set_public_key(&mut self, public_key: impl Into<String>) -> &mut Self {
        self.public_key = public_key.into();
        self
    }

    pub fn private_key(&self) -> &str {
        &self.private_key
    }

    pub fn set_private_key(&mut self, private_key: impl Into<String>) -> &mut Self {
        self.private_key = private_key.into();
        self
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn set_is_live(&mut self, live: bool) -> &mut Self {
        self.is_live = live;
        self
    }

    pub fn return_url(&self) -> &str {
        &self.return_url
    }

    pub fn set_return_url(&mut self, return_url: impl Into<String>) -> &mut Self {
        self.return_url = return_url.into();
        self
    }

    pub fn cancel_url(&self) -> &str {
        &self.cancel_url
    }

    pub fn set_cancel_url(&mut self, cancel_url: impl Into<String>) -> &mut Self {
        self.cancel_url = cancel_url.into();
        self
    }

    pub fn order_id(&self) -> &str {
        &self.order_id
    }

    pub fn set_order_id(&mut self, order_id: impl Into<String>) -> &mut Self {
        self.order_id = order_id.into();
        self
    }

    pub fn suppress_termination(&self) -> bool {
        self.suppress_termination
    }

    pub fn set_suppress_termination(&mut self, suppress: bool) -> &mut Self {
        self.suppress_termination = suppress;
        self
    }

    pub fn payment(&self) -> &Payment {
        &self.payment
    }

    pub fn amount(&self) -> &BigDecimal {
        &self.payment.amount
    }

    pub fn set_amount(&mut self, amount: impl Into<BigDecimal>) -> &mut Self {
        self.payment.amount = amount.into();
        self
    }

    pub fn currency(&self) -> &str {
        &self.payment.currency
    }

    pub fn set_currency(&mut self, currency: impl Into<String>) -> &mut Self {
        self.payment.currency = currency.into();
        self
    }

    pub fn invoice_id(&self) -> &str {
        &self.payment.invoice_id
    }

    pub fn set_invoice_id(&mut self, invoice_id: impl Into<String>) -> &mut Self {
        self.payment.invoice_id = invoice_id.into();
        self
    }

    pub fn set_client(&mut self, client: Arc<dyn HttpClient>) -> &mut Self {
        self.client = Some(client);
        self
    }

    pub fn set_store(&mut self, store: Arc<dyn CorrelationStore>) -> &mut Self {
        self.store = Some(store);
        self
    }
}
