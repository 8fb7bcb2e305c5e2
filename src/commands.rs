use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use bigdecimal::BigDecimal;
use serde::Serialize;
use tracing::debug;

use paypal_gateway::config::GatewayConfig;
use paypal_gateway::error::GatewayError;
use paypal_gateway::gateway::Gateway;
use paypal_gateway::store::{CorrelationStore, SqliteStore};

fn open_store(config: &GatewayConfig) -> Result<Arc<SqliteStore>> {
    let store =
        SqliteStore::open(&config.store_path).context("Failed to open pending-checkout store")?;
    Ok(Arc::new(store))
}

fn gateway_failure(err: GatewayError) -> anyhow::Error {
    anyhow!("{} ({})", err, err.kind())
}

/// Print `data` as pretty JSON if `json` is true, otherwise call `human_fmt`.
fn output<T: Serialize>(data: &T, json: bool, human_fmt: impl FnOnce(&T)) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(data)?);
    } else {
        human_fmt(data);
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct CheckoutOutput {
    status: u16,
    location: String,
    order_id: String,
}

/// Create an order and emit the redirect to its approval page.
pub fn cmd_checkout(
    config: &GatewayConfig,
    amount: &str,
    currency: &str,
    invoice_id: Option<&str>,
    form: Option<&str>,
    json: bool,
) -> Result<()> {
    let amount =
        BigDecimal::from_str(amount).with_context(|| format!("Invalid amount '{amount}'"))?;
    let store = open_store(config)?;

    let mut gateway = Gateway::from_config(config).with_store(store);
    gateway
        .set_amount(amount)
        .set_currency(currency)
        .set_invoice_id(invoice_id.unwrap_or_default());

    let redirect = gateway.checkout(form).map_err(gateway_failure)?;

    if json {
        let data = CheckoutOutput {
            status: redirect.status_code(),
            location: redirect.location.clone(),
            order_id: gateway.order_id().to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        redirect
            .write_to(std::io::stdout().lock())
            .context("Failed to write redirect")?;
    }

    if redirect.terminate() {
        std::io::stdout().flush()?;
        std::process::exit(0);
    }
    debug!("termination suppressed, continuing after redirect");
    Ok(())
}

/// Capture an approved order, resolving it from the invoice when needed.
pub fn cmd_process(
    config: &GatewayConfig,
    order_id: Option<&str>,
    invoice_id: Option<&str>,
    json: bool,
) -> Result<()> {
    let store = open_store(config)?;

    let order_id = match (order_id, invoice_id) {
        (Some(id), _) => id.to_string(),
        (None, Some(invoice)) => store
            .get(invoice)?
            .map(|record| record.order_id)
            .unwrap_or_default(),
        (None, None) => String::new(),
    };

    let mut gateway = Gateway::from_config(config).with_store(store);
    gateway
        .set_order_id(order_id)
        .set_invoice_id(invoice_id.unwrap_or_default());

    let transaction = gateway.process().map_err(gateway_failure)?;

    output(&transaction, json, |tx| {
        println!("{}  {}", tx.status, tx.reference_id);
        println!("  {}", tx.message);
    })
}

/// Show the live pending checkout for an invoice.
pub fn cmd_pending(config: &GatewayConfig, invoice_id: &str, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let record = store.get(invoice_id)?;

    output(&record, json, |r| match r {
        Some(r) => println!(
            "{invoice_id}  order {order}  form {form}  amount {amount}",
            order = r.order_id,
            form = r.form,
            amount = r.amount,
        ),
        None => println!("No pending checkout for '{invoice_id}'"),
    })
}

/// Remove expired pending checkouts.
pub fn cmd_purge(config: &GatewayConfig, json: bool) -> Result<()> {
    let store = open_store(config)?;
    let removed = store.purge_expired()?;

    output(&serde_json::json!({ "removed": removed }), json, |_| {
        println!("Removed {removed} expired pending checkouts");
    })
}
