use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

/// Generic payment attributes shared by every gateway: what is charged and
/// which invoice it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub amount: BigDecimal,
    pub currency: String,
    pub invoice_id: String,
}

impl Payment {
    pub fn new(amount: BigDecimal, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            invoice_id: String::new(),
        }
    }

    /// Set the invoice identifier.
    pub fn with_invoice_id(mut self, invoice_id: impl Into<String>) -> Self {
        self.invoice_id = invoice_id.into();
        self
    }
}

/// Outcome of a capture, produced once per `process` call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub status: TransactionStatus,
    pub message: String,
    pub reference_id: String,
}

impl Transaction {
    /// A fresh draft: `Pending`, empty message, no reference.
    pub fn new() -> Self {
        Self {
            status: TransactionStatus::Pending,
            message: String::new(),
            reference_id: String::new(),
        }
    }

    pub fn with_status(mut self, status: TransactionStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_reference_id(mut self, reference_id: impl Into<String>) -> Self {
        self.reference_id = reference_id.into();
        self
    }

    pub fn is_paid(&self) -> bool {
        self.status == TransactionStatus::Paid
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    Pending,
    Paid,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Paid => "Paid",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Correlation record linking an invoice to the provider order across the
/// buyer's redirect round-trip. Keyed by invoice id in the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingCheckout {
    pub form: String,
    pub amount: BigDecimal,
    #[serde(rename = "orderid")]
    pub order_id: String,
}

impl PendingCheckout {
    pub fn new(form: impl Into<String>, amount: BigDecimal, order_id: impl Into<String>) -> Self {
        Self {
            form: form.into(),
            amount,
            order_id: order_id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_starts_pending() {
        let tx = Transaction::new();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert!(!tx.is_paid());
        assert!(tx.message.is_empty());
    }

    #[test]
    fn test_transaction_builders() {
        let tx = Transaction::new()
            .with_status(TransactionStatus::Paid)
            .with_message("Transaction is COMPLETED")
            .with_reference_id("8GB67279RC051624C");
        assert!(tx.is_paid());
        assert_eq!(tx.reference_id, "8GB67279RC051624C");
    }

    #[test]
    fn test_payment_builder() {
        let payment = Payment::new(BigDecimal::from(100), "USD").with_invoice_id("INV-1");
        assert_eq!(payment.invoice_id, "INV-1");
        assert_eq!(payment.currency, "USD");
        assert!(Payment::default().invoice_id.is_empty());
    }

    #[test]
    fn test_status_display_matches_as_str() {
        assert_eq!(TransactionStatus::Pending.as_str(), "Pending");
        assert_eq!(TransactionStatus::Paid.to_string(), "Paid");
        assert_eq!(
            serde_json::to_value(TransactionStatus::Paid).unwrap(),
            serde_json::json!("Paid")
        );
    }

    #[test]
    fn test_pending_checkout_json_shape() {
        let record = PendingCheckout::new("donate", BigDecimal::from(100), "ORDER-1");
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["form"], "donate");
        assert_eq!(value["orderid"], "ORDER-1");

        let back: PendingCheckout = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
    }
}
