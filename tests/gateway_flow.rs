//! End-to-end checkout and capture flows against scripted provider responses.
//!
//! The client fake records every request it receives, so tests can assert both
//! what was sent and that validation failures never reach the network.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bigdecimal::BigDecimal;
use paypal_gateway::{
    CorrelationStore, ErrorKind, Gateway, GatewayError, HttpClient, HttpResponse, Operation,
    OrderRequest, PendingCheckout, TransactionStatus, TransportError, CHECKOUT_TTL,
};
use serde_json::{json, Value};

const APPROVE_URL: &str = "https://www.sandbox.paypal.com/checkoutnow?token=8GB67279RC051624C";

#[derive(Default)]
struct ScriptedClient {
    replies: Mutex<VecDeque<Result<HttpResponse, TransportError>>>,
    requests: Mutex<Vec<OrderRequest>>,
}

impl ScriptedClient {
    fn replying(reply: Result<HttpResponse, TransportError>) -> Arc<Self> {
        let client = Self::default();
        client.replies.lock().unwrap().push_back(reply);
        Arc::new(client)
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> OrderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

impl HttpClient for ScriptedClient {
    fn execute(&self, request: &OrderRequest) -> Result<HttpResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected request")
    }
}

#[derive(Default)]
struct RecordingStore {
    records: Mutex<HashMap<String, (PendingCheckout, Duration)>>,
    deletes: Mutex<Vec<String>>,
}

impl CorrelationStore for RecordingStore {
    fn set(&self, key: &str, value: &PendingCheckout, ttl: Duration) -> anyhow::Result<()> {
        self.records
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.clone(), ttl));
        Ok(())
    }

    fn get(&self, key: &str) -> anyhow::Result<Option<PendingCheckout>> {
        Ok(self.records.lock().unwrap().get(key).map(|(r, _)| r.clone()))
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.deletes.lock().unwrap().push(key.to_string());
        self.records.lock().unwrap().remove(key);
        Ok(())
    }
}

struct FailingStore;

impl CorrelationStore for FailingStore {
    fn set(&self, _key: &str, _value: &PendingCheckout, _ttl: Duration) -> anyhow::Result<()> {
        anyhow::bail!("store unavailable")
    }

    fn get(&self, _key: &str) -> anyhow::Result<Option<PendingCheckout>> {
        anyhow::bail!("store unavailable")
    }

    fn delete(&self, _key: &str) -> anyhow::Result<()> {
        anyhow::bail!("store unavailable")
    }
}

fn checkout_body() -> Value {
    json!({
        "id": "8GB67279RC051624C",
        "intent": "CAPTURE",
        "status": "CREATED",
        "create_time": "2018-08-06T23:34:31Z",
        "purchase_units": [{ "amount": { "currency_code": "USD", "value": "100.00" } }],
        "links": [
            { "href": "https://api.sandbox.paypal.com/v2/checkout/orders/8GB67279RC051624C", "rel": "self", "method": "GET" },
            { "href": APPROVE_URL, "rel": "approve", "method": "GET" },
            { "href": "https://api.sandbox.paypal.com/v2/checkout/orders/8GB67279RC051624C/capture", "rel": "capture", "method": "POST" }
        ]
    })
}

fn process_body(status: &str) -> Value {
    json!({
        "id": "8GB67279RC051624C",
        "intent": "CAPTURE",
        "status": status,
        "create_time": "2018-08-06T23:34:31Z",
        "payer": { "email_address": "test-buyer@paypal.com", "payer_id": "KWADC7LXRRWCE" },
        "links": [
            { "href": "https://api.sandbox.paypal.com/v2/checkout/orders/8GB67279RC051624C", "rel": "self", "method": "GET" }
        ]
    })
}

fn ok(body: Value) -> Result<HttpResponse, TransportError> {
    Ok(HttpResponse::new(201, body))
}

fn broke() -> Result<HttpResponse, TransportError> {
    Err(TransportError::Http {
        status: 500,
        message: "Error message".to_string(),
    })
}

/// A gateway that passes every checkout gate.
fn ready_gateway(client: Arc<ScriptedClient>) -> Gateway {
    let mut gateway = Gateway::new("public1", "private1", false).with_client(client);
    gateway
        .set_return_url("http://localhost.com/success")
        .set_cancel_url("http://localhost.com/cancel")
        .set_amount(100)
        .set_suppress_termination(true);
    gateway
}

// ── Validation gates ──

#[test]
fn test_empty_keys_never_reach_network() {
    for (public, private) in [("", ""), ("public1", ""), ("", "private1")] {
        let client = Arc::new(ScriptedClient::default());
        let mut gateway = ready_gateway(Arc::clone(&client));
        gateway
            .set_public_key(public)
            .set_private_key(private)
            .set_order_id("ORDER-1");

        assert_eq!(gateway.checkout(None), Err(GatewayError::InvalidCredentials));
        assert_eq!(gateway.process(), Err(GatewayError::InvalidCredentials));
        assert_eq!(client.calls(), 0);
    }
}

#[test]
fn test_checkout_gate_order() {
    let client = Arc::new(ScriptedClient::default());
    let mut gateway = Gateway::new("public1", "private1", false).with_client(client.clone());

    // URLs are checked before the amount.
    assert_eq!(gateway.checkout(None), Err(GatewayError::InvalidUrls));

    gateway.set_return_url("http://localhost.com/success");
    assert_eq!(gateway.checkout(None), Err(GatewayError::InvalidUrls));

    gateway.set_return_url("").set_cancel_url("http://localhost.com/cancel");
    assert_eq!(gateway.checkout(None), Err(GatewayError::InvalidUrls));

    gateway.set_return_url("http://localhost.com/success");
    assert_eq!(gateway.checkout(None), Err(GatewayError::InvalidAmount));

    gateway.set_amount(-5);
    assert_eq!(gateway.checkout(None), Err(GatewayError::InvalidAmount));

    assert_eq!(client.calls(), 0);
}

#[test]
fn test_process_requires_order_id() {
    let client = Arc::new(ScriptedClient::default());
    let gateway = Gateway::new("public1", "private1", false).with_client(client.clone());

    let err = gateway.process().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidOrderId);
    assert_eq!(err.kind().code(), "invalid_order_id");
    assert_eq!(client.calls(), 0);
}

// ── Transport failures ──

#[test]
fn test_transport_failure_is_broke() {
    let client = ScriptedClient::replying(broke());
    let mut gateway = ready_gateway(client.clone());
    assert_eq!(
        gateway.checkout(Some("test")),
        Err(GatewayError::Broke("Error message".to_string()))
    );
    assert_eq!(client.calls(), 1);

    let client = ScriptedClient::replying(Err(TransportError::Network(
        "connection refused".to_string(),
    )));
    let mut gateway = Gateway::new("public1", "private1", false).with_client(client);
    gateway.set_order_id("ORDER-1");
    let err = gateway.process().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Broke);
    assert_eq!(err.message(), "connection refused");
}

// ── Checkout responses ──

#[test]
fn test_malformed_create_response() {
    let mut no_links = checkout_body();
    no_links["links"] = json!([]);
    let mut wrong_status = checkout_body();
    wrong_status["status"] = json!("PAYER_ACTION_REQUIRED");
    let mut no_id = checkout_body();
    no_id.as_object_mut().unwrap().remove("id");
    let mut links_not_list = checkout_body();
    links_not_list["links"] = json!("approve");
    let mut no_links_key = checkout_body();
    no_links_key.as_object_mut().unwrap().remove("links");

    for body in [no_links, wrong_status, no_id, links_not_list, no_links_key] {
        let mut gateway = ready_gateway(ScriptedClient::replying(ok(body)));
        assert_eq!(gateway.checkout(None), Err(GatewayError::EmptyResponse));
        assert!(gateway.order_id().is_empty());
    }
}

#[test]
fn test_missing_approve_link() {
    let mut body = checkout_body();
    let links: Vec<Value> = body["links"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|l| l["rel"] != "approve")
        .cloned()
        .collect();
    body["links"] = Value::Array(links);

    let mut gateway = ready_gateway(ScriptedClient::replying(ok(body)));
    let err = gateway.checkout(Some("test")).unwrap_err();
    assert_eq!(err, GatewayError::EmptyApproveUrl);
    assert_eq!(err.kind().code(), "empty_approve");
}

#[test]
fn test_checkout_success_redirects_and_records() {
    let client = ScriptedClient::replying(ok(checkout_body()));
    let store = Arc::new(RecordingStore::default());
    let mut gateway = ready_gateway(client.clone()).with_store(store.clone());
    gateway.set_invoice_id("INV-42").set_currency("EUR");

    let redirect = gateway.checkout(Some("test")).unwrap();
    assert_eq!(redirect.status_code(), 303);
    assert_eq!(redirect.location, APPROVE_URL);
    assert_eq!(redirect.headers(), vec![("Location", APPROVE_URL)]);
    assert!(!redirect.terminate());
    assert_eq!(gateway.order_id(), "8GB67279RC051624C");

    let records = store.records.lock().unwrap();
    let (record, ttl) = records.get("INV-42").unwrap();
    assert_eq!(*ttl, CHECKOUT_TTL);
    assert_eq!(ttl.as_secs(), 600);
    assert_eq!(record.form, "test");
    assert_eq!(record.order_id, "8GB67279RC051624C");
    assert_eq!(record.amount, BigDecimal::from(100));

    match client.last_request() {
        OrderRequest::Create {
            body,
            prefer_full_representation,
        } => {
            assert!(prefer_full_representation);
            let body = serde_json::to_value(&body).unwrap();
            assert_eq!(body["intent"], "CAPTURE");
            assert_eq!(body["purchase_units"][0]["reference_id"], "INV-42");
            assert_eq!(body["purchase_units"][0]["amount"]["currency_code"], "EUR");
            assert_eq!(body["application_context"]["cancel_url"], "http://localhost.com/cancel");
        }
        other => panic!("expected create request, got {other:?}"),
    }
}

#[test]
fn test_checkout_without_form_skips_record() {
    let store = Arc::new(RecordingStore::default());
    let mut gateway =
        ready_gateway(ScriptedClient::replying(ok(checkout_body()))).with_store(store.clone());
    gateway.set_invoice_id("INV-42");

    gateway.checkout(None).unwrap();
    assert!(store.records.lock().unwrap().is_empty());

    let mut gateway =
        ready_gateway(ScriptedClient::replying(ok(checkout_body()))).with_store(store.clone());
    gateway.set_invoice_id("INV-42");
    gateway.checkout(Some("")).unwrap();
    assert!(store.records.lock().unwrap().is_empty());

    let mut gateway =
        ready_gateway(ScriptedClient::replying(ok(checkout_body()))).with_store(store.clone());
    gateway.checkout(Some("test")).unwrap();
    assert!(store.records.lock().unwrap().is_empty());
}

#[test]
fn test_redirect_terminates_unless_suppressed() {
    let mut gateway = ready_gateway(ScriptedClient::replying(ok(checkout_body())));
    gateway.set_suppress_termination(false);
    assert!(gateway.checkout(None).unwrap().terminate());
}

#[test]
fn test_store_failure_does_not_fail_checkout() {
    let mut gateway = ready_gateway(ScriptedClient::replying(ok(checkout_body())))
        .with_store(Arc::new(FailingStore));
    gateway.set_invoice_id("INV-42");
    assert!(gateway.checkout(Some("test")).is_ok());
}

#[test]
fn test_checkout_skips_malformed_sibling_links() {
    let mut body = checkout_body();
    body["links"] = json!([
        "garbage",
        { "href": 5, "rel": "self" },
        { "href": APPROVE_URL, "rel": "approve" }
    ]);

    let mut gateway = ready_gateway(ScriptedClient::replying(ok(body)));
    let redirect = gateway.checkout(None).unwrap();
    assert_eq!(redirect.location, APPROVE_URL);
}

// ── Capture ──

#[test]
fn test_process_completed_is_paid() {
    let client = ScriptedClient::replying(ok(process_body("COMPLETED")));
    let mut gateway = Gateway::new("public1", "private1", false).with_client(client.clone());
    gateway.set_order_id("8GB67279RC051624C");

    let tx = gateway.process().unwrap();
    assert_eq!(tx.status, TransactionStatus::Paid);
    assert!(tx.message.contains("COMPLETED"));
    assert_eq!(tx.reference_id, "8GB67279RC051624C");

    let request = client.last_request();
    assert_eq!(request.operation(), Operation::Capture);
    assert_eq!(request.path(), "/v2/checkout/orders/8GB67279RC051624C/capture");
    assert!(request.prefer_full_representation());
}

#[test]
fn test_process_other_status_stays_pending() {
    for status in ["PENDING", "APPROVED", "VOIDED"] {
        let mut gateway = Gateway::new("public1", "private1", false)
            .with_client(ScriptedClient::replying(ok(process_body(status))));
        gateway.set_order_id("ORDER-1");

        let tx = gateway.process().unwrap();
        assert_eq!(tx.status, TransactionStatus::Pending);
        assert_eq!(tx.message, format!("Transaction is {status}"));
    }
}

#[test]
fn test_process_without_status_reports_pending() {
    let mut gateway = Gateway::new("public1", "private1", false)
        .with_client(ScriptedClient::replying(ok(json!({ "id": "ORDER-1" }))));
    gateway.set_order_id("ORDER-1");

    let tx = gateway.process().unwrap();
    assert_eq!(tx.status, TransactionStatus::Pending);
    assert_eq!(tx.message, "Transaction is PENDING");
}

#[test]
fn test_process_clears_pending_record_regardless_of_status() {
    for status in ["COMPLETED", "PENDING"] {
        let store = Arc::new(RecordingStore::default());
        store
            .set(
                "INV-42",
                &PendingCheckout::new("test", 100.into(), "ORDER-1"),
                CHECKOUT_TTL,
            )
            .unwrap();

        let mut gateway = Gateway::new("public1", "private1", false)
            .with_client(ScriptedClient::replying(ok(process_body(status))))
            .with_store(store.clone());
        gateway.set_order_id("ORDER-1").set_invoice_id("INV-42");

        gateway.process().unwrap();
        assert_eq!(*store.deletes.lock().unwrap(), vec!["INV-42".to_string()]);
        assert!(store.get("INV-42").unwrap().is_none());
    }
}

#[test]
fn test_process_failure_keeps_pending_record() {
    let store = Arc::new(RecordingStore::default());
    let mut gateway = Gateway::new("public1", "private1", false)
        .with_client(ScriptedClient::replying(broke()))
        .with_store(store.clone());
    gateway.set_order_id("ORDER-1").set_invoice_id("INV-42");

    assert!(gateway.process().is_err());
    assert!(store.deletes.lock().unwrap().is_empty());
}

#[test]
fn test_checkout_then_process_round_trip() {
    let client = Arc::new(ScriptedClient::default());
    client.replies.lock().unwrap().push_back(ok(checkout_body()));
    client
        .replies
        .lock()
        .unwrap()
        .push_back(ok(process_body("COMPLETED")));
    let store = Arc::new(RecordingStore::default());

    let mut gateway = ready_gateway(client.clone()).with_store(store.clone());
    gateway.set_invoice_id("INV-7");
    gateway.checkout(Some("donate")).unwrap();
    assert!(store.get("INV-7").unwrap().is_some());

    let tx = gateway.process().unwrap();
    assert!(tx.is_paid());
    assert_eq!(tx.reference_id, "8GB67279RC051624C");
    assert!(store.get("INV-7").unwrap().is_none());
    assert_eq!(client.calls(), 2);
}
