use checkout_engine::helpers::calculate_hmac;
use serde_json::json;

pub const WEBHOOK_SECRET: &str = "whsec_test_5f1b2c";

/// A gateway delivery for `external_order_id`, serialized the way the gateway sends it.
pub fn payment_event(event: &str, external_order_id: &str, payment_id: &str, amount: i64) -> Vec<u8> {
    let status = event.trim_start_matches("payment.");
    let body = json!({
        "entity": "event",
        "event": event,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": external_order_id,
                    "amount": amount,
                    "currency": "INR",
                    "status": status,
                    "error_description": null,
                }
            }
        },
        "created_at": 1_718_000_000
    });
    serde_json::to_vec(&body).expect("Could not serialize webhook body")
}

pub fn failed_event(external_order_id: &str, payment_id: &str, amount: i64, reason: &str) -> Vec<u8> {
    let mut body: serde_json::Value =
        serde_json::from_slice(&payment_event("payment.failed", external_order_id, payment_id, amount))
            .expect("Could not parse webhook body");
    body["payload"]["payment"]["entity"]["error_description"] = json!(reason);
    serde_json::to_vec(&body).expect("Could not serialize webhook body")
}

pub fn sign(body: &[u8]) -> String {
    calculate_hmac(WEBHOOK_SECRET, body)
}
