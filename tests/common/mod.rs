#![allow(dead_code)]

use std::path::PathBuf;

use serde_json::{json, Value};
use space_client::{Client, ConnectionOptions};
use wiremock::{MockServer, Request};

pub const API_KEY: &str = "test-api-key";

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn options(server: &MockServer) -> ConnectionOptions {
    ConnectionOptions::new(server.uri(), API_KEY)
}

pub fn client(server: &MockServer) -> Client {
    init_logger();
    options(server).connect().expect("valid connection options")
}

pub fn test_data(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(file)
}

pub async fn requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
}

pub fn contract_json(user_id: &str, service: &str, plan: &str) -> Value {
    json!({
        "userContact": {"userId": user_id, "username": format!("user_{user_id}")},
        "billingPeriod": {
            "startDate": "2025-01-01T00:00:00.000Z",
            "endDate": "2025-01-31T00:00:00.000Z",
            "autoRenew": true,
            "renewalDays": 30
        },
        "usageLevels": {},
        "contractedServices": {service: "1.0.0"},
        "subscriptionPlans": {service: plan},
        "subscriptionAddOns": {},
        "history": []
    })
}

pub fn service_json(name: &str) -> Value {
    json!({
        "name": name,
        "activePricings": {
            "1.0.0": {
                "version": "1.0.0",
                "currency": "USD",
                "createdAt": "2025-01-01T00:00:00.000Z",
                "features": {
                    "meetings": {
                        "name": "meetings",
                        "valueType": "BOOLEAN",
                        "defaultValue": true,
                        "type": "DOMAIN"
                    }
                },
                "plans": {"BASIC": {"price": 0.0, "features": null}}
            }
        },
        "archivedPricings": {}
    })
}
