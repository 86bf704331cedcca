//! API integration tests against a running server
//!
//! Expects a server on localhost:8080 with an `admin` / `admin` account.

use reqwest::Client;
use serde_json::{json, Value};

const BASE_URL: &str = "http://localhost:8080/api/v1";

/// Helper to get an authenticated client
async fn get_auth_token(client: &Client) -> String {
    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send login request");

    let body: Value = response.json().await.expect("Failed to parse login response");
    body["token"].as_str().expect("No token in response").to_string()
}

#[tokio::test]
#[ignore] // Run with: cargo test -- --ignored
async fn test_health_check() {
    let client = Client::new();

    let response = client
        .get(format!("{}/health", BASE_URL))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
#[ignore]
async fn test_login() {
    let client = Client::new();

    let response = client
        .post(format!("{}/auth/login", BASE_URL))
        .json(&json!({
            "login": "admin",
            "password": "admin"
        }))
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body["token"].is_string());
    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["user"]["role"], "admin");
}

#[tokio::test]
#[ignore]
async fn test_list_equipment() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let response = client
        .get(format!("{}/equipment", BASE_URL))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");

    assert!(response.status().is_success());

    let body: Value = response.json().await.expect("Failed to parse response");
    assert!(body.is_array());
}

#[tokio::test]
#[ignore]
async fn test_booking_conflict() {
    let client = Client::new();
    let token = get_auth_token(&client).await;

    let equipment: Value = client
        .post(format!("{}/equipment", BASE_URL))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Integration test tripod",
            "category": "tripod",
            "daily_rate": "15"
        }))
        .send()
        .await
        .expect("Failed to create equipment")
        .json()
        .await
        .expect("Failed to parse equipment");
    let equipment_id = equipment["id"].as_i64().expect("No equipment id");

    let request = json!({
        "equipment_id": equipment_id,
        "start_date": "2030-01-01",
        "end_date": "2030-01-05"
    });

    let first = client
        .post(format!("{}/bookings", BASE_URL))
        .bearer_auth(&token)
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(first.status().as_u16(), 201);
    let booking: Value = first.json().await.expect("Failed to parse booking");

    let second = client
        .post(format!("{}/bookings", BASE_URL))
        .bearer_auth(&token)
        .json(&request)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(second.status().as_u16(), 409);

    let cancelled = client
        .post(format!("{}/bookings/{}/cancel", BASE_URL, booking["id"]))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert!(cancelled.status().is_success());

    let deleted = client
        .delete(format!("{}/equipment/{}", BASE_URL, equipment_id))
        .bearer_auth(&token)
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(deleted.status().as_u16(), 409);
}
