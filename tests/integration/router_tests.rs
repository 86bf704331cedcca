//! In-process router tests on the memory backend

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use cinerent_server::{
    api,
    config::AppConfig,
    models::user::{CreateUser, UserRole},
    repository::MemoryStore,
    services::Services,
    AppState,
};

struct TestApp {
    router: Router,
    services: Arc<Services>,
}

impl TestApp {
    async fn new() -> Self {
        let config = AppConfig::default();
        let services = Arc::new(Services::new(
            Arc::new(MemoryStore::new()),
            config.auth.clone(),
            config.predictions.clone(),
        ));
        let state = AppState {
            config: Arc::new(config),
            services: services.clone(),
        };
        Self {
            router: api::create_router(state),
            services,
        }
    }

    async fn user(&self, login: &str, role: UserRole) -> (i32, String) {
        let user = self
            .services
            .auth
            .create_user(CreateUser {
                login: login.to_string(),
                password: "secret-password".to_string(),
                firstname: None,
                lastname: None,
                email: None,
                role: Some(role),
            })
            .await
            .unwrap();

        let (status, body) = self
            .send(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "login": login, "password": "secret-password" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        (user.id, body["token"].as_str().unwrap().to_string())
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }
}

async fn create_camera(app: &TestApp, token: &str) -> i64 {
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/equipment",
            Some(token),
            Some(json!({
                "name": "ARRI Alexa Mini",
                "category": "camera",
                "daily_rate": "100",
                "weekly_rate": "500"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_i64().unwrap()
}

#[tokio::test]
async fn test_health_and_ready() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = app.send(Method::GET, "/api/v1/ready", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_requires_authentication() {
    let app = TestApp::new().await;

    let (status, body) = app.send(Method::GET, "/api/v1/bookings", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);

    let (status, _) = app
        .send(Method::GET, "/api/v1/bookings", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "login": "ghost", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_booking_lifecycle_over_http() {
    let app = TestApp::new().await;
    let (_, staff) = app.user("rental-desk", UserRole::Staff).await;
    let (customer_id, customer) = app.user("director", UserRole::Customer).await;
    let camera = create_camera(&app, &staff).await;

    // 10 days: one week plus three days = 500 + 300
    let (status, booking) = app
        .send(
            Method::POST,
            "/api/v1/bookings",
            Some(&customer),
            Some(json!({
                "equipment_id": camera,
                "start_date": "2024-06-01",
                "end_date": "2024-06-11"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(booking["status"], "pending");
    assert_eq!(booking["user_id"], customer_id);
    assert_eq!(booking["duration_days"], 10);
    assert_eq!(booking["total_cost"].as_str().unwrap().parse::<f64>().unwrap(), 800.0);
    let id = booking["id"].as_i64().unwrap();

    // Overlapping request is rejected
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/bookings",
            Some(&customer),
            Some(json!({
                "equipment_id": camera,
                "start_date": "2024-06-10",
                "end_date": "2024-06-12"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 6);

    let (status, body) = app
        .send(
            Method::GET,
            &format!(
                "/api/v1/bookings/conflicts?equipment_id={}&start_date=2024-06-11&end_date=2024-06-12",
                camera
            ),
            Some(&customer),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_conflict"], false);

    // Customers cannot approve
    let (status, _) = app
        .send(Method::POST, &format!("/api/v1/bookings/{}/approve", id), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::POST, &format!("/api/v1/bookings/{}/approve", id), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "approved");

    let (_, equipment) = app
        .send(Method::GET, &format!("/api/v1/equipment/{}", camera), Some(&staff), None)
        .await;
    assert_eq!(equipment["status"], "checked-out");

    // Check-in before check-out is an invalid transition
    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/bookings/{}/check-in", id),
            Some(&staff),
            Some(json!({ "condition": "good" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 7);

    let (status, body) = app
        .send(Method::POST, &format!("/api/v1/bookings/{}/check-out", id), Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/bookings/{}/check-in", id),
            Some(&staff),
            Some(json!({ "condition": "excellent" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["return_condition"], "excellent");

    let (_, equipment) = app
        .send(Method::GET, &format!("/api/v1/equipment/{}", camera), Some(&staff), None)
        .await;
    assert_eq!(equipment["status"], "available");

    let (status, stats) = app
        .send(Method::GET, "/api/v1/stats/bookings", Some(&staff), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["completed_revenue"].as_str().unwrap().parse::<f64>().unwrap(), 800.0);
}

#[tokio::test]
async fn test_customer_rights() {
    let app = TestApp::new().await;
    let (_, staff) = app.user("rental-desk", UserRole::Staff).await;
    let (_, alice) = app.user("alice", UserRole::Customer).await;
    let (bob_id, bob) = app.user("bob", UserRole::Customer).await;
    let camera = create_camera(&app, &staff).await;

    // Booking on someone else's behalf needs staff rights
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/bookings",
            Some(&alice),
            Some(json!({
                "equipment_id": camera,
                "user_id": bob_id,
                "start_date": "2024-06-01",
                "end_date": "2024-06-03"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, booking) = app
        .send(
            Method::POST,
            "/api/v1/bookings",
            Some(&bob),
            Some(json!({
                "equipment_id": camera,
                "start_date": "2024-06-01",
                "end_date": "2024-06-03"
            })),
        )
        .await;
    let id = booking["id"].as_i64().unwrap();

    let (status, _) = app
        .send(Method::GET, &format!("/api/v1/bookings/{}", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, list) = app.send(Method::GET, "/api/v1/bookings", Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 0);

    let (status, _) = app
        .send(Method::POST, &format!("/api/v1/bookings/{}/cancel", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/api/v1/bookings/{}/cancel", id),
            Some(&bob),
            Some(json!({ "reason": "shoot postponed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["cancellation_reason"], "shoot postponed");

    // Only admins create users
    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/users",
            Some(&staff),
            Some(json!({ "login": "carol", "password": "secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, admin) = app.user("boss", UserRole::Admin).await;
    let (status, user) = app
        .send(
            Method::POST,
            "/api/v1/users",
            Some(&admin),
            Some(json!({ "login": "carol", "password": "secret" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(user["role"], "customer");
    assert!(user.get("password_hash").is_none());
}

#[tokio::test]
async fn test_only_staff_set_booking_rates() {
    let app = TestApp::new().await;
    let (_, staff) = app.user("rental-desk", UserRole::Staff).await;
    let (customer_id, customer) = app.user("director", UserRole::Customer).await;
    let camera = create_camera(&app, &staff).await;

    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/bookings",
            Some(&customer),
            Some(json!({
                "equipment_id": camera,
                "start_date": "2024-06-01",
                "end_date": "2024-06-03",
                "rates": { "daily_rate": "0" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], 2);

    let (status, booking) = app
        .send(
            Method::POST,
            "/api/v1/bookings",
            Some(&customer),
            Some(json!({
                "equipment_id": camera,
                "start_date": "2024-06-01",
                "end_date": "2024-06-03"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = booking["id"].as_i64().unwrap();

    for change in [
        json!({ "daily_rate": "1" }),
        json!({ "weekly_rate": null }),
        json!({ "monthly_rate": "10" }),
    ] {
        let (status, _) = app
            .send(Method::PUT, &format!("/api/v1/bookings/{}", id), Some(&customer), Some(change))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    // Notes stay editable by the owner
    let (status, body) = app
        .send(
            Method::PUT,
            &format!("/api/v1/bookings/{}", id),
            Some(&customer),
            Some(json!({ "notes": "need a matte box" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_cost"].as_str().unwrap().parse::<f64>().unwrap(), 200.0);

    // Negotiated rate entered by the rental desk
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/bookings",
            Some(&staff),
            Some(json!({
                "equipment_id": camera,
                "user_id": customer_id,
                "start_date": "2024-07-01",
                "end_date": "2024-07-03",
                "rates": { "daily_rate": "80" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["total_cost"].as_str().unwrap().parse::<f64>().unwrap(), 160.0);
}

#[tokio::test]
async fn test_availability_and_suggestions() {
    let app = TestApp::new().await;
    let (_, staff) = app.user("rental-desk", UserRole::Staff).await;
    let camera = create_camera(&app, &staff).await;

    let (status, _) = app
        .send(
            Method::POST,
            "/api/v1/equipment",
            Some(&staff),
            Some(json!({ "name": "Cooke S4 32mm", "category": "lens", "daily_rate": "40" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, forecast) = app
        .send(
            Method::GET,
            &format!(
                "/api/v1/equipment/{}/availability?start_date=2024-06-03&end_date=2024-06-05",
                camera
            ),
            Some(&staff),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(forecast["available"], true);
    assert!(forecast["score"].as_f64().unwrap() > 0.0);

    let (status, _) = app
        .send(
            Method::GET,
            &format!(
                "/api/v1/equipment/{}/availability?start_date=2024-06-05&end_date=2024-06-05",
                camera
            ),
            Some(&staff),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, suggestions) = app
        .send(
            Method::GET,
            &format!("/api/v1/equipment/{}/suggestions", camera),
            Some(&staff),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(suggestions[0]["name"], "Cooke S4 32mm");
}
