use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use tessera_server::auth::password::hash_password;
use tessera_server::models::user::{Role, User};
use tessera_server::routes::create_routes;
use tessera_server::state::AppState;
use tessera_server::store::{MemoryStore, UserStore};
use tessera_server::ticketing::token;

const SECRET: &str = "http-test-secret";
const PASSWORD: &str = "password123";

struct TestApp {
    app: Router,
    admin_token: String,
}

/// Router over a fresh in-memory store, with one seeded admin account.
async fn setup() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    store
        .create_user(User::new(
            "Site Admin".to_string(),
            "admin@campus.edu".to_string(),
            hash_password(PASSWORD).unwrap(),
            Role::Admin,
        ))
        .await
        .unwrap();

    let app = create_routes(AppState {
        store,
        jwt_secret: SECRET.to_string(),
    });
    let admin_token = login(&app, "admin@campus.edu").await;
    TestApp { app, admin_token }
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn send_raw(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn login(app: &Router, email: &str) -> String {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/user/login/",
            None,
            Some(json!({ "email": email, "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body["access"].as_str().unwrap().to_string()
}

async fn signup(app: &Router, name: &str, email: &str, role: &str) -> Value {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/user/signup/",
            None,
            Some(json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "role": role,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

/// Signs up an account and returns a usable access token. Organizers start
/// pending, so they get approved by the seeded admin first.
async fn active_account(t: &TestApp, name: &str, email: &str, role: &str) -> String {
    signup(&t.app, name, email, role).await;
    if role == "organizer" {
        let (status, _) = send(
            &t.app,
            request(
                "PATCH",
                "/api/users/manage/",
                Some(&t.admin_token),
                Some(json!({ "email": email, "status": "active" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }
    login(&t.app, email).await
}

async fn create_event(t: &TestApp, organizer_token: &str, capacity: i32) -> String {
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/events/",
            Some(organizer_token),
            Some(json!({
                "title": "Campus Hack Night",
                "description": "An evening of hacking",
                "location": "Engineering atrium",
                "category": "tech",
                "organization": "ACM",
                "date": "2026-09-12",
                "start_time": "18:00:00",
                "capacity": capacity,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["data"]["id"].as_str().unwrap().to_string()
}

async fn approve_event(t: &TestApp, event_id: &str) {
    let (status, _) = send(
        &t.app,
        request(
            "PATCH",
            &format!("/api/events/manage/{event_id}/"),
            Some(&t.admin_token),
            Some(json!({ "status": "approved" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

async fn claim(t: &TestApp, token: &str, event_id: &str) -> (StatusCode, Value) {
    send(
        &t.app,
        request(
            "POST",
            "/api/tickets/claim/",
            Some(token),
            Some(json!({ "event": event_id })),
        ),
    )
    .await
}

#[tokio::test]
async fn health_reports_the_service() {
    let t = setup().await;
    let (status, body) = send(&t.app, request("GET", "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["service"], "tessera-api");
}

#[tokio::test]
async fn organizer_signup_is_pending_until_approved() {
    let t = setup().await;
    let body = signup(&t.app, "Club Lead", "lead@campus.edu", "organizer").await;
    assert_eq!(body["status"], "pending");
    assert_eq!(body["role"], "organizer");
    assert!(body.get("password_hash").is_none());

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/user/login/",
            None,
            Some(json!({ "email": "lead@campus.edu", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Account not active. Please wait for admin approval."
    );
}

#[tokio::test]
async fn student_signup_is_active_immediately() {
    let t = setup().await;
    let body = signup(&t.app, "Amina", "amina@campus.edu", "student").await;
    assert_eq!(body["status"], "active");
    login(&t.app, "amina@campus.edu").await;
}

#[tokio::test]
async fn admin_accounts_cannot_be_self_registered() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/user/signup/",
            None,
            Some(json!({
                "name": "Sneaky",
                "email": "sneaky@campus.edu",
                "password": PASSWORD,
                "role": "admin",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
    let t = setup().await;
    signup(&t.app, "Amina", "amina@campus.edu", "student").await;
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/user/signup/",
            None,
            Some(json!({
                "name": "Other Amina",
                "email": "amina@campus.edu",
                "password": PASSWORD,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "An account with this email already exists"
    );
}

#[tokio::test]
async fn login_rejects_bad_credentials() {
    let t = setup().await;
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/user/login/",
            None,
            Some(json!({ "email": "admin@campus.edu", "password": "wrong" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid Credentials");

    let (status, body) = send(
        &t.app,
        request("POST", "/api/user/login/", None, Some(json!({ "email": "admin@campus.edu" }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Email and password are required");
}

#[tokio::test]
async fn full_claim_and_check_in_flow() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let student_body = signup(&t.app, "Amina", "amina@campus.edu", "student").await;
    let student_id = student_body["id"].as_str().unwrap().to_string();
    let student = login(&t.app, "amina@campus.edu").await;

    let event_id = create_event(&t, &organizer, 3).await;

    // Not claimable until an admin approves it.
    let (status, body) = claim(&t, &student, &event_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "This event is not open for ticket claims");

    approve_event(&t, &event_id).await;

    let (status, ticket) = claim(&t, &student, &event_id).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(ticket["event"], event_id.as_str());
    assert_eq!(ticket["user"], student_id.as_str());
    assert_eq!(ticket["status"], "active");
    let qr_code = ticket["qr_code"].as_str().unwrap().to_string();

    let (status, body) = claim(&t, &student, &event_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "You have already claimed a ticket for this event");

    // Gate scan by the organizer.
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&organizer),
            Some(json!({ "qr_code": qr_code })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Check-in successful");
    assert_eq!(body["user"], "Amina");
    assert_eq!(body["event"], "Campus Hack Night");
    assert!(body["checked_in_at"].is_string());

    // A second scan is a no-op.
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&organizer),
            Some(json!({ "qr_code": qr_code })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "This ticket has already been used");

    let (status, body) = send(
        &t.app,
        request("GET", "/api/student/tickets/", Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tickets = body["data"].as_array().unwrap();
    assert_eq!(tickets.len(), 1);
    assert_eq!(tickets[0]["status"], "used");
}

#[tokio::test]
async fn claim_validates_its_input() {
    let t = setup().await;
    let student = active_account(&t, "Amina", "amina@campus.edu", "student").await;

    let (status, body) = send(
        &t.app,
        request("POST", "/api/tickets/claim/", Some(&student), Some(json!({}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Event id is required");

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/tickets/claim/",
            Some(&student),
            Some(json!({ "event": "not-a-uuid" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Event not found");

    let (status, body) = claim(&t, &student, &Uuid::new_v4().to_string()).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Event not found");
}

#[tokio::test]
async fn check_in_distinguishes_malformed_and_unknown_codes() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&organizer),
            Some(json!({})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "QR code is required");

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&organizer),
            Some(json!({ "qr_code": "garbage" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid QR code format");

    // Well-formed token that matches no ticket.
    let phantom = token::encode(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&organizer),
            Some(json!({ "qr_code": phantom })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Invalid QR code");
}

#[tokio::test]
async fn check_in_requires_the_event_organizer() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let student = active_account(&t, "Amina", "amina@campus.edu", "student").await;
    let event_id = create_event(&t, &organizer, 3).await;
    approve_event(&t, &event_id).await;

    let (_, ticket) = claim(&t, &student, &event_id).await;
    let qr_code = ticket["qr_code"].as_str().unwrap();

    // The holder cannot scan their own ticket in.
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&student),
            Some(json!({ "qr_code": qr_code })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "You are not authorized to check in tickets for this event"
    );

    // The admin can.
    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&t.admin_token),
            Some(json!({ "qr_code": qr_code })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn cancel_flow_over_http() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let student = active_account(&t, "Amina", "amina@campus.edu", "student").await;
    let other = active_account(&t, "Bayo", "bayo@campus.edu", "student").await;
    let event_id = create_event(&t, &organizer, 3).await;
    approve_event(&t, &event_id).await;

    let (_, ticket) = claim(&t, &student, &event_id).await;
    let ticket_id = ticket["id"].as_str().unwrap().to_string();

    // Only the holder (or an admin) may release it.
    let (status, _) = send(
        &t.app,
        request(
            "POST",
            &format!("/api/tickets/{ticket_id}/cancel/"),
            Some(&other),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            &format!("/api/tickets/{ticket_id}/cancel/"),
            Some(&student),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    // Releasing the same ticket twice is a conflict, not a double credit.
    let (status, body) = send(
        &t.app,
        request(
            "POST",
            &format!("/api/tickets/{ticket_id}/cancel/"),
            Some(&student),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

    // A cancelled ticket's code no longer checks in.
    let qr_code = ticket["qr_code"].as_str().unwrap();
    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&organizer),
            Some(json!({ "qr_code": qr_code })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn sold_out_event_rejects_further_claims() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let first = active_account(&t, "Amina", "amina@campus.edu", "student").await;
    let second = active_account(&t, "Bayo", "bayo@campus.edu", "student").await;
    let event_id = create_event(&t, &organizer, 1).await;
    approve_event(&t, &event_id).await;

    let (status, _) = claim(&t, &first, &event_id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = claim(&t, &second, &event_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "This event is fully booked");
}

#[tokio::test]
async fn pending_events_are_hidden_from_students() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let student = active_account(&t, "Amina", "amina@campus.edu", "student").await;
    let event_id = create_event(&t, &organizer, 10).await;

    let (status, _) = send(
        &t.app,
        request("GET", &format!("/api/events/{event_id}/"), Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // The owner still sees it.
    let (status, body) = send(
        &t.app,
        request("GET", &format!("/api/events/{event_id}/"), Some(&organizer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["approval_state"], "pending");

    let (_, body) = send(&t.app, request("GET", "/api/events/", Some(&student), None)).await;
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .all(|event| event["id"] != event_id.as_str()));

    let (_, body) = send(
        &t.app,
        request("GET", "/api/events/", Some(&t.admin_token), None),
    )
    .await;
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|event| event["id"] == event_id.as_str()));
}

#[tokio::test]
async fn event_list_is_newest_date_first() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;

    for (title, date) in [("Early", "2026-03-01"), ("Late", "2026-10-01")] {
        let (status, body) = send(
            &t.app,
            request(
                "POST",
                "/api/events/",
                Some(&organizer),
                Some(json!({
                    "title": title,
                    "location": "Quad",
                    "date": date,
                    "start_time": "12:00:00",
                    "capacity": 10,
                })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        approve_event(&t, body["data"]["id"].as_str().unwrap()).await;
    }

    let (_, body) = send(&t.app, request("GET", "/api/events/", Some(&organizer), None)).await;
    let titles: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|event| event["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Late", "Early"]);
}

#[tokio::test]
async fn admin_routes_are_gated() {
    let t = setup().await;
    let student = active_account(&t, "Amina", "amina@campus.edu", "student").await;

    let (status, _) = send(&t.app, request("GET", "/api/users/", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&t.app, request("GET", "/api/users/", Some(&student), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, body) = send(
        &t.app,
        request("GET", "/api/users/", Some(&t.admin_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|user| user["email"] == "admin@campus.edu"));
}

#[tokio::test]
async fn moderation_is_recorded_in_the_audit_log() {
    let t = setup().await;
    let organizer_body = signup(&t.app, "Club Lead", "lead@campus.edu", "organizer").await;
    let organizer_id = organizer_body["id"].as_str().unwrap().to_string();

    // Approve the organizer by id.
    let (status, body) = send(
        &t.app,
        request(
            "PATCH",
            &format!("/api/users/approve/{organizer_id}/"),
            Some(&t.admin_token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "active");

    let organizer = login(&t.app, "lead@campus.edu").await;
    let event_id = create_event(&t, &organizer, 5).await;

    let (status, body) = send(
        &t.app,
        request(
            "PATCH",
            &format!("/api/events/manage/{event_id}/"),
            Some(&t.admin_token),
            Some(json!({ "status": "rejected", "notes": "Too vague" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["approval_state"], "rejected");

    let (status, body) = send(&t.app, request("GET", "/api/audit/", Some(&t.admin_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert!(entries
        .iter()
        .any(|entry| entry["action"] == "approve_user"
            && entry["target_user_id"] == organizer_id.as_str()));
    assert!(entries
        .iter()
        .any(|entry| entry["action"] == "reject_event"
            && entry["target_event_id"] == event_id.as_str()
            && entry["notes"] == "Too vague"));
}

#[tokio::test]
async fn approval_stamps_the_event() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let event_id = create_event(&t, &organizer, 5).await;

    let (status, body) = send(
        &t.app,
        request(
            "PATCH",
            &format!("/api/events/manage/{event_id}/"),
            Some(&t.admin_token),
            Some(json!({ "status": "approved" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["approval_state"], "approved");
    assert!(body["data"]["approved_by"].is_string());
    assert!(body["data"]["approved_at"].is_string());
}

#[tokio::test]
async fn analytics_report_sales_and_usage() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let first = active_account(&t, "Amina", "amina@campus.edu", "student").await;
    let second = active_account(&t, "Bayo", "bayo@campus.edu", "student").await;
    let event_id = create_event(&t, &organizer, 3).await;
    approve_event(&t, &event_id).await;

    let (_, first_ticket) = claim(&t, &first, &event_id).await;
    let (_, second_ticket) = claim(&t, &second, &event_id).await;

    // First attends, second backs out.
    let qr_code = first_ticket["qr_code"].as_str().unwrap();
    send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&organizer),
            Some(json!({ "qr_code": qr_code })),
        ),
    )
    .await;
    send(
        &t.app,
        request(
            "POST",
            &format!("/api/tickets/{}/cancel/", second_ticket["id"].as_str().unwrap()),
            Some(&second),
            None,
        ),
    )
    .await;

    let (status, body) = send(
        &t.app,
        request("GET", "/api/analytics/global", Some(&t.admin_token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["totalUsers"], 4);
    assert_eq!(body["totalEvents"], 1);
    assert_eq!(body["ticketsIssued"], 1);
    assert_eq!(body["ticketsUsed"], 1);

    // Students cannot read the global numbers.
    let (status, _) = send(
        &t.app,
        request("GET", "/api/analytics/global", Some(&first), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &t.app,
        request("GET", "/api/analytics/organizer", Some(&organizer), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let per_event = body["perEvent"].as_array().unwrap();
    assert_eq!(per_event.len(), 1);
    assert_eq!(per_event[0]["title"], "Campus Hack Night");
    assert_eq!(per_event[0]["sold"], 1);
    assert_eq!(per_event[0]["capacity"], 3);
    assert_eq!(per_event[0]["remaining"], 2);
    let timeline = body["timeline"].as_array().unwrap();
    assert_eq!(timeline.len(), 1);
    assert_eq!(timeline[0]["sold"], 1);

    let (status, _) = send(
        &t.app,
        request("GET", "/api/analytics/organizer", Some(&first), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn refresh_token_mints_a_new_access_token() {
    let t = setup().await;
    signup(&t.app, "Amina", "amina@campus.edu", "student").await;

    let (_, body) = send(
        &t.app,
        request(
            "POST",
            "/api/user/login/",
            None,
            Some(json!({ "email": "amina@campus.edu", "password": PASSWORD })),
        ),
    )
    .await;
    let refresh = body["refresh"].as_str().unwrap().to_string();
    let access = body["access"].as_str().unwrap().to_string();

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/token/refresh/",
            None,
            Some(json!({ "refresh": refresh })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_access = body["access"].as_str().unwrap().to_string();

    let (status, _) = send(
        &t.app,
        request("GET", "/api/student/tickets/", Some(&new_access), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // An access token is not accepted as a refresh token.
    let (status, _) = send(
        &t.app,
        request(
            "POST",
            "/api/token/refresh/",
            None,
            Some(json!({ "refresh": access })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // And a refresh token is not accepted as an access token.
    let (status, _) = send(
        &t.app,
        request("GET", "/api/student/tickets/", Some(&refresh), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn suspended_accounts_are_locked_out() {
    let t = setup().await;
    let student = active_account(&t, "Amina", "amina@campus.edu", "student").await;

    let (status, _) = send(
        &t.app,
        request(
            "PATCH",
            "/api/users/manage/",
            Some(&t.admin_token),
            Some(json!({ "email": "amina@campus.edu", "status": "suspended" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // The still-valid token no longer works.
    let (status, _) = send(
        &t.app,
        request("GET", "/api/student/tickets/", Some(&student), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            "/api/user/login/",
            None,
            Some(json!({ "email": "amina@campus.edu", "password": PASSWORD })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"],
        "Account not active. Please wait for admin approval."
    );
}

#[tokio::test]
async fn organizer_can_update_and_resize_their_event() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let student = active_account(&t, "Amina", "amina@campus.edu", "student").await;
    let event_id = create_event(&t, &organizer, 5).await;
    approve_event(&t, &event_id).await;
    claim(&t, &student, &event_id).await;

    // Outsiders cannot touch it.
    let (status, _) = send(
        &t.app,
        request(
            "PATCH",
            &format!("/api/events/organizer/{event_id}/"),
            Some(&student),
            Some(json!({ "title": "Hijacked" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &t.app,
        request(
            "PATCH",
            &format!("/api/events/organizer/{event_id}/"),
            Some(&organizer),
            Some(json!({ "title": "Hack Night, Round Two", "capacity": 10 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Hack Night, Round Two");
    assert_eq!(body["data"]["capacity_total"], 10);
    assert_eq!(body["data"]["capacity_remaining"], 9);

    // Cannot shrink below the ticket already sold... but down to it is fine.
    let (status, _) = send(
        &t.app,
        request(
            "PATCH",
            &format!("/api/events/organizer/{event_id}/"),
            Some(&organizer),
            Some(json!({ "capacity": 0 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &t.app,
        request(
            "PATCH",
            &format!("/api/events/organizer/{event_id}/"),
            Some(&organizer),
            Some(json!({ "capacity": 1 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["capacity_remaining"], 0);
}

#[tokio::test]
async fn deleting_an_event_removes_it() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let event_id = create_event(&t, &organizer, 5).await;

    let (status, _) = send(
        &t.app,
        request(
            "DELETE",
            &format!("/api/events/organizer/{event_id}/"),
            Some(&organizer),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &t.app,
        request("GET", &format!("/api/events/{event_id}/"), Some(&organizer), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn feedback_requires_a_ticket_and_is_unique() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let holder = active_account(&t, "Amina", "amina@campus.edu", "student").await;
    let outsider = active_account(&t, "Bayo", "bayo@campus.edu", "student").await;
    let event_id = create_event(&t, &organizer, 5).await;
    approve_event(&t, &event_id).await;
    claim(&t, &holder, &event_id).await;

    let feedback_uri = format!("/api/events/{event_id}/feedback/");

    let (status, _) = send(
        &t.app,
        request(
            "POST",
            &feedback_uri,
            Some(&outsider),
            Some(json!({ "rating": 5, "comment": "Sounded great" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &t.app,
        request("POST", &feedback_uri, Some(&holder), Some(json!({ "rating": 6 }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            &feedback_uri,
            Some(&holder),
            Some(json!({ "rating": 4, "comment": "Great event" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["rating"], 4);

    let (status, body) = send(
        &t.app,
        request(
            "POST",
            &feedback_uri,
            Some(&holder),
            Some(json!({ "rating": 2 })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["error"]["message"],
        "You have already submitted feedback for this event"
    );

    // The organizer reads it; the holder sees their own history.
    let (status, body) = send(&t.app, request("GET", &feedback_uri, Some(&organizer), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = send(&t.app, request("GET", &feedback_uri, Some(&outsider), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &t.app,
        request("GET", "/api/student/feedback/", Some(&holder), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn attendee_export_produces_csv() {
    let t = setup().await;
    let organizer = active_account(&t, "Club Lead", "lead@campus.edu", "organizer").await;
    let attending = active_account(&t, "Amina", "amina@campus.edu", "student").await;
    let cancelling = active_account(&t, "Bayo", "bayo@campus.edu", "student").await;
    let event_id = create_event(&t, &organizer, 5).await;
    approve_event(&t, &event_id).await;

    let (_, ticket) = claim(&t, &attending, &event_id).await;
    let qr_code = ticket["qr_code"].as_str().unwrap();
    send(
        &t.app,
        request(
            "POST",
            "/api/tickets/checkin/",
            Some(&organizer),
            Some(json!({ "qr_code": qr_code })),
        ),
    )
    .await;

    let (_, cancelled) = claim(&t, &cancelling, &event_id).await;
    send(
        &t.app,
        request(
            "POST",
            &format!("/api/tickets/{}/cancel/", cancelled["id"].as_str().unwrap()),
            Some(&cancelling),
            None,
        ),
    )
    .await;

    let export_uri = format!("/api/events/{event_id}/attendees/export/");
    let (status, headers, body) =
        send_raw(&t.app, request("GET", &export_uri, Some(&organizer), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/csv");
    assert!(headers[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .contains("attachment"));

    let mut lines = body.lines();
    assert_eq!(lines.next(), Some("name,email,status,claimed_at,used_at"));
    assert!(body.contains("amina@campus.edu"));
    assert!(body.contains(",used,"));
    // Cancelled tickets are not attendees.
    assert!(!body.contains("bayo@campus.edu"));

    // Students cannot pull the list.
    let (status, _, _) =
        send_raw(&t.app, request("GET", &export_uri, Some(&attending), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}
