mod support;

use axum::http::{StatusCode, header};
use serde_json::json;
use time::{Duration, OffsetDateTime};

use lightfield::domain::ordering::CollectionVersion;
use lightfield::domain::resources::ResourceKind;

use support::{FakeGateway, STAFF_PASSWORD, STAFF_USERNAME, TestApp, body_json, json_request};

fn future_date() -> String {
    let date = (OffsetDateTime::now_utc() + Duration::days(2)).date();
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

async fn create_associate(app: &TestApp, token: &str, name: &str) -> String {
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/associates",
            Some(token),
            Some(json!({
                "name": name,
                "title": "Partner",
                "bio": "Technology counsel.",
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["id"]
        .as_str()
        .expect("id")
        .to_string()
}

#[tokio::test]
async fn health_reports_no_content() {
    let app = TestApp::new().await;
    let response = app.send(json_request("GET", "/health", None, None)).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn login_returns_token_pair() {
    let app = TestApp::new().await;
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"username": STAFF_USERNAME, "password": STAFF_PASSWORD})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["access"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["username"], STAFF_USERNAME);

    let wrong = app
        .send(json_request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"username": STAFF_USERNAME, "password": "nope-nope"})),
        ))
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn writes_require_staff() {
    let app = TestApp::new().await;
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/associates",
            None,
            Some(json!({"name": "Anon", "title": "T", "bio": "B"})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn invalid_token_is_rejected_on_public_routes() {
    let app = TestApp::new().await;
    let response = app
        .send(json_request(
            "GET",
            "/api/v1/associates",
            Some("lfa_bogus_token"),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_carries_collection_version() {
    let app = TestApp::new().await;
    let token = app.access_token().await;
    create_associate(&app, &token, "Ada Obi").await;
    create_associate(&app, &token, "Bola Ade").await;

    let response = app
        .send(json_request("GET", "/api/v1/associates", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok()),
        Some("\"2\"")
    );
    let body = body_json(response).await;
    let names: Vec<_> = body
        .as_array()
        .expect("array")
        .iter()
        .map(|item| item["name"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Ada Obi".to_string()));
    assert_eq!(app.store.audit_actions(), ["associate.create", "associate.create"]);
}

#[tokio::test]
async fn missing_required_field_is_a_validation_error() {
    let app = TestApp::new().await;
    let token = app.access_token().await;
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/associates",
            Some(&token),
            Some(json!({"title": "Partner", "bio": "Counsel"})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "validation_error");
    assert!(
        body["error"]["hint"]
            .as_str()
            .is_some_and(|hint| hint.starts_with("name:"))
    );
}

#[tokio::test]
async fn reorder_applies_priorities_and_bumps_version() {
    let app = TestApp::new().await;
    let token = app.access_token().await;
    let first = create_associate(&app, &token, "First").await;
    let second = create_associate(&app, &token, "Second").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/associates/reorder",
            Some(&token),
            Some(json!({
                "items": [
                    {"id": second, "order_priority": 0},
                    {"id": first, "order_priority": 1}
                ],
                "base_version": 2
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Associates reordered successfully");
    assert_eq!(body["version"], 3);
    assert_eq!(
        app.store.version(ResourceKind::Associates),
        CollectionVersion(3)
    );

    let priorities = app.store.associate_priorities();
    let second_priority = priorities
        .iter()
        .find(|(id, _)| id.to_string() == second)
        .map(|(_, priority)| *priority);
    assert_eq!(second_priority, Some(0));
    assert!(
        app.store
            .audit_actions()
            .contains(&"associate.reorder".to_string())
    );
}

#[tokio::test]
async fn reorder_with_stale_base_version_conflicts() {
    let app = TestApp::new().await;
    let token = app.access_token().await;
    let only = create_associate(&app, &token, "Only").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/associates/reorder",
            Some(&token),
            Some(json!({
                "items": [{"id": only, "order_priority": 4}],
                "base_version": 0
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(
        response
            .headers()
            .get(header::ETAG)
            .and_then(|v| v.to_str().ok()),
        Some("\"1\"")
    );
    assert_eq!(body_json(response).await["error"]["code"], "version_conflict");
}

#[tokio::test]
async fn empty_reorder_still_checks_base_version() {
    let app = TestApp::new().await;
    let token = app.access_token().await;
    create_associate(&app, &token, "Only").await;

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/associates/reorder",
            Some(&token),
            Some(json!({"items": [], "base_version": 0})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["error"]["code"], "version_conflict");

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/associates/reorder",
            Some(&token),
            Some(json!({"items": [], "base_version": 1})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn reorder_items_need_id_and_priority() {
    let app = TestApp::new().await;
    let token = app.access_token().await;
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/grants/reorder",
            Some(&token),
            Some(json!({"items": [{"order_priority": 1}]})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"]["message"],
        "Each item must have 'id' and 'order_priority' fields"
    );
}

#[tokio::test]
async fn malformed_bodies_use_the_error_envelope() {
    let app = TestApp::new().await;
    let token = app.access_token().await;
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/associates/reorder",
            Some(&token),
            Some(json!({"items": [{"id": "not-a-uuid", "order_priority": 1}]})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok()),
        Some("application/json")
    );
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "invalid_input");
    assert_eq!(body["error"]["message"], "Request body has invalid fields");
    assert_eq!(
        app.store.version(ResourceKind::Associates),
        CollectionVersion(0)
    );
}

#[tokio::test]
async fn reorder_requires_staff() {
    let app = TestApp::new().await;
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/testimonials/reorder",
            None,
            Some(json!({"items": []})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn contact_submission_is_public() {
    let app = TestApp::new().await;
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/contacts",
            None,
            Some(json!({
                "name": "Chidi",
                "email": "chidi@example.com",
                "subject": "Advisory",
                "message": "Please call me back."
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(
        body_json(response).await["message"],
        "Contact form submitted successfully"
    );

    let listing = app
        .send(json_request("GET", "/api/v1/contacts", None, None))
        .await;
    assert_eq!(listing.status(), StatusCode::UNAUTHORIZED);

    let token = app.access_token().await;
    let listing = app
        .send(json_request("GET", "/api/v1/contacts", Some(&token), None))
        .await;
    assert_eq!(listing.status(), StatusCode::OK);
    assert_eq!(body_json(listing).await.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn booking_checkout_then_verification() {
    let app = TestApp::new().await;
    let service = app.store.seed_service("AI Compliance Review", 5_000_000, true);

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/bookings",
            None,
            Some(json!({
                "service_id": service,
                "client_name": "Ngozi",
                "client_email": "ngozi@example.com",
                "client_phone": "+2348000000000",
                "preferred_date": future_date(),
                "preferred_time": "10:30"
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let checkout = body_json(response).await;
    assert_eq!(checkout["amount"], 5_000_000);
    assert_eq!(checkout["currency"], "NGN");
    let reference = checkout["reference"].as_str().expect("reference").to_string();
    assert!(
        checkout["authorization_url"]
            .as_str()
            .is_some_and(|url| url.ends_with(&reference))
    );

    let verified = app
        .send(json_request(
            "POST",
            "/api/v1/bookings/verify-payment",
            None,
            Some(json!({"reference": reference})),
        ))
        .await;
    assert_eq!(verified.status(), StatusCode::OK);
    let view = body_json(verified).await;
    assert_eq!(view["payment_verified"], true);
    assert_eq!(view["status"], "paid");

    let again = app
        .send(json_request(
            "POST",
            "/api/v1/bookings/verify-payment",
            None,
            Some(json!({"reference": reference})),
        ))
        .await;
    assert_eq!(again.status(), StatusCode::OK);
}

#[tokio::test]
async fn booking_rejects_past_dates() {
    let app = TestApp::new().await;
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/bookings",
            None,
            Some(json!({
                "custom_service_description": "Contract review",
                "client_name": "Ngozi",
                "client_email": "ngozi@example.com",
                "client_phone": "+2348000000000",
                "preferred_date": "2020-01-01",
                "preferred_time": "10:30"
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(
        body_json(response).await["error"]["hint"]
            .as_str()
            .is_some_and(|hint| hint.starts_with("preferred_date:"))
    );
    assert_eq!(app.store.booking_count(), 0);
}

#[tokio::test]
async fn gateway_failure_discards_the_booking() {
    let gateway = FakeGateway::unreachable();
    let app = TestApp::with(gateway, 1_000).await;
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/bookings",
            None,
            Some(json!({
                "custom_service_description": "Blockchain structuring",
                "client_name": "Ife",
                "client_email": "ife@example.com",
                "client_phone": "+2348011111111",
                "preferred_date": future_date(),
                "preferred_time": "09:00:00"
            })),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(
        body_json(response).await["error"]["code"],
        "payment_gateway_error"
    );
    assert_eq!(app.store.booking_count(), 0);
}

#[tokio::test]
async fn unsuccessful_payment_is_not_marked_paid() {
    let gateway = FakeGateway::reporting("abandoned");
    let app = TestApp::with(gateway, 1_000).await;
    let checkout = body_json(
        app.send(json_request(
            "POST",
            "/api/v1/bookings",
            None,
            Some(json!({
                "custom_service_description": "Data protection audit",
                "client_name": "Ife",
                "client_email": "ife@example.com",
                "client_phone": "+2348011111111",
                "preferred_date": future_date(),
                "preferred_time": "09:00"
            })),
        ))
        .await,
    )
    .await;
    let reference = checkout["reference"].as_str().expect("reference");

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/bookings/verify-payment",
            None,
            Some(json!({"reference": reference})),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"]["code"], "payment_failed");

    let lookup = app
        .send(json_request(
            "GET",
            &format!("/api/v1/bookings/reference/{reference}"),
            None,
            None,
        ))
        .await;
    assert_eq!(lookup.status(), StatusCode::OK);
    assert_eq!(body_json(lookup).await["payment_verified"], false);
}

#[tokio::test]
async fn anonymous_callers_are_rate_limited() {
    let app = TestApp::with(FakeGateway::default(), 2).await;
    for _ in 0..2 {
        let response = app
            .send(json_request("GET", "/api/v1/grants", None, None))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
    let limited = app
        .send(json_request("GET", "/api/v1/grants", None, None))
        .await;
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key(header::RETRY_AFTER));
}

#[tokio::test]
async fn rotating_forwarded_for_does_not_reset_the_limit() {
    let app = TestApp::with(FakeGateway::default(), 1).await;
    let mut statuses = Vec::new();
    for n in 0..3 {
        let mut request = json_request("GET", "/api/v1/grants", None, None);
        request.headers_mut().insert(
            "x-forwarded-for",
            format!("203.0.113.{n}").parse().expect("header value"),
        );
        statuses.push(app.send(request).await.status());
    }
    assert_eq!(
        statuses,
        [
            StatusCode::OK,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::TOO_MANY_REQUESTS
        ]
    );
}

#[tokio::test]
async fn rate_buckets_follow_route_templates() {
    let app = TestApp::with(FakeGateway::default(), 1_000).await;
    for reference in ["LF-AAAAAAAAAA", "LF-BBBBBBBBBB", "LF-CCCCCCCCCC"] {
        app.send(json_request(
            "GET",
            &format!("/api/v1/bookings/reference/{reference}"),
            None,
            None,
        ))
        .await;
    }
    assert_eq!(app.state.rate_limiter.bucket_count(), 1);
}

#[tokio::test]
async fn dashboard_charts_aggregate_published_posts_and_contacts() {
    let app = TestApp::new().await;
    let token = app.access_token().await;
    let recent = OffsetDateTime::now_utc() - Duration::hours(1);
    app.store.seed_blog("First", Some(recent), 10, &["AI Policy"]);
    app.store
        .seed_blog("Second", Some(recent), 5, &["AI Policy", "Data"]);
    app.store.seed_blog(
        "Archive",
        Some(OffsetDateTime::now_utc() - Duration::days(60)),
        100,
        &[],
    );
    app.store.seed_blog("Draft", None, 7, &["Data"]);

    let response = app
        .send(json_request(
            "GET",
            "/api/v1/dashboard/views-over-time",
            None,
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .send(json_request(
            "GET",
            "/api/v1/dashboard/views-over-time",
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let views = body_json(response).await;
    assert_eq!(views.as_array().map(Vec::len), Some(1));
    assert_eq!(views[0]["views"], 15);

    let response = app
        .send(json_request(
            "GET",
            "/api/v1/dashboard/posts-over-time?days=90",
            Some(&token),
            None,
        ))
        .await;
    let posts = body_json(response).await;
    let total: u64 = posts
        .as_array()
        .expect("series")
        .iter()
        .filter_map(|point| point["posts"].as_u64())
        .sum();
    assert_eq!(total, 3);

    for bad in ["days=0", "days=soon"] {
        let response = app
            .send(json_request(
                "GET",
                &format!("/api/v1/dashboard/posts-over-time?{bad}"),
                Some(&token),
                None,
            ))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"]["code"], "invalid_input");
    }

    let response = app
        .send(json_request(
            "GET",
            "/api/v1/dashboard/posts-by-category",
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(
        body_json(response).await,
        json!([
            {"category": "AI Policy", "posts": 2},
            {"category": "Data", "posts": 1}
        ])
    );

    app.send(json_request(
        "POST",
        "/api/v1/contacts",
        None,
        Some(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "subject": "Grant",
            "message": "Is the fund still open?"
        })),
    ))
    .await;
    let response = app
        .send(json_request(
            "GET",
            "/api/v1/dashboard/contacts-by-status",
            Some(&token),
            None,
        ))
        .await;
    assert_eq!(
        body_json(response).await,
        json!([{"status": "Unread", "value": 1, "raw_status": "unread"}])
    );
}

#[tokio::test]
async fn unknown_routes_fall_back_to_not_found() {
    let app = TestApp::new().await;
    let response = app
        .send(json_request("GET", "/api/v1/nowhere", None, None))
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
