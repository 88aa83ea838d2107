use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};
use voucherdesk_auth::SessionClaims;
use voucherdesk_infra::{AnyVoucherStore, InMemoryVoucherStore};

const SECRET: &str = "test-secret";

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over an in-memory store, bound to an ephemeral port.
        let store = AnyVoucherStore::InMemory(InMemoryVoucherStore::new());
        let app = voucherdesk_api::app::build_router(SECRET, store, 64);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: &str) -> String {
    let now = Utc::now();
    let claims = SessionClaims::new(sub, now, now + ChronoDuration::minutes(10))
        .with_email(format!("{sub}@example.com"));

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn march_voucher() -> Value {
    json!({
        "title": "March travel",
        "type": "Month",
        "dateRange": "March 2025",
        "expenses": [
            { "category": "food", "date": "2025-03-03", "description": "client lunch", "amount": 315.0 },
            { "category": "fuel", "date": "2025-03-04", "description": "site visit", "distanceKm": 10.0 }
        ]
    })
}

async fn create_draft(client: &reqwest::Client, srv: &TestServer, token: &str, body: &Value) -> String {
    let res = client
        .post(srv.url("/vouchers"))
        .bearer_auth(token)
        .json(body)
        .send()
        .await
        .unwrap();
    if res.status() != StatusCode::CREATED {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        panic!("expected 201 from create, got {status} body={body}");
    }
    let created: Value = res.json().await.unwrap();
    created["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client.get(srv.url("/vouchers")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn owner_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(mint_jwt("alice"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["owner_id"], "alice");
    assert_eq!(body["email"], "alice@example.com");
}

#[tokio::test]
async fn voucher_lifecycle_draft_update_submit_export_delete() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt("alice");

    let id = create_draft(&client, &srv, &token, &march_voucher()).await;

    let res = client
        .get(srv.url(&format!("/vouchers/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let voucher: Value = res.json().await.unwrap();
    assert_eq!(voucher["status"], "Draft");
    assert_eq!(voucher["totalAmount"], 35_000);
    assert_eq!(voucher["total"], "350.00");
    assert_eq!(voucher["expenses"].as_array().unwrap().len(), 2);
    assert_eq!(voucher["expenses"][1]["amount"], 3_500);

    // Update replaces the whole expense set.
    let mut revised = march_voucher();
    revised["title"] = json!("March travel (rev)");
    revised["expenses"] = json!([
        { "category": "taxi", "date": "2025-03-05", "amount": 12.5 }
    ]);
    let res = client
        .put(srv.url(&format!("/vouchers/{id}")))
        .bearer_auth(&token)
        .json(&revised)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let voucher: Value = client
        .get(srv.url(&format!("/vouchers/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(voucher["title"], "March travel (rev)");
    assert_eq!(voucher["totalAmount"], 1_250);

    // Drafts are not exportable yet.
    let res = client
        .get(srv.url(&format!("/vouchers/{id}/statement")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);

    let res = client
        .post(srv.url(&format!("/vouchers/{id}/submit")))
        .bearer_auth(&token)
        .json(&revised)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    // Submitted vouchers are locked.
    let res = client
        .put(srv.url(&format!("/vouchers/{id}")))
        .bearer_auth(&token)
        .json(&revised)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "voucher_locked");

    let res = client
        .get(srv.url(&format!("/vouchers/{id}/statement")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let statement: Value = res.json().await.unwrap();
    assert_eq!(statement["statement"]["lines"][0]["category"], "TAXI");
    assert!(statement["text"].as_str().unwrap().contains("Total: 12.50"));

    let exports: Value = client
        .get(srv.url("/exports"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(exports.as_array().unwrap().len(), 1);

    let res = client
        .delete(srv.url(&format!("/vouchers/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = client
        .get(srv.url(&format!("/vouchers/{id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_fields_are_reported_together() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/vouchers/submit"))
        .bearer_auth(mint_jwt("alice"))
        .json(&json!({ "title": "", "type": "Month", "dateRange": "", "expenses": [] }))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["fields"], json!(["title", "dateRange", "expenses"]));
}

#[tokio::test]
async fn malformed_expenses_are_rejected() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt("alice");

    for expense in [
        json!({ "category": "fuel", "date": "2025-03-04", "amount": 20.0 }),
        json!({ "category": "hotel", "date": "2025-03-04", "amount": 20.0 }),
        json!({ "category": "food", "date": "", "amount": 20.0 }),
        json!({ "category": "food", "date": "2025-03-04", "amount": -1.0 }),
    ] {
        let mut body = march_voucher();
        body["expenses"] = json!([expense]);
        let res = client
            .post(srv.url("/vouchers"))
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "expense: {expense}");
    }

    let res = client
        .get(srv.url("/vouchers?status=Archived"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn owner_isolation_blocks_cross_owner_reads_and_writes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let alice = mint_jwt("alice");
    let bob = mint_jwt("bob");

    let id = create_draft(&client, &srv, &alice, &march_voucher()).await;

    let res = client
        .get(srv.url(&format!("/vouchers/{id}")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .put(srv.url(&format!("/vouchers/{id}")))
        .bearer_auth(&bob)
        .json(&march_voucher())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(srv.url(&format!("/vouchers/{id}")))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let listed: Value = client
        .get(srv.url("/vouchers"))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn list_filters_by_status_and_dashboard_counts() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt("alice");

    create_draft(&client, &srv, &token, &march_voucher()).await;
    let res = client
        .post(srv.url("/vouchers/submit"))
        .bearer_auth(&token)
        .json(&march_voucher())
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);

    let drafts: Value = client
        .get(srv.url("/vouchers?status=Draft"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(drafts.as_array().unwrap().len(), 1);
    assert_eq!(drafts[0]["status"], "Draft");

    let stats: Value = client
        .get(srv.url("/dashboard"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["voucherCount"], 2);
    assert_eq!(stats["draftCount"], 1);
    assert_eq!(stats["submittedCount"], 1);
    assert_eq!(stats["totalAmount"], 70_000);
    assert_eq!(stats["submittedAmount"], 35_000);
}

#[tokio::test]
async fn stream_delivers_own_voucher_changes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let token = mint_jwt("alice");

    let mut stream = client
        .get(srv.url("/stream"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(stream.status(), StatusCode::OK);

    // Another owner's write must not show up on alice's stream.
    create_draft(&client, &srv, &mint_jwt("bob"), &march_voucher()).await;
    let id = create_draft(&client, &srv, &token, &march_voucher()).await;

    let mut received = String::new();
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    while !received.contains(&id) {
        let chunk = tokio::time::timeout_at(deadline, stream.chunk())
            .await
            .expect("no voucher event within timeout")
            .unwrap()
            .expect("stream closed");
        received.push_str(&String::from_utf8_lossy(&chunk));
    }

    assert!(received.contains("event: voucher"));
    assert!(received.contains("\"kind\":\"created\""));
    assert!(!received.contains("bob"));
}
