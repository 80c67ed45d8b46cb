//! End-to-end placement flow driven through the public HTTP router.
//!
//! A school publishes a program and LIA period, a company posts a job, a student
//! builds a profile with a CV and applies, and each role checks its dashboard.

mod common {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use lia_banken::config::{AuthConfig, StorageConfig};
    use lia_banken::notifications::RecordingNotifier;
    use lia_banken::storage::MemoryObjectStore;
    use lia_banken::store::MemoryDatabase;
    use lia_banken::Platform;

    pub(super) struct Harness {
        pub(super) router: Router,
        pub(super) objects: Arc<MemoryObjectStore>,
        pub(super) notifier: Arc<RecordingNotifier>,
    }

    pub(super) fn harness(max_upload_bytes: u64) -> Harness {
        let objects = Arc::new(MemoryObjectStore::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let platform = Platform::new(
            Arc::new(MemoryDatabase::new()),
            objects.clone(),
            notifier.clone(),
            AuthConfig::default(),
            &StorageConfig {
                max_upload_bytes,
                ..StorageConfig::default()
            },
        );
        Harness {
            router: platform.router(),
            objects,
            notifier,
        }
    }

    pub(super) async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => request.body(Body::empty()),
        }
        .expect("request");

        let response = router
            .clone()
            .oneshot(request)
            .await
            .expect("route executes");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("read body");
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub(super) async fn upload(
        router: &Router,
        uri: &str,
        token: &str,
        bytes: Vec<u8>,
    ) -> StatusCode {
        let request = Request::builder()
            .method("PUT")
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(Body::from(bytes))
            .expect("request");
        router
            .clone()
            .oneshot(request)
            .await
            .expect("route executes")
            .status()
    }

    /// Register and sign in, returning the bearer token.
    pub(super) async fn account(router: &Router, email: &str, role: &str) -> String {
        let (status, _) = call(
            router,
            "POST",
            "/api/v1/auth/sign-up",
            None,
            Some(json!({ "email": email, "password": "sommar2026!", "role": role })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "sign up {email}");

        let (status, body) = call(
            router,
            "POST",
            "/api/v1/auth/sign-in",
            None,
            Some(json!({ "email": email, "password": "sommar2026!" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "sign in {email}");
        body["token"].as_str().expect("token").to_string()
    }
}

use axum::http::StatusCode;
use common::*;
use serde_json::json;

#[tokio::test]
async fn school_company_and_student_complete_a_placement() {
    let harness = harness(1024 * 1024);
    let router = &harness.router;

    let school = account(router, "lia@yh-norr.se", "school").await;
    let company = account(router, "hr@kodverket.se", "company").await;
    let student = account(router, "elin@student.se", "student").await;

    let (status, school_row) = call(
        router,
        "PUT",
        "/api/v1/schools",
        Some(&school),
        Some(json!({ "name": "YH Norr", "city": "Umeå" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let school_id = school_row["id"].as_str().expect("school id").to_string();

    let (status, program) = call(
        router,
        "POST",
        "/api/v1/programs",
        Some(&school),
        Some(json!({ "name": "Javautvecklare", "field": "IT", "lia_weeks": 12 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let program_id = program["id"].as_str().expect("program id").to_string();

    let (status, period) = call(
        router,
        "POST",
        "/api/v1/lia-periods",
        Some(&school),
        Some(json!({
            "program_id": program_id,
            "name": "LIA 1 VT27",
            "start_date": "2027-01-11",
            "end_date": "2027-04-02",
            "slots": 2
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let period_id = period["id"].as_str().expect("period id").to_string();

    let (status, _) = call(
        router,
        "PUT",
        "/api/v1/companies",
        Some(&company),
        Some(json!({
            "name": "Kodverket AB",
            "city": "Umeå",
            "supervisor": { "name": "Maja Holm", "email": "maja@kodverket.se" }
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, posting) = call(
        router,
        "POST",
        "/api/v1/postings",
        Some(&company),
        Some(json!({
            "title": "Javautvecklare LIA",
            "category": "IT",
            "location": "Umeå",
            "lia_period_id": period_id,
            "positions": 2,
            "publish": true
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(posting["status"], "active");
    let posting_id = posting["id"].as_str().expect("posting id").to_string();

    let (status, board) = call(router, "GET", "/api/v1/postings?category=it", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board[0]["company_name"], "Kodverket AB");

    let (status, _) = call(
        router,
        "PUT",
        "/api/v1/profile",
        Some(&student),
        Some(json!({
            "full_name": "Elin Ek",
            "school_id": school_id,
            "program_id": program_id,
            "lia_period_id": period_id,
            "skills": ["Java", "SQL", "java"]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let status = upload(
        router,
        "/api/v1/profile/cv?filename=Elin%20Ek%20CV.pdf",
        &student,
        b"%PDF-1.7 cv".to_vec(),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let paths = harness.objects.paths();
    assert_eq!(paths.len(), 1);
    assert!(paths[0].starts_with("cvs/"));
    assert!(paths[0].ends_with("-Elin_Ek_CV.pdf"));

    let (status, application) = call(
        router,
        "POST",
        "/api/v1/applications",
        Some(&student),
        Some(json!({ "posting_id": posting_id, "cover_letter": "Hej!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(application["cv_path"].as_str(), Some(paths[0].as_str()));
    let application_id = application["id"].as_str().expect("id").to_string();

    let (status, _) = call(
        router,
        "GET",
        &format!("/api/v1/students/{}", application["student_id"].as_str().expect("sid")),
        Some(&company),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "applicant profile visible to company");

    let (status, updated) = call(
        router,
        "PATCH",
        &format!("/api/v1/applications/{application_id}/status"),
        Some(&company),
        Some(json!({ "status": "accepted" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "accepted");
    assert_eq!(harness.notifier.events().len(), 2);

    let (_, dashboard) = call(router, "GET", "/api/v1/dashboard", Some(&school), None).await;
    assert_eq!(dashboard["role"], "school");
    assert_eq!(dashboard["students"], 1);
    assert_eq!(dashboard["placed_students"], 1);
    assert_eq!(dashboard["open_slots"], 1);

    let (_, dashboard) = call(router, "GET", "/api/v1/dashboard", Some(&company), None).await;
    assert_eq!(dashboard["role"], "company");
    assert_eq!(dashboard["applications_by_status"]["accepted"], 1);
    assert_eq!(dashboard["open_positions"], 2);

    let (_, dashboard) = call(router, "GET", "/api/v1/dashboard", Some(&student), None).await;
    assert_eq!(dashboard["role"], "student");
    assert_eq!(dashboard["has_cv"], true);
    assert_eq!(dashboard["active_postings"], 1);

    let (_, listing) = call(router, "GET", "/api/v1/applications", Some(&school), None).await;
    assert_eq!(listing[0]["posting"]["title"], "Javautvecklare LIA");
}

#[tokio::test]
async fn posting_form_without_title_creates_nothing() {
    let harness = harness(1024);
    let router = &harness.router;
    let company = account(router, "hr@bygg.se", "company").await;
    call(
        router,
        "PUT",
        "/api/v1/companies",
        Some(&company),
        Some(json!({ "name": "Bygg AB" })),
    )
    .await;

    let (status, body) = call(
        router,
        "POST",
        "/api/v1/postings",
        Some(&company),
        Some(json!({ "title": "   ", "category": "Bygg" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "title is required");

    let (_, own) = call(router, "GET", "/api/v1/company/postings", Some(&company), None).await;
    assert_eq!(own.as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn oversize_cv_is_rejected() {
    let harness = harness(16);
    let router = &harness.router;
    let student = account(router, "kim@student.se", "student").await;
    call(
        router,
        "PUT",
        "/api/v1/profile",
        Some(&student),
        Some(json!({ "full_name": "Kim Berg" })),
    )
    .await;

    let status = upload(
        router,
        "/api/v1/profile/cv?filename=cv.pdf",
        &student,
        vec![b'x'; 64],
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(harness.objects.paths().is_empty());
}

#[tokio::test]
async fn sign_up_rules_are_enforced() {
    let harness = harness(1024);
    let router = &harness.router;

    let (status, _) = call(
        router,
        "POST",
        "/api/v1/auth/sign-up",
        None,
        Some(json!({ "email": "root@lia.se", "password": "langtlosenord", "role": "admin" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    account(router, "Anna@Skola.se", "school").await;
    let (status, _) = call(
        router,
        "POST",
        "/api/v1/auth/sign-up",
        None,
        Some(json!({ "email": "anna@skola.se", "password": "langtlosenord", "role": "student" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(router, "GET", "/api/v1/auth/me", Some("not-a-token"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
