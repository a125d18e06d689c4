use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use checkin_cell::forms::ONLY_WHITESPACE;
use checkin_cell::models::{NO_PATIENT_FOUND, NON_FIELD_ERRORS};
use checkin_cell::router::checkin_routes;
use shared_models::status::AppointmentStatus;
use shared_utils::test_utils::{test_state, FakeScheduling, JwtTestUtils, MockDrChronoResponses, TestConfig, TestUser};
use shared_utils::state::AppState;

fn setup() -> (Arc<FakeScheduling>, Arc<AppState>, String) {
    let today = Utc::now().date_naive();
    let fake = Arc::new(
        FakeScheduling::new(7)
            .with_patient(MockDrChronoResponses::remote_patient(11, 7, "Jane", "Doe"))
            .with_appointment(MockDrChronoResponses::remote_appointment("a-1", 11, 7, today.and_hms_opt(9, 0, 0).unwrap())),
    );
    let config = TestConfig::default().to_app_config();
    let user = TestUser::default();
    let token = JwtTestUtils::create_test_token(&user, &config.session_secret);
    let state = test_state(config, fake.clone(), &user);
    (fake, state, token)
}

fn form_post(uri: &str, token: &str, fields: &[(&str, &str)]) -> Request<Body> {
    let body = fields
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, format!("session={}; tzname_from_user=UTC", token))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn test_get_pages_render_empty_forms() {
    let (_, state, token) = setup();
    let app = checkin_routes(state);

    for (uri, page) in [("/checkin/", "checkin"), ("/walkin/", "walkin"), ("/demographics/", "checkin")] {
        let request = Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let (status, json) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["page"], page);
    }
}

#[tokio::test]
async fn test_checkin_rerenders_with_field_errors() {
    let (fake, state, token) = setup();
    let app = checkin_routes(state);

    let (status, json) = send(
        &app,
        form_post("/checkin/", &token, &[("first_name", "Jane"), ("last_name", "Doe"), ("social_security_number", "   ")]),
    ).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["page"], "checkin");
    assert_eq!(json["errors"]["social_security_number"][0], ONLY_WHITESPACE);
    assert_eq!(json["form"]["first_name"], "Jane");
    assert!(fake.patient_patches().is_empty());
}

#[tokio::test]
async fn test_unknown_patient_is_a_form_error() {
    let (_, state, token) = setup();
    let app = checkin_routes(state);

    let (_, json) = send(
        &app,
        form_post("/checkin/", &token, &[("first_name", "Nobody"), ("last_name", "Here"), ("social_security_number", "123-45-6789")]),
    ).await;

    assert_eq!(json["page"], "checkin");
    assert_eq!(json["errors"][NON_FIELD_ERRORS][0], NO_PATIENT_FOUND);
}

#[tokio::test]
async fn test_checkin_then_demographics_completes() {
    let (fake, state, token) = setup();
    let app = checkin_routes(state.clone());

    let (_, page) = send(
        &app,
        form_post("/checkin/", &token, &[("first_name", "Jane"), ("last_name", "Doe"), ("social_security_number", "123-45-6789")]),
    ).await;
    assert_eq!(page["page"], "demographics");
    let form = &page["form"];
    assert_eq!(form["appointment_id"], "a-1");

    let field = |name: &str| form[name].as_str().unwrap().to_string();
    let (status, done) = send(
        &app,
        form_post("/demographics/", &token, &[
            ("patient_id", &field("patient_id")),
            ("appointment_id", &field("appointment_id")),
            ("cell_phone", &field("cell_phone")),
            ("email", "jane.new@example.com"),
            ("zip_code", &field("zip_code")),
            ("address", &field("address")),
            ("emergency_contact_phone", &field("emergency_contact_phone")),
            ("emergency_contact_name", &field("emergency_contact_name")),
            ("initial_form_data", &field("initial_form_data")),
        ]),
    ).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(done["page"], "completed");
    assert_eq!(done["patient_queue"], 0);

    let patches = fake.patient_patches();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].1.keys().collect::<Vec<_>>(), vec!["email"]);
    assert_eq!(state.store.get_appointment("a-1").unwrap().unwrap().status, AppointmentStatus::Arrived);
    assert_eq!(state.store.drain_arrivals(7).unwrap(), vec!["a-1".to_string()]);
}

#[tokio::test]
async fn test_tampered_snapshot_is_refused() {
    let (fake, state, token) = setup();
    let app = checkin_routes(state);

    let (_, json) = send(
        &app,
        form_post("/demographics/", &token, &[
            ("cell_phone", "+15555550100"),
            ("emergency_contact_phone", "+15555550199"),
            ("initial_form_data", r#"{"patient_id":11,"appointment_id":"a-1"}"#),
        ]),
    ).await;

    assert_eq!(json["page"], "demographics");
    assert!(json["errors"][NON_FIELD_ERRORS][0].is_string());
    assert!(fake.appointment_patches().is_empty());
}

#[tokio::test]
async fn test_walkin_registers_new_patient() {
    let (fake, state, token) = setup();
    let app = checkin_routes(state);

    let (_, json) = send(
        &app,
        form_post("/walkin/", &token, &[
            ("first_name", "Sam"),
            ("last_name", "New"),
            ("social_security_number", "123 45 6789"),
            ("gender", "Other"),
        ]),
    ).await;

    assert_eq!(json["page"], "walkin");
    assert!(json["notice"].is_string());
    assert_eq!(fake.created_patients()[0].social_security_number, "123-45-6789");
}
