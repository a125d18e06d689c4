use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{NaiveDate, TimeZone, Utc};
use tower::ServiceExt;

use appointment_cell::router::appointment_routes;
use shared_database::sync::{cache_appointment, cache_patient};
use shared_models::status::AppointmentStatus;
use shared_utils::state::AppState;
use shared_utils::test_utils::{test_state, FakeScheduling, JwtTestUtils, MockDrChronoResponses, TestConfig, TestUser};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 14).unwrap()
}

fn setup() -> (Arc<FakeScheduling>, Arc<AppState>, String) {
    let fake = Arc::new(
        FakeScheduling::new(7)
            .with_patient(MockDrChronoResponses::remote_patient(11, 7, "Jane", "Doe"))
            .with_appointment(MockDrChronoResponses::remote_appointment("a-1", 11, 7, today().and_hms_opt(9, 0, 0).unwrap())),
    );
    let config = TestConfig::default().to_app_config();
    let user = TestUser::default();
    let token = JwtTestUtils::create_test_token(&user, &config.session_secret);
    let state = test_state(config, fake.clone(), &user);
    (fake, state, token)
}

fn arrived(state: &AppState) {
    cache_patient(&state.store, &MockDrChronoResponses::remote_patient(11, 7, "Jane", "Doe")).unwrap();
    cache_appointment(
        &state.store,
        &MockDrChronoResponses::remote_appointment("a-1", 11, 7, today().and_hms_opt(9, 0, 0).unwrap()),
    ).unwrap();
    state.store.mark_arrived("a-1", Utc.with_ymd_and_hms(2026, 10, 14, 14, 0, 0).unwrap()).unwrap();
}

fn form_post(uri: &str, token: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::COOKIE, format!("session={}", token))
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_routes_require_session() {
    let (_, state, _) = setup();
    let app: Router = appointment_routes(state);

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_call_in_then_complete() {
    let (fake, state, token) = setup();
    arrived(&state);
    let app = appointment_routes(state.clone());

    let response = app
        .clone()
        .oneshot(form_post(
            "/call_in_patient/",
            &token,
            "appointment_id=a-1&current_date_time=2026-10-14T14%3A00%3A20Z",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["avg_wait_time"], "0:00:20");

    let response = app
        .oneshot(form_post("/appointment_completed/", &token, "appointment_id=a-1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"ok");
    assert_eq!(state.store.get_appointment("a-1").unwrap().unwrap().status, AppointmentStatus::Complete);
    assert_eq!(fake.appointment_patches().len(), 2);
}

#[tokio::test]
async fn test_call_in_with_bad_timestamp_is_bad_request() {
    let (_, state, token) = setup();
    arrived(&state);

    let response = appointment_routes(state)
        .oneshot(form_post("/call_in_patient/", &token, "appointment_id=a-1&current_date_time=soon"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_dashboard_lists_todays_appointments_in_local_zone() {
    let (_, state, token) = setup();

    let request = Request::builder()
        .uri("/")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = appointment_routes(state).oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["doctor_id"], 7);
    assert!(json.get("average_wait_time").is_none());
}
