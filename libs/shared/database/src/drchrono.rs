use async_trait::async_trait;
use reqwest::{
    Client,
    header::{HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION},
    Method, RequestBuilder, Response,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{debug, error, info};

use shared_config::AppConfig;
use shared_models::auth::OAuthToken;
use shared_models::scheduling::{
    AppointmentQuery, Created, NewAppointment, NewPatient, Page, PatchOutcome, PatientChanges,
    PatientQuery, RemoteAppointment, RemotePatient, RemoteUser, SchedulingError, SchedulingProvider,
};

pub struct DrChronoClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl DrChronoClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.drchrono_base_url.trim_end_matches('/').to_string(),
            client_id: config.drchrono_client_id.clone(),
            client_secret: config.drchrono_client_secret.clone(),
            redirect_uri: config.drchrono_redirect_uri.clone(),
        }
    }

    fn get_headers(&self, auth_token: &str) -> Result<HeaderMap, SchedulingError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = HeaderValue::from_str(&format!("Bearer {}", auth_token))
            .map_err(|_| SchedulingError::Unauthorized("Access token is not a valid header value".to_string()))?;
        headers.insert(AUTHORIZATION, bearer);

        Ok(headers)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, req: RequestBuilder) -> Result<Response, SchedulingError> {
        req.send()
            .await
            .map_err(|e| SchedulingError::Transport(e.to_string()))
    }

    async fn check(response: Response) -> Result<Response, SchedulingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await.unwrap_or_default();
        error!("API error ({}): {}", status, error_text);

        Err(match status.as_u16() {
            401 | 403 => SchedulingError::Unauthorized(error_text),
            code => SchedulingError::Status { status: code, body: error_text },
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, SchedulingError> {
        response
            .json::<T>()
            .await
            .map_err(|e| SchedulingError::Decode(e.to_string()))
    }

    /// GETs `path` and every `next` page after it. Any failing page fails the whole listing.
    async fn get_all<T>(
        &self,
        path: &str,
        params: &[(&'static str, String)],
        auth_token: &str,
    ) -> Result<Vec<T>, SchedulingError>
    where
        T: DeserializeOwned,
    {
        let headers = self.get_headers(auth_token)?;
        let mut results = Vec::new();

        let first = self.url(path);
        debug!("Making request to {}", first);
        let mut req = self.client.get(&first).headers(headers.clone()).query(params);

        loop {
            let response = Self::check(self.send(req).await?).await?;
            let page: Page<T> = Self::decode(response).await?;
            results.extend(page.results);

            // a JSON null on the last page
            match page.next {
                Some(next) => {
                    debug!("Following next page {}", next);
                    req = self.client.get(&next).headers(headers.clone());
                }
                None => break,
            }
        }

        Ok(results)
    }

    async fn patch(&self, path: &str, body: Value, auth_token: &str) -> Result<PatchOutcome, SchedulingError> {
        let url = self.url(path);
        debug!("Making request to {}", url);

        let req = self.client
            .request(Method::PATCH, &url)
            .headers(self.get_headers(auth_token)?)
            .json(&body);
        let response = self.send(req).await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        info!("PATCH {} :: status code {}, body: {}", path, status.as_u16(), text);

        if !status.is_success() {
            error!("API error ({}): {}", status, text);
        }

        Ok(PatchOutcome::from_status(status.as_u16()))
    }

    async fn post<T>(&self, path: &str, body: Value, auth_token: &str) -> Result<T, SchedulingError>
    where
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!("Making request to {}", url);

        let req = self.client
            .post(&url)
            .headers(self.get_headers(auth_token)?)
            .json(&body);
        let response = Self::check(self.send(req).await?).await?;

        Self::decode(response).await
    }
}

#[async_trait]
impl SchedulingProvider for DrChronoClient {
    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, SchedulingError> {
        let url = self.url("/o/token/");
        debug!("Exchanging authorization code at {}", url);

        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let response = Self::check(self.send(self.client.post(&url).form(&form)).await?).await?;

        Self::decode(response).await
    }

    async fn current_user(&self, token: &str) -> Result<RemoteUser, SchedulingError> {
        let url = self.url("/api/users/current");
        debug!("Making request to {}", url);

        let req = self.client.get(&url).headers(self.get_headers(token)?);
        let response = Self::check(self.send(req).await?).await?;

        Self::decode(response).await
    }

    async fn list_patients(
        &self,
        token: &str,
        query: &PatientQuery,
    ) -> Result<Vec<RemotePatient>, SchedulingError> {
        self.get_all("/api/patients", &query.params(), token).await
    }

    async fn list_appointments(
        &self,
        token: &str,
        query: &AppointmentQuery,
    ) -> Result<Vec<RemoteAppointment>, SchedulingError> {
        self.get_all("/api/appointments", &query.params(), token).await
    }

    async fn patch_patient(
        &self,
        token: &str,
        patient_id: i64,
        changes: &PatientChanges,
    ) -> Result<PatchOutcome, SchedulingError> {
        let body = serde_json::to_value(changes)
            .map_err(|e| SchedulingError::Decode(e.to_string()))?;

        self.patch(&format!("/api/patients/{}", patient_id), body, token).await
    }

    async fn patch_appointment(
        &self,
        token: &str,
        appointment_id: &str,
        status: &str,
    ) -> Result<PatchOutcome, SchedulingError> {
        self.patch(
            &format!("/api/appointments/{}", appointment_id),
            json!({ "status": status }),
            token,
        ).await
    }

    async fn create_patient(
        &self,
        token: &str,
        patient: &NewPatient,
    ) -> Result<Created, SchedulingError> {
        let body = serde_json::to_value(patient)
            .map_err(|e| SchedulingError::Decode(e.to_string()))?;

        self.post("/api/patients", body, token).await
    }

    async fn create_appointment(
        &self,
        token: &str,
        appointment: &NewAppointment,
    ) -> Result<Created, SchedulingError> {
        let body = json!({
            "doctor": appointment.doctor,
            "patient": appointment.patient,
            "office": appointment.office,
            "exam_room": appointment.exam_room,
            "scheduled_time": appointment.scheduled_time.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "duration": appointment.duration,
        });

        self.post("/api/appointments", body, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;
    use wiremock::{MockServer, Mock, ResponseTemplate};
    use wiremock::matchers::{body_json, body_string_contains, header, method, path, query_param};

    fn test_config(base_url: &str) -> AppConfig {
        AppConfig {
            drchrono_base_url: base_url.to_string(),
            drchrono_client_id: "client-id".to_string(),
            drchrono_client_secret: "client-secret".to_string(),
            drchrono_redirect_uri: "http://localhost:3000/complete/drchrono/".to_string(),
            session_secret: "test-session-secret".to_string(),
            session_ttl_hours: 12,
            database_path: ":memory:".to_string(),
            port: 3000,
            match_on_ssn: false,
        }
    }

    fn patient_json(id: i64, first: &str) -> Value {
        json!({
            "id": id,
            "doctor": 7,
            "first_name": first,
            "last_name": "Doe",
            "email": "doe@example.com",
            "gender": "Female"
        })
    }

    #[tokio::test]
    async fn test_list_patients_follows_next_links_in_order() {
        let server = MockServer::start().await;
        let client = DrChronoClient::new(&test_config(&server.uri()));

        Mock::given(method("GET"))
            .and(path("/api/patients"))
            .and(query_param("page", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [patient_json(3, "Cara")],
                "next": null
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/patients"))
            .and(query_param("doctor", "7"))
            .and(header("Authorization", "Bearer token-abc"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [patient_json(1, "Ann"), patient_json(2, "Bea")],
                "next": format!("{}/api/patients?page=2", server.uri())
            })))
            .mount(&server)
            .await;

        let query = PatientQuery { doctor: Some(7), ..Default::default() };
        let patients = client.list_patients("token-abc", &query).await.unwrap();

        let names: Vec<_> = patients.iter().map(|p| p.first_name.as_str()).collect();
        assert_eq!(names, vec!["Ann", "Bea", "Cara"]);
    }

    #[tokio::test]
    async fn test_failing_later_page_returns_no_partial_results() {
        let server = MockServer::start().await;
        let client = DrChronoClient::new(&test_config(&server.uri()));

        Mock::given(method("GET"))
            .and(path("/api/appointments"))
            .and(query_param("cursor", "next"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/api/appointments"))
            .and(query_param("date", "2026-10-14"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{
                    "id": "a-1", "patient": 1, "doctor": 7,
                    "scheduled_time": "2026-10-14T09:00:00", "status": ""
                }],
                "next": format!("{}/api/appointments?cursor=next", server.uri())
            })))
            .mount(&server)
            .await;

        let query = AppointmentQuery {
            date: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap(),
            doctor: Some(7),
            patient: None,
        };
        let result = client.list_appointments("token", &query).await;

        assert_matches!(result, Err(SchedulingError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_patch_204_is_applied_other_statuses_are_rejected() {
        let server = MockServer::start().await;
        let client = DrChronoClient::new(&test_config(&server.uri()));

        Mock::given(method("PATCH"))
            .and(path("/api/appointments/a-1"))
            .and(body_json(json!({ "status": "Arrived" })))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/appointments/a-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/api/appointments/a-3"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "status": ["invalid"] })))
            .mount(&server)
            .await;

        assert_eq!(client.patch_appointment("t", "a-1", "Arrived").await.unwrap(), PatchOutcome::Applied);
        assert_eq!(client.patch_appointment("t", "a-2", "Arrived").await.unwrap(), PatchOutcome::Rejected(200));
        assert_eq!(client.patch_appointment("t", "a-3", "Arrived").await.unwrap(), PatchOutcome::Rejected(400));
    }

    #[tokio::test]
    async fn test_current_user_unauthorized() {
        let server = MockServer::start().await;
        let client = DrChronoClient::new(&test_config(&server.uri()));

        Mock::given(method("GET"))
            .and(path("/api/users/current"))
            .respond_with(ResponseTemplate::new(401).set_body_string("expired"))
            .mount(&server)
            .await;

        let result = client.current_user("stale").await;
        assert_matches!(result, Err(SchedulingError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_create_patient_returns_created_id() {
        let server = MockServer::start().await;
        let client = DrChronoClient::new(&test_config(&server.uri()));

        Mock::given(method("POST"))
            .and(path("/api/patients"))
            .and(body_json(json!({
                "doctor": 7,
                "first_name": "Walk",
                "last_name": "In",
                "gender": "Other",
                "social_security_number": "123-45-6789"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 900, "doctor": 7 })))
            .mount(&server)
            .await;

        let created = client.create_patient("t", &NewPatient {
            doctor: 7,
            first_name: "Walk".to_string(),
            last_name: "In".to_string(),
            gender: "Other".to_string(),
            social_security_number: "123-45-6789".to_string(),
        }).await.unwrap();

        assert_eq!(created.id, "900");
    }

    #[tokio::test]
    async fn test_create_appointment_posts_naive_scheduled_time() {
        let server = MockServer::start().await;
        let client = DrChronoClient::new(&test_config(&server.uri()));

        Mock::given(method("POST"))
            .and(path("/api/appointments"))
            .and(body_json(json!({
                "doctor": 7,
                "patient": 900,
                "office": 3,
                "exam_room": 1,
                "scheduled_time": "2026-10-14T15:00:00",
                "duration": 30
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "a-77" })))
            .mount(&server)
            .await;

        let created = client.create_appointment("t", &NewAppointment {
            doctor: 7,
            patient: 900,
            office: 3,
            exam_room: 1,
            scheduled_time: NaiveDate::from_ymd_opt(2026, 10, 14).unwrap().and_hms_opt(15, 0, 0).unwrap(),
            duration: 30,
        }).await.unwrap();

        assert_eq!(created.id, "a-77");
    }

    #[tokio::test]
    async fn test_exchange_code_posts_form() {
        let server = MockServer::start().await;
        let client = DrChronoClient::new(&test_config(&server.uri()));

        Mock::given(method("POST"))
            .and(path("/o/token/"))
            .and(body_string_contains("client_id=client-id"))
            .and(body_string_contains("code=auth-code"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "refresh_token": "refresh",
                "expires_in": 172800,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let token = client.exchange_code("auth-code").await.unwrap();
        assert_eq!(token.access_token, "fresh");
        assert_eq!(token.expires_in, Some(172800));
    }
}
