use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use base64::{Engine as _, engine::general_purpose};
use hmac::{Hmac, Mac};
use serde_json::json;
use sha2::Sha256;

use shared_config::AppConfig;
use shared_database::cache::{Credential, Database};
use shared_models::auth::{OAuthToken, User};
use shared_models::scheduling::{
    AppointmentQuery, Created, NewAppointment, NewPatient, PatchOutcome, PatientChanges, PatientQuery,
    RemoteAppointment, RemotePatient, RemoteUser, SchedulingError, SchedulingProvider,
};

use crate::jwt::issue_session_token;
use crate::state::AppState;

pub struct TestConfig {
    pub session_secret: String,
    pub drchrono_base_url: String,
    pub match_on_ssn: bool,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            session_secret: "test-session-secret-for-kiosk-tokens".to_string(),
            drchrono_base_url: "http://localhost:54321".to_string(),
            match_on_ssn: false,
        }
    }
}

impl TestConfig {
    pub fn with_base_url(base_url: &str) -> Self {
        Self { drchrono_base_url: base_url.to_string(), ..Self::default() }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            drchrono_base_url: self.drchrono_base_url.clone(),
            drchrono_client_id: "test-client-id".to_string(),
            drchrono_client_secret: "test-client-secret".to_string(),
            drchrono_redirect_uri: "http://localhost:3000/complete/drchrono/".to_string(),
            session_secret: self.session_secret.clone(),
            session_ttl_hours: 12,
            database_path: ":memory:".to_string(),
            port: 3000,
            match_on_ssn: self.match_on_ssn,
        }
    }
}

pub struct TestUser {
    pub id: String,
    pub username: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("501", "drwho")
    }
}

impl TestUser {
    pub fn new(id: &str, username: &str) -> Self {
        Self { id: id.to_string(), username: username.to_string() }
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            username: Some(self.username.clone()),
            created_at: Some(Utc::now()),
        }
    }

    pub fn credential(&self, access_token: &str) -> Credential {
        Credential {
            user_ref: self.id.clone(),
            provider: "drchrono".to_string(),
            access_token: access_token.to_string(),
            refresh_token: None,
            expires_at: Some(Utc::now() + Duration::hours(1)),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str) -> String {
        issue_session_token(&user.id, Some(&user.username), secret, 12)
            .expect("test secret is not empty")
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        issue_session_token(&user.id, Some(&user.username), secret, -1)
            .expect("test secret is not empty")
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "wrong-secret")
    }

    /// Signed token whose claims are not valid JSON claims.
    pub fn create_malformed_claims_token(secret: &str) -> String {
        let header = general_purpose::URL_SAFE_NO_PAD.encode(json!({"alg": "HS256", "typ": "JWT"}).to_string());
        let payload = general_purpose::URL_SAFE_NO_PAD.encode("not-json");
        let signing_input = format!("{}.{}", header, payload);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        format!("{}.{}", signing_input, signature)
    }
}

/// App state over an in-memory store, with a stored credential for `user`.
pub fn test_state(config: AppConfig, scheduler: Arc<dyn SchedulingProvider>, user: &TestUser) -> Arc<AppState> {
    let store = Arc::new(Database::open_in_memory().expect("in-memory store opens"));
    store.save_credential(&user.credential("test-access-token")).expect("credential saves");
    Arc::new(AppState::new(config, store, scheduler))
}

/// In-memory stand-in for the remote scheduling API. Records every write it receives.
pub struct FakeScheduling {
    doctor_id: i64,
    patients: Mutex<Vec<RemotePatient>>,
    appointments: Mutex<Vec<RemoteAppointment>>,
    patch_status: Mutex<u16>,
    patient_patches: Mutex<Vec<(i64, PatientChanges)>>,
    appointment_patches: Mutex<Vec<(String, String)>>,
    created_patients: Mutex<Vec<NewPatient>>,
    created_appointments: Mutex<Vec<NewAppointment>>,
    exchanged_codes: Mutex<Vec<String>>,
    next_id: AtomicI64,
}

impl FakeScheduling {
    pub fn new(doctor_id: i64) -> Self {
        Self {
            doctor_id,
            patients: Mutex::new(Vec::new()),
            appointments: Mutex::new(Vec::new()),
            patch_status: Mutex::new(204),
            patient_patches: Mutex::new(Vec::new()),
            appointment_patches: Mutex::new(Vec::new()),
            created_patients: Mutex::new(Vec::new()),
            created_appointments: Mutex::new(Vec::new()),
            exchanged_codes: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1000),
        }
    }

    pub fn with_patient(self, patient: RemotePatient) -> Self {
        self.patients.lock().unwrap().push(patient);
        self
    }

    pub fn with_appointment(self, appointment: RemoteAppointment) -> Self {
        self.appointments.lock().unwrap().push(appointment);
        self
    }

    /// Every subsequent PATCH answers with `status`.
    pub fn respond_to_patches_with(&self, status: u16) {
        *self.patch_status.lock().unwrap() = status;
    }

    pub fn patient_patches(&self) -> Vec<(i64, PatientChanges)> {
        self.patient_patches.lock().unwrap().clone()
    }

    pub fn appointment_patches(&self) -> Vec<(String, String)> {
        self.appointment_patches.lock().unwrap().clone()
    }

    pub fn created_patients(&self) -> Vec<NewPatient> {
        self.created_patients.lock().unwrap().clone()
    }

    pub fn created_appointments(&self) -> Vec<NewAppointment> {
        self.created_appointments.lock().unwrap().clone()
    }

    pub fn exchanged_codes(&self) -> Vec<String> {
        self.exchanged_codes.lock().unwrap().clone()
    }

    pub fn remote_status(&self, appointment_id: &str) -> Option<String> {
        self.appointments
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == appointment_id)
            .and_then(|a| a.status.clone())
    }
}

#[async_trait]
impl SchedulingProvider for FakeScheduling {
    /// Hands out `token-<code>` for any code.
    async fn exchange_code(&self, code: &str) -> Result<OAuthToken, SchedulingError> {
        self.exchanged_codes.lock().unwrap().push(code.to_string());
        Ok(OAuthToken {
            access_token: format!("token-{}", code),
            refresh_token: None,
            expires_in: Some(172800),
            token_type: Some("Bearer".to_string()),
        })
    }

    async fn current_user(&self, _token: &str) -> Result<RemoteUser, SchedulingError> {
        Ok(RemoteUser { id: 501, username: Some("drwho".to_string()), doctor: self.doctor_id })
    }

    async fn list_patients(
        &self,
        _token: &str,
        query: &PatientQuery,
    ) -> Result<Vec<RemotePatient>, SchedulingError> {
        let patients = self.patients.lock().unwrap();
        Ok(patients
            .iter()
            .filter(|p| query.doctor.map_or(true, |d| p.doctor == d))
            .filter(|p| query.first_name.as_ref().map_or(true, |f| p.first_name.eq_ignore_ascii_case(f)))
            .filter(|p| query.last_name.as_ref().map_or(true, |l| p.last_name.eq_ignore_ascii_case(l)))
            .cloned()
            .collect())
    }

    async fn list_appointments(
        &self,
        _token: &str,
        query: &AppointmentQuery,
    ) -> Result<Vec<RemoteAppointment>, SchedulingError> {
        let appointments = self.appointments.lock().unwrap();
        Ok(appointments
            .iter()
            .filter(|a| a.scheduled_time.date() == query.date)
            .filter(|a| query.doctor.map_or(true, |d| a.doctor == d))
            .filter(|a| query.patient.map_or(true, |p| a.patient == p))
            .cloned()
            .collect())
    }

    async fn patch_patient(
        &self,
        _token: &str,
        patient_id: i64,
        changes: &PatientChanges,
    ) -> Result<PatchOutcome, SchedulingError> {
        self.patient_patches.lock().unwrap().push((patient_id, changes.clone()));
        Ok(PatchOutcome::from_status(*self.patch_status.lock().unwrap()))
    }

    async fn patch_appointment(
        &self,
        _token: &str,
        appointment_id: &str,
        status: &str,
    ) -> Result<PatchOutcome, SchedulingError> {
        self.appointment_patches
            .lock()
            .unwrap()
            .push((appointment_id.to_string(), status.to_string()));

        let outcome = PatchOutcome::from_status(*self.patch_status.lock().unwrap());
        if outcome.is_applied() {
            if let Some(appointment) = self.appointments.lock().unwrap().iter_mut().find(|a| a.id == appointment_id) {
                appointment.status = Some(status.to_string());
            }
        }
        Ok(outcome)
    }

    async fn create_patient(&self, _token: &str, patient: &NewPatient) -> Result<Created, SchedulingError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.created_patients.lock().unwrap().push(patient.clone());
        self.patients.lock().unwrap().push(RemotePatient {
            id,
            doctor: patient.doctor,
            first_name: patient.first_name.clone(),
            last_name: patient.last_name.clone(),
            gender: Some(patient.gender.clone()),
            social_security_number: Some(patient.social_security_number.clone()),
            ..RemotePatient::default()
        });
        Ok(Created { id: id.to_string() })
    }

    async fn create_appointment(
        &self,
        _token: &str,
        appointment: &NewAppointment,
    ) -> Result<Created, SchedulingError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.created_appointments.lock().unwrap().push(appointment.clone());
        self.appointments.lock().unwrap().push(RemoteAppointment {
            id: id.to_string(),
            patient: appointment.patient,
            doctor: appointment.doctor,
            scheduled_time: appointment.scheduled_time,
            status: None,
            duration: Some(appointment.duration),
        });
        Ok(Created { id: id.to_string() })
    }
}

pub struct MockDrChronoResponses;

impl MockDrChronoResponses {
    pub fn remote_patient(id: i64, doctor_id: i64, first_name: &str, last_name: &str) -> RemotePatient {
        RemotePatient {
            id,
            doctor: doctor_id,
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: Some(format!("{}@example.com", first_name.to_lowercase())),
            gender: Some("Female".to_string()),
            social_security_number: Some("123-45-6789".to_string()),
            cell_phone: Some("+15555550100".to_string()),
            zip_code: Some("60601".to_string()),
            address: Some("1 Main St".to_string()),
            emergency_contact_phone: Some("+15555550199".to_string()),
            emergency_contact_name: Some("John Doe".to_string()),
        }
    }

    pub fn remote_appointment(id: &str, patient: i64, doctor_id: i64, scheduled_time: NaiveDateTime) -> RemoteAppointment {
        RemoteAppointment {
            id: id.to_string(),
            patient,
            doctor: doctor_id,
            scheduled_time,
            status: Some(String::new()),
            duration: Some(30),
        }
    }

    pub fn token_response(access_token: &str) -> serde_json::Value {
        json!({
            "access_token": access_token,
            "refresh_token": "refresh-token",
            "expires_in": 172800,
            "token_type": "Bearer",
            "scope": "patients:read patients:write calendar:read calendar:write"
        })
    }
}
