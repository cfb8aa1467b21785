//! Stub portal backend shared by the integration tests.
//!
//! Integration tests compile as separate crates, so each one declares
//! `mod support;` and only uses the parts it needs. The stub mimics the
//! Django backend closely enough to exercise cookies, error envelopes, 204
//! responses, pagination and multipart uploads.
#![allow(dead_code, reason = "each test crate uses a different subset")]

use std::net::TcpListener;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use actix_web::cookie::Cookie;
use actix_web::dev::ServerHandle;
use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use portal_client::outbound::http::{PortalHttpClient, PortalHttpOptions};
use reqwest::Url;
use serde_json::{Value, json};

pub const SESSION_COOKIE: &str = "sessionid";
pub const PATIENT_SESSION: &str = "patient-7";
pub const DOCTOR_SESSION: &str = "doctor-3";
pub const PATIENT_PHONE: &str = "555-1234";
pub const PATIENT_PASSWORD: &str = "secret";
pub const DOCTOR_EMAIL: &str = "grey@sloan.example";
pub const DOCTOR_PASSWORD: &str = "scalpel";
pub const PATIENT_ID: u64 = 7;

/// Switches and recordings shared with handlers.
#[derive(Default)]
pub struct StubState {
    requests: Mutex<Vec<String>>,
    upload_bodies: Mutex<Vec<String>>,
    /// Makes `POST /logout/` answer 500.
    pub fail_logout: AtomicBool,
    /// Delays `GET /patients/profile/` by two seconds.
    pub slow_profile: AtomicBool,
}

impl StubState {
    /// Every request seen so far as `METHOD path?query`.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Raw multipart bodies received by `POST /files/`, lossily decoded.
    pub fn upload_bodies(&self) -> Vec<String> {
        self.upload_bodies
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn record(&self, req: &HttpRequest) {
        let query = req.query_string();
        let line = if query.is_empty() {
            format!("{} {}", req.method(), req.path())
        } else {
            format!("{} {}?{query}", req.method(), req.path())
        };
        self.requests
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(line);
    }
}

/// A running stub server.
pub struct StubBackend {
    /// API root including the `/api` prefix.
    pub base_url: Url,
    /// Shared handler state.
    pub state: web::Data<StubState>,
    handle: ServerHandle,
}

impl StubBackend {
    /// Bind to an ephemeral port and start serving on the current runtime.
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
        let addr = listener.local_addr().expect("stub address");
        let state = web::Data::new(StubState::default());
        let server_state = state.clone();

        let server = HttpServer::new(move || {
            App::new()
                .app_data(server_state.clone())
                .service(
                    web::scope("/api")
                        .route("/doctors/login/", web::post().to(doctor_login))
                        .route("/patients/login/", web::post().to(patient_login))
                        .route("/logout/", web::post().to(logout))
                        .route("/doctors/register/", web::post().to(register_doctor))
                        .route("/patients/register/", web::post().to(register_patient))
                        .route("/patients/profile/", web::get().to(patient_profile))
                        .route("/visits/", web::get().to(list_visits))
                        .route("/visits/", web::post().to(create_visit))
                        .route("/visits/{id}/", web::get().to(visit_details))
                        .route("/tests/", web::get().to(list_tests))
                        .route("/medications/", web::get().to(list_empty))
                        .route("/files/", web::get().to(list_empty))
                        .route("/files/", web::post().to(upload_files))
                        .route("/ai/interact/", web::post().to(interact)),
                )
        })
        .disable_signals()
        .workers(1)
        .listen(listener)
        .expect("listen on stub socket")
        .run();

        let handle = server.handle();
        actix_web::rt::spawn(server);

        let base_url = Url::parse(&format!("http://{addr}/api")).expect("stub base url");
        Self {
            base_url,
            state,
            handle,
        }
    }

    /// A fresh client with its own cookie jar.
    pub fn client(&self) -> PortalHttpClient {
        PortalHttpClient::new(self.base_url.clone()).expect("portal client")
    }

    /// A client that gives up after `timeout`.
    pub fn client_with_timeout(&self, timeout: Duration) -> PortalHttpClient {
        let options = PortalHttpOptions {
            timeout: Some(timeout),
            ..PortalHttpOptions::default()
        };
        PortalHttpClient::with_options(self.base_url.clone(), options).expect("portal client")
    }

    /// Stop the server and wait for it to finish.
    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

/// A base URL nothing listens on.
pub fn unreachable_base_url() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    drop(listener);
    Url::parse(&format!("http://{addr}/api")).expect("stub url")
}

fn patient_json() -> Value {
    json!({"id": PATIENT_ID, "name": "Ada Lovelace", "phone": PATIENT_PHONE, "age": 36})
}

fn session_of(req: &HttpRequest) -> Option<String> {
    req.cookie(SESSION_COOKIE)
        .map(|cookie| cookie.value().to_owned())
}

fn session_cookie(value: &str) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, value.to_owned())
        .path("/")
        .http_only(true)
        .finish()
}

fn unauthenticated() -> HttpResponse {
    HttpResponse::Unauthorized()
        .json(json!({"detail": "Authentication credentials were not provided."}))
}

async fn doctor_login(
    state: web::Data<StubState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> HttpResponse {
    state.record(&req);
    if body["email"] == DOCTOR_EMAIL && body["password"] == DOCTOR_PASSWORD {
        HttpResponse::Ok()
            .cookie(session_cookie(DOCTOR_SESSION))
            .json(json!({"id": 3, "full_name": "Meredith Grey", "email": DOCTOR_EMAIL}))
    } else {
        HttpResponse::BadRequest().json(json!({"detail": "Invalid email or password"}))
    }
}

async fn patient_login(
    state: web::Data<StubState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> HttpResponse {
    state.record(&req);
    if body["phone"] == PATIENT_PHONE && body["password"] == PATIENT_PASSWORD {
        HttpResponse::Ok()
            .cookie(session_cookie(PATIENT_SESSION))
            .json(patient_json())
    } else {
        HttpResponse::Unauthorized().json(json!({"error": "Invalid credentials"}))
    }
}

async fn logout(state: web::Data<StubState>, req: HttpRequest) -> HttpResponse {
    state.record(&req);
    if state.fail_logout.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError()
            .json(json!({"error": "Session store unavailable"}));
    }
    let mut expired = session_cookie("");
    expired.make_removal();
    HttpResponse::NoContent().cookie(expired).finish()
}

async fn register_doctor(state: web::Data<StubState>, req: HttpRequest) -> HttpResponse {
    state.record(&req);
    HttpResponse::NoContent().finish()
}

async fn register_patient(
    state: web::Data<StubState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> HttpResponse {
    state.record(&req);
    if body["phone"] == PATIENT_PHONE {
        return HttpResponse::BadRequest().json(json!({"error": "Phone already registered"}));
    }
    HttpResponse::Created().json(json!({
        "id": 11,
        "message": "Patient registered successfully",
        "echo": body.into_inner(),
    }))
}

async fn patient_profile(state: web::Data<StubState>, req: HttpRequest) -> HttpResponse {
    state.record(&req);
    if state.slow_profile.load(Ordering::SeqCst) {
        actix_web::rt::time::sleep(Duration::from_secs(2)).await;
    }
    match session_of(&req).as_deref() {
        Some(PATIENT_SESSION) => HttpResponse::Ok().json(patient_json()),
        Some(DOCTOR_SESSION) => {
            HttpResponse::Forbidden().json(json!({"error": "Not a patient account"}))
        }
        _ => unauthenticated(),
    }
}

fn require_patient_session(req: &HttpRequest) -> Result<(), HttpResponse> {
    if session_of(req).as_deref() == Some(PATIENT_SESSION) {
        Ok(())
    } else {
        Err(unauthenticated())
    }
}

async fn list_visits(state: web::Data<StubState>, req: HttpRequest) -> HttpResponse {
    state.record(&req);
    if let Err(response) = require_patient_session(&req) {
        return response;
    }
    HttpResponse::Ok().json(json!([
        {"id": 1, "date": "2025-03-15", "reason": "Annual check-up"},
        {"id": 2, "date": "2025-04-02", "reason": "Follow-up"}
    ]))
}

async fn list_tests(state: web::Data<StubState>, req: HttpRequest) -> HttpResponse {
    state.record(&req);
    if let Err(response) = require_patient_session(&req) {
        return response;
    }
    HttpResponse::Ok().json(json!({
        "count": 1,
        "next": null,
        "previous": null,
        "results": [{"id": 5, "name": "Complete blood count", "status": "normal"}]
    }))
}

async fn list_empty(state: web::Data<StubState>, req: HttpRequest) -> HttpResponse {
    state.record(&req);
    if let Err(response) = require_patient_session(&req) {
        return response;
    }
    HttpResponse::Ok().json(json!([]))
}

async fn create_visit(
    state: web::Data<StubState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> HttpResponse {
    state.record(&req);
    let mut record = body.into_inner();
    if let Some(fields) = record.as_object_mut() {
        fields.insert("id".to_owned(), json!(99));
    }
    HttpResponse::Created().json(record)
}

async fn visit_details(
    state: web::Data<StubState>,
    req: HttpRequest,
    path: web::Path<u64>,
) -> HttpResponse {
    state.record(&req);
    if path.into_inner() == 1 {
        HttpResponse::Ok().json(json!({"id": 1, "date": "2025-03-15", "notes": "All clear"}))
    } else {
        HttpResponse::NotFound().json(json!({"detail": "Not found."}))
    }
}

async fn upload_files(
    state: web::Data<StubState>,
    req: HttpRequest,
    body: web::Bytes,
) -> HttpResponse {
    state.record(&req);
    let text = String::from_utf8_lossy(&body).into_owned();
    let rejected = text.contains("oversized.pdf");
    state
        .upload_bodies
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push(text);
    if rejected {
        return HttpResponse::PayloadTooLarge().json(json!({"error": "Upload exceeds 10 MB"}));
    }
    HttpResponse::Created().json(json!({
        "file_paths": ["/media/uploads/report.pdf"],
        "file_ids": [41]
    }))
}

async fn interact(
    state: web::Data<StubState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> HttpResponse {
    state.record(&req);
    let question = body["question"].as_str().unwrap_or_default();
    let patient = body["patient_id"].as_u64().unwrap_or_default();
    HttpResponse::Ok().json(json!({
        "answer": format!("Patient {patient} asked about {question}")
    }))
}
