//! Integration tests for Customer Desk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p customer-desk-integration-tests
//! ```
//!
//! No external services are needed: [`FakeApi`] serves the customer REST API
//! in-process on an ephemeral port, keeps customers in memory, and records
//! every request so tests can assert what was (and was not) sent.
//!
//! # Test Categories
//!
//! - `auth_session` - Login, profile, logout and the session file
//! - `customer_table` - Loading, sorting and mutating the dashboard table
//! - `customer_form` - Form mount, local validation and uploads

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{FromRequest, Multipart, Path, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use customer_desk_client::{ApiClient, Session, TokenPair};
use customer_desk_core::{Attachment, Field, FormState};
use serde_json::{Map, Value, json};
use url::Url;

pub const USERNAME: &str = "admin";
pub const PASSWORD: &str = "correct-horse-battery";
pub const ACCESS_TOKEN: &str = "access-token-1";
pub const REFRESH_TOKEN: &str = "refresh-token-1";

type Shared = Arc<Mutex<FakeState>>;

/// A multipart body as the fake received it.
#[derive(Debug, Clone, Default)]
pub struct Upload {
    pub content_type: String,
    pub fields: BTreeMap<String, String>,
    pub photo_name: Option<String>,
    pub photo_content_type: Option<String>,
    pub photo_len: usize,
}

/// Everything the fake API knows.
#[derive(Debug, Default)]
pub struct FakeState {
    pub customers: Vec<Value>,
    /// When false, every bearer token is rejected with `401`.
    pub token_valid: bool,
    /// Delay before the customer list is returned.
    pub list_delay: Option<Duration>,
    /// Delay before a create, update or delete is answered.
    pub write_delay: Option<Duration>,
    /// Status the next customer request fails with, once.
    pub fail_next: Option<StatusCode>,
    /// `"METHOD /path"` of every request, in arrival order.
    pub requests: Vec<String>,
    pub uploads: Vec<Upload>,
}

impl FakeState {
    fn record(&mut self, line: impl Into<String>) {
        self.requests.push(line.into());
    }

    fn position(&self, id: i64) -> Option<usize> {
        self.customers.iter().position(|c| id_of(c) == Some(id))
    }

    fn next_id(&self) -> i64 {
        self.customers.iter().filter_map(id_of).max().unwrap_or(0) + 1
    }

    fn email_taken(&self, email: Option<&Value>, except: Option<i64>) -> bool {
        self.customers
            .iter()
            .any(|c| c.get("email") == email && id_of(c) != except)
    }
}

fn id_of(customer: &Value) -> Option<i64> {
    customer.get("id").and_then(Value::as_i64)
}

fn lock(state: &Shared) -> MutexGuard<'_, FakeState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process fake of the customer REST API.
#[derive(Clone)]
pub struct FakeApi {
    addr: SocketAddr,
    state: Shared,
}

impl FakeApi {
    /// Serve `customers` on an ephemeral port.
    pub async fn start(customers: Vec<Value>) -> Self {
        let state = Arc::new(Mutex::new(FakeState {
            customers,
            token_valid: true,
            ..FakeState::default()
        }));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake API");
        let addr = listener.local_addr().expect("Failed to read fake API address");
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Fake API server failed");
        });

        Self { addr, state }
    }

    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("Invalid fake API URL")
    }

    #[must_use]
    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.base_url()).expect("Failed to build API client")
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        lock(&self.state)
    }

    /// Reject every token from now on.
    pub fn revoke_tokens(&self) {
        self.state().token_valid = false;
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.state().list_delay = Some(delay);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.state().write_delay = Some(delay);
    }

    /// Answer the next customer request with `status` instead of handling
    /// it. A `400` carries a field error for `email`.
    pub fn fail_next(&self, status: StatusCode) {
        self.state().fail_next = Some(status);
    }

    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.state().requests.clone()
    }

    /// Number of recorded requests starting with `prefix`, e.g. `"POST "`.
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.state()
            .requests
            .iter()
            .filter(|line| line.starts_with(prefix))
            .count()
    }

    #[must_use]
    pub fn customers(&self) -> Vec<Value> {
        self.state().customers.clone()
    }

    #[must_use]
    pub fn uploads(&self) -> Vec<Upload> {
        self.state().uploads.clone()
    }
}

/// An in-memory session holding the token the fake accepts.
#[must_use]
pub fn logged_in_session() -> Session {
    let session = Session::in_memory();
    session
        .set(&TokenPair::new(ACCESS_TOKEN, REFRESH_TOKEN))
        .expect("Failed to store tokens");
    session
}

// ============================================================================
// Fixtures
// ============================================================================

/// A customer record as the server returns it.
#[must_use]
pub fn customer_json(id: i64, first_name: &str, city: &str, credit_limit: &str) -> Value {
    json!({
        "id": id,
        "title": "Mr",
        "customer_category": "Domestic",
        "first_name": first_name,
        "last_name": "Fernando",
        "email": format!("{}.{id}@example.lk", first_name.to_lowercase()),
        "address_1": "10 Galle Road",
        "address_2": "",
        "city": city,
        "mobile": "0771234567",
        "phone": null,
        "company_name": null,
        "photo": null,
        "credit_limit": credit_limit,
        "credit_period": 30,
        "is_deleted": false
    })
}

/// Fill every required field with valid input.
pub fn fill_valid_form(state: &mut FormState, email: &str, city: &str) {
    for (field, value) in [
        (Field::Title, "Ms"),
        (Field::CustomerCategory, "International"),
        (Field::FirstName, "Kamala"),
        (Field::LastName, "Silva"),
        (Field::Email, email),
        (Field::Address1, "1 Lake Drive"),
        (Field::City, city),
        (Field::Mobile, "+94711234567"),
        (Field::CreditLimit, "1500.50"),
        (Field::CreditPeriod, "45"),
    ] {
        state.set_text(field, value);
    }
}

/// A tiny PNG-looking attachment.
#[must_use]
pub fn png_attachment(file_name: &str) -> Attachment {
    let mut bytes = b"\x89PNG\r\n\x1a\n".to_vec();
    bytes.extend_from_slice(&[0; 24]);
    Attachment {
        file_name: file_name.to_string(),
        content_type: "image/png".to_string(),
        bytes,
    }
}

// ============================================================================
// Routes
// ============================================================================

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/auth/token/", post(token))
        .route("/api/auth/profile/", get(profile))
        .route("/cms/customers/", get(list).post(create))
        .route("/cms/customers/{id}/", put(update).delete(remove))
        .with_state(state)
}

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, json!({"detail": "No Customer matches the given query."}))
}

fn authorize(state: &Shared, headers: &HeaderMap) -> Result<(), Response> {
    let expected = format!("Bearer {ACCESS_TOKEN}");
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if lock(state).token_valid && presented == Some(expected.as_str()) {
        Ok(())
    } else {
        Err(error(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "Given token not valid for any token type"}),
        ))
    }
}

async fn token(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    lock(&state).record("POST /api/auth/token/");
    let username = body.get("username").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    if username == Some(USERNAME) && password == Some(PASSWORD) {
        Json(json!({"access": ACCESS_TOKEN, "refresh": REFRESH_TOKEN})).into_response()
    } else {
        error(
            StatusCode::UNAUTHORIZED,
            json!({"detail": "No active account found with the given credentials"}),
        )
    }
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    lock(&state).record("GET /api/auth/profile/");
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    Json(json!({"username": USERNAME, "email": "admin@example.lk"})).into_response()
}

async fn list(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let delay = {
        let mut state = lock(&state);
        state.record("GET /cms/customers/");
        state.list_delay
    };
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    if let Some(response) = injected_failure(&state) {
        return response;
    }
    pause(delay).await;
    let customers = lock(&state).customers.clone();
    Json(Value::Array(customers)).into_response()
}

async fn create(State(state): State<Shared>, request: Request) -> Response {
    lock(&state).record("POST /cms/customers/");
    if let Err(response) = authorize(&state, request.headers()) {
        return response;
    }
    if let Some(response) = injected_failure(&state) {
        return response;
    }
    let delay = lock(&state).write_delay;
    pause(delay).await;
    let (mut fields, upload) = match read_customer_body(request).await {
        Ok(body) => body,
        Err(response) => return response,
    };

    let mut state = lock(&state);
    if state.email_taken(fields.get("email"), None) {
        return error(
            StatusCode::BAD_REQUEST,
            json!({"email": ["customer with this email already exists."]}),
        );
    }
    let id = state.next_id();
    fields.insert("id".to_string(), json!(id));
    fields.insert("photo".to_string(), photo_url(upload.as_ref()));
    fields.insert("is_deleted".to_string(), json!(false));
    let customer = Value::Object(fields);
    state.customers.push(customer.clone());
    state.uploads.extend(upload);
    (StatusCode::CREATED, Json(customer)).into_response()
}

async fn update(State(state): State<Shared>, Path(id): Path<i64>, request: Request) -> Response {
    lock(&state).record(format!("PUT /cms/customers/{id}/"));
    if let Err(response) = authorize(&state, request.headers()) {
        return response;
    }
    if let Some(response) = injected_failure(&state) {
        return response;
    }
    let delay = lock(&state).write_delay;
    pause(delay).await;
    let (mut fields, upload) = match read_customer_body(request).await {
        Ok(body) => body,
        Err(response) => return response,
    };

    let mut state = lock(&state);
    let Some(index) = state.position(id) else {
        return not_found();
    };
    if state.email_taken(fields.get("email"), Some(id)) {
        return error(
            StatusCode::BAD_REQUEST,
            json!({"email": ["customer with this email already exists."]}),
        );
    }
    let Some(existing) = state.customers.get_mut(index) else {
        return not_found();
    };
    let photo = match photo_url(upload.as_ref()) {
        Value::Null => existing.get("photo").cloned().unwrap_or(Value::Null),
        url => url,
    };
    fields.insert("id".to_string(), json!(id));
    fields.insert("photo".to_string(), photo);
    fields.insert("is_deleted".to_string(), json!(false));
    *existing = Value::Object(fields);
    let customer = existing.clone();
    state.uploads.extend(upload);
    Json(customer).into_response()
}

async fn remove(State(state): State<Shared>, Path(id): Path<i64>, headers: HeaderMap) -> Response {
    lock(&state).record(format!("DELETE /cms/customers/{id}/"));
    if let Err(response) = authorize(&state, &headers) {
        return response;
    }
    if let Some(response) = injected_failure(&state) {
        return response;
    }
    let delay = lock(&state).write_delay;
    pause(delay).await;
    let mut state = lock(&state);
    let Some(index) = state.position(id) else {
        return not_found();
    };
    state.customers.remove(index);
    StatusCode::NO_CONTENT.into_response()
}

/// The failure queued by [`FakeApi::fail_next`], consumed.
fn injected_failure(state: &Shared) -> Option<Response> {
    let status = lock(state).fail_next.take()?;
    Some(if status == StatusCode::BAD_REQUEST {
        error(status, json!({"email": ["Enter a valid email address."]}))
    } else {
        error(status, json!({"detail": "Something went wrong."}))
    })
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

fn photo_url(upload: Option<&Upload>) -> Value {
    upload
        .and_then(|upload| upload.photo_name.as_deref())
        .map_or(Value::Null, |name| {
            json!(format!("http://testserver/media/customer_photos/{name}"))
        })
}

/// Read a JSON or multipart customer body into a JSON object.
async fn read_customer_body(request: Request) -> Result<(Map<String, Value>, Option<Upload>), Response> {
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if !content_type.starts_with("multipart/form-data") {
        let Json(body) = Json::<Map<String, Value>>::from_request(request, &())
            .await
            .map_err(IntoResponse::into_response)?;
        return Ok((body, None));
    }

    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(IntoResponse::into_response)?;
    let mut fields = Map::new();
    let mut upload = Upload {
        content_type,
        ..Upload::default()
    };
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(IntoResponse::into_response)?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photo" {
            upload.photo_name = field.file_name().map(str::to_string);
            upload.photo_content_type = field.content_type().map(str::to_string);
            upload.photo_len = field
                .bytes()
                .await
                .map_err(IntoResponse::into_response)?
                .len();
            continue;
        }
        let text = field.text().await.map_err(IntoResponse::into_response)?;
        upload.fields.insert(name.clone(), text.clone());
        let value = if name == "credit_period" {
            text.parse::<i64>().map_or(Value::String(text), Value::from)
        } else {
            Value::String(text)
        };
        fields.insert(name, value);
    }
    Ok((fields, Some(upload)))
}
