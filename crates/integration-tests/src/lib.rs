//! Integration tests for Bazaar.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! No external services are needed. Each test starts in-process fakes bound
//! to `127.0.0.1:0`:
//!
//! - [`FakeCatalog`] - the `/products` catalog endpoint
//! - [`FakeFirebase`] - Identity Toolkit and Firestore REST endpoints
//!
//! # Test Categories
//!
//! - `catalog_http` - HTTP catalog adapter, catalog store and filtering
//! - `firebase_rest` - Auth and document adapters over REST
//! - `storefront_flow` - Buyer and seller journeys through the engine

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

/// API key the fake Identity Toolkit accepts.
pub const TEST_API_KEY: &str = "AIzaIntegrationTestKey";

/// Project the fake Firestore serves.
pub const TEST_PROJECT_ID: &str = "demo-bazaar";

// ============================================================================
// Server plumbing
// ============================================================================

/// An axum app served on an ephemeral local port until dropped.
pub struct TestServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Serve `app` on `127.0.0.1:0`.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start(app: Router) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self { addr, handle }
    }

    /// `host:port`, as used by the emulator host variables.
    #[must_use]
    pub fn host(&self) -> String {
        self.addr.to_string()
    }

    /// `http://host:port/`
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&format!("http://{}/", self.addr)).expect("Socket address forms a URL")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Google API error body.
fn google_error(status: StatusCode, message: &str, code: &str) -> Response {
    (
        status,
        axum::Json(json!({
            "error": {
                "code": status.as_u16(),
                "message": message,
                "status": code,
                "errors": [],
            }
        })),
    )
        .into_response()
}

// ============================================================================
// Product fixtures
// ============================================================================

/// A catalog product in the JSON shape the public catalog returns.
#[must_use]
pub fn product_json(id: i32, title: &str, price: f64, category: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{title} description"),
        "price": price,
        "category": category,
        "rating": 4.2,
        "stock": 25,
        "thumbnail": format!("https://cdn.example.com/{id}/thumb.webp"),
        "images": [format!("https://cdn.example.com/{id}/1.webp")],
        "tags": ["fixture"],
    })
}

/// A small mixed catalog: three categories, prices 9.99 to 1299.
#[must_use]
pub fn sample_products() -> Vec<Value> {
    vec![
        product_json(1, "iPhone 9", 549.0, "smartphones"),
        product_json(2, "Essence Mascara", 9.99, "beauty"),
        product_json(3, "iPhone X", 899.0, "smartphones"),
        product_json(4, "Wooden Chair", 129.5, "furniture"),
        product_json(5, "MacBook Pro", 1299.0, "laptops"),
        product_json(6, "Phone Stand", 19.0, "accessories"),
    ]
}

// ============================================================================
// Fake catalog
// ============================================================================

#[derive(Default)]
struct CatalogState {
    products: Mutex<Vec<Value>>,
    failing: AtomicBool,
    list_requests: AtomicUsize,
    last_limit: Mutex<Option<String>>,
}

/// Fake `/products` catalog endpoint.
pub struct FakeCatalog {
    state: Arc<CatalogState>,
    server: TestServer,
}

impl FakeCatalog {
    /// Serve `products` at `/products` and `/products/{id}`.
    pub async fn start(products: Vec<Value>) -> Self {
        let state = Arc::new(CatalogState {
            products: Mutex::new(products),
            ..CatalogState::default()
        });
        let app = Router::new()
            .route("/products", get(list_products))
            .route("/products/{id}", get(get_product))
            .with_state(Arc::clone(&state));
        Self {
            state,
            server: TestServer::start(app).await,
        }
    }

    #[must_use]
    pub fn url(&self) -> Url {
        self.server.url()
    }

    /// Answer every request with 500 while `failing`.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Replace the served collection.
    pub fn replace(&self, products: Vec<Value>) {
        *lock(&self.state.products) = products;
    }

    /// Number of `GET /products` requests served.
    #[must_use]
    pub fn list_requests(&self) -> usize {
        self.state.list_requests.load(Ordering::SeqCst)
    }

    /// `limit` query parameter of the last list request.
    #[must_use]
    pub fn last_limit(&self) -> Option<String> {
        lock(&self.state.last_limit).clone()
    }
}

async fn list_products(
    State(state): State<Arc<CatalogState>>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    state.list_requests.fetch_add(1, Ordering::SeqCst);
    *lock(&state.last_limit) = query.get("limit").cloned();

    if state.failing.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }

    let products = lock(&state.products).clone();
    let total = products.len();
    axum::Json(json!({
        "products": products,
        "total": total,
        "skip": 0,
        "limit": total,
    }))
    .into_response()
}

async fn get_product(State(state): State<Arc<CatalogState>>, Path(id): Path<String>) -> Response {
    if state.failing.load(Ordering::SeqCst) {
        return (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response();
    }

    let found = lock(&state.products)
        .iter()
        .find(|p| p.get("id").map(ToString::to_string).as_deref() == Some(id.as_str()))
        .cloned();

    match found {
        Some(product) => axum::Json(product).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            axum::Json(json!({ "message": format!("Product with id '{id}' not found") })),
        )
            .into_response(),
    }
}

// ============================================================================
// Fake Firebase
// ============================================================================

#[derive(Default)]
struct FirebaseState {
    /// email -> (password, uid)
    accounts: Mutex<HashMap<String, (String, String)>>,
    /// "collection/id" -> typed Firestore fields
    documents: Mutex<HashMap<String, Map<String, Value>>>,
    offline: AtomicBool,
    next_uid: AtomicUsize,
    bearer_tokens: Mutex<Vec<Option<String>>>,
}

/// Fake Identity Toolkit and Firestore, served from one port.
///
/// Point both `FIREBASE_AUTH_EMULATOR_HOST` and `FIRESTORE_EMULATOR_HOST` at
/// [`FakeFirebase::host`].
pub struct FakeFirebase {
    state: Arc<FirebaseState>,
    server: TestServer,
}

impl FakeFirebase {
    pub async fn start() -> Self {
        let state = Arc::new(FirebaseState::default());
        let app = Router::new()
            .fallback(dispatch)
            .with_state(Arc::clone(&state));
        Self {
            state,
            server: TestServer::start(app).await,
        }
    }

    /// `host:port` of the fake.
    #[must_use]
    pub fn host(&self) -> String {
        self.server.host()
    }

    /// Make every Firestore request fail with 503.
    pub fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::SeqCst);
    }

    /// Typed fields of a stored document.
    #[must_use]
    pub fn raw_document(&self, collection: &str, id: &str) -> Option<Map<String, Value>> {
        lock(&self.state.documents)
            .get(&format!("{collection}/{id}"))
            .cloned()
    }

    /// Bearer tokens seen on Firestore requests, in order.
    #[must_use]
    pub fn bearer_tokens(&self) -> Vec<Option<String>> {
        lock(&self.state.bearer_tokens).clone()
    }

    /// Number of accounts created.
    #[must_use]
    pub fn account_count(&self) -> usize {
        lock(&self.state.accounts).len()
    }
}

async fn dispatch(
    State(state): State<Arc<FirebaseState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path();
    let body: Value = if body.is_empty() {
        Value::Null
    } else {
        match serde_json::from_slice(&body) {
            Ok(body) => body,
            Err(_) => {
                return google_error(StatusCode::BAD_REQUEST, "INVALID_JSON", "INVALID_ARGUMENT");
            }
        }
    };

    if let Some(action) = path.strip_prefix("/identitytoolkit.googleapis.com/v1/accounts:") {
        let key_ok = uri
            .query()
            .is_some_and(|q| q.split('&').any(|pair| pair == format!("key={TEST_API_KEY}")));
        if !key_ok {
            return google_error(
                StatusCode::BAD_REQUEST,
                "API key not valid. Please pass a valid API key.",
                "INVALID_ARGUMENT",
            );
        }
        return match (method, action) {
            (Method::POST, "signUp") => sign_up(&state, &body),
            (Method::POST, "signInWithPassword") => sign_in(&state, &body),
            _ => StatusCode::NOT_FOUND.into_response(),
        };
    }

    let root = format!("/v1/projects/{TEST_PROJECT_ID}/databases/(default)/documents");
    let Some(rest) = path.strip_prefix(&root) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(String::from);
    lock(&state.bearer_tokens).push(bearer);

    if state.offline.load(Ordering::SeqCst) {
        return google_error(
            StatusCode::SERVICE_UNAVAILABLE,
            "The service is currently unavailable.",
            "UNAVAILABLE",
        );
    }

    match (method, rest) {
        (Method::POST, ":commit") => commit(&state, &body),
        (Method::GET, doc) => doc
            .strip_prefix('/')
            .map_or_else(|| StatusCode::NOT_FOUND.into_response(), |doc| read(&state, doc)),
        (Method::PATCH, doc) => doc.strip_prefix('/').map_or_else(
            || StatusCode::NOT_FOUND.into_response(),
            |doc| write(&state, doc, &body),
        ),
        _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
    }
}

fn credentials(body: &Value) -> (String, String) {
    let field = |name: &str| {
        body.get(name)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    (field("email"), field("password"))
}

fn account_response(uid: &str, email: &str) -> Response {
    axum::Json(json!({
        "kind": "identitytoolkit#SignupNewUserResponse",
        "localId": uid,
        "email": email,
        "idToken": format!("token-{uid}"),
        "refreshToken": format!("refresh-{uid}"),
        "expiresIn": "3600",
    }))
    .into_response()
}

fn sign_up(state: &FirebaseState, body: &Value) -> Response {
    let (email, password) = credentials(body);
    if !email.contains('@') {
        return google_error(StatusCode::BAD_REQUEST, "INVALID_EMAIL", "INVALID_ARGUMENT");
    }
    if password.len() < 6 {
        return google_error(
            StatusCode::BAD_REQUEST,
            "WEAK_PASSWORD : Password should be at least 6 characters",
            "INVALID_ARGUMENT",
        );
    }

    let mut accounts = lock(&state.accounts);
    let key = email.to_lowercase();
    if accounts.contains_key(&key) {
        return google_error(StatusCode::BAD_REQUEST, "EMAIL_EXISTS", "INVALID_ARGUMENT");
    }
    let uid = format!("fake-uid-{}", state.next_uid.fetch_add(1, Ordering::SeqCst) + 1);
    accounts.insert(key, (password, uid.clone()));
    account_response(&uid, &email)
}

fn sign_in(state: &FirebaseState, body: &Value) -> Response {
    let (email, password) = credentials(body);
    let accounts = lock(&state.accounts);
    match accounts.get(&email.to_lowercase()) {
        Some((stored, uid)) if *stored == password => account_response(uid, &email),
        _ => google_error(
            StatusCode::BAD_REQUEST,
            "INVALID_LOGIN_CREDENTIALS",
            "INVALID_ARGUMENT",
        ),
    }
}

fn document_body(doc: &str, fields: &Map<String, Value>) -> Response {
    axum::Json(json!({
        "name": format!("projects/{TEST_PROJECT_ID}/databases/(default)/documents/{doc}"),
        "fields": fields,
        "createTime": "2024-05-01T10:00:00.000000Z",
        "updateTime": "2024-05-01T10:00:00.000000Z",
    }))
    .into_response()
}

fn read(state: &FirebaseState, doc: &str) -> Response {
    match lock(&state.documents).get(doc) {
        Some(fields) => document_body(doc, fields),
        None => google_error(
            StatusCode::NOT_FOUND,
            &format!("Document \"{doc}\" not found."),
            "NOT_FOUND",
        ),
    }
}

fn write(state: &FirebaseState, doc: &str, body: &Value) -> Response {
    let fields = body
        .get("fields")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    lock(&state.documents).insert(doc.to_string(), fields.clone());
    document_body(doc, &fields)
}

/// Apply `writes[*].transform` array transforms.
fn commit(state: &FirebaseState, body: &Value) -> Response {
    let prefix = format!("projects/{TEST_PROJECT_ID}/databases/(default)/documents/");
    let writes = body
        .get("writes")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let mut documents = lock(&state.documents);
    for write in &writes {
        let Some(transform) = write.get("transform") else {
            continue;
        };
        let Some(doc) = transform
            .get("document")
            .and_then(Value::as_str)
            .and_then(|name| name.strip_prefix(&prefix))
        else {
            return google_error(StatusCode::BAD_REQUEST, "bad document name", "INVALID_ARGUMENT");
        };
        let Some(fields) = documents.get_mut(doc) else {
            return google_error(
                StatusCode::NOT_FOUND,
                &format!("No document to update: {doc}"),
                "NOT_FOUND",
            );
        };

        let field_transforms = transform
            .get("fieldTransforms")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        for field_transform in &field_transforms {
            let Some(path) = field_transform.get("fieldPath").and_then(Value::as_str) else {
                continue;
            };
            let mut current: Vec<Value> = fields
                .get(path)
                .and_then(|v| v.pointer("/arrayValue/values"))
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if let Some(values) = field_transform
                .pointer("/appendMissingElements/values")
                .and_then(Value::as_array)
            {
                for value in values {
                    if !current.contains(value) {
                        current.push(value.clone());
                    }
                }
            }
            if let Some(values) = field_transform
                .pointer("/removeAllArrayElements/values")
                .and_then(Value::as_array)
            {
                current.retain(|v| !values.contains(v));
            }

            fields.insert(
                path.to_string(),
                json!({ "arrayValue": { "values": current } }),
            );
        }
    }

    axum::Json(json!({
        "writeResults": writes.iter().map(|_| json!({})).collect::<Vec<_>>(),
        "commitTime": "2024-05-01T10:00:00.000000Z",
    }))
    .into_response()
}
