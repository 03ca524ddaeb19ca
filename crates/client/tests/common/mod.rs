//! An in-process fake CouchDB for integration tests.
//!
//! Implements just enough of the HTTP API for the client's calls, keeps all
//! state in memory, and exposes counters the tests assert on: every request
//! received, and every continuous feed response still being streamed.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use client::{ClientConfig, Server};
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

/// Interval between heartbeats on an idle continuous feed.
const TICK: Duration = Duration::from_millis(20);

/// The only password the fake accepts for `POST /_session`.
pub const SESSION_PASSWORD: &str = "secret";

type Params = Query<HashMap<String, String>>;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A running fake server.
pub struct FakeCouch {
    pub url: String,
    shared: Arc<Shared>,
}

impl FakeCouch {
    pub async fn start() -> Self {
        init_tracing();
        let shared = Arc::new(Shared::default());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake couch");
        let url = format!("http://{}", listener.local_addr().unwrap());

        let app = router(shared.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake couch failed");
        });

        Self { url, shared }
    }

    /// A client connected to this server with a five second timeout.
    pub fn server(&self) -> Server {
        self.server_with_timeout(Duration::from_secs(5))
    }

    pub fn server_with_timeout(&self, timeout: Duration) -> Server {
        Server::connect(&ClientConfig {
            url: self.url.clone(),
            timeout: Some(timeout),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    /// A fresh, valid database name.
    pub fn unique_db(prefix: &str) -> String {
        format!("{prefix}_{}", Uuid::new_v4().simple())
    }

    /// Requests received so far.
    pub fn requests(&self) -> usize {
        self.shared.requests.load(Ordering::SeqCst)
    }

    /// Continuous feed responses still streaming.
    pub fn open_feeds(&self) -> usize {
        self.shared.open_feeds.load(Ordering::SeqCst)
    }

    /// Polls until `open_feeds() == expected` or five seconds pass.
    pub async fn wait_for_open_feeds(&self, expected: usize) -> bool {
        for _ in 0..250 {
            if self.open_feeds() == expected {
                return true;
            }
            tokio::time::sleep(TICK).await;
        }
        false
    }

    /// Every `_bulk_docs` body received, in order.
    pub fn bulk_bodies(&self) -> Vec<Value> {
        self.shared.inner.lock().unwrap().bulk_bodies.clone()
    }

    /// Number of `PUT /{db}/_security` requests received.
    pub fn security_writes(&self) -> usize {
        self.shared.inner.lock().unwrap().security_writes
    }

    /// The stored body of a live document.
    pub fn doc(&self, db: &str, id: &str) -> Option<Value> {
        let inner = self.shared.inner.lock().unwrap();
        let doc = inner.dbs.get(db)?.docs.get(id)?;
        Some(Value::Object(doc.body.clone()))
    }

    /// Appends a raw line to a database's change log, bypassing validation.
    pub fn inject_change_line(&self, db: &str, line: &str) {
        let mut inner = self.shared.inner.lock().unwrap();
        if let Some(db) = inner.dbs.get_mut(db) {
            db.seq += 1;
            db.changes.push(line.to_string());
        }
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Shared {
    requests: AtomicUsize,
    open_feeds: AtomicUsize,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    dbs: BTreeMap<String, Db>,
    db_events: Vec<String>,
    bulk_bodies: Vec<Value>,
    security_writes: usize,
    sessions: BTreeMap<String, String>,
}

struct Db {
    docs: BTreeMap<String, Doc>,
    changes: Vec<String>,
    seq: u64,
    security: Value,
    revs_limit: u64,
}

impl Default for Db {
    fn default() -> Self {
        Self {
            docs: BTreeMap::new(),
            changes: Vec::new(),
            seq: 0,
            security: json!({}),
            revs_limit: 1000,
        }
    }
}

struct Doc {
    rev: String,
    body: Map<String, Value>,
    attachments: BTreeMap<String, (String, Bytes)>,
}

/// Counts a continuous feed response for as long as it is being produced.
struct OpenFeed(Arc<Shared>);

impl OpenFeed {
    fn new(shared: Arc<Shared>) -> Self {
        shared.open_feeds.fetch_add(1, Ordering::SeqCst);
        Self(shared)
    }
}

impl Drop for OpenFeed {
    fn drop(&mut self) {
        self.0.open_feeds.fetch_sub(1, Ordering::SeqCst);
    }
}

fn next_rev(previous: Option<&str>) -> String {
    let generation = previous
        .and_then(|rev| rev.split('-').next())
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or(0);
    format!("{}-{}", generation + 1, Uuid::new_v4().simple())
}

fn error(status: StatusCode, error: &str, reason: &str) -> Response {
    (status, Json(json!({ "error": error, "reason": reason }))).into_response()
}

fn not_found() -> Response {
    error(StatusCode::NOT_FOUND, "not_found", "missing")
}

fn conflict() -> Response {
    error(StatusCode::CONFLICT, "conflict", "Document update conflict.")
}

impl Db {
    fn record_change(&mut self, id: &str, rev: &str, deleted: bool) {
        self.seq += 1;
        let mut change = json!({ "seq": self.seq, "id": id, "changes": [{ "rev": rev }] });
        if deleted {
            change["deleted"] = json!(true);
        }
        self.changes.push(change.to_string());
    }

    /// Applies one document write the way `PUT /{db}/{id}` and `_bulk_docs`
    /// do, returning the per-document result.
    fn write(&mut self, id: Option<String>, mut body: Map<String, Value>) -> Result<Value, Value> {
        let id = id
            .or_else(|| body.get("_id").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let given_rev = body.get("_rev").and_then(Value::as_str).map(str::to_string);
        let deleted = body.get("_deleted").and_then(Value::as_bool).unwrap_or(false);
        let conflict = json!({ "id": id, "error": "conflict", "reason": "Document update conflict." });

        let current = self.docs.get(&id).map(|doc| doc.rev.clone());
        if current != given_rev {
            return Err(conflict);
        }

        let rev = next_rev(current.as_deref());
        if deleted {
            self.docs.remove(&id);
        } else {
            body.remove("_id");
            body.remove("_rev");
            let attachments = self
                .docs
                .remove(&id)
                .map(|doc| doc.attachments)
                .unwrap_or_default();
            self.docs.insert(
                id.clone(),
                Doc {
                    rev: rev.clone(),
                    body,
                    attachments,
                },
            );
        }
        self.record_change(&id, &rev, deleted);
        Ok(json!({ "ok": true, "id": id, "rev": rev }))
    }

    fn live(&self, id: &str) -> Option<&Doc> {
        self.docs.get(id)
    }
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

fn router(shared: Arc<Shared>) -> Router {
    Router::new()
        .route("/", get(welcome))
        .route("/_all_dbs", get(all_dbs))
        .route("/_uuids", get(uuids))
        .route("/_membership", get(membership))
        .route("/_db_updates", get(db_updates))
        .route("/_session", get(session_info).post(login).delete(logout))
        .route(
            "/{db}",
            get(db_info)
                .put(create_db)
                .delete(delete_db)
                .post(insert_doc),
        )
        .route("/{db}/_all_docs", get(all_docs).post(all_docs_by_keys))
        .route("/{db}/_bulk_docs", post(bulk_docs))
        .route("/{db}/_changes", get(changes))
        .route("/{db}/_security", get(get_security).put(put_security))
        .route("/{db}/_compact", post(acknowledge))
        .route("/{db}/_revs_limit", get(get_revs_limit).put(put_revs_limit))
        .route(
            "/{db}/{doc}",
            get(get_doc).head(head_doc).put(put_doc).delete(delete_doc),
        )
        .route(
            "/{db}/{doc}/{attachment}",
            put(put_attachment)
                .get(get_attachment)
                .head(head_attachment)
                .delete(delete_attachment),
        )
        .layer(middleware::from_fn_with_state(shared.clone(), count_requests))
        .with_state(shared)
}

async fn count_requests(State(shared): State<Arc<Shared>>, request: Request, next: Next) -> Response {
    shared.requests.fetch_add(1, Ordering::SeqCst);
    next.run(request).await
}

async fn welcome() -> Json<Value> {
    Json(json!({
        "couchdb": "Welcome",
        "uuid": "85fb71bf700c17267fef77535820e371",
        "vendor": { "name": "The Apache Software Foundation", "version": "1.6.1" },
        "version": "1.6.1"
    }))
}

async fn all_dbs(State(shared): State<Arc<Shared>>) -> Json<Vec<String>> {
    Json(shared.inner.lock().unwrap().dbs.keys().cloned().collect())
}

async fn uuids(Query(params): Params) -> Json<Value> {
    let count: usize = params.get("count").and_then(|c| c.parse().ok()).unwrap_or(1);
    let uuids: Vec<String> = (0..count).map(|_| Uuid::new_v4().simple().to_string()).collect();
    Json(json!({ "uuids": uuids }))
}

async fn membership() -> Response {
    error(StatusCode::BAD_REQUEST, "illegal_database_name", "Only lowercase characters (a-z), digits (0-9), and any of the characters _, $, (, ), +, -, and / are allowed. Must begin with a letter.")
}

// --- databases -------------------------------------------------------------

async fn db_info(State(shared): State<Arc<Shared>>, Path(db): Path<String>) -> Response {
    let inner = shared.inner.lock().unwrap();
    let Some(state) = inner.dbs.get(&db) else {
        return not_found();
    };
    Json(json!({
        "db_name": db,
        "doc_count": state.docs.len(),
        "doc_del_count": 0,
        "update_seq": state.seq,
        "purge_seq": 0,
        "compact_running": false,
        "disk_size": 4096,
        "data_size": 1024,
        "disk_format_version": 6,
        "instance_start_time": "1476887327000000",
        "committed_update_seq": state.seq
    }))
    .into_response()
}

async fn create_db(State(shared): State<Arc<Shared>>, Path(db): Path<String>) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    if inner.dbs.contains_key(&db) {
        return error(StatusCode::PRECONDITION_FAILED, "file_exists", "The database could not be created, the file already exists.");
    }
    inner.dbs.insert(db.clone(), Db::default());
    inner
        .db_events
        .push(json!({ "db_name": db, "ok": true, "type": "created" }).to_string());
    (StatusCode::CREATED, Json(json!({ "ok": true }))).into_response()
}

async fn delete_db(State(shared): State<Arc<Shared>>, Path(db): Path<String>) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    if inner.dbs.remove(&db).is_none() {
        return not_found();
    }
    inner
        .db_events
        .push(json!({ "db_name": db, "ok": true, "type": "deleted" }).to_string());
    Json(json!({ "ok": true })).into_response()
}

// --- documents -------------------------------------------------------------

async fn insert_doc(
    State(shared): State<Arc<Shared>>,
    Path(db): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    let Some(state) = inner.dbs.get_mut(&db) else {
        return not_found();
    };
    match state.write(None, body) {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(_) => conflict(),
    }
}

async fn get_doc(
    State(shared): State<Arc<Shared>>,
    Path((db, id)): Path<(String, String)>,
) -> Response {
    let inner = shared.inner.lock().unwrap();
    let Some(doc) = inner.dbs.get(&db).and_then(|state| state.live(&id)) else {
        return not_found();
    };
    let mut body = doc.body.clone();
    body.insert("_id".into(), json!(id));
    body.insert("_rev".into(), json!(doc.rev));
    Json(Value::Object(body)).into_response()
}

async fn head_doc(
    State(shared): State<Arc<Shared>>,
    Path((db, id)): Path<(String, String)>,
) -> Response {
    let inner = shared.inner.lock().unwrap();
    let Some(doc) = inner.dbs.get(&db).and_then(|state| state.live(&id)) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut body = doc.body.clone();
    body.insert("_id".into(), json!(id));
    body.insert("_rev".into(), json!(doc.rev));
    let length = Value::Object(body).to_string().len();

    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    headers.insert(header::ETAG, HeaderValue::from_str(&format!("\"{}\"", doc.rev)).unwrap());
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    response
}

async fn put_doc(
    State(shared): State<Arc<Shared>>,
    Path((db, id)): Path<(String, String)>,
    Json(body): Json<Map<String, Value>>,
) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    let Some(state) = inner.dbs.get_mut(&db) else {
        return not_found();
    };
    match state.write(Some(id), body) {
        Ok(result) => (StatusCode::CREATED, Json(result)).into_response(),
        Err(_) => conflict(),
    }
}

async fn delete_doc(
    State(shared): State<Arc<Shared>>,
    Path((db, id)): Path<(String, String)>,
    Query(params): Params,
) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    let Some(state) = inner.dbs.get_mut(&db) else {
        return not_found();
    };
    if state.live(&id).is_none() {
        return not_found();
    }
    let mut body = Map::new();
    if let Some(rev) = params.get("rev") {
        body.insert("_rev".into(), json!(rev));
    }
    body.insert("_deleted".into(), json!(true));
    match state.write(Some(id), body) {
        Ok(result) => Json(result).into_response(),
        Err(_) => conflict(),
    }
}

async fn all_docs(State(shared): State<Arc<Shared>>, Path(db): Path<String>) -> Response {
    let inner = shared.inner.lock().unwrap();
    let Some(state) = inner.dbs.get(&db) else {
        return not_found();
    };
    let rows: Vec<Value> = state
        .docs
        .iter()
        .map(|(id, doc)| json!({ "id": id, "key": id, "value": { "rev": doc.rev } }))
        .collect();
    Json(json!({ "total_rows": rows.len(), "offset": 0, "rows": rows })).into_response()
}

async fn all_docs_by_keys(
    State(shared): State<Arc<Shared>>,
    Path(db): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let inner = shared.inner.lock().unwrap();
    let Some(state) = inner.dbs.get(&db) else {
        return not_found();
    };
    let keys = body["keys"].as_array().cloned().unwrap_or_default();
    let rows: Vec<Value> = keys
        .iter()
        .filter_map(Value::as_str)
        .map(|key| match state.live(key) {
            Some(doc) => json!({ "id": key, "key": key, "value": { "rev": doc.rev } }),
            None => json!({ "key": key, "error": "not_found" }),
        })
        .collect();
    Json(json!({ "total_rows": state.docs.len(), "offset": 0, "rows": rows })).into_response()
}

async fn bulk_docs(
    State(shared): State<Arc<Shared>>,
    Path(db): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    inner.bulk_bodies.push(body.clone());
    let Some(state) = inner.dbs.get_mut(&db) else {
        return not_found();
    };
    let docs = body["docs"].as_array().cloned().unwrap_or_default();
    let results: Vec<Value> = docs
        .into_iter()
        .map(|doc| match doc {
            Value::Object(fields) => state.write(None, fields).unwrap_or_else(|err| err),
            _ => json!({ "error": "bad_request", "reason": "Document must be a JSON object" }),
        })
        .collect();
    (StatusCode::CREATED, Json(results)).into_response()
}

// --- attachments -----------------------------------------------------------

async fn put_attachment(
    State(shared): State<Arc<Shared>>,
    Path((db, id, name)): Path<(String, String, String)>,
    Query(params): Params,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    let Some(state) = inner.dbs.get_mut(&db) else {
        return not_found();
    };
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();

    let current = state.live(&id).map(|doc| doc.rev.clone());
    if current.as_deref() != params.get("rev").map(String::as_str) {
        return conflict();
    }
    let rev = next_rev(current.as_deref());
    let doc = state.docs.entry(id.clone()).or_insert_with(|| Doc {
        rev: String::new(),
        body: Map::new(),
        attachments: BTreeMap::new(),
    });
    doc.rev = rev.clone();
    doc.attachments.insert(name, (content_type, body));
    state.record_change(&id, &rev, false);
    (StatusCode::CREATED, Json(json!({ "ok": true, "id": id, "rev": rev }))).into_response()
}

async fn get_attachment(
    State(shared): State<Arc<Shared>>,
    Path((db, id, name)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let inner = shared.inner.lock().unwrap();
    let Some(doc) = inner.dbs.get(&db).and_then(|state| state.live(&id)) else {
        return not_found();
    };
    if let Some(expected) = headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok()) {
        if expected != doc.rev {
            return error(StatusCode::PRECONDITION_FAILED, "precondition_failed", "revision mismatch");
        }
    }
    let Some((content_type, data)) = doc.attachments.get(&name) else {
        return not_found();
    };
    ([(header::CONTENT_TYPE, content_type.clone())], data.clone()).into_response()
}

async fn head_attachment(
    State(shared): State<Arc<Shared>>,
    Path((db, id, name)): Path<(String, String, String)>,
) -> Response {
    let inner = shared.inner.lock().unwrap();
    let Some((content_type, data)) = inner
        .dbs
        .get(&db)
        .and_then(|state| state.live(&id))
        .and_then(|doc| doc.attachments.get(&name))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let mut response = StatusCode::OK.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(data.len()));
    headers.insert("content-md5", HeaderValue::from_static("cGxhY2Vob2xkZXI="));
    response
}

async fn delete_attachment(
    State(shared): State<Arc<Shared>>,
    Path((db, id, name)): Path<(String, String, String)>,
    headers: HeaderMap,
) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    let Some(state) = inner.dbs.get_mut(&db) else {
        return not_found();
    };
    let expected = headers.get(header::IF_MATCH).and_then(|v| v.to_str().ok());
    let Some(doc) = state.docs.get_mut(&id) else {
        return not_found();
    };
    if expected != Some(doc.rev.as_str()) {
        return conflict();
    }
    if doc.attachments.remove(&name).is_none() {
        return not_found();
    }
    let rev = next_rev(Some(&doc.rev));
    doc.rev = rev.clone();
    state.record_change(&id, &rev, false);
    Json(json!({ "ok": true, "id": id, "rev": rev })).into_response()
}

// --- security and maintenance ---------------------------------------------

async fn get_security(State(shared): State<Arc<Shared>>, Path(db): Path<String>) -> Response {
    let inner = shared.inner.lock().unwrap();
    match inner.dbs.get(&db) {
        Some(state) => Json(state.security.clone()).into_response(),
        None => not_found(),
    }
}

async fn put_security(
    State(shared): State<Arc<Shared>>,
    Path(db): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    inner.security_writes += 1;
    let Some(state) = inner.dbs.get_mut(&db) else {
        return not_found();
    };
    state.security = body;
    Json(json!({ "ok": true })).into_response()
}

async fn acknowledge(headers: HeaderMap) -> Response {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .is_some_and(|v| v.as_bytes().starts_with(b"application/json"));
    if !is_json {
        return error(StatusCode::UNSUPPORTED_MEDIA_TYPE, "bad_content_type", "Content-Type must be application/json");
    }
    (StatusCode::ACCEPTED, Json(json!({ "ok": true }))).into_response()
}

async fn get_revs_limit(State(shared): State<Arc<Shared>>, Path(db): Path<String>) -> Response {
    let inner = shared.inner.lock().unwrap();
    match inner.dbs.get(&db) {
        Some(state) => Json(json!(state.revs_limit)).into_response(),
        None => not_found(),
    }
}

async fn put_revs_limit(
    State(shared): State<Arc<Shared>>,
    Path(db): Path<String>,
    Json(limit): Json<u64>,
) -> Response {
    let mut inner = shared.inner.lock().unwrap();
    let Some(state) = inner.dbs.get_mut(&db) else {
        return not_found();
    };
    state.revs_limit = limit;
    Json(json!({ "ok": true })).into_response()
}

// --- sessions --------------------------------------------------------------

async fn login(State(shared): State<Arc<Shared>>, Json(body): Json<Value>) -> Response {
    let name = body["name"].as_str().unwrap_or_default().to_string();
    if body["password"].as_str() != Some(SESSION_PASSWORD) {
        return error(StatusCode::UNAUTHORIZED, "unauthorized", "Name or password is incorrect.");
    }
    let token = Uuid::new_v4().simple().to_string();
    shared
        .inner
        .lock()
        .unwrap()
        .sessions
        .insert(token.clone(), name.clone());

    let cookie = format!("AuthSession={token}; Version=1; Path=/; HttpOnly");
    (
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "ok": true, "name": name, "roles": [] })),
    )
        .into_response()
}

fn session_user(shared: &Shared, headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    let token = cookies
        .split(';')
        .find_map(|pair| pair.trim().strip_prefix("AuthSession="))?;
    shared.inner.lock().unwrap().sessions.get(token).cloned()
}

async fn session_info(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Json<Value> {
    let name = session_user(&shared, &headers);
    Json(json!({
        "ok": true,
        "userCtx": { "name": name, "roles": [] },
        "info": { "authentication_db": "_users", "authentication_handlers": ["cookie", "default"] }
    }))
}

async fn logout(State(shared): State<Arc<Shared>>, headers: HeaderMap) -> Response {
    if let Some(cookies) = headers.get(header::COOKIE).and_then(|v| v.to_str().ok()) {
        if let Some(token) = cookies
            .split(';')
            .find_map(|pair| pair.trim().strip_prefix("AuthSession="))
        {
            shared.inner.lock().unwrap().sessions.remove(token);
        }
    }
    (
        [(header::SET_COOKIE, "AuthSession=; Version=1; Path=/; HttpOnly")],
        Json(json!({ "ok": true })),
    )
        .into_response()
}

// --- feeds -----------------------------------------------------------------

#[derive(Clone)]
enum LineSource {
    DbUpdates,
    Changes(String),
}

impl Shared {
    /// Lines at positions `cursor..` and the position after them, or `None`
    /// once the source is gone.
    fn lines_since(&self, source: &LineSource, cursor: usize) -> Option<(Vec<String>, usize)> {
        let inner = self.inner.lock().unwrap();
        let lines = match source {
            LineSource::DbUpdates => &inner.db_events,
            LineSource::Changes(db) => &inner.dbs.get(db)?.changes,
        };
        Some((lines.get(cursor..).unwrap_or_default().to_vec(), lines.len()))
    }

    fn start_position(&self, source: &LineSource, since: Option<&String>) -> usize {
        match since.map(String::as_str) {
            Some("now") => self.lines_since(source, 0).map_or(0, |(_, end)| end),
            Some(n) => n.parse().unwrap_or(0),
            None => 0,
        }
    }
}

/// Streams `source` as a continuous feed: one line per entry, a heartbeat on
/// every idle tick, and `{"last_seq": ...}` once `timeout` passes with no
/// new entries.
fn continuous(shared: Arc<Shared>, source: LineSource, params: &HashMap<String, String>) -> Response {
    let timeout = params
        .get("timeout")
        .and_then(|t| t.parse().ok())
        .map(Duration::from_millis);
    let mut cursor = shared.start_position(&source, params.get("since"));

    let (tx, rx) = mpsc::channel::<Result<Bytes, Infallible>>(16);
    let open = OpenFeed::new(shared.clone());
    tokio::spawn(async move {
        let _open = open;
        let mut idle = Duration::ZERO;
        loop {
            let Some((lines, end)) = shared.lines_since(&source, cursor) else {
                return;
            };
            if lines.is_empty() {
                if timeout.is_some_and(|limit| idle >= limit) {
                    let last = Bytes::from(format!("{}\n", json!({ "last_seq": end })));
                    let _ = tx.send(Ok(last)).await;
                    return;
                }
                if tx.send(Ok(Bytes::from_static(b"\n"))).await.is_err() {
                    return;
                }
                tokio::time::sleep(TICK).await;
                idle += TICK;
                continue;
            }
            idle = Duration::ZERO;
            for line in lines {
                if tx.send(Ok(Bytes::from(format!("{line}\n")))).await.is_err() {
                    return;
                }
            }
            cursor = end;
        }
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from_stream(ReceiverStream::new(rx)))
        .unwrap()
}

async fn db_updates(State(shared): State<Arc<Shared>>, Query(params): Params) -> Response {
    if params.get("feed").map(String::as_str) == Some("continuous") {
        return continuous(shared, LineSource::DbUpdates, &params);
    }

    // Long-poll: wait up to `timeout` for the next event.
    let wait = params
        .get("timeout")
        .and_then(|t| t.parse().ok())
        .map_or(Duration::ZERO, Duration::from_millis);
    let start = shared.inner.lock().unwrap().db_events.len();
    let mut waited = Duration::ZERO;
    loop {
        let event = shared.inner.lock().unwrap().db_events.get(start).cloned();
        if let Some(event) = event {
            return ([(header::CONTENT_TYPE, "application/json")], event).into_response();
        }
        if waited >= wait {
            return StatusCode::OK.into_response();
        }
        tokio::time::sleep(TICK).await;
        waited += TICK;
    }
}

async fn changes(
    State(shared): State<Arc<Shared>>,
    Path(db): Path<String>,
    Query(params): Params,
) -> Response {
    let source = LineSource::Changes(db);
    if params.get("feed").map(String::as_str) == Some("continuous") {
        if shared.lines_since(&source, 0).is_none() {
            return not_found();
        }
        return continuous(shared, source, &params);
    }

    let start = shared.start_position(&source, params.get("since"));
    let Some((lines, end)) = shared.lines_since(&source, start) else {
        return not_found();
    };
    let results: Vec<Value> = lines
        .iter()
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect();
    Json(json!({ "results": results, "last_seq": end })).into_response()
}
