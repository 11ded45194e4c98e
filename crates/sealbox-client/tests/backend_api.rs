//! Auth and table API tests against an in-process mock backend.
//!
//! The mock implements just enough of the auth and REST endpoints to
//! exercise the client: password and refresh grants, the user endpoint,
//! logout, and a table route that records what the client sent.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};

use sealbox_client::{
    AuthEvent, BackendClient, BackendError, ClientOptions, MemorySessionStore, Session,
    SessionStore, SortOrder, User,
};

const ANON_KEY: &str = "public-anon-key";
const EMAIL: &str = "dev@example.co";
const PASSWORD: &str = "hunter2";

#[derive(Clone, Default)]
struct Recorded {
    method: String,
    table: String,
    query: Vec<(String, String)>,
    apikey: Option<String>,
    bearer: Option<String>,
    prefer: Option<String>,
    accept: Option<String>,
    body: Option<Value>,
}

#[derive(Clone)]
struct MockState {
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockState {
    fn last_request(&self) -> Recorded {
        self.requests
            .lock()
            .last()
            .cloned()
            .expect("no table request recorded")
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn bearer_of(headers: &HeaderMap) -> Option<String> {
    header(headers, "authorization")?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

fn session_json(access_token: &str) -> Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-1",
        "user": {"id": "user-1", "email": EMAIL}
    })
}

#[derive(Deserialize)]
struct TokenQuery {
    grant_type: String,
}

async fn token(Query(query): Query<TokenQuery>, Json(body): Json<Value>) -> Response {
    match query.grant_type.as_str() {
        "password" if body["email"] == EMAIL && body["password"] == PASSWORD => {
            Json(session_json("access-1")).into_response()
        }
        "password" => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error_description": "Invalid login credentials"})),
        )
            .into_response(),
        "refresh_token" if body["refresh_token"] == "refresh-1" => {
            Json(session_json("access-2")).into_response()
        }
        _ => (
            StatusCode::BAD_REQUEST,
            Json(json!({"error_description": "Invalid refresh token"})),
        )
            .into_response(),
    }
}

async fn user(headers: HeaderMap) -> Response {
    match bearer_of(&headers).as_deref() {
        Some("access-1") | Some("access-2") => {
            Json(json!({"id": "user-1", "email": EMAIL})).into_response()
        }
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"msg": "invalid token"})),
        )
            .into_response(),
    }
}

async fn logout() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn rest(
    State(state): State<MockState>,
    Path(table): Path<String>,
    method: Method,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let accept = header(&headers, "accept");
    let single = accept
        .as_deref()
        .is_some_and(|v| v.contains("vnd.pgrst.object"));

    state.requests.lock().push(Recorded {
        method: method.to_string(),
        table,
        query,
        apikey: header(&headers, "apikey"),
        bearer: bearer_of(&headers),
        prefer: header(&headers, "prefer"),
        accept,
        body: serde_json::from_slice(&body).ok(),
    });

    if single {
        Json(json!({"id": "1", "title": "First"})).into_response()
    } else {
        Json(json!([{"id": "1", "title": "First"}])).into_response()
    }
}

async fn spawn_backend() -> (String, MockState) {
    let state = MockState {
        requests: Arc::new(Mutex::new(Vec::new())),
    };

    let app = Router::new()
        .route("/auth/v1/token", post(token))
        .route("/auth/v1/user", get(user))
        .route("/auth/v1/logout", post(logout))
        .route("/rest/v1/{table}", any(rest))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock backend");
    });

    (format!("http://{}", addr), state)
}

fn expired_session() -> Session {
    Session {
        access_token: "stale".to_string(),
        token_type: "bearer".to_string(),
        expires_in: 3600,
        expires_at: 1_000,
        refresh_token: "refresh-1".to_string(),
        user: User {
            id: "user-1".to_string(),
            email: Some(EMAIL.to_string()),
            role: None,
            created_at: None,
        },
    }
}

#[tokio::test]
async fn test_sign_in_and_out_emit_events() {
    let (url, _state) = spawn_backend().await;
    let client = BackendClient::new(&url, ANON_KEY, &ClientOptions::default()).expect("client");
    let mut events = client.auth().on_auth_state_change();

    let session = client
        .auth()
        .sign_in_with_password(EMAIL, PASSWORD)
        .await
        .expect("sign in");
    assert_eq!(session.access_token, "access-1");
    assert_eq!(session.user.id, "user-1");
    assert!(session.expires_at > 0, "expires_at derived from expires_in");

    let change = events.recv().await.expect("event");
    assert_eq!(change.event, AuthEvent::SignedIn);
    assert_eq!(change.session.expect("session").access_token, "access-1");

    client.auth().sign_out().await.expect("sign out");

    let change = events.recv().await.expect("event");
    assert_eq!(change.event, AuthEvent::SignedOut);
    assert!(change.session.is_none());

    assert!(client.auth().get_session().await.expect("session").is_none());
}

#[tokio::test]
async fn test_bad_password_is_auth_error() {
    let (url, _state) = spawn_backend().await;
    let client = BackendClient::new(&url, ANON_KEY, &ClientOptions::default()).expect("client");

    let err = client
        .auth()
        .sign_in_with_password(EMAIL, "wrong")
        .await
        .unwrap_err();

    match err {
        BackendError::Auth(message) => assert_eq!(message, "Invalid login credentials"),
        other => panic!("expected auth error, got {:?}", other),
    }
    assert!(client.auth().get_session().await.expect("session").is_none());
}

#[tokio::test]
async fn test_expired_session_is_refreshed() {
    let (url, _state) = spawn_backend().await;

    let store: Arc<MemorySessionStore> = Arc::new(MemorySessionStore::new());
    store.save(&expired_session()).expect("seed store");

    let options = ClientOptions::new().with_session_store(store.clone());
    let client = BackendClient::new(&url, ANON_KEY, &options).expect("client");
    let mut events = client.auth().on_auth_state_change();

    let session = client
        .auth()
        .get_session()
        .await
        .expect("session")
        .expect("signed in");
    assert_eq!(session.access_token, "access-2");
    assert!(!session.is_expired());

    let change = events.recv().await.expect("event");
    assert_eq!(change.event, AuthEvent::TokenRefreshed);

    // The refreshed session was written back to the store.
    let persisted = store.load().expect("load").expect("persisted");
    assert_eq!(persisted.access_token, "access-2");
}

#[tokio::test]
async fn test_stale_session_kept_when_refresh_disabled() {
    let (url, _state) = spawn_backend().await;

    let store: Arc<MemorySessionStore> = Arc::new(MemorySessionStore::new());
    store.save(&expired_session()).expect("seed store");

    let options = ClientOptions::new()
        .with_session_store(store)
        .with_auto_refresh_token(false);
    let client = BackendClient::new(&url, ANON_KEY, &options).expect("client");

    let session = client
        .auth()
        .get_session()
        .await
        .expect("session")
        .expect("signed in");
    assert_eq!(session.access_token, "stale");
}

#[tokio::test]
async fn test_get_user_requires_sign_in() {
    let (url, _state) = spawn_backend().await;
    let client = BackendClient::new(&url, ANON_KEY, &ClientOptions::default()).expect("client");

    assert!(client.auth().get_user().await.expect("user").is_none());

    client
        .auth()
        .sign_in_with_password(EMAIL, PASSWORD)
        .await
        .expect("sign in");

    let user = client.auth().get_user().await.expect("user").expect("some");
    assert_eq!(user.id, "user-1");
    assert_eq!(user.email.as_deref(), Some(EMAIL));
}

#[tokio::test]
async fn test_select_sends_filters_and_bearer() {
    let (url, state) = spawn_backend().await;
    let client = BackendClient::new(&url, ANON_KEY, &ClientOptions::default()).expect("client");

    let rows: Vec<Value> = client
        .from("notes")
        .select("id,title")
        .eq("owner", "user-1")
        .order("created_at", SortOrder::Descending)
        .limit(10)
        .execute()
        .await
        .expect("select");
    assert_eq!(rows.len(), 1);

    let recorded = state.last_request();
    assert_eq!(recorded.method, "GET");
    assert_eq!(recorded.table, "notes");
    assert_eq!(recorded.apikey.as_deref(), Some(ANON_KEY));
    // Anonymous requests carry the anon key as the bearer.
    assert_eq!(recorded.bearer.as_deref(), Some(ANON_KEY));
    assert!(recorded.query.contains(&("select".into(), "id,title".into())));
    assert!(recorded.query.contains(&("owner".into(), "eq.user-1".into())));
    assert!(recorded.query.contains(&("order".into(), "created_at.desc".into())));
    assert!(recorded.query.contains(&("limit".into(), "10".into())));

    client
        .auth()
        .sign_in_with_password(EMAIL, PASSWORD)
        .await
        .expect("sign in");

    let _rows: Vec<Value> = client
        .from("notes")
        .select("*")
        .execute()
        .await
        .expect("select");
    assert_eq!(state.last_request().bearer.as_deref(), Some("access-1"));
}

#[tokio::test]
async fn test_insert_asks_for_representation() {
    let (url, state) = spawn_backend().await;
    let client = BackendClient::new(&url, ANON_KEY, &ClientOptions::default()).expect("client");

    let rows: Vec<Value> = client
        .from("notes")
        .insert(json!({"title": "First"}))
        .execute()
        .await
        .expect("insert");
    assert_eq!(rows.len(), 1);

    let recorded = state.last_request();
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.prefer.as_deref(), Some("return=representation"));
    assert_eq!(recorded.body.expect("body")["title"], "First");
}

#[tokio::test]
async fn test_single_asks_for_one_object() {
    let (url, state) = spawn_backend().await;
    let client = BackendClient::new(&url, ANON_KEY, &ClientOptions::default()).expect("client");

    let row: Value = client
        .from("notes")
        .select("*")
        .eq("id", "1")
        .single()
        .execute()
        .await
        .expect("single");
    assert_eq!(row["id"], "1");

    let recorded = state.last_request();
    assert_eq!(
        recorded.accept.as_deref(),
        Some("application/vnd.pgrst.object+json")
    );
}

#[tokio::test]
async fn test_update_and_delete_use_filters() {
    let (url, state) = spawn_backend().await;
    let client = BackendClient::new(&url, ANON_KEY, &ClientOptions::default()).expect("client");

    let _rows: Vec<Value> = client
        .from("notes")
        .update(json!({"title": "Renamed"}))
        .eq("id", "1")
        .execute()
        .await
        .expect("update");

    let recorded = state.last_request();
    assert_eq!(recorded.method, "PATCH");
    assert!(recorded.query.contains(&("id".into(), "eq.1".into())));
    assert_eq!(recorded.body.expect("body")["title"], "Renamed");

    let _rows: Vec<Value> = client
        .from("notes")
        .delete()
        .eq("id", "1")
        .execute()
        .await
        .expect("delete");

    let recorded = state.last_request();
    assert_eq!(recorded.method, "DELETE");
    assert_eq!(recorded.prefer.as_deref(), Some("return=representation"));
    assert!(recorded.query.contains(&("id".into(), "eq.1".into())));
}
