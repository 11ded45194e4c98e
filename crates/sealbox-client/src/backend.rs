//! HTTP client for the backend's auth and table endpoints.
//!
//! [`BackendClient`] is cheap to share behind an `Arc`. Table access
//! goes through [`QueryBuilder`], which accumulates filters and issues
//! a single REST request on [`QueryBuilder::execute`].

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::auth::AuthApi;
use crate::config::ClientOptions;
use crate::error::{BackendError, BackendResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for one backend project.
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    auth: AuthApi,
}

impl BackendClient {
    /// Construct a client from a project URL and its anon key.
    pub fn new(url: &str, anon_key: &str, options: &ClientOptions) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| BackendError::Http(e.to_string()))?;

        let base_url = url.trim_end_matches('/').to_string();
        let auth = AuthApi::new(http.clone(), &base_url, anon_key, options);

        Ok(Self {
            http,
            base_url,
            anon_key: anon_key.to_string(),
            auth,
        })
    }

    /// The project URL this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The anon key sent with every request.
    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// Auth sub-API.
    pub fn auth(&self) -> &AuthApi {
        &self.auth
    }

    /// Start a query against a table.
    pub fn from(&self, table: &str) -> QueryBuilder<'_> {
        QueryBuilder::new(self, table)
    }
}

impl fmt::Debug for BackendClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Sort direction for [`QueryBuilder::order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Accumulates a table request and executes it.
pub struct QueryBuilder<'a> {
    client: &'a BackendClient,
    table: String,
    method: reqwest::Method,
    filters: Vec<(String, String)>,
    select: Option<String>,
    order: Option<String>,
    limit: Option<usize>,
    single: bool,
    body: Option<serde_json::Result<Value>>,
}

impl<'a> QueryBuilder<'a> {
    fn new(client: &'a BackendClient, table: &str) -> Self {
        Self {
            client,
            table: table.to_string(),
            method: reqwest::Method::GET,
            filters: Vec::new(),
            select: None,
            order: None,
            limit: None,
            single: false,
            body: None,
        }
    }

    /// Restrict the returned columns.
    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    /// Insert one row or a batch of rows.
    pub fn insert(mut self, rows: impl Serialize) -> Self {
        self.method = reqwest::Method::POST;
        self.body = Some(serde_json::to_value(rows));
        self
    }

    /// Update the rows matched by the filters.
    pub fn update(mut self, changes: impl Serialize) -> Self {
        self.method = reqwest::Method::PATCH;
        self.body = Some(serde_json::to_value(changes));
        self
    }

    /// Delete the rows matched by the filters.
    pub fn delete(mut self) -> Self {
        self.method = reqwest::Method::DELETE;
        self
    }

    /// Keep rows whose `column` equals `value`.
    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_string(), format!("eq.{}", value)));
        self
    }

    /// Order the result by `column`.
    pub fn order(mut self, column: &str, direction: SortOrder) -> Self {
        let suffix = match direction {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        self.order = Some(format!("{}.{}", column, suffix));
        self
    }

    /// Cap the number of returned rows.
    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    /// Ask for exactly one row instead of an array.
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Send the accumulated request and decode the response.
    pub async fn execute<T: DeserializeOwned>(self) -> BackendResult<T> {
        let url = format!("{}/rest/v1/{}", self.client.base_url, self.table);
        let bearer = self.client.auth.bearer_token();

        let mut query: Vec<(String, String)> = Vec::new();
        if let Some(select) = self.select {
            query.push(("select".to_string(), select));
        }
        query.extend(self.filters);
        if let Some(order) = self.order {
            query.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }

        debug!(method = %self.method, table = %self.table, "executing table request");

        let mut request = self
            .client
            .http
            .request(self.method.clone(), url)
            .header("apikey", &self.client.anon_key)
            .bearer_auth(bearer)
            .query(&query);

        if self.single {
            request = request.header("Accept", "application/vnd.pgrst.object+json");
        }
        if self.method == reqwest::Method::POST
            || self.method == reqwest::Method::PATCH
            || self.method == reqwest::Method::DELETE
        {
            request = request.header("Prefer", "return=representation");
        }
        if let Some(body) = self.body {
            let value = body.map_err(|e| BackendError::Decode(e.to_string()))?;
            request = request.json(&value);
        }

        let response = request.send().await?;
        handle_response(response).await
    }
}

/// Map a response to a decoded body or a [`BackendError`].
pub(crate) async fn handle_response<T: DeserializeOwned>(
    response: reqwest::Response,
) -> BackendResult<T> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(BackendError::Auth(read_error_message(response).await));
    }
    if !status.is_success() {
        return Err(BackendError::Api {
            status: status.as_u16(),
            message: read_error_message(response).await,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| BackendError::Decode(e.to_string()))
}

/// Pull a human-readable message out of an error response body.
pub(crate) async fn read_error_message(response: reqwest::Response) -> String {
    let status = response.status();
    let fallback = format!("HTTP {}", status);

    let Ok(body) = response.json::<Value>().await else {
        return fallback;
    };

    ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(key).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or(fallback)
}
