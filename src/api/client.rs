//! API client for the Expense Tracker backend.
//!
//! Every protected request goes through the shared `get`/`post`/`delete`
//! helpers here, which attach the bearer token and map HTTP failures to
//! [`ApiError`]. In particular a 401 always surfaces as
//! `ApiError::Unauthorized`, so call sites have exactly one signal to
//! watch for when deciding to fall back to the login flow.

use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::try_join;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::models::{
    Category, MonthlyReport, NewCategory, NewTransaction, NewUser, Transaction, UserProfile,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for the backend API (local Django dev server)
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// Raw body of `POST /users/login/`. Token fields are optional so the
/// auth flow can tell a malformed 2xx apart from a complete one instead
/// of failing deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// List endpoints return either a bare array or a paginated wrapper,
/// depending on backend pagination settings.
#[derive(Debug, Deserialize)]
struct Paginated<T> {
    results: Vec<T>,
}

/// API client for the Expense Tracker backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client against the given base URL
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    /// Drop the bearer token; subsequent requests go out unauthenticated
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// URL the browser (or user) must be sent to for third-party login.
    /// The backend runs the identity-provider dance and redirects back to
    /// the callback route with `access` and `refresh` query parameters.
    pub fn third_party_login_url(&self) -> String {
        format!("{}/users/login/okta/", self.base_url)
    }

    // ===== Authentication =====

    /// Submit credentials to `POST /users/login/`.
    ///
    /// A 2xx yields the raw [`LoginResponse`] even when token fields are
    /// missing; deciding whether that constitutes a session is the auth
    /// flow's job. A non-2xx yields an [`ApiError`] carrying the backend's
    /// message when it sent one.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse> {
        let url = format!("{}/users/login/", self.base_url);

        let body = serde_json::json!({
            "username": username,
            "password": password,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from)
            .context("Failed to send login request")?;

        let response = Self::check_response(response).await?;

        response
            .json()
            .await
            .context("Failed to parse login response")
    }

    /// Register a new account via `POST /users/register/`
    pub async fn register(&self, user: &NewUser) -> Result<()> {
        let url = format!("{}/users/register/", self.base_url);

        let response = self.client.post(&url).json(user).send().await
            .map_err(ApiError::from)
            .context("Failed to send registration request")?;

        Self::check_response(response).await?;
        Ok(())
    }

    // ===== Protected endpoints =====

    /// Fetch the authenticated user's profile
    pub async fn fetch_profile(&self) -> Result<UserProfile> {
        self.get(&format!("{}/users/", self.base_url)).await
    }

    /// Fetch the current month's totals and per-category summary
    pub async fn fetch_monthly_report(&self) -> Result<MonthlyReport> {
        self.get(&format!("{}/users/monthly-report/", self.base_url))
            .await
    }

    /// Fetch all transactions for the authenticated user
    pub async fn fetch_transactions(&self) -> Result<Vec<Transaction>> {
        self.get_list(&format!("{}/transactions/", self.base_url))
            .await
    }

    /// Create a transaction
    pub async fn create_transaction(&self, tx: &NewTransaction) -> Result<Transaction> {
        self.post(&format!("{}/transactions/", self.base_url), tx)
            .await
    }

    /// Delete a transaction by id
    pub async fn delete_transaction(&self, id: &str) -> Result<()> {
        self.delete(&format!("{}/transactions/{}/", self.base_url, id))
            .await
    }

    /// Fetch all categories visible to the authenticated user
    pub async fn fetch_categories(&self) -> Result<Vec<Category>> {
        self.get_list(&format!("{}/categories/", self.base_url))
            .await
    }

    /// Create a category
    pub async fn create_category(&self, name: &str) -> Result<Category> {
        let body = NewCategory {
            name: name.to_string(),
        };
        self.post(&format!("{}/categories/", self.base_url), &body)
            .await
    }

    /// Delete a category by id
    pub async fn delete_category(&self, id: &str) -> Result<()> {
        self.delete(&format!("{}/categories/{}/", self.base_url, id))
            .await
    }

    /// Fetch transactions and categories concurrently, as the dashboard
    /// needs both before it can render anything.
    pub async fn fetch_dashboard(&self) -> Result<(Vec<Transaction>, Vec<Category>)> {
        try_join(self.fetch_transactions(), self.fetch_categories()).await
    }

    // ===== Request plumbing =====

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit
    /// (should retry), or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.request_with_retry(|| self.client.get(url)).await
            .with_context(|| format!("Failed to send GET request to {}", url))?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// GET a list endpoint, accepting both the bare-array and the
    /// paginated `{"results": [...]}` response shapes.
    async fn get_list<T: DeserializeOwned>(&self, url: &str) -> Result<Vec<T>> {
        let response = self.request_with_retry(|| self.client.get(url)).await
            .with_context(|| format!("Failed to send GET request to {}", url))?;
        let text = response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", url))?;

        if let Ok(items) = serde_json::from_str::<Vec<T>>(&text) {
            return Ok(items);
        }
        let page: Paginated<T> = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse list response from {}", url))?;
        debug!(url, count = page.results.len(), "Parsed paginated list response");
        Ok(page.results)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, url: &str, body: &B) -> Result<T> {
        let response = self
            .request_with_retry(|| self.client.post(url).json(body))
            .await
            .with_context(|| format!("Failed to send POST request to {}", url))?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn delete(&self, url: &str) -> Result<()> {
        self.request_with_retry(|| self.client.delete(url))
            .await
            .with_context(|| format!("Failed to send DELETE request to {}", url))?;
        Ok(())
    }

    /// Send a request with bearer auth, retrying on 429 with exponential
    /// backoff. All protected calls funnel through here.
    async fn request_with_retry(
        &self,
        build: impl Fn() -> reqwest::RequestBuilder,
    ) -> Result<reqwest::Response> {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let response = build()
                .headers(self.auth_headers()?)
                .send()
                .await
                .map_err(ApiError::from)?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(retry = retries, backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }
}
