//! HTTP access to the Rally v2 API.
//!
//! [`ApiClient`] is the only way the crate talks to Rally. It looks up the
//! environment's credentials, refuses mutating requests against protected
//! environments, applies the configured per-request timeout and turns unexpected
//! status codes into [`RallyError::ApiError`].
//!
//! The wire itself sits behind the [`Transport`] trait. Production code uses
//! [`ReqwestTransport`]; tests substitute a scripted transport so that no network
//! access is needed.
//!
//! # Modules
//!
//! - `pagination` - fetching every record of a paginated collection endpoint

pub mod pagination;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::future::BoxFuture;
use reqwest::Method;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::GlobalConfig;
use crate::constants::{API_MEDIA_TYPE, LOCAL_ENVIRONMENTS};
use crate::core::RallyError;

pub use pagination::{index_path, index_path_fast};

/// A fully resolved request, ready to be put on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// API key sent as a bearer token
    pub bearer: String,
    /// JSON body, sent with the API media type as content type
    pub body: Option<String>,
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

/// Sends [`ApiRequest`]s.
///
/// Implementations only move bytes; status checking, environment guards and
/// timeouts are applied by [`ApiClient`].
pub trait Transport: Send + Sync {
    /// Send one request and return its status and body.
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse>>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport whose connections give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            timeout,
        })
    }
}

impl Transport for ReqwestTransport {
    fn send(&self, request: ApiRequest) -> BoxFuture<'_, Result<ApiResponse>> {
        Box::pin(async move {
            let mut builder = self
                .client
                .request(request.method.clone(), &request.url)
                .header(ACCEPT, API_MEDIA_TYPE)
                .bearer_auth(&request.bearer);
            if let Some(body) = request.body {
                builder = builder.header(CONTENT_TYPE, API_MEDIA_TYPE).body(body);
            }

            let response = builder.send().await.map_err(|e| {
                if e.is_timeout() {
                    RallyError::Timeout {
                        url: request.url.clone(),
                        seconds: self.timeout.as_secs(),
                    }
                } else {
                    RallyError::NetworkError {
                        operation: format!("{} {}", request.method, request.url),
                        reason: e.to_string(),
                    }
                }
            })?;

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| RallyError::NetworkError {
                operation: format!("reading response of {}", request.url),
                reason: e.to_string(),
            })?;

            Ok(ApiResponse {
                status,
                body,
            })
        })
    }
}

/// Client for the Rally API, shared by every repository and download.
///
/// Cloning is cheap; clones share the configuration and the transport.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<GlobalConfig>,
    transport: Arc<dyn Transport>,
    danger_modify: bool,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("environments", &self.config.environments().collect::<Vec<_>>())
            .field("danger_modify", &self.danger_modify)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client that talks HTTP through `reqwest`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: GlobalConfig) -> Result<Self> {
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over an arbitrary transport.
    #[must_use]
    pub fn with_transport(config: GlobalConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            danger_modify: false,
        }
    }

    /// Allow mutating requests against protected environments (`--no-protect`).
    #[must_use]
    pub const fn danger_modify(mut self, allow: bool) -> Self {
        self.danger_modify = allow;
        self
    }

    /// The configuration this client was built from.
    #[must_use]
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Maximum number of concurrent code downloads.
    #[must_use]
    pub fn max_parallel(&self) -> usize {
        self.config.max_parallel.max(1)
    }

    /// Whether `env` names the offline pseudo-environment (empty, `LOCAL` or `LOC`).
    ///
    /// ```rust
    /// use rally_cli::api::ApiClient;
    ///
    /// assert!(ApiClient::is_local_env("LOCAL"));
    /// assert!(ApiClient::is_local_env(""));
    /// assert!(!ApiClient::is_local_env("DEV"));
    /// ```
    #[must_use]
    pub fn is_local_env(env: &str) -> bool {
        env.is_empty() || LOCAL_ENVIRONMENTS.contains(&env)
    }

    /// Refuse a mutating `method` against a protected environment.
    ///
    /// `GET` is always allowed. Otherwise `PROD` is refused, and so is `UAT` when its
    /// configuration sets `restrict_uat`, unless the client was built with
    /// [`danger_modify`](Self::danger_modify).
    ///
    /// # Errors
    ///
    /// Returns [`RallyError::ProtectedEnv`] when the request must not be sent.
    pub fn check_mutation_allowed(&self, env: &str, method: &Method) -> Result<(), RallyError> {
        if *method == Method::GET || self.danger_modify {
            return Ok(());
        }

        let restrict_uat = self.config.api(env).is_some_and(|api| api.restrict_uat);
        if env == "PROD" || (env == "UAT" && restrict_uat) {
            return Err(RallyError::ProtectedEnv {
                env: env.to_string(),
            });
        }
        Ok(())
    }

    /// Issue a request and require a `200`, `201` or `204` answer.
    ///
    /// `path` is either relative to the environment's API root or an absolute URL
    /// (pagination links are absolute).
    ///
    /// # Errors
    ///
    /// - [`RallyError::UnconfiguredEnv`] if `env` has no API configuration
    /// - [`RallyError::ProtectedEnv`] for a refused mutation
    /// - [`RallyError::Timeout`] if no answer arrives within the request timeout
    /// - [`RallyError::ApiError`] for any other status code
    pub async fn request(
        &self,
        env: &str,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<ApiResponse> {
        let (method, url, response) = self.send(env, method, path, body).await?;

        if !matches!(response.status, 200 | 201 | 204) {
            return Err(RallyError::ApiError {
                status: response.status,
                method: method.to_string(),
                url,
                body: response.body,
            }
            .into());
        }
        Ok(response)
    }

    /// `GET` a JSON document and deserialize it.
    ///
    /// # Errors
    ///
    /// Fails like [`request`](Self::request), or if the body is not valid JSON for `T`.
    pub async fn get_json<T: DeserializeOwned>(&self, env: &str, path: &str) -> Result<T> {
        let response = self.request(env, Method::GET, path, None).await?;
        serde_json::from_str(&response.body)
            .map_err(RallyError::from)
            .with_context(|| format!("Invalid JSON returned by {env} for {path}"))
    }

    /// `GET` a plain text document, such as preset code.
    ///
    /// # Errors
    ///
    /// Fails like [`request`](Self::request).
    pub async fn get_text(&self, env: &str, path: &str) -> Result<String> {
        Ok(self.request(env, Method::GET, path, None).await?.body)
    }

    /// Probe an environment and report the status code it answers with.
    ///
    /// Local environments are never contacted and report `None`. Unlike
    /// [`request`](Self::request), any status code is returned rather than
    /// treated as an error, so a bad key shows up as `Some(401)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment is unconfigured or the request cannot be
    /// completed at all.
    pub async fn test_access(&self, env: &str) -> Result<Option<u16>> {
        if Self::is_local_env(env) {
            return Ok(None);
        }
        let (_, _, response) = self.send(env, Method::GET, "/providers?page=1p1", None).await?;
        Ok(Some(response.status))
    }

    async fn send(
        &self,
        env: &str,
        method: Method,
        path: &str,
        body: Option<String>,
    ) -> Result<(Method, String, ApiResponse)> {
        let api = self.config.api(env).ok_or_else(|| RallyError::UnconfiguredEnv {
            env: env.to_string(),
        })?;
        self.check_mutation_allowed(env, &method)?;

        let url = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", api.url.trim_end_matches('/'), path)
        };
        debug!("{method} @ {url}");

        let request = ApiRequest {
            method: method.clone(),
            url: url.clone(),
            bearer: api.key.clone(),
            body,
        };

        let timeout = self.config.request_timeout();
        let response = tokio::time::timeout(timeout, self.transport.send(request))
            .await
            .map_err(|_| RallyError::Timeout {
                url: url.clone(),
                seconds: timeout.as_secs(),
            })??;

        Ok((method, url, response))
    }
}
