//! HTTP client for the game server manager backend.
//!
//! Covers the plain (non-stream) requests: starting installs, querying
//! install/server status, sending stdin input, and terminating processes.
//! Stream connections are opened through [`ApiClient::open_stream`] and
//! driven by [`crate::stream`].

use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use gsmon_core::prelude::*;
use gsmon_core::ProcessKind;

/// Bound on plain request round-trips (status queries, input, terminate).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Generic `{status, message}` response envelope used by most endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusEnvelope {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl StatusEnvelope {
    pub fn succeeded(&self) -> bool {
        self.status == "success"
    }
}

/// Install job status as reported by `GET /installation_status`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallationStatus {
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub return_code: Option<i32>,
}

impl InstallationStatus {
    pub fn succeeded(&self) -> bool {
        self.return_code == Some(0)
    }
}

#[derive(Debug, Deserialize)]
struct InstallationStatusEnvelope {
    status: String,
    #[serde(default)]
    installation: Option<InstallationStatus>,
}

#[derive(Debug, Deserialize)]
struct ServerStatusEnvelope {
    #[serde(default)]
    server_status: Option<String>,
}

/// Client for the backend HTTP API.
///
/// Holds two reqwest clients: one with a total request timeout for plain
/// requests, and one with only a connect timeout for long-lived SSE
/// streams (a total timeout would kill the stream mid-flight).
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    stream_http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    /// Create a client for the backend at `base_url` (e.g.
    /// `http://localhost:5000/api`), optionally authenticating with a
    /// bearer token.
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        Url::parse(&base_url).map_err(|_| Error::InvalidUrl {
            url: base_url.clone(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;
        let stream_http = reqwest::Client::builder()
            .connect_timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::transport(e.to_string()))?;

        Ok(Self {
            http,
            stream_http,
            base_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    /// Resolve an endpoint path against the base URL.
    fn endpoint(&self, path: &str) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse(&raw).map_err(|_| Error::InvalidUrl { url: raw })
    }

    // ── Install endpoints ─────────────────────────────────────────────────

    /// Ask the backend to start installing `game_id`.
    ///
    /// On success the caller proceeds to open the install stream. A
    /// backend-reported failure becomes [`Error::Backend`].
    pub async fn start_install(&self, game_id: &str) -> Result<String> {
        let envelope: StatusEnvelope = self
            .post_json("install", &json!({ "game_id": game_id }))
            .await?;
        if envelope.succeeded() {
            Ok(envelope.message.unwrap_or_default())
        } else {
            Err(Error::backend(
                envelope
                    .message
                    .unwrap_or_else(|| "install request failed".to_string()),
            ))
        }
    }

    /// Query the status of an install job.
    ///
    /// Returns `Ok(None)` when the backend has no record of the job — the
    /// caller treats that as "status unavailable".
    pub async fn installation_status(&self, game_id: &str) -> Result<Option<InstallationStatus>> {
        let mut url = self.endpoint("installation_status")?;
        url.query_pairs_mut().append_pair("game_id", game_id);
        let envelope: InstallationStatusEnvelope = self.get_json(url).await?;
        if envelope.status == "success" {
            Ok(envelope.installation)
        } else {
            Ok(None)
        }
    }

    /// Kill an install process. Returns the backend's verdict.
    pub async fn terminate_install(&self, game_id: &str) -> Result<bool> {
        let envelope: StatusEnvelope = self
            .post_json("terminate_install", &json!({ "game_id": game_id }))
            .await?;
        Ok(envelope.succeeded())
    }

    /// Write a line to an install process's stdin.
    pub async fn send_install_input(&self, game_id: &str, value: &str) -> Result<bool> {
        let envelope: StatusEnvelope = self
            .post_json("send_input", &json!({ "game_id": game_id, "value": value }))
            .await?;
        Ok(envelope.succeeded())
    }

    // ── Server endpoints ──────────────────────────────────────────────────

    /// Query whether a game server process is currently running.
    pub async fn server_is_running(&self, game_id: &str) -> Result<bool> {
        let mut url = self.endpoint("server/status")?;
        url.query_pairs_mut().append_pair("game_id", game_id);
        let envelope: ServerStatusEnvelope = self.get_json(url).await?;
        Ok(envelope.server_status.as_deref() == Some("running"))
    }

    /// Write a line to a game server's stdin.
    pub async fn send_server_input(&self, game_id: &str, value: &str) -> Result<bool> {
        let envelope: StatusEnvelope = self
            .post_json(
                "server/send_input",
                &json!({ "game_id": game_id, "value": value }),
            )
            .await?;
        Ok(envelope.succeeded())
    }

    /// Ask the backend to stop a game server, gracefully or by force.
    pub async fn stop_server(&self, game_id: &str, force: bool) -> Result<bool> {
        let envelope: StatusEnvelope = self
            .post_json("server/stop", &json!({ "game_id": game_id, "force": force }))
            .await?;
        Ok(envelope.succeeded())
    }

    // ── Stream support ────────────────────────────────────────────────────

    /// Build the SSE URL for a process stream.
    ///
    /// The auth token travels as a `token` query parameter here — event
    /// stream requests cannot carry custom headers.
    pub fn stream_url(&self, kind: ProcessKind, game_id: &str, restart: bool) -> Result<Url> {
        let path = match kind {
            ProcessKind::Install => "install_stream",
            ProcessKind::Server => "server/stream",
            ProcessKind::Custom => {
                return Err(Error::config("custom sessions have no backend stream"))
            }
        };
        let mut url = self.endpoint(path)?;
        url.query_pairs_mut().append_pair("game_id", game_id);
        if kind == ProcessKind::Server && restart {
            url.query_pairs_mut().append_pair("restart", "true");
        }
        if let Some(token) = &self.token {
            url.query_pairs_mut().append_pair("token", token);
        }
        Ok(url)
    }

    /// Open a long-lived stream connection. The response body is consumed
    /// by the stream task; errors here are transport-level.
    pub(crate) async fn open_stream(&self, url: Url) -> reqwest::Result<reqwest::Response> {
        self.stream_http.get(url).send().await
    }

    // ── Request plumbing ──────────────────────────────────────────────────

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let mut request = self.http.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        Self::parse_response(response).await
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let mut request = self.http.post(url).json(body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::transport(e.to_string()))?;
        Self::parse_response(response).await
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(Error::Unauthorized);
        }
        if !status.is_success() {
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("unknown error"));
            return Err(Error::transport(format!("request failed: {status} - {text}")));
        }
        Ok(response.json::<T>().await.map_err(|e| {
            Error::protocol(format!("invalid response body: {e}"))
        })?)
    }
}
