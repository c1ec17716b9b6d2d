// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Authenticated access to the REST API.
//!
//! The gateway only moves bytes: it builds the URL, attaches the credential headers, and
//! hands back whatever status and body the service produced. Deciding whether a status is
//! acceptable is left to [`crate::operations`].

use async_trait::async_trait;
use cloudlive_api::{Action, Endpoint};
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde_json::Value;
use std::io::{IsTerminal, Write};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::spinner::Spinner;

pub const API_KEY_HEADER: &str = "wsc-api-key";
pub const ACCESS_KEY_HEADER: &str = "wsc-access-key";

/// One call against a resource-oriented endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: Endpoint,
    pub id: Option<String>,
    pub action: Option<Action>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub const fn new(method: Method, endpoint: Endpoint) -> Self {
        Self { method, endpoint, id: None, action: None, body: None }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub const fn action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    #[must_use]
    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Path below the versioned API root, e.g. `live_streams/abc/state`.
    pub fn path(&self) -> String {
        let mut path = self.endpoint.path().to_string();
        if let Some(id) = &self.id {
            path.push('/');
            path.push_str(id);
        }
        if let Some(action) = self.action {
            path.push('/');
            path.push_str(action.path());
        }
        path
    }
}

/// Raw outcome of a call. Any status, including non-2xx, is a normal response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self { status, headers: Vec::new(), body: body.into() }
    }
}

/// Performs API calls. Implemented over HTTP by [`HttpGateway`] and in memory by
/// [`crate::testing::ScriptedGateway`].
#[async_trait]
pub trait ApiGateway: Send + Sync {
    /// Performs the call without retrying.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Transport`] when no response was obtained and
    /// [`ApiError::Request`] when the request could not be built.
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse>;
}

#[async_trait]
impl<G: ApiGateway + ?Sized> ApiGateway for std::sync::Arc<G> {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse> {
        (**self).call(request).await
    }
}

/// Builds `<base_url>/api/<version>`, keeping any path prefix of `base_url`.
fn api_root(base_url: &str, version: &str) -> Result<Url> {
    let mut url = Url::parse(base_url.trim())
        .map_err(|e| ApiError::Request(format!("Invalid base URL {base_url}: {e}")))?;
    match url.scheme() {
        "http" | "https" => {},
        scheme => return Err(ApiError::Request(format!("Base URL must be http(s), got: {scheme}"))),
    }
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| ApiError::Request(format!("Base URL cannot carry a path: {base_url}")))?
        .pop_if_empty()
        .push("api")
        .push(version.trim().trim_matches('/'));
    Ok(url)
}

/// reqwest-backed gateway configured from [`Config`].
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    root: Url,
    api_key: String,
    access_key: String,
    debug: bool,
    progress: bool,
}

impl HttpGateway {
    /// Creates a gateway with the configured credentials and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.http.timeout()).build()?;

        Ok(Self {
            client,
            root: api_root(&config.api.base_url, &config.api.version)?,
            api_key: config.api.key.clone(),
            access_key: config.api.access_key.clone(),
            debug: config.api.debug,
            progress: config.http.progress && std::io::stderr().is_terminal(),
        })
    }

    /// Full URL of `request`. Ids are percent-encoded as single path segments.
    pub fn url(&self, request: &ApiRequest) -> Url {
        let mut url = self.root.clone();
        // `root` was validated as a base URL in `api_root`
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.push(request.endpoint.path());
            if let Some(id) = &request.id {
                segments.push(id);
            }
            if let Some(action) = request.action {
                segments.push(action.path());
            }
        }
        url
    }

    async fn send(&self, request: &ApiRequest, url: Url) -> Result<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCESS_KEY_HEADER, &self.access_key)
            .header(CONTENT_TYPE, "application/json");

        if let Some(body) = &request.body {
            let bytes = serde_json::to_vec(body)
                .map_err(|e| ApiError::Request(format!("Failed to serialize body: {e}")))?;
            builder = builder.body(bytes);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (name.as_str().to_string(), value.to_str().unwrap_or("<binary>").to_string())
            })
            .collect();
        let body = response.text().await?;

        Ok(ApiResponse { status, headers, body })
    }
}

/// Writes the status and headers of `response` in the debug dump format.
///
/// # Errors
///
/// Returns any error from `out`.
pub fn write_debug(out: &mut impl Write, response: &ApiResponse) -> std::io::Result<()> {
    writeln!(out, "###### DEBUG #####")?;
    writeln!(out, "HTTP Response Code: {}", response.status)?;
    writeln!(out, "HTTP Response Headers:")?;
    for (name, value) in &response.headers {
        writeln!(out, "{name} => {value}")?;
    }
    writeln!(out, "###### DEBUG #####")
}

#[async_trait]
impl ApiGateway for HttpGateway {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse> {
        let url = self.url(&request);
        debug!(method = %request.method, %url, "Calling API");

        let spinner = if self.progress {
            Spinner::start(format!("calling {} {url}", request.method))
        } else {
            Spinner::disabled()
        };
        let result = self.send(&request, url).await;
        spinner.finish().await;

        let response = result?;
        debug!(method = %request.method, path = %request.path(), status = response.status, "API call finished");
        if self.debug {
            if let Err(e) = write_debug(&mut std::io::stdout().lock(), &response) {
                debug!(error = %e, "Failed to print response dump");
            }
        }
        Ok(response)
    }
}
