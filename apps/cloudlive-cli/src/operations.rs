// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Typed live stream operations.
//!
//! Each operation issues exactly one gateway call, checks the status it expects, and decodes
//! the response envelope. A status other than the expected one becomes
//! [`ApiError::UnexpectedStatus`] carrying the parsed body, so callers can show the
//! service's own error document.

use cloudlive_api::{
    decode, parse_body, Action, Endpoint, LiveStream, LiveStreamList, PlayerState, Resource,
    StreamState, Thumbnail,
};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ApiError, Result};
use crate::gateway::{ApiGateway, ApiRequest};

const OK: u16 = 200;
const CREATED: u16 = 201;
const NO_CONTENT: u16 = 204;

/// Live stream and player operations over an [`ApiGateway`].
pub struct LiveStreamApi<G> {
    gateway: G,
}

impl<G: ApiGateway> LiveStreamApi<G> {
    pub const fn new(gateway: G) -> Self {
        Self { gateway }
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    async fn send(&self, request: ApiRequest, expected: u16) -> Result<Value> {
        let path = request.path();
        let response = self.gateway.call(request).await?;
        let body = parse_body(&response.body);

        if response.status != expected {
            debug!(%path, status = response.status, expected, "Unexpected response status");
            return Err(ApiError::UnexpectedStatus {
                status: response.status,
                body: body.unwrap_or(Value::Null),
            });
        }

        Ok(body?)
    }

    async fn fetch<T: Resource>(&self, request: ApiRequest, expected: u16) -> Result<T> {
        let body = self.send(request, expected).await?;
        Ok(decode(&body)?)
    }

    fn stream(method: Method, id: &str) -> ApiRequest {
        ApiRequest::new(method, Endpoint::LiveStreams).id(id)
    }

    /// Number of live streams in the account (`GET /live_streams`).
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the list cannot be decoded.
    pub async fn count(&self) -> Result<usize> {
        Ok(self.list().await?.len())
    }

    /// All live streams in the account (`GET /live_streams`).
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the list cannot be decoded.
    pub async fn list(&self) -> Result<LiveStreamList> {
        self.fetch(ApiRequest::new(Method::GET, Endpoint::LiveStreams), OK).await
    }

    /// Creates a live stream from an opaque request document (`POST /live_streams`).
    ///
    /// Only `201 Created` counts as success.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 201, or the new stream cannot be
    /// decoded.
    pub async fn create(&self, body: &Value) -> Result<LiveStream> {
        info!("Creating live stream");
        let request = ApiRequest::new(Method::POST, Endpoint::LiveStreams).body(body.clone());
        let stream: LiveStream = self.fetch(request, CREATED).await?;
        info!(stream_id = %stream.id, player_id = ?stream.player_id, "Live stream created");
        Ok(stream)
    }

    /// Details of a live stream (`GET /live_streams/<id>`).
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the stream cannot be decoded.
    pub async fn show(&self, id: &str) -> Result<LiveStream> {
        self.fetch(Self::stream(Method::GET, id), OK).await
    }

    /// Applies a partial update document (`PATCH /live_streams/<id>`).
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the stream cannot be decoded.
    pub async fn update(&self, id: &str, body: &Value) -> Result<LiveStream> {
        info!(stream_id = %id, "Updating live stream");
        self.fetch(Self::stream(Method::PATCH, id).body(body.clone()), OK).await
    }

    async fn act(&self, id: &str, action: Action) -> Result<StreamState> {
        info!(stream_id = %id, action = action.path(), "Sending live stream action");
        let state: StreamState =
            self.fetch(Self::stream(Method::PUT, id).action(action), OK).await?;
        debug!(stream_id = %id, state = %state.state, "Live stream action accepted");
        Ok(state)
    }

    /// `PUT /live_streams/<id>/start`
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the state cannot be decoded.
    pub async fn start(&self, id: &str) -> Result<StreamState> {
        self.act(id, Action::Start).await
    }

    /// `PUT /live_streams/<id>/reset`
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the state cannot be decoded.
    pub async fn reset(&self, id: &str) -> Result<StreamState> {
        self.act(id, Action::Reset).await
    }

    /// `PUT /live_streams/<id>/stop`
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the state cannot be decoded.
    pub async fn stop(&self, id: &str) -> Result<StreamState> {
        self.act(id, Action::Stop).await
    }

    /// Current state of a live stream (`GET /live_streams/<id>/state`).
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the state cannot be decoded.
    pub async fn state(&self, id: &str) -> Result<StreamState> {
        self.fetch(Self::stream(Method::GET, id).action(Action::State), OK).await
    }

    /// Preview image URL of a started stream (`GET /live_streams/<id>/thumbnail_url`).
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the URL cannot be decoded.
    pub async fn thumbnail_url(&self, id: &str) -> Result<Thumbnail> {
        self.fetch(Self::stream(Method::GET, id).action(Action::ThumbnailUrl), OK).await
    }

    /// Provisioning state of a player (`GET /players/<id>/state`).
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails, the status is not 200, or the state cannot be decoded.
    pub async fn player_state(&self, id: &str) -> Result<PlayerState> {
        let request = ApiRequest::new(Method::GET, Endpoint::Players).id(id).action(Action::State);
        self.fetch(request, OK).await
    }

    /// Deletes a live stream (`DELETE /live_streams/<id>`). Only `204 No Content` counts as
    /// success.
    ///
    /// # Errors
    ///
    /// Returns an error if the call fails or the status is not 204.
    pub async fn delete(&self, id: &str) -> Result<()> {
        info!(stream_id = %id, "Deleting live stream");
        let response = self.gateway.call(Self::stream(Method::DELETE, id)).await?;
        if response.status != NO_CONTENT {
            return Err(ApiError::UnexpectedStatus {
                status: response.status,
                body: parse_body(&response.body).unwrap_or(Value::Null),
            });
        }
        info!(stream_id = %id, "Live stream deleted");
        Ok(())
    }
}
