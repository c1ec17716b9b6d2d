// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! api: Wire types for the live stream management REST API.
//!
//! Every response document wraps its payload in one top-level key named after the
//! resource (`live_stream`, `player`), or after the collection for lists
//! (`live_streams`). [`decode`] unwraps that envelope and checks the fields the
//! client depends on before handing back a typed value.
//!
//! # Example
//! ```json
//! {
//!   "live_stream": {
//!     "id": "wdjfqvsv",
//!     "name": "My RTSP Pull Stream",
//!     "player_id": "pkfswbbr",
//!     "hosted_page_url": "in_progress"
//!   }
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

mod error;

pub use error::DecodeError;

/// State values the client branches on. Everything else the service reports is
/// treated as an opaque string.
pub mod states {
    /// Live stream is being provisioned after a start request.
    pub const STARTING: &str = "starting";
    /// Live stream is running and its hosted page is available.
    pub const STARTED: &str = "started";
    /// Player provisioning has been requested but has not finished.
    pub const REQUESTED: &str = "requested";
    /// Player is provisioned and ready for playback.
    pub const ACTIVATED: &str = "activated";
}

// --- Routing ---

/// A resource collection exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    LiveStreams,
    Players,
}

impl Endpoint {
    /// Path segment of the collection.
    pub const fn path(self) -> &'static str {
        match self {
            Self::LiveStreams => "live_streams",
            Self::Players => "players",
        }
    }
}

/// A sub-resource action appended after a resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Start,
    Reset,
    Stop,
    State,
    ThumbnailUrl,
}

impl Action {
    /// Path segment of the action.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Reset => "reset",
            Self::Stop => "stop",
            Self::State => "state",
            Self::ThumbnailUrl => "thumbnail_url",
        }
    }
}

// --- Resources ---

/// A typed payload found under a known envelope key.
pub trait Resource: DeserializeOwned {
    /// Top-level key wrapping the payload.
    const KEY: &'static str;
    /// Fields that must be present and non-null inside the envelope.
    const REQUIRED: &'static [&'static str] = &[];
}

/// Full representation of a live stream.
///
/// Only the fields the client acts on are typed; the rest of the document is kept
/// in `extra` so it can be shown back to the user unchanged.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LiveStream {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Player provisioned together with the stream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,
    /// Viewer page, populated once the stream has started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hosted_page_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for LiveStream {
    const KEY: &'static str = "live_stream";
    const REQUIRED: &'static [&'static str] = &["id", "name"];
}

/// State document returned by start, stop, reset and state calls.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct StreamState {
    pub state: String,
}

impl Resource for StreamState {
    const KEY: &'static str = "live_stream";
    const REQUIRED: &'static [&'static str] = &["state"];
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.state)
    }
}

/// Provisioning state of a player.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub state: String,
}

impl Resource for PlayerState {
    const KEY: &'static str = "player";
    const REQUIRED: &'static [&'static str] = &["state"];
}

impl fmt::Display for PlayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.state)
    }
}

/// Preview image location of a started stream.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub thumbnail_url: String,
}

impl Resource for Thumbnail {
    const KEY: &'static str = "live_stream";
    const REQUIRED: &'static [&'static str] = &["thumbnail_url"];
}

/// Entry of the live stream collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct LiveStreamSummary {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The live stream collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(transparent)]
pub struct LiveStreamList(pub Vec<LiveStreamSummary>);

impl Resource for LiveStreamList {
    const KEY: &'static str = "live_streams";
}

impl LiveStreamList {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LiveStreamSummary> {
        self.0.iter()
    }
}

// --- Decoding ---

/// Parses a raw response body. An empty body (e.g. `204 No Content`) parses as `null`.
///
/// # Errors
///
/// Returns [`DecodeError::NotJson`] if the body is not empty and not valid JSON.
pub fn parse_body(raw: &str) -> Result<Value, DecodeError> {
    if raw.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(raw).map_err(DecodeError::NotJson)
}

/// Unwraps the `T::KEY` envelope of a response document and deserializes its content.
///
/// # Errors
///
/// Returns an error if:
/// - The document is not a JSON object
/// - The envelope key is absent
/// - A field listed in `T::REQUIRED` is absent or null
/// - The content does not match `T`
pub fn decode<T: Resource>(body: &Value) -> Result<T, DecodeError> {
    let object = body.as_object().ok_or(DecodeError::NotAnObject)?;
    let inner = object.get(T::KEY).ok_or(DecodeError::MissingEnvelope { key: T::KEY })?;

    for &field in T::REQUIRED {
        if inner.get(field).is_none_or(Value::is_null) {
            return Err(DecodeError::MissingField { key: T::KEY, field });
        }
    }

    T::deserialize(inner).map_err(|source| DecodeError::Invalid { key: T::KEY, source })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_live_stream_keeps_unknown_fields() {
        let body = json!({
            "live_stream": {
                "id": "A",
                "name": "Cam",
                "player_id": "P",
                "encoder": "other_rtsp",
                "aspect_ratio_width": 1920
            }
        });

        let stream: LiveStream = decode(&body).unwrap();
        assert_eq!(stream.id, "A");
        assert_eq!(stream.player_id.as_deref(), Some("P"));
        assert_eq!(stream.hosted_page_url, None);
        assert_eq!(stream.extra.get("encoder"), Some(&json!("other_rtsp")));
        assert_eq!(stream.extra.get("aspect_ratio_width"), Some(&json!(1920)));
    }

    #[test]
    fn test_decode_reports_missing_envelope() {
        let body = json!({ "meta": { "status": 401, "code": "ERR-401-NoApiKey" } });

        let err = decode::<LiveStream>(&body).unwrap_err();
        assert!(matches!(err, DecodeError::MissingEnvelope { key: "live_stream" }));
    }

    #[test]
    fn test_decode_reports_missing_and_null_required_fields() {
        let missing = json!({ "live_stream": { "name": "Cam" } });
        let err = decode::<LiveStream>(&missing).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { key: "live_stream", field: "id" }));

        let null_state = json!({ "player": { "state": null } });
        let err = decode::<PlayerState>(&null_state).unwrap_err();
        assert!(matches!(err, DecodeError::MissingField { key: "player", field: "state" }));
    }

    #[test]
    fn test_decode_reports_invalid_shape() {
        let body = json!({ "live_stream": { "state": 3 } });

        let err = decode::<StreamState>(&body).unwrap_err();
        assert!(matches!(err, DecodeError::Invalid { key: "live_stream", .. }));
    }

    #[test]
    fn test_decode_rejects_non_object_documents() {
        assert!(matches!(decode::<StreamState>(&json!([1, 2])), Err(DecodeError::NotAnObject)));
        assert!(matches!(decode::<StreamState>(&Value::Null), Err(DecodeError::NotAnObject)));
    }

    #[test]
    fn test_decode_list() {
        let body = json!({
            "live_streams": [
                { "id": "a", "name": "First" },
                { "id": "b", "name": "Second", "created_at": "2016-01-01T00:00:00.000Z" }
            ]
        });

        let list: LiveStreamList = decode(&body).unwrap();
        assert_eq!(list.len(), 2);
        let names: Vec<&str> = list.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["First", "Second"]);
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body("").unwrap(), Value::Null);
        assert_eq!(parse_body("  \n").unwrap(), Value::Null);
        assert_eq!(parse_body(r#"{"player":{"state":"requested"}}"#).unwrap()["player"]["state"], "requested");
        assert!(matches!(parse_body("<html>"), Err(DecodeError::NotJson(_))));
    }

    #[test]
    fn test_paths() {
        assert_eq!(Endpoint::LiveStreams.path(), "live_streams");
        assert_eq!(Endpoint::Players.path(), "players");
        assert_eq!(Action::ThumbnailUrl.path(), "thumbnail_url");
        assert_eq!(Action::Start.path(), "start");
    }
}
