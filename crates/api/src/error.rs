// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use thiserror::Error;

/// Failure to turn a response body into a typed resource.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The body is neither empty nor valid JSON.
    #[error("Response body is not valid JSON: {0}")]
    NotJson(#[source] serde_json::Error),

    /// The document is valid JSON but not an object.
    #[error("Response body is not a JSON object")]
    NotAnObject,

    /// The top-level resource key is absent (typically an error document).
    #[error("Response is missing the `{key}` envelope")]
    MissingEnvelope { key: &'static str },

    /// A field the client depends on is absent or null.
    #[error("Response `{key}` is missing required field `{field}`")]
    MissingField { key: &'static str, field: &'static str },

    /// The envelope content does not have the expected shape.
    #[error("Response `{key}` has an unexpected shape: {source}")]
    Invalid {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DecodeError::MissingField { key: "live_stream", field: "player_id" };
        assert_eq!(err.to_string(), "Response `live_stream` is missing required field `player_id`");

        let err = DecodeError::MissingEnvelope { key: "player" };
        assert_eq!(err.to_string(), "Response is missing the `player` envelope");
    }
}
