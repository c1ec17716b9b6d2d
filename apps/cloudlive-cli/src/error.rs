// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Error types for the live stream client.
//!
//! The split mirrors how callers react: a [`ApiError::Transport`] means no response was
//! obtained at all, [`ApiError::UnexpectedStatus`] means the service answered but not with
//! the status the operation expects, and [`ApiError::Decode`] means the answer could not be
//! interpreted.

use cloudlive_api::DecodeError;
use serde_json::Value;
use thiserror::Error;

/// Failure of a single API operation.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was obtained (connect failure, timeout, body read failure).
    #[error("Network error: {0}")]
    Transport(String),

    /// The request could not be built (invalid URL, unserializable body).
    #[error("Request error: {0}")]
    Request(String),

    /// The service answered with a status the operation does not accept.
    ///
    /// `body` holds the parsed response document (usually the service's error
    /// description) or `null` when the body was empty or not JSON.
    #[error("Server returned status {status}")]
    UnexpectedStatus { status: u16, body: Value },

    /// The response could not be decoded into the expected resource.
    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        // reqwest's Display omits the cause ("error sending request for url (...)")
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        if err.is_builder() {
            Self::Request(message)
        } else {
            Self::Transport(message)
        }
    }
}

impl ApiError {
    /// True when no response was obtained from the service.
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// The HTTP status of the response, if one was received.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Convenience type alias for operation results.
pub type Result<T> = std::result::Result<T, ApiError>;
