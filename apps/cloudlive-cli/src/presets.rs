// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Example request bodies shipped in the data directory.
//!
//! ```text
//! <data>/live_stream/encoder_types/*.json|*.yaml   create bodies, one per encoder type
//! <data>/live_stream/update_example.json           update body
//! ```
//!
//! The documents are sent as they are; only `live_stream.name` is read, to label the menu.

use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Label used when a preset has no `live_stream.name`.
pub const UNKNOWN_NAME: &str = "Unknown Name. Please change the content of the JSON and add a name!";

const ENCODER_TYPES_DIR: &str = "live_stream/encoder_types";
const UPDATE_EXAMPLE: &str = "live_stream/update_example.json";

#[derive(Debug, Error)]
pub enum PresetError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unknown preset '{name}'. Available: {available}")]
    Unknown { name: String, available: String },
}

/// A create body found in the encoder types directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Preset {
    /// File name without extension, e.g. `other_rtsp_pull`.
    pub stem: String,
    /// Menu label.
    pub name: String,
    pub body: Value,
}

fn is_document(path: &Path) -> bool {
    matches!(path.extension().and_then(|e| e.to_str()), Some("json" | "yaml" | "yml"))
}

fn display_name(body: &Value) -> String {
    body.get("live_stream")
        .and_then(|ls| ls.get("name"))
        .and_then(Value::as_str)
        .map_or_else(|| UNKNOWN_NAME.to_string(), str::to_string)
}

/// Parses a JSON or YAML document. `.yaml`/`.yml` files go straight to the YAML parser;
/// anything else is tried as JSON first.
fn parse_document(path: &Path, text: &str) -> Result<Value, PresetError> {
    let yaml = matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml"));
    if !yaml {
        if let Ok(value) = serde_json::from_str::<Value>(text) {
            return Ok(value);
        }
    }

    serde_saphyr::from_str::<Value>(text).map_err(|e| PresetError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Reads and parses one document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is neither JSON nor YAML.
pub async fn load_document(path: &Path) -> Result<Value, PresetError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| PresetError::Io { path: path.display().to_string(), source })?;
    parse_document(path, &text)
}

/// All create presets, sorted by file name. Files that fail to parse are skipped with a
/// warning.
///
/// # Errors
///
/// Returns an error if the encoder types directory cannot be read.
pub async fn list_presets(data_dir: &Path) -> Result<Vec<Preset>, PresetError> {
    let dir = data_dir.join(ENCODER_TYPES_DIR);
    let mut entries = tokio::fs::read_dir(&dir)
        .await
        .map_err(|source| PresetError::Io { path: dir.display().to_string(), source })?;

    let mut paths: Vec<PathBuf> = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|source| PresetError::Io { path: dir.display().to_string(), source })?
    {
        let path = entry.path();
        if is_document(&path) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut presets = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
            continue;
        };
        match load_document(&path).await {
            Ok(body) => {
                debug!(preset = %stem, "Loaded preset");
                presets.push(Preset { name: display_name(&body), stem, body });
            },
            Err(e) => warn!(error = %e, "Skipping preset"),
        }
    }

    Ok(presets)
}

/// Loads the preset whose file stem is `name`.
///
/// # Errors
///
/// Returns [`PresetError::Unknown`] listing the available stems if there is no such preset.
pub async fn load_preset(data_dir: &Path, name: &str) -> Result<Preset, PresetError> {
    let presets = list_presets(data_dir).await?;
    let available = presets.iter().map(|p| p.stem.as_str()).collect::<Vec<_>>().join(", ");

    presets
        .into_iter()
        .find(|p| p.stem == name)
        .ok_or_else(|| PresetError::Unknown { name: name.to_string(), available })
}

/// Loads the update example body.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub async fn load_update_body(data_dir: &Path) -> Result<Value, PresetError> {
    load_document(&data_dir.join(UPDATE_EXAMPLE)).await
}
