// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! In-memory doubles for driving operations and workflows without a network.

use async_trait::async_trait;
use reqwest::Method;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{ApiError, Result};
use crate::gateway::{ApiGateway, ApiRequest, ApiResponse};
use crate::workflow::{Stage, StepGate};

#[derive(Debug, Clone)]
enum Reply {
    Response(ApiResponse),
    Transport(String),
}

#[derive(Debug, Default)]
struct Script {
    routes: HashMap<(Method, String), VecDeque<Reply>>,
    calls: Vec<ApiRequest>,
}

/// Gateway replaying queued replies per `(method, path)` route.
///
/// Every request is recorded, answered or not. A route with no queued reply left answers
/// `500` with an error document, so an unscripted call shows up as a failed operation
/// rather than a hang.
///
/// # Example
///
/// ```rust,ignore
/// let gateway = ScriptedGateway::new();
/// gateway.reply(Method::GET, "live_streams/A/state", 200, json!({"live_stream": {"state": "started"}}));
///
/// let api = LiveStreamApi::new(gateway.clone());
/// api.state("A").await?;
/// assert_eq!(gateway.count(&Method::GET, "live_streams/A/state"), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScriptedGateway {
    script: Arc<Mutex<Script>>,
}

impl ScriptedGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, method: Method, path: &str, reply: Reply) {
        self.script().routes.entry((method, path.to_string())).or_default().push_back(reply);
    }

    /// Queues a JSON reply.
    pub fn reply(&self, method: Method, path: &str, status: u16, body: Value) {
        self.push(method, path, Reply::Response(ApiResponse::new(status, body.to_string())));
    }

    /// Queues a reply with a raw body (empty, HTML, truncated JSON).
    pub fn reply_raw(&self, method: Method, path: &str, status: u16, body: &str) {
        self.push(method, path, Reply::Response(ApiResponse::new(status, body)));
    }

    /// Queues a `{ "live_stream": { "state": .. } }` reply for each state in order.
    pub fn stream_states(&self, method: Method, path: &str, states: &[&str]) {
        for state in states {
            self.reply(method.clone(), path, 200, json!({ "live_stream": { "state": state } }));
        }
    }

    /// Queues a `{ "player": { "state": .. } }` reply for each state in order.
    pub fn player_states(&self, player_id: &str, states: &[&str]) {
        let path = format!("players/{player_id}/state");
        for state in states {
            self.reply(
                Method::GET,
                &path,
                200,
                json!({ "player": { "id": player_id, "state": state } }),
            );
        }
    }

    /// Queues a transport failure (no response at all).
    pub fn fail(&self, method: Method, path: &str, message: &str) {
        self.push(method, path, Reply::Transport(message.to_string()));
    }

    /// All requests received so far, in order.
    pub fn calls(&self) -> Vec<ApiRequest> {
        self.script().calls.clone()
    }

    /// `METHOD path` of every request received so far, in order.
    pub fn call_log(&self) -> Vec<String> {
        self.script().calls.iter().map(|c| format!("{} {}", c.method, c.path())).collect()
    }

    /// Number of requests received for one route.
    pub fn count(&self, method: &Method, path: &str) -> usize {
        self.script().calls.iter().filter(|c| &c.method == method && c.path() == path).count()
    }
}

#[async_trait]
impl ApiGateway for ScriptedGateway {
    async fn call(&self, request: ApiRequest) -> Result<ApiResponse> {
        let mut script = self.script();
        let key = (request.method.clone(), request.path());
        script.calls.push(request);

        match script.routes.get_mut(&key).and_then(VecDeque::pop_front) {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Transport(message)) => Err(ApiError::Transport(message)),
            None => Ok(ApiResponse::new(
                500,
                json!({ "meta": { "status": 500, "code": "ERR-500-Unscripted", "title": key.1 } })
                    .to_string(),
            )),
        }
    }
}

/// Gate that records every step it is asked about and declines from a chosen step on.
#[derive(Debug, Clone, Default)]
pub struct RecordingGate {
    pub seen: Vec<(u32, Stage)>,
    decline_at: Option<u32>,
}

impl RecordingGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declines step `step` (counting from 1).
    pub fn decline_at(step: u32) -> Self {
        Self { seen: Vec::new(), decline_at: Some(step) }
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.seen.iter().map(|(_, stage)| *stage).collect()
    }
}

impl StepGate for RecordingGate {
    fn advance(&mut self, step: u32, stage: Stage) -> bool {
        self.seen.push((step, stage));
        self.decline_at.is_none_or(|decline| step < decline)
    }
}
