// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The guided create, start, watch, tear down walkthrough.
//!
//! A run moves through [`Stage`]s in order. Before each step a [`StepGate`] decides whether
//! to go on: the shell asks the user, the headless command and the tests advance
//! automatically.
//!
//! Failures are handled per stage:
//! - a rejected create ends the run with nothing to clean up,
//! - a created stream without a player is deleted again before the run ends,
//! - a stream that does not reach `started` is deleted again before the run ends,
//! - a player that does not reach `activated` only produces a warning,
//! - stop and delete during teardown are best effort.

use cloudlive_api::states::{ACTIVATED, REQUESTED, STARTED, STARTING};
use cloudlive_api::{PlayerState, StreamState};
use serde_json::Value;
use std::fmt;
use thiserror::Error;
use tokio::time::Duration;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::operations::LiveStreamApi;
use crate::poll::poll_until;

/// Where a run currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Init,
    Creating,
    Starting,
    PollingStream,
    PollingPlayer,
    ShowingUrl,
    Stopping,
    Deleting,
    Done,
    AbortCreateFailed,
    AbortStartFailed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::Creating => "creating the live stream",
            Self::Starting => "starting the live stream",
            Self::PollingStream => "waiting for the live stream",
            Self::PollingPlayer => "waiting for the player",
            Self::ShowingUrl => "fetching the hosted page URL",
            Self::Stopping => "stopping the live stream",
            Self::Deleting => "deleting the live stream",
            Self::Done => "done",
            Self::AbortCreateFailed => "aborted after a failed create",
            Self::AbortStartFailed => "aborted after a failed start",
        };
        f.write_str(name)
    }
}

/// Confirmation consulted before every step of a run.
pub trait StepGate {
    /// Returns false to abandon the run before `stage` (numbered `step`, from 1).
    fn advance(&mut self, step: u32, stage: Stage) -> bool;
}

/// Gate that always continues.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoAdvance;

impl StepGate for AutoAdvance {
    fn advance(&mut self, _step: u32, _stage: Stage) -> bool {
        true
    }
}

/// Everything a run has learned so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    pub step: u32,
    pub stage: Stage,
    pub stream_id: Option<String>,
    pub player_id: Option<String>,
    pub stream_state: Option<String>,
    pub player_state: Option<String>,
}

impl Default for WorkflowRun {
    fn default() -> Self {
        Self {
            step: 0,
            stage: Stage::Init,
            stream_id: None,
            player_id: None,
            stream_state: None,
            player_state: None,
        }
    }
}

/// Result of the compensating delete after a dependent step failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cleanup {
    Deleted,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome {
    /// All steps ran. The player may still have failed to provision.
    Completed { stream_id: String, player_activated: bool, hosted_page_url: Option<String> },
    /// The service did not answer the create with `201`. Nothing was created.
    CreateFailed { status: u16, body: Value },
    /// The stream was created but did not start; it has been deleted again if `cleanup`
    /// says so.
    StartFailed { stream_id: String, last_state: Option<String>, cleanup: Cleanup },
    /// The create answer carried no player id. The stream has been deleted again if
    /// `cleanup` says so.
    MissingPlayer { stream_id: String, cleanup: Cleanup },
    /// The gate declined `stage`. A stream created before that is left in place.
    Abandoned { stage: Stage, stream_id: Option<String> },
}

/// A failure that ends a run without going through its cleanup path.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Workflow failed while {stage}: {source}")]
    Api {
        stage: Stage,
        /// Stream that was created before the failure and may need manual cleanup.
        stream_id: Option<String>,
        #[source]
        source: ApiError,
    },
}

impl WorkflowError {
    /// Stream left behind by the failed run, if any.
    pub fn stream_id(&self) -> Option<&str> {
        match self {
            Self::Api { stream_id, .. } => stream_id.as_deref(),
        }
    }
}

/// Drives one workflow run against the API.
pub struct Orchestrator<'a, G, S> {
    api: &'a LiveStreamApi<G>,
    gate: S,
    interval: Duration,
    run: WorkflowRun,
}

impl<'a, G: ApiGateway, S: StepGate> Orchestrator<'a, G, S> {
    pub fn new(api: &'a LiveStreamApi<G>, gate: S, interval: Duration) -> Self {
        Self { api, gate, interval, run: WorkflowRun::default() }
    }

    /// State of the current (or last) run.
    pub const fn run(&self) -> &WorkflowRun {
        &self.run
    }

    pub const fn gate(&self) -> &S {
        &self.gate
    }

    /// Announces the next step and asks the gate. Returns false when the run is abandoned.
    fn enter(&mut self, stage: Stage, description: &str) -> bool {
        let step = self.run.step + 1;
        println!();
        println!("Step {step}: {description}");
        println!();
        if !self.gate.advance(step, stage) {
            return false;
        }
        self.run.step = step;
        self.run.stage = stage;
        info!(step, %stage, stream_id = ?self.run.stream_id, "Workflow step");
        true
    }

    fn abandon(&self, stage: Stage) -> WorkflowOutcome {
        let stream_id = self.run.stream_id.clone();
        info!(%stage, stream_id = ?stream_id, "Workflow abandoned");
        if let Some(id) = &stream_id {
            println!("Workflow stopped. Live stream {id} was left as it is.");
        }
        WorkflowOutcome::Abandoned { stage, stream_id }
    }

    fn fail(&self, source: ApiError) -> WorkflowError {
        WorkflowError::Api { stage: self.run.stage, stream_id: self.run.stream_id.clone(), source }
    }

    /// Deletes a stream whose later steps cannot run.
    async fn compensate(&self, stream_id: &str) -> Cleanup {
        match self.api.delete(stream_id).await {
            Ok(()) => Cleanup::Deleted,
            Err(e) => {
                warn!(stream_id = %stream_id, error = %e, "Compensating delete failed");
                Cleanup::Failed(e.to_string())
            },
        }
    }

    async fn abort_start(&mut self, stream_id: String, reason: &str) -> WorkflowOutcome {
        self.run.stage = Stage::AbortStartFailed;
        warn!(stream_id = %stream_id, state = ?self.run.stream_state, reason, "Live stream did not start");
        println!();
        println!(
            "Unfortunately something went wrong starting the Live Stream. Going to delete the Live Stream and return to Main Menu!"
        );
        println!();

        let cleanup = self.compensate(&stream_id).await;
        WorkflowOutcome::StartFailed { stream_id, last_state: self.run.stream_state.clone(), cleanup }
    }

    /// Runs the workflow with `create_body` as the live stream to create.
    ///
    /// # Errors
    ///
    /// Returns an error if the service becomes unreachable during the run. Unexpected
    /// statuses are reported through the [`WorkflowOutcome`] instead.
    pub async fn execute(&mut self, create_body: &Value) -> Result<WorkflowOutcome, WorkflowError> {
        self.run = WorkflowRun::default();
        let api = self.api;
        let secs = self.interval.as_secs();

        // Create
        if !self.enter(Stage::Creating, "We are going to create a new pre-configured Live Stream.") {
            return Ok(self.abandon(Stage::Creating));
        }
        let stream = match api.create(create_body).await {
            Ok(stream) => stream,
            Err(ApiError::UnexpectedStatus { status, body }) => {
                self.run.stage = Stage::AbortCreateFailed;
                warn!(status, "Live stream was not created");
                println!("An error occurred. Please check the error below! Returning to Main Menu...");
                return Ok(WorkflowOutcome::CreateFailed { status, body });
            },
            Err(e) => return Err(self.fail(e)),
        };

        let stream_id = stream.id;
        self.run.stream_id = Some(stream_id.clone());
        let Some(player_id) = stream.player_id else {
            self.run.stage = Stage::AbortCreateFailed;
            warn!(stream_id = %stream_id, "Live stream was created without a player id");
            println!(
                "The Live Stream was created without a Player. Going to delete the Live Stream and return to Main Menu!"
            );
            let cleanup = self.compensate(&stream_id).await;
            return Ok(WorkflowOutcome::MissingPlayer { stream_id, cleanup });
        };
        self.run.player_id = Some(player_id.clone());

        // Start
        if !self.enter(Stage::Starting, "Next we are going to start this Live Stream.") {
            return Ok(self.abandon(Stage::Starting));
        }
        match api.start(&stream_id).await {
            Ok(state) => self.run.stream_state = Some(state.state),
            Err(e) if e.is_transport() => return Err(self.fail(e)),
            Err(e) => return Ok(self.abort_start(stream_id, &e.to_string()).await),
        }

        // Wait for the stream
        let description = format!(
            "Now we are going to check the state of this Live Stream every {secs} seconds and wait until it is started."
        );
        if !self.enter(Stage::PollingStream, &description) {
            return Ok(self.abandon(Stage::PollingStream));
        }
        let polled =
            poll_until(|| api.state(&stream_id), |s: &StreamState| s.state == STARTING, self.interval)
                .await;
        match polled {
            Ok(polled) => {
                info!(stream_id = %stream_id, state = %polled.value, waits = polled.waits(), "Live stream polling finished");
                self.run.stream_state = Some(polled.value.state);
            },
            Err(e) if e.is_transport() => return Err(self.fail(e)),
            Err(e) => return Ok(self.abort_start(stream_id, &e.to_string()).await),
        }
        if self.run.stream_state.as_deref() != Some(STARTED) {
            return Ok(self.abort_start(stream_id, "unexpected state").await);
        }
        println!("Nice! Stream {STARTED}.");

        // Wait for the player
        let description = format!(
            "Now we are going to check the state of the player (that was created with the Live Stream) every {secs} seconds and wait until the provisioning is finished."
        );
        if !self.enter(Stage::PollingPlayer, &description) {
            return Ok(self.abandon(Stage::PollingPlayer));
        }
        let polled = poll_until(
            || api.player_state(&player_id),
            |p: &PlayerState| p.state == REQUESTED,
            self.interval,
        )
        .await;
        match polled {
            Ok(polled) => self.run.player_state = Some(polled.value.state),
            Err(e) if e.is_transport() => return Err(self.fail(e)),
            Err(e) => warn!(player_id = %player_id, error = %e, "Player state could not be read"),
        }

        let player_activated = self.run.player_state.as_deref() == Some(ACTIVATED);
        let mut hosted_page_url = None;
        if player_activated {
            if !self.enter(
                Stage::ShowingUrl,
                "Now we want to see the updated details of the started Live Stream to get the URL of the hosted page.",
            ) {
                return Ok(self.abandon(Stage::ShowingUrl));
            }
            match api.show(&stream_id).await {
                Ok(stream) => hosted_page_url = stream.hosted_page_url,
                Err(e) if e.is_transport() => return Err(self.fail(e)),
                Err(e) => warn!(stream_id = %stream_id, error = %e, "Live stream details could not be read"),
            }
            if let Some(url) = &hosted_page_url {
                println!(
                    "There it is! If you like to see a hosted page and a player with your Live Stream, feel free to open this URL in your browser:"
                );
                println!();
                println!("{url}");
                println!();
                println!(
                    "And by the way: Now would also be a good time to tweet it or announce it somewhere programmatically."
                );
            }
        } else {
            warn!(player_id = %player_id, state = ?self.run.player_state, "Player was not activated");
            println!();
            println!(
                "Unfortunately something went wrong provisioning the Player of your Live Stream. Let's continue with the next step."
            );
        }

        // Tear down
        if !self.enter(Stage::Stopping, "Ok, let's go ahead and stop the Live Stream again.") {
            return Ok(self.abandon(Stage::Stopping));
        }
        match api.stop(&stream_id).await {
            Ok(state) => self.run.stream_state = Some(state.state),
            Err(e) => warn!(stream_id = %stream_id, error = %e, "Stopping the live stream failed"),
        }

        if !self.enter(Stage::Deleting, "And finally we clean up a bit and delete the Live Stream.") {
            return Ok(self.abandon(Stage::Deleting));
        }
        if let Err(e) = api.delete(&stream_id).await {
            warn!(stream_id = %stream_id, error = %e, "Deleting the live stream failed");
        }

        self.run.stage = Stage::Done;
        println!();
        println!("Workflow finished!");
        info!(stream_id = %stream_id, player_activated, "Workflow finished");

        Ok(WorkflowOutcome::Completed { stream_id, player_activated, hosted_page_url })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::testing::{RecordingGate, ScriptedGateway};
    use reqwest::Method;
    use serde_json::json;

    fn created(id: &str, player_id: &str) -> Value {
        json!({ "live_stream": { "id": id, "name": "Cam", "player_id": player_id, "state": "stopped" } })
    }

    #[test]
    fn test_auto_advance_never_declines() {
        let mut gate = AutoAdvance;
        assert!(gate.advance(1, Stage::Creating));
        assert!(gate.advance(7, Stage::Deleting));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::PollingPlayer.to_string(), "waiting for the player");
        let err = WorkflowError::Api {
            stage: Stage::Starting,
            stream_id: Some("A".to_string()),
            source: ApiError::Transport("timed out".to_string()),
        };
        assert_eq!(err.to_string(), "Workflow failed while starting the live stream: Network error: timed out");
        assert_eq!(err.stream_id(), Some("A"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_declining_first_gate_makes_no_calls() {
        let gateway = ScriptedGateway::new();
        let api = LiveStreamApi::new(gateway.clone());
        let mut orchestrator =
            Orchestrator::new(&api, RecordingGate::decline_at(1), Duration::from_secs(10));

        let outcome = orchestrator.execute(&json!({})).await.unwrap();

        assert_eq!(outcome, WorkflowOutcome::Abandoned { stage: Stage::Creating, stream_id: None });
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stream_without_player_is_deleted_again() {
        let gateway = ScriptedGateway::new();
        gateway.reply(Method::POST, "live_streams", 201, json!({ "live_stream": { "id": "A", "name": "Cam" } }));
        gateway.reply_raw(Method::DELETE, "live_streams/A", 204, "");
        let api = LiveStreamApi::new(gateway.clone());
        let mut orchestrator = Orchestrator::new(&api, AutoAdvance, Duration::from_secs(10));

        let outcome = orchestrator.execute(&json!({})).await.unwrap();

        assert_eq!(
            outcome,
            WorkflowOutcome::MissingPlayer { stream_id: "A".to_string(), cleanup: Cleanup::Deleted }
        );
        assert_eq!(orchestrator.run().stage, Stage::AbortCreateFailed);
        assert_eq!(gateway.count(&Method::DELETE, "live_streams/A"), 1);
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_record_tracks_progress() {
        let gateway = ScriptedGateway::new();
        gateway.reply(Method::POST, "live_streams", 201, created("A", "P"));
        gateway.stream_states(Method::PUT, "live_streams/A/start", &["starting"]);
        gateway.stream_states(Method::GET, "live_streams/A/state", &["started"]);
        gateway.player_states("P", &["activated"]);
        gateway.reply(
            Method::GET,
            "live_streams/A",
            200,
            json!({ "live_stream": { "id": "A", "name": "Cam", "hosted_page_url": "https://player.example.com/A" } }),
        );
        gateway.stream_states(Method::PUT, "live_streams/A/stop", &["stopped"]);
        gateway.reply_raw(Method::DELETE, "live_streams/A", 204, "");

        let api = LiveStreamApi::new(gateway.clone());
        let mut orchestrator = Orchestrator::new(&api, RecordingGate::new(), Duration::from_secs(10));
        orchestrator.execute(&created("", "")).await.unwrap();

        let run = orchestrator.run();
        assert_eq!(run.stage, Stage::Done);
        assert_eq!(run.step, 7);
        assert_eq!(run.stream_id.as_deref(), Some("A"));
        assert_eq!(run.player_id.as_deref(), Some("P"));
        assert_eq!(run.stream_state.as_deref(), Some("stopped"));
        assert_eq!(run.player_state.as_deref(), Some("activated"));

        let steps: Vec<u32> = orchestrator.gate().seen.iter().map(|(step, _)| *step).collect();
        assert_eq!(steps, [1, 2, 3, 4, 5, 6, 7]);
    }
}
