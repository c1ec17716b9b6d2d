// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use anyhow::{bail, Context, Result};
use cloudlive_api::{LiveStream, LiveStreamList};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tokio::time::Duration;
use tracing::debug;

use crate::config::Config;
use crate::error::ApiError;
use crate::gateway::ApiGateway;
use crate::operations::LiveStreamApi;
use crate::presets::{self, Preset};
use crate::workflow::{Cleanup, Orchestrator, StepGate, WorkflowOutcome};

/// Entries of the main menu, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Count,
    List,
    Create,
    Show,
    Update,
    Start,
    Reset,
    Stop,
    State,
    Thumbnail,
    PlayerState,
    Delete,
    Workflow,
    Quit,
}

impl MenuCommand {
    pub const ALL: [Self; 14] = [
        Self::Count,
        Self::List,
        Self::Create,
        Self::Show,
        Self::Update,
        Self::Start,
        Self::Reset,
        Self::Stop,
        Self::State,
        Self::Thumbnail,
        Self::PlayerState,
        Self::Delete,
        Self::Workflow,
        Self::Quit,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::List => "list",
            Self::Create => "create",
            Self::Show => "show",
            Self::Update => "update",
            Self::Start => "start",
            Self::Reset => "reset",
            Self::Stop => "stop",
            Self::State => "state",
            Self::Thumbnail => "thumbnail_url",
            Self::PlayerState => "player_state",
            Self::Delete => "delete",
            Self::Workflow => "workflow",
            Self::Quit => "quit",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Count => "Show the number of live streams in your account",
            Self::List => "List all live streams of your account",
            Self::Create => {
                "Create a live stream with pre-configured settings         => data/live_stream/encoder_types/*"
            },
            Self::Show => "Show the details of an existing live stream",
            Self::Update => {
                "Update a live stream with pre-configured settings         => data/live_stream/update_example.json"
            },
            Self::Start => {
                "Start a live stream                                       => only for Live Streams with the state 'stopped'"
            },
            Self::Reset => {
                "Reset a live stream                                       => only for Live Streams with the state 'started'"
            },
            Self::Stop => {
                "Stop a live stream                                        => only for Live Streams with the state 'started'"
            },
            Self::State => "Show the current state of a live stream",
            Self::Thumbnail => {
                "Show the thumbnail URL of a live stream                  => only for Live Streams with the state 'started'"
            },
            Self::PlayerState => "Show the provisioning state of the player of a live stream",
            Self::Delete => "Delete a live stream",
            Self::Workflow => "Run the pre-configured live stream workflow",
            Self::Quit => "Quit :(",
        }
    }

    /// True for the commands that act on one existing live stream.
    pub const fn needs_stream(self) -> bool {
        matches!(
            self,
            Self::Show
                | Self::Update
                | Self::Start
                | Self::Reset
                | Self::Stop
                | Self::State
                | Self::Thumbnail
                | Self::PlayerState
                | Self::Delete
        )
    }

    /// Resolves a menu answer: a 1-based position or a command name.
    pub fn from_choice(input: &str) -> Option<Self> {
        let input = input.trim();
        if let Ok(index) = input.parse::<usize>() {
            return index.checked_sub(1).and_then(|i| Self::ALL.get(i)).copied();
        }
        Self::ALL.iter().copied().find(|c| c.name().eq_ignore_ascii_case(input))
    }
}

/// Prints a document the way every operation echoes its response.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("Failed to format response: {e}"),
    }
}

/// Prints an error with its cause chain. When the service answered with an unexpected
/// status, its error document is printed as well.
pub fn report_error(err: &anyhow::Error) {
    eprintln!("❌ {err}");
    for cause in err.chain().skip(1) {
        eprintln!("  Caused by: {cause}");
    }
    if let Some(ApiError::UnexpectedStatus { body, .. }) =
        err.chain().find_map(|e| e.downcast_ref::<ApiError>())
    {
        if !body.is_null() {
            print_json(body);
        }
    }
}

/// Operations wired to user-facing output, shared by the menu and the subcommands.
pub struct App<G> {
    api: LiveStreamApi<G>,
    data_dir: PathBuf,
    preset: String,
    poll_interval: Duration,
}

impl<G: ApiGateway> App<G> {
    pub fn new(gateway: G, config: &Config) -> Self {
        Self {
            api: LiveStreamApi::new(gateway),
            data_dir: PathBuf::from(&config.data.dir),
            preset: config.workflow.preset.clone(),
            poll_interval: config.workflow.poll_interval(),
        }
    }

    pub const fn api(&self) -> &LiveStreamApi<G> {
        &self.api
    }

    /// # Errors
    ///
    /// Returns an error if the live streams cannot be listed.
    pub async fn count(&self) -> Result<usize> {
        let count = self.api.count().await?;
        println!("Found {count} Live Streams total.");
        Ok(count)
    }

    /// Lists the live streams, either as `id: name` lines or as the full documents.
    ///
    /// # Errors
    ///
    /// Returns an error if the live streams cannot be listed.
    pub async fn list(&self, simple: bool) -> Result<LiveStreamList> {
        let streams = self.api.list().await?;
        if simple {
            for stream in streams.iter() {
                println!("{}: {}", stream.id, stream.name);
            }
        } else {
            print_json(&streams);
        }
        Ok(streams)
    }

    /// # Errors
    ///
    /// Returns an error if the encoder types directory cannot be read.
    pub async fn presets(&self) -> Result<Vec<Preset>> {
        Ok(presets::list_presets(&self.data_dir).await?)
    }

    /// # Errors
    ///
    /// Returns an error if the service rejects the body.
    pub async fn create(&self, body: &Value) -> Result<LiveStream> {
        let stream = self.api.create(body).await?;
        print_json(&stream);
        Ok(stream)
    }

    /// Creates a live stream from the preset with file stem `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the preset cannot be loaded or the service rejects it.
    pub async fn create_preset(&self, name: &str) -> Result<LiveStream> {
        let preset = presets::load_preset(&self.data_dir, name).await?;
        debug!(preset = %preset.stem, "Creating live stream from preset");
        self.create(&preset.body).await
    }

    /// Runs a per-stream command against live stream `id` and prints the response.
    ///
    /// # Errors
    ///
    /// Returns an error if the operation fails or `command` does not act on a stream.
    pub async fn run_on_stream(&self, command: MenuCommand, id: &str) -> Result<()> {
        match command {
            MenuCommand::Show => print_json(&self.api.show(id).await?),
            MenuCommand::Update => self.update(id, None).await?,
            MenuCommand::Start => print_json(&self.api.start(id).await?),
            MenuCommand::Reset => print_json(&self.api.reset(id).await?),
            MenuCommand::Stop => print_json(&self.api.stop(id).await?),
            MenuCommand::State => print_json(&self.api.state(id).await?),
            MenuCommand::Thumbnail => print_json(&self.api.thumbnail_url(id).await?),
            MenuCommand::PlayerState => {
                let stream = self.api.show(id).await?;
                let player_id = stream
                    .player_id
                    .with_context(|| format!("Live stream {id} has no player"))?;
                print_json(&self.api.player_state(&player_id).await?);
            },
            MenuCommand::Delete => {
                self.api.delete(id).await?;
                println!("✅ Live stream {id} deleted");
            },
            other => bail!("'{}' does not act on a single live stream", other.name()),
        }
        Ok(())
    }

    /// Applies `body_path` (or the update example) to live stream `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the body cannot be loaded or the service rejects it.
    pub async fn update(&self, id: &str, body_path: Option<PathBuf>) -> Result<()> {
        let body = match body_path {
            Some(path) => presets::load_document(&path).await?,
            None => presets::load_update_body(&self.data_dir).await?,
        };
        print_json(&self.api.update(id, &body).await?);
        Ok(())
    }

    /// Runs the guided workflow with the configured preset, or `preset` when given.
    ///
    /// # Errors
    ///
    /// Returns an error if the preset cannot be loaded or the run is aborted by a transport
    /// failure.
    pub async fn workflow<S: StepGate>(
        &self,
        gate: S,
        preset: Option<&str>,
    ) -> Result<WorkflowOutcome> {
        let preset = presets::load_preset(&self.data_dir, preset.unwrap_or(&self.preset)).await?;
        let mut orchestrator = Orchestrator::new(&self.api, gate, self.poll_interval);
        let outcome = orchestrator.execute(&preset.body).await.map_err(|e| {
            let stream_id = e.stream_id().map(str::to_string);
            let err = anyhow::Error::new(e);
            match stream_id {
                Some(id) => err.context(format!("Live stream {id} may need to be deleted manually")),
                None => err,
            }
        })?;

        match &outcome {
            WorkflowOutcome::CreateFailed { status, body } => {
                eprintln!("❌ Creating the live stream failed with status {status}");
                if !body.is_null() {
                    print_json(body);
                }
            },
            WorkflowOutcome::StartFailed { stream_id, cleanup: Cleanup::Failed(reason), .. }
            | WorkflowOutcome::MissingPlayer { stream_id, cleanup: Cleanup::Failed(reason) } => {
                eprintln!("❌ Live stream {stream_id} could not be deleted: {reason}");
            },
            WorkflowOutcome::StartFailed { stream_id, cleanup: Cleanup::Deleted, .. }
            | WorkflowOutcome::MissingPlayer { stream_id, cleanup: Cleanup::Deleted } => {
                println!("Live stream {stream_id} was deleted.");
            },
            WorkflowOutcome::Completed { .. } | WorkflowOutcome::Abandoned { .. } => {},
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::testing::ScriptedGateway;
    use reqwest::Method;
    use serde_json::json;

    #[test]
    fn test_from_choice_accepts_numbers_and_names() {
        assert_eq!(MenuCommand::from_choice("1"), Some(MenuCommand::Count));
        assert_eq!(MenuCommand::from_choice(" 14 "), Some(MenuCommand::Quit));
        assert_eq!(MenuCommand::from_choice("thumbnail_url"), Some(MenuCommand::Thumbnail));
        assert_eq!(MenuCommand::from_choice("Workflow"), Some(MenuCommand::Workflow));
        assert_eq!(MenuCommand::from_choice("0"), None);
        assert_eq!(MenuCommand::from_choice("15"), None);
        assert_eq!(MenuCommand::from_choice("launch"), None);
    }

    #[test]
    fn test_menu_table_is_consistent() {
        for (i, command) in MenuCommand::ALL.iter().enumerate() {
            assert_eq!(MenuCommand::from_choice(&(i + 1).to_string()), Some(*command));
            assert_eq!(MenuCommand::from_choice(command.name()), Some(*command));
            assert!(!command.description().is_empty());
        }
        let per_stream = MenuCommand::ALL.iter().filter(|c| c.needs_stream()).count();
        assert_eq!(per_stream, 9);
        assert!(!MenuCommand::Create.needs_stream());
    }

    #[tokio::test]
    async fn test_player_state_goes_through_stream_player_id() {
        let gateway = ScriptedGateway::new();
        gateway.reply(
            Method::GET,
            "live_streams/A",
            200,
            json!({ "live_stream": { "id": "A", "name": "Cam", "player_id": "P" } }),
        );
        gateway.player_states("P", &["activated"]);

        let app = App::new(gateway.clone(), &Config::default());
        app.run_on_stream(MenuCommand::PlayerState, "A").await.unwrap();

        assert_eq!(gateway.call_log(), ["GET live_streams/A", "GET players/P/state"]);
    }

    #[tokio::test]
    async fn test_non_stream_command_is_rejected() {
        let app = App::new(ScriptedGateway::new(), &Config::default());
        assert!(app.run_on_stream(MenuCommand::Count, "A").await.is_err());
    }

    #[tokio::test]
    async fn test_unexpected_status_survives_anyhow_wrapping() {
        let gateway = ScriptedGateway::new();
        gateway.reply(Method::PUT, "live_streams/A/start", 422, json!({ "meta": { "code": "ERR-422" } }));

        let app = App::new(gateway, &Config::default());
        let err = app.run_on_stream(MenuCommand::Start, "A").await.unwrap_err();

        let api_err = err.chain().find_map(|e| e.downcast_ref::<ApiError>()).unwrap();
        assert_eq!(api_err.status(), Some(422));
        report_error(&err);
    }
}
