// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::{debug, warn};

use crate::commands::{report_error, App, MenuCommand};
use crate::gateway::ApiGateway;
use crate::workflow::{Stage, StepGate, WorkflowOutcome};

const NEXT_STEP_PROMPT: &str = "Are you ready? Hit Enter to continue with the next step! (q to abort) ";
const SEPARATOR: &str = "-----------------------------";

/// Outcome of a prompt.
enum Answer {
    Line(String),
    /// Ctrl-C: back out of the current menu.
    Cancel,
    /// Ctrl-D or a terminal error: leave the shell.
    Exit,
}

fn read(editor: &mut DefaultEditor, prompt: &str) -> Answer {
    match editor.readline(prompt) {
        Ok(line) => Answer::Line(line.trim().to_string()),
        Err(ReadlineError::Interrupted) => {
            println!("^C");
            Answer::Cancel
        },
        Err(ReadlineError::Eof) => Answer::Exit,
        Err(err) => {
            eprintln!("Error: {err:?}");
            Answer::Exit
        },
    }
}

/// Asks before every workflow step. Enter continues; `q`, Ctrl-C or Ctrl-D abandons the run.
pub struct PromptGate<'e> {
    editor: &'e mut DefaultEditor,
}

impl<'e> PromptGate<'e> {
    pub fn new(editor: &'e mut DefaultEditor) -> Self {
        Self { editor }
    }
}

impl StepGate for PromptGate<'_> {
    fn advance(&mut self, step: u32, stage: Stage) -> bool {
        match read(self.editor, NEXT_STEP_PROMPT) {
            Answer::Line(line) => {
                let abort = matches!(line.to_ascii_lowercase().as_str(), "q" | "quit" | "abort");
                debug!(step, %stage, abort, "Step confirmation");
                !abort
            },
            Answer::Cancel | Answer::Exit => false,
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Numbered menu driven interface.
pub struct Shell<G> {
    app: App<G>,
    editor: DefaultEditor,
}

impl<G: ApiGateway> Shell<G> {
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be initialized.
    pub fn new(app: App<G>) -> Result<Self> {
        Ok(Self { app, editor: DefaultEditor::new()? })
    }

    fn intro() {
        println!();
        println!("{}", "-".repeat(100));
        println!();
        println!("        Live Stream API - An example application for the Live Stream workflow");
        println!();
        println!("{}", "-".repeat(100));
        println!();
    }

    /// Shows `options` numbered from 1 plus a trailing "Back to Main Menu" entry and returns
    /// the chosen index. `None` means back (or exit).
    fn choose(&mut self, prompt: &str, options: &[String]) -> Option<usize> {
        loop {
            println!();
            println!("Submenu");
            println!();
            for (i, option) in options.iter().enumerate() {
                println!("{}. {option}", i + 1);
            }
            println!("{}. Back to Main Menu", options.len() + 1);

            let line = match read(&mut self.editor, &format!("\n{prompt}\n> ")) {
                Answer::Line(line) => line,
                Answer::Cancel | Answer::Exit => return None,
            };
            match line.parse::<usize>() {
                Ok(n) if (1..=options.len()).contains(&n) => return Some(n - 1),
                Ok(n) if n == options.len() + 1 => return None,
                _ => eprintln!("Please enter a number between 1 and {}.", options.len() + 1),
            }
        }
    }

    /// Runs the menu until the user quits.
    ///
    /// # Errors
    ///
    /// Returns an error only for terminal failures; failed operations are reported and the
    /// menu is shown again.
    pub async fn run(&mut self) -> Result<()> {
        Self::intro();

        loop {
            println!();
            println!("Main Menu");
            println!();
            for (i, command) in MenuCommand::ALL.iter().enumerate() {
                println!("{}. {}", i + 1, command.description());
            }

            let line = match read(
                &mut self.editor,
                "\nEnter the number for the action you want to execute.\n> ",
            ) {
                Answer::Line(line) if line.is_empty() => continue,
                Answer::Line(line) => line,
                Answer::Cancel => continue,
                Answer::Exit => break,
            };
            let _ = self.editor.add_history_entry(line.as_str());

            let Some(command) = MenuCommand::from_choice(&line) else {
                eprintln!("Unknown option: {line}. Enter a number from the menu.");
                continue;
            };

            let position = MenuCommand::ALL.iter().position(|c| *c == command).unwrap_or(0) + 1;
            println!();
            println!("{SEPARATOR}");
            println!("Processing Option {position}: {}", command.description());
            println!("{SEPARATOR}");
            println!();

            match self.handle(command).await {
                Ok(Flow::Continue) => {},
                Ok(Flow::Quit) => break,
                Err(e) => report_error(&e),
            }
            println!();
            println!("{SEPARATOR}");
        }

        println!("Goodbye!");
        Ok(())
    }

    async fn handle(&mut self, command: MenuCommand) -> Result<Flow> {
        match command {
            MenuCommand::Quit => return Ok(Flow::Quit),
            MenuCommand::Count => {
                self.app.count().await?;
            },
            MenuCommand::List => {
                let options =
                    ["Simple (just id and name)".to_string(), "Detailed (full JSON response)".to_string()];
                if let Some(choice) = self.choose("Simple or detailed? Please enter a number!", &options) {
                    self.app.list(choice == 0).await?;
                }
            },
            MenuCommand::Create => {
                let presets = self.app.presets().await?;
                let names: Vec<String> = presets.iter().map(|p| p.name.clone()).collect();
                if let Some(choice) = self.choose(
                    "What pre-configured camera or encoder will you use to connect? Please enter a number!",
                    &names,
                ) {
                    self.app.create(&presets[choice].body).await?;
                }
            },
            MenuCommand::Workflow => self.workflow().await?,
            stream_command => {
                let streams = self.app.api().list().await?;
                let labels: Vec<String> =
                    streams.iter().map(|s| format!("{} ({})", s.name, s.id)).collect();
                if let Some(choice) =
                    self.choose("Which Live Stream do you want to call? Please enter a number!", &labels)
                {
                    let id = streams.0[choice].id.clone();
                    self.app.run_on_stream(stream_command, &id).await?;
                }
            },
        }
        Ok(Flow::Continue)
    }

    async fn workflow(&mut self) -> Result<()> {
        let gate = PromptGate::new(&mut self.editor);
        let outcome = self.app.workflow(gate, None).await?;

        match outcome {
            WorkflowOutcome::Completed { .. } => {
                println!();
                let _ = read(&mut self.editor, "Thank you! Hit Enter to return to Main Menu!");
            },
            WorkflowOutcome::Abandoned { stage, stream_id } => {
                warn!(%stage, stream_id = ?stream_id, "Workflow abandoned by user");
            },
            WorkflowOutcome::CreateFailed { .. }
            | WorkflowOutcome::StartFailed { .. }
            | WorkflowOutcome::MissingPlayer { .. } => {},
        }
        Ok(())
    }
}
