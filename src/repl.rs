//! Interactive REPL.

use crate::commands::{parse_state, step_line};
use colored::Colorize;
use fsmkit_core::{CoreError, State, StateMachine};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::sync::Arc;

const HELP_TEXT: &str = r#"
Available commands:
  help                  Show this help
  state                 Show the current state
  events                List events accepted from the current state

  fire <event>          Apply an event to the current state
  goto <state>          Jump to a state (id or label) without running hooks
  reset                 Return to the start state

  quit, exit            Exit the REPL
"#;

/// Current position of the entity driven from the REPL.
struct Session {
    machine: Arc<StateMachine>,
    state: State,
}

impl Session {
    fn new(machine: Arc<StateMachine>, from: Option<&str>) -> Result<Self, String> {
        let state = match from {
            Some(token) => parse_state(&machine, token)?,
            None => machine.graph().start(),
        };
        Ok(Self { machine, state })
    }

    fn prompt(&self) -> String {
        format!(
            "{} {}> ",
            self.machine.name().cyan(),
            self.machine.describe(self.state).yellow()
        )
    }

    /// Runs one command line. `Ok(None)` ends the session.
    fn execute(&mut self, line: &str) -> Result<Option<String>, Box<dyn std::error::Error>> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            return Ok(Some(String::new()));
        }

        let cmd = parts[0].to_lowercase();
        let args = &parts[1..];

        match cmd.as_str() {
            "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

            "quit" | "exit" | "q" => Ok(None),

            "state" | "s" => {
                let terminal = if self.machine.graph().is_end(self.state) {
                    " (terminal)".dimmed().to_string()
                } else {
                    String::new()
                };
                Ok(Some(format!(
                    "{}{}",
                    self.machine.describe(self.state).yellow(),
                    terminal
                )))
            }

            "events" | "e" => {
                let graph = self.machine.graph();
                let events = graph.events_from(self.state);
                if events.is_empty() {
                    return Ok(Some("No events".yellow().to_string()));
                }
                let mut output = String::new();
                for event in events {
                    if let Some(t) = graph.get_transition(self.state, event.as_str()) {
                        output.push_str(&format!(
                            "  {} -> {}\n",
                            event.as_str().cyan(),
                            graph.describe(t.to)
                        ));
                    }
                }
                Ok(Some(output))
            }

            "fire" | "f" => {
                if args.is_empty() {
                    return Ok(Some("Usage: fire <event>".to_string()));
                }
                let event = args[0];
                match self.machine.run(self.state, event) {
                    Ok(next) => {
                        let output = step_line(&self.machine, self.state, event, next);
                        self.state = next;
                        Ok(Some(output))
                    }
                    // Hooks failed but the transition was applied.
                    Err(e) => match e.applied_state() {
                        Some(next) => {
                            let mut output = format!(
                                "{}\n{}: {}",
                                step_line(&self.machine, self.state, event, next),
                                "Hook failure".red(),
                                e
                            );
                            if let CoreError::HooksFailed { failures, .. } = &e {
                                for failure in failures {
                                    output.push_str(&format!("\n  {}", failure));
                                }
                            }
                            self.state = next;
                            Ok(Some(output))
                        }
                        None => Err(e.into()),
                    },
                }
            }

            "goto" => {
                if args.is_empty() {
                    return Ok(Some("Usage: goto <state>".to_string()));
                }
                self.state = parse_state(&self.machine, args[0])?;
                Ok(Some(format!(
                    "{} {}",
                    "Moved to".green(),
                    self.machine.describe(self.state).yellow()
                )))
            }

            "reset" => {
                self.state = self.machine.graph().start();
                Ok(Some(format!(
                    "{} {}",
                    "Reset to".green(),
                    self.machine.describe(self.state).yellow()
                )))
            }

            _ => Ok(Some(format!(
                "Unknown command: {}. Type 'help' for available commands.",
                cmd
            ))),
        }
    }
}

pub fn run(
    machine: Arc<StateMachine>,
    from: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::new(machine, from)?;

    println!("{}", "fsmkit REPL".bold().cyan());

    // Create readline editor
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    // Load history
    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".fsmkit_history"))
        .unwrap_or_else(|_| ".fsmkit_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        match rl.readline(&session.prompt()) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match session.execute(line) {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    Ok(())
}
