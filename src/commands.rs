//! Command execution.

use crate::config::{load_definition, Config};
use crate::{Commands, Format};
use colored::Colorize;
use fsmkit_core::{
    CoreError, GraphDefinition, MachineRegistry, State, StateGraph, StateMachine, TracingProcessor,
};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// A `run` command that stopped part way through its events.
#[derive(Debug, Error)]
#[error("{trace}event '{event}' failed: {source} (current state: {current})")]
pub struct StepError {
    /// Steps that were applied, one per line. Includes the failing step when
    /// the transition went through but its hooks failed.
    trace: String,
    event: String,
    /// `label(id)` of the state the entity is in after the failure.
    current: String,
    #[source]
    source: CoreError,
}

/// Builds the registry: built-in workflows followed by configured definition files.
pub fn build_registry(config: &Config) -> Result<MachineRegistry, Box<dyn std::error::Error>> {
    let registry = fsmkit_workflows::registry(config.engine)?;

    for path in &config.definitions.paths {
        let graph = StateGraph::from_definition(load_definition(path)?)?;
        let name = graph.name().to_string();
        let machine = StateMachine::with_options(
            graph,
            Arc::new(TracingProcessor::new(name.clone())),
            config.engine,
        );
        registry.register(machine)?;
        tracing::debug!(machine = %name, path = %path.display(), "loaded definition");
    }

    Ok(registry)
}

/// Executes a command and returns the formatted output.
pub fn execute(
    registry: &MachineRegistry,
    cmd: Commands,
) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl { .. } => unreachable!(),
        Commands::Validate { file } => validate(&file),

        Commands::List => {
            let names = registry.names();
            if names.is_empty() {
                return Ok("No machines registered".dimmed().to_string());
            }

            let mut lines = Vec::with_capacity(names.len());
            for name in names {
                let machine = registry.get(&name)?;
                let graph = machine.graph();
                lines.push(format!(
                    "  {} ({} states, {} transitions)",
                    name.cyan(),
                    graph.state_count(),
                    graph.transition_count()
                ));
            }
            Ok(format!("{}\n{}", "Machines:".bold(), lines.join("\n")))
        }

        Commands::Describe { machine } => {
            let machine = registry.get(&machine)?;
            Ok(describe(&machine))
        }

        Commands::Export { machine, format } => {
            let machine = registry.get(&machine)?;
            export(&machine.graph().to_definition(), format)
        }

        Commands::Run {
            machine,
            from,
            events,
        } => {
            let machine = registry.get(&machine)?;
            let from = parse_state(&machine, &from)?;
            let (state, trace) = run_events(&machine, from, &events)?;
            Ok(format!(
                "{}{} {}",
                trace,
                "Final state:".bold(),
                machine.describe(state).yellow()
            ))
        }
    }
}

/// Loads a definition file and reports what it declares.
pub fn validate(file: &Path) -> Result<String, Box<dyn std::error::Error>> {
    let graph = StateGraph::from_definition(load_definition(file)?)?;
    Ok(format!(
        "{} machine {} ({} states, {} transitions, checksum: {})",
        "Valid".green(),
        graph.name().cyan(),
        graph.state_count(),
        graph.transition_count(),
        graph.checksum()
    ))
}

/// Renders a machine's graph for humans.
pub fn describe(machine: &StateMachine) -> String {
    let graph = machine.graph();
    let mut out = vec![
        format!("{}", format!("Machine {}", graph.name().cyan()).bold()),
        format!("  checksum: {}", graph.checksum()),
        format!("  start:    {}", graph.describe(graph.start()).yellow()),
    ];

    let end: Vec<String> = graph.end().iter().map(|s| graph.describe(*s)).collect();
    out.push(format!(
        "  terminal: {}",
        if end.is_empty() {
            "(none)".dimmed().to_string()
        } else {
            end.join(", ")
        }
    ));

    out.push(format!("{}", "States:".bold()));
    for (state, label) in graph.states() {
        let marker = if graph.is_end(state) { " *" } else { "" };
        out.push(format!("  {:>3}  {}{}", state, label, marker));
    }

    out.push(format!("{}", "Transitions:".bold()));
    for t in graph.transitions() {
        out.push(format!("  {}", step_line(machine, t.from, t.event.as_str(), t.to)));
    }

    out.join("\n")
}

/// Serializes a definition in the requested format.
pub fn export(
    definition: &GraphDefinition,
    format: Format,
) -> Result<String, Box<dyn std::error::Error>> {
    match format {
        Format::Json => Ok(definition.to_json()?),
        Format::Yaml => Ok(serde_yaml::to_string(definition)?),
    }
}

/// Parses a state given as a numeric id or a label.
///
/// Numeric ids are passed through even when undeclared so that the engine reports them.
pub fn parse_state(machine: &StateMachine, token: &str) -> Result<State, String> {
    if let Ok(id) = token.parse::<u8>() {
        return Ok(State(id));
    }
    machine
        .graph()
        .resolve(token)
        .ok_or_else(|| format!("no state labelled '{}' in machine '{}'", token, machine.name()))
}

/// Applies `events` in order, stopping at the first error.
///
/// A `HooksFailed` error still moves the entity to the applied state.
///
/// Returns the final state and one line per applied step.
pub fn run_events(
    machine: &StateMachine,
    from: State,
    events: &[String],
) -> Result<(State, String), StepError> {
    let mut state = from;
    let mut trace = String::new();

    for event in events {
        match machine.run(state, event) {
            Ok(next) => {
                trace.push_str(&step_line(machine, state, event, next));
                trace.push('\n');
                state = next;
            }
            Err(source) => {
                if let Some(next) = source.applied_state() {
                    trace.push_str(&step_line(machine, state, event, next));
                    trace.push('\n');
                    state = next;
                }
                return Err(StepError {
                    trace,
                    event: event.clone(),
                    current: machine.describe(state),
                    source,
                });
            }
        }
    }

    Ok((state, trace))
}

/// Formats `label(id) --event--> label(id)`.
pub fn step_line(machine: &StateMachine, from: State, event: &str, to: State) -> String {
    format!(
        "{} --{}--> {}",
        machine.describe(from),
        event.green(),
        machine.describe(to)
    )
}
