// Interactive console client for the cobot proxy
// Run with: cargo run -p example
// Make sure the simulator is running: cargo run -p sim

use std::error::Error;

use cobot_console::debug::{InspectionPointSet, Toggle};
use cobot_console::dispatcher::TelemetryEvent;
use cobot_console::drivers::{ConnectionConfig, ConnectionEvent};
use cobot_console::lifecycle::CommandEvent;
use cobot_console::{Console, WatchVariable};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
enum Input {
    Submit(String),
    Break(u32),
    Watch { line: u32, variable: WatchVariable },
    Global { name: String, on: bool },
    Debug(String),
    Undo(u32),
    Stop,
    History,
    Reconnect,
    Help,
    Quit,
    Invalid(String),
}

fn parse(line: &str) -> Input {
    let Some(rest) = line.trim_start().strip_prefix(':') else {
        return Input::Submit(line.to_string());
    };
    let mut words = rest.split_whitespace();
    let Some(keyword) = words.next() else {
        return Input::Help;
    };
    let args: Vec<&str> = words.collect();

    match (keyword, args.as_slice()) {
        ("break", [line]) => line.parse().map(Input::Break).unwrap_or_else(|_| invalid(rest)),
        ("watch", [line, name, expression @ ..]) if !expression.is_empty() => match line.parse() {
            Ok(line) => Input::Watch {
                line,
                variable: WatchVariable::new(*name, expression.join(" ")),
            },
            Err(_) => invalid(rest),
        },
        ("show", [name]) => Input::Global { name: name.to_string(), on: true },
        ("hide", [name]) => Input::Global { name: name.to_string(), on: false },
        ("debug", [path]) => Input::Debug(path.to_string()),
        ("undo", [id]) => id.parse().map(Input::Undo).unwrap_or_else(|_| invalid(rest)),
        ("stop", []) => Input::Stop,
        ("history", []) => Input::History,
        ("reconnect", []) => Input::Reconnect,
        ("help", []) => Input::Help,
        ("quit", []) | ("q", []) => Input::Quit,
        _ => invalid(rest),
    }
}

fn invalid(rest: &str) -> Input {
    Input::Invalid(format!(":{}", rest))
}

fn print_help() {
    println!("Anything not starting with ':' is sent to the robot as a command.");
    println!("  :break <line>                 toggle a breakpoint");
    println!("  :watch <line> <name> <expr>   read <expr> as <name> at the breakpoint on <line>");
    println!("  :show <name> / :hide <name>   select or deselect a global variable");
    println!("  :debug <file>                 run a script with the current breakpoints");
    println!("  :undo <id>                    rewind to command <id>");
    println!("  :stop                         stop the running program");
    println!("  :history                      list commands and their states");
    println!("  :reconnect                    skip the reconnect delay");
    println!("  :quit");
}

fn spawn_printers(
    mut commands: tokio::sync::broadcast::Receiver<CommandEvent>,
    mut telemetry: tokio::sync::broadcast::Receiver<TelemetryEvent>,
    mut connection: tokio::sync::broadcast::Receiver<ConnectionEvent>,
) {
    tokio::spawn(async move {
        while let Ok(event) = commands.recv().await {
            match event {
                CommandEvent::Entered(command) => println!("[{}] > {}", command.id(), command.text()),
                CommandEvent::Transition(t) => println!("[{}] {} -> {}", t.id, t.from, t.to),
                CommandEvent::Feedback { id, message } => println!("[{}] {}", id, message),
                CommandEvent::Inconsistency(e) => println!("! {}", e),
            }
        }
    });

    tokio::spawn(async move {
        let mut halted = false;
        while let Ok(event) = telemetry.recv().await {
            match event {
                TelemetryEvent::ReportState(report) => {
                    println!("inspection point {} @ {}", report.id, report.timestamp);
                    for variable in &report.variables {
                        println!("    {:<14} = {}", variable.name, variable.value);
                    }
                }
                TelemetryEvent::UndoFailed { id } => println!("! undo to [{}] failed", id),
                TelemetryEvent::RobotState(state) => {
                    let stopped = state.safety_status.is_stopped();
                    if stopped != halted {
                        halted = stopped;
                        if stopped {
                            println!("! robot halted: {:?}", state.safety_status);
                        } else {
                            println!("robot released ({:?})", state.safety_status);
                        }
                    }
                }
            }
        }
    });

    tokio::spawn(async move {
        while let Ok(event) = connection.recv().await {
            match event {
                ConnectionEvent::Connected => println!("connected"),
                ConnectionEvent::Disconnected => println!("disconnected"),
                ConnectionEvent::ReconnectScheduled { delay_ms } => {
                    println!("reconnecting in {} ms", delay_ms)
                }
                ConnectionEvent::Connecting => {}
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ConnectionConfig::from_env()?;
    println!("=== Cobot Console ({}) ===", config.url());
    println!("Type :help for commands.\n");

    let console = Console::connect(config)?;
    spawn_printers(
        console.subscribe_commands().await,
        console.subscribe_telemetry().await,
        console.subscribe_connection(),
    );

    let mut points = InspectionPointSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse(&line) {
            Input::Submit(text) => {
                console.submit(&text).await;
            }
            Input::Break(line) => match points.toggle(line) {
                Toggle::Added(_) => println!("breakpoint on line {}", line),
                Toggle::Removed(_) => println!("breakpoint on line {} removed", line),
            },
            Input::Watch { line, variable } => {
                let decoration = match points.decoration_at(line) {
                    Some(decoration) => decoration,
                    None => match points.toggle(line) {
                        Toggle::Added(decoration) => decoration,
                        Toggle::Removed(_) => continue,
                    },
                };
                points.add_variable(decoration, variable);
            }
            Input::Global { name, on } => {
                let known = if on {
                    points.select_global(&name)
                } else {
                    points.deselect_global(&name)
                };
                if !known {
                    println!("unknown global variable {}", name);
                }
            }
            Input::Debug(path) => {
                let script = match tokio::fs::read_to_string(&path).await {
                    Ok(source) => source.lines().map(str::to_string).collect(),
                    Err(e) => {
                        println!("cannot read {}: {}", path, e);
                        continue;
                    }
                };
                if let Err(e) = console.debug(&points, script) {
                    println!("! {}", e);
                }
            }
            Input::Undo(id) => match console.undo(id).await {
                Ok(true) => {}
                Ok(false) => println!("not connected, undo dropped"),
                Err(e) => println!("! {}", e),
            },
            Input::Stop => {
                if !console.stop() {
                    warn!("not connected, stop dropped");
                }
            }
            Input::History => {
                for command in console.history().await {
                    println!("[{}] {:<9} {}", command.id(), command.state().to_string(), command.text());
                    if let Some(response) = command.response() {
                        println!("      {}", response);
                    }
                }
            }
            Input::Reconnect => console.reconnect(),
            Input::Help => print_help(),
            Input::Quit => break,
            Input::Invalid(input) => println!("unrecognized: {} (try :help)", input),
        }
    }

    console.shutdown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_commands() {
        assert_eq!(parse("movej(q)"), Input::Submit("movej(q)".to_string()));
    }

    #[test]
    fn colon_commands() {
        assert_eq!(parse(":break 4"), Input::Break(4));
        assert_eq!(parse(":undo 2"), Input::Undo(2));
        assert_eq!(parse(" :quit"), Input::Quit);
        assert_eq!(
            parse(":watch 3 pose get_actual_tcp_pose()"),
            Input::Watch {
                line: 3,
                variable: WatchVariable::new("pose", "get_actual_tcp_pose()"),
            }
        );
        assert_eq!(parse(":hide force"), Input::Global { name: "force".to_string(), on: false });
    }

    #[test]
    fn malformed_commands_are_reported() {
        assert_eq!(parse(":break x"), Input::Invalid(":break x".to_string()));
        assert_eq!(parse(":watch 3 name"), Input::Invalid(":watch 3 name".to_string()));
    }
}
