// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `pim` binary: parse a request, run it through the router, print the
//! response.

use clap::Parser;
use pim::context::{Session, StderrNotifier};
use pim::request::ActionRequest;
use pim::router::execute_crew_action;
use pim_core::Notifier;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pim", about = "pi-messenger crew orchestrator", version)]
struct Cli {
    /// Action to execute, e.g. `join`, `plan`, `work`, `task.start`
    action: String,

    /// Full request as JSON; fields merge over the action argument
    #[arg(long)]
    json: Option<String>,

    /// Project directory (defaults to the current directory)
    #[arg(long)]
    dir: Option<std::path::PathBuf>,

    /// Agent name for join/rename
    #[arg(long)]
    name: Option<String>,

    /// Inline prompt (plan, revise, swarm)
    #[arg(long)]
    prompt: Option<String>,

    /// Run waves autonomously until done or blocked
    #[arg(long)]
    autonomous: bool,

    /// Worker count for this wave
    #[arg(long)]
    concurrency: Option<f64>,

    /// Print the structured details object instead of the text
    #[arg(long)]
    details: bool,
}

fn build_request(cli: &Cli) -> Result<ActionRequest, serde_json::Error> {
    let mut request: ActionRequest = match &cli.json {
        Some(json) => serde_json::from_str(json)?,
        None => ActionRequest::default(),
    };
    if request.action.is_empty() {
        request.action = cli.action.clone();
    }
    request.name = request.name.take().or_else(|| cli.name.clone());
    request.prompt = request.prompt.take().or_else(|| cli.prompt.clone());
    if cli.autonomous {
        request.autonomous = Some(true);
    }
    request.concurrency = request.concurrency.take().or(cli.concurrency);
    Ok(request)
}

/// Keeps the non-blocking writer alive for the process lifetime.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    if let Ok(log_dir) = std::env::var("PI_MESSENGER_LOG_DIR") {
        if !log_dir.is_empty() {
            let appender = tracing_appender::rolling::daily(log_dir, "pim.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(writer)
                .with_ansi(false)
                .init();
            return Some(guard);
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    None
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    let _log_guard = init_tracing();

    let cli = Cli::parse();
    let request = match build_request(&cli) {
        Ok(request) => request,
        Err(error) => {
            eprintln!("bad request json: {error}");
            return std::process::ExitCode::FAILURE;
        }
    };

    let project = cli
        .dir
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| std::path::PathBuf::from("."));
    let mut session = Session::open(&project);

    // Detect a planning run left behind by a dead process; the coordinator
    // notifies the UI collaborator when it clears one.
    let _ = session.engine.coordinator.restore_planning_state(session.engine.store.paths());

    // Pre-registered identity from the environment (crew workers join with
    // the name the orchestrator gave them).
    if let Ok(name) = std::env::var("PI_AGENT_NAME") {
        if !name.is_empty() && session.engine.registry.load(&name).is_some() {
            session.registered = Some(name.clone());
            session.engine.agent_name = name;
        }
    }

    // Auto-register when the project matches a configured pattern.
    if session.registered.is_none() && session.messenger.auto_register {
        let here = session.engine.store.paths().root().to_string_lossy().into_owned();
        let matches = session
            .messenger
            .auto_register_paths
            .iter()
            .any(|pattern| pim_core::auto_register_matches(&here, pattern));
        if matches {
            let join: ActionRequest =
                serde_json::from_value(serde_json::json!({"action": "join"}))
                    .unwrap_or_default();
            let joined = execute_crew_action(&join, &mut session).await;
            if joined.is_error() {
                StderrNotifier.notify(
                    pim_core::Severity::Warning,
                    &format!("auto-register failed: {}", joined.text),
                );
            }
        }
    }

    // Watch our inbox for the life of this invocation, steering deliveries
    // to the notifier. check_mail drains directly, so it gets no watcher to
    // race against.
    let _inbox_watcher = match &session.registered {
        Some(name) if request.action != "check_mail" => {
            let dir = session.engine.registry.base().inbox_dir(name);
            let (tx, mut rx) = tokio::sync::mpsc::channel::<pim_core::InboxMessage>(16);
            tokio::spawn(async move {
                while let Some(message) = rx.recv().await {
                    StderrNotifier.notify(
                        pim_core::Severity::Info,
                        &format!("message from {}: {}", message.from, message.text),
                    );
                }
            });
            Some(pim_mesh::InboxWatcher::spawn(dir, tx))
        }
        _ => None,
    };

    let response = execute_crew_action(&request, &mut session).await;
    if cli.details {
        match serde_json::to_string_pretty(&response) {
            Ok(json) => println!("{json}"),
            Err(error) => eprintln!("serialize failed: {error}"),
        }
    } else {
        println!("{}", response.text);
    }
    if response.is_error() {
        std::process::ExitCode::FAILURE
    } else {
        std::process::ExitCode::SUCCESS
    }
}
