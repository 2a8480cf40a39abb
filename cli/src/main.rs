//! CLI entrypoint for triad
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use triad_application::{OrchestrationManager, PlanExecutionStateManager, StatusSink};
use triad_domain::{AgentId, Thread};
use triad_infrastructure::{
    ConfigLoader, FileConfig, FileOutputFormat, InMemoryAgentRegistry, JsonlContextDump,
    ReplayChainExecutor, ReplayScript, ReplayToolExecutor, TracingStatusSink,
};
use triad_presentation::{Cli, ConsoleStatusSink, OutputFormat, OutputFormatter, ThreadFormatter};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref())
            .map_err(|e| anyhow!("Failed to load configuration: {}", e))?
    };
    config.validate().context("Invalid configuration")?;

    let log_file = cli.log_file.clone().or_else(|| config.logging.file.clone());
    let _guard = init_logging(cli.verbose, &config.logging.level, log_file.as_deref())?;

    info!("Starting triad");

    let output = cli.output.unwrap_or(match config.output.format {
        FileOutputFormat::Text => OutputFormat::Text,
        FileOutputFormat::Json => OutputFormat::Json,
    });
    let color = config.output.color && !cli.no_color;
    if !color {
        colored::control::set_override(false);
    }

    // === Dependency Injection ===
    let script = ReplayScript::from_file(&cli.script)?;
    let registry = build_registry(&config, &script)?;
    let chains = Arc::new(ReplayChainExecutor::new(&script));
    let state = Arc::new(PlanExecutionStateManager::new(config.orchestration_params()));

    // Spinner on an interactive terminal, status log lines elsewhere
    let console = if cli.quiet {
        Some(Arc::new(ConsoleStatusSink::hidden()))
    } else if config.output.show_progress
        && output != OutputFormat::Json
        && std::io::stderr().is_terminal()
    {
        Some(Arc::new(ConsoleStatusSink::new()))
    } else {
        None
    };
    let status: Arc<dyn StatusSink> = match &console {
        Some(console) => console.clone(),
        None => Arc::new(TracingStatusSink::new()),
    };

    let manager = OrchestrationManager::new(chains.clone(), Arc::new(registry), state.clone())
        .with_status_sink(status);

    let mut thread = Thread::default();
    let initiator = AgentId::new(cli.agent.as_str());
    let result = manager
        .orchestrate_thread(&mut thread, &cli.content, &initiator)
        .await;
    if let Some(console) = &console {
        console.finish();
    }

    let unused: Vec<String> = chains
        .remaining()
        .into_iter()
        .filter(|(_, left)| *left > 0)
        .map(|(chain, left)| format!("{} ({})", chain, left))
        .collect();
    if !unused.is_empty() {
        warn!(chains = %unused.join(", "), "Replay script has unused outputs");
    }

    if let Some(path) = &cli.dump_contexts {
        match JsonlContextDump::new(path) {
            Some(dump) => {
                let written = dump.dump(&state);
                info!(path = %dump.path().display(), written, "Dumped plan contexts");
            }
            None => warn!(path = %path.display(), "Plan contexts were not dumped"),
        }
    }
    for plan_id in state.active_plans() {
        state.dispose(&plan_id);
    }

    let formatter = ThreadFormatter::new(color);
    let rendered = match output {
        OutputFormat::Text => formatter.format(&thread),
        OutputFormat::Answer => formatter.format_answer(&thread),
        OutputFormat::Json => formatter.format_json(&thread),
    };
    println!("{}", rendered);

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!("Orchestration failed: {}", e);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Console logging on stderr, plus a plain-text file layer when `log_file` is set.
fn init_logging(verbose: u8, default_level: &str, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow!("Log file path has no file name: {}", path.display()))?;
            std::fs::create_dir_all(directory)
                .with_context(|| format!("Failed to create log directory {}", directory.display()))?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    Ok(guard)
}

/// Agents from config, tools from the replay script.
fn build_registry(config: &FileConfig, script: &ReplayScript) -> Result<InMemoryAgentRegistry> {
    let mut registry = InMemoryAgentRegistry::from_config(config)?;
    for tool in ReplayToolExecutor::from_script(script) {
        registry = registry.register_tool(tool);
    }
    if registry.agent_ids().is_empty() {
        warn!("No agents configured; add [[agents]] to triad.toml");
    }
    info!(
        agents = registry.agent_ids().len(),
        tools = %registry.tool_ids().join(", "),
        "Registry ready"
    );
    Ok(registry)
}
