//! Webpilot CLI entry point.
//!
//! # Commands
//!
//! - `webpilot run [-t TASK] [--headless] [--logs]`: one task, or a REPL when no task is given
//! - `webpilot init`: write the default configuration
//! - `webpilot status`: show configuration and provider status

mod helpers;
mod init;
mod repl;
mod status;

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;

use webpilot_agent::{AgentLoop, Environment, EnvironmentHandle, LoopSettings, ToolRegistry};
use webpilot_browser::{BrowserTools, ChromeEnvironment};
use webpilot_core::config::{load_config, Config};
use webpilot_providers::create_provider;

// ─────────────────────────────────────────────
// CLI definition
// ─────────────────────────────────────────────

/// Webpilot: an LLM that drives a web browser to finish your tasks
#[derive(Parser)]
#[command(name = "webpilot", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task (single-shot) or start the interactive REPL
    Run {
        /// Task to run. Omit for REPL mode.
        #[arg(short, long)]
        task: Option<String>,

        /// Run Chromium without a window
        #[arg(long, default_value_t = false)]
        headless: bool,

        /// Enable debug logging
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Write the default configuration
    Init,

    /// Show configuration and provider status
    Status,
}

// ─────────────────────────────────────────────
// Entrypoint
// ─────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            task,
            headless,
            logs,
        } => {
            init_logging(logs);
            run(task, headless).await
        }
        Commands::Init => init::run(),
        Commands::Status => status::run(),
    }
}

// ─────────────────────────────────────────────
// Run command
// ─────────────────────────────────────────────

async fn run(task: Option<String>, headless: bool) -> Result<()> {
    let mut config = load_config(None);
    if headless {
        config.browser.headless = true;
    }

    let provider = create_provider(&config.agent.model, &config.providers.to_map())
        .map_err(|e| anyhow!(e))?;

    let env = ChromeEnvironment::launch(&config.browser)
        .await
        .context("could not start the browser")?;
    let handle = EnvironmentHandle::new(Arc::new(env));

    let result = drive(&config, Arc::new(provider), &handle, task).await;
    handle.close().await;
    result
}

/// Run tasks against an already launched browser.
async fn drive(
    config: &Config,
    provider: Arc<webpilot_providers::HttpProvider>,
    handle: &EnvironmentHandle,
    task: Option<String>,
) -> Result<()> {
    let agent = build_agent(config, provider, handle.env().clone())?;

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupt received");
                cancel.cancel();
            }
        })
    };

    let env: &dyn Environment = &**handle.env();
    let result = match task {
        Some(task) => {
            info!(task = %task, "running single task");
            let report = helpers::run_with_progress(&agent, &task, env, &cancel).await;
            helpers::print_report(&report);
            Ok(())
        }
        None => repl::run(&agent, env, &cancel).await,
    };

    watcher.abort();
    result
}

/// Wire the provider and the browser tool set into an `AgentLoop`.
pub fn build_agent(
    config: &Config,
    provider: Arc<webpilot_providers::HttpProvider>,
    env: Arc<dyn Environment>,
) -> Result<AgentLoop> {
    let mut tools = ToolRegistry::new();
    tools
        .register_all(&BrowserTools::new(env), None)
        .context("failed to register browser tools")?;

    Ok(AgentLoop::new(
        provider,
        tools,
        LoopSettings::from_config(&config.agent),
    ))
}

/// Initialize tracing/logging.
fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("webpilot=debug,info")
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
