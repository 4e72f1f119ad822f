//! tandem CLI entry point

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tandem::agent::{create_client, Agent};
use tandem::session::{FileSessionStore, Mode, Session, SessionStore, ToolVerbosity};
use tandem::{acp, config, terminal};

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "A coding-assistant agent for the terminal and the editor")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the agent interactively
    Chat {
        /// Initial prompt to send before entering the loop
        prompt: Vec<String>,

        /// Session name (defaults to a timestamped name)
        #[arg(short, long)]
        session: Option<String>,

        /// Resume a stored session instead of starting fresh
        #[arg(short, long)]
        resume: bool,

        #[command(flatten)]
        agent: AgentArgs,
    },

    /// Serve editor clients over JSON-RPC on stdin/stdout
    Acp {
        #[command(flatten)]
        agent: AgentArgs,
    },
}

#[derive(clap::Args)]
struct AgentArgs {
    /// Tool execution mode: 'auto' or 'prompt'
    #[arg(short, long)]
    mode: Option<String>,

    /// Named toolset from configuration
    #[arg(short, long)]
    toolset: Option<String>,

    /// Tool output verbosity: 'none', 'info', or 'all'
    #[arg(long)]
    tool_verbosity: Option<String>,
}

impl AgentArgs {
    fn mode(&self) -> Result<Option<Mode>> {
        self.mode
            .as_deref()
            .map(|m| m.parse().map_err(anyhow::Error::msg))
            .transpose()
    }

    fn verbosity(&self) -> Result<Option<ToolVerbosity>> {
        self.tool_verbosity
            .as_deref()
            .map(|v| v.parse().map_err(anyhow::Error::msg))
            .transpose()
    }
}

/// Default session name: the working directory's basename plus a timestamp.
fn default_session_name() -> String {
    let dir = std::env::current_dir()
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "session".to_string());
    let stamp = chrono::Local::now().format("%Y-%m-%d_%H-%M-%S");
    format!("{dir}_{stamp}")
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr: stdout is reserved for the protocol in acp mode.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load().context("failed to load configuration")?;
    let store: Arc<dyn SessionStore> =
        Arc::new(FileSessionStore::new(FileSessionStore::default_dir()));

    match cli.command {
        Commands::Chat {
            prompt,
            session,
            resume,
            agent,
        } => {
            let name = session.unwrap_or_else(default_session_name);

            let mut session = if resume {
                store
                    .load(&name)
                    .with_context(|| format!("failed to resume session '{name}'"))?
            } else {
                Session::new(&name)
            };

            // Flags override stored session metadata; a resumed session
            // otherwise keeps the settings it was created with.
            if let Some(mode) = agent.mode()? {
                session.mode = mode;
            }
            if let Some(verbosity) = agent.verbosity()? {
                session.tool_verbosity = verbosity;
            }
            if let Some(toolset) = &agent.toolset {
                session.toolset = toolset.clone();
            }

            let client = create_client(&config)?;
            let agent = Agent::new(
                &config,
                &session.toolset,
                session.mode,
                session.tool_verbosity,
                client,
                Arc::clone(&store),
            )?;
            store.save(&session)?;

            terminal::print_header(&config.model, &config.provider, &session.name);
            let initial = if prompt.is_empty() {
                None
            } else {
                Some(prompt.join(" "))
            };
            terminal::run_interactive(&agent, &mut session, initial).await?;
        }

        Commands::Acp { agent } => {
            let mode = agent.mode()?.unwrap_or_default();
            let verbosity = agent.verbosity()?.unwrap_or_default();
            let toolset = agent.toolset.as_deref().unwrap_or("default");

            let client = create_client(&config)?;
            let agent = Agent::new(&config, toolset, mode, verbosity, client, Arc::clone(&store))?;

            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            let mut server = acp::AcpServer::new(agent, store, stdin.lock(), stdout.lock());
            server.run().await?;
        }
    }

    Ok(())
}
