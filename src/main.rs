use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use ideaforge_lib::agents::AgentDispatcher;
use ideaforge_lib::config::AppConfig;
use ideaforge_lib::models::{CoordinationMode, QueryContext, TurnOutcome};
use ideaforge_lib::server::{self, EventBroadcaster, ServerAppState};
use ideaforge_lib::shutdown::{register_signal_handlers, ShutdownState};
use ideaforge_lib::storage::JsonlStore;
use ideaforge_lib::Coordinator;

/// IdeaForge - route product questions to specialist agents and merge their answers
#[derive(Parser, Debug)]
#[command(name = "ideaforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.ideaforge/config.toml)
    #[arg(long, global = true, env = "IDEAFORGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct QueryArgs {
    /// Query text
    text: String,

    /// Current product lifecycle phase (e.g. "Market Research")
    #[arg(long)]
    phase: Option<String>,

    /// Coordination mode: sequential, parallel, collaborative or debate
    #[arg(long)]
    mode: Option<CoordinationMode>,

    #[arg(long)]
    product: Option<String>,

    #[arg(long)]
    session: Option<String>,
}

impl QueryArgs {
    fn context(&self) -> QueryContext {
        QueryContext {
            text: self.text.clone(),
            phase: self.phase.clone(),
            product_id: self.product.clone(),
            session_id: self.session.clone(),
            history: Vec::new(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List registered agents
    Agents,

    /// Print the routing decision for a query without invoking agents
    Route(QueryArgs),

    /// Run one query turn and print the synthesized answer
    Ask {
        #[command(flatten)]
        query: QueryArgs,

        /// Print the full turn outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run the HTTP/WebSocket server
    Serve {
        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        bind: Option<String>,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = AppConfig::load(cli.config.as_deref())?;

    match cli.command {
        Command::Agents => {
            let registry = config.validate()?;
            for agent in registry.agents() {
                let tags: Vec<&str> = agent.capabilities.iter().map(|t| t.as_str()).collect();
                println!(
                    "{:<12} {:<18} weight {:.2}{}  [{}]",
                    agent.id,
                    agent.display_name,
                    agent.weight,
                    if agent.retrieval_augmented { " (retrieval)" } else { "" },
                    tags.join(", ")
                );
            }
            Ok(0)
        }
        Command::Route(query) => {
            let coordinator = build_coordinator(&config)?;
            let decision = coordinator.preview(&query.context(), query.mode)?;
            println!("{}", serde_json::to_string_pretty(&decision)?);
            Ok(0)
        }
        Command::Ask { query, json } => {
            let coordinator = build_coordinator(&config)?;
            let runtime = tokio::runtime::Runtime::new()?;
            let outcome = runtime.block_on(coordinator.handle(query.context(), query.mode))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            }
            match outcome {
                TurnOutcome::Answered(report) => {
                    if !json {
                        println!("{}", report.response.to_markdown());
                    }
                    Ok(0)
                }
                TurnOutcome::Failed(failure) => {
                    eprintln!("No answer: {}", failure.reason);
                    for gap in &failure.gaps {
                        eprintln!("  {}: {}", gap.agent_id, gap.reason);
                    }
                    Ok(2)
                }
            }
        }
        Command::Serve { port, bind } => {
            let mut server_config = config.server.clone();
            if let Some(port) = port {
                server_config.port = port;
            }
            if let Some(bind) = bind {
                server_config.bind = bind;
            }

            let coordinator = build_coordinator(&config)?;
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(async {
                let shutdown_state = ShutdownState::new();
                if let Err(e) = register_signal_handlers(shutdown_state.clone()) {
                    log::warn!("Failed to register signal handlers: {}", e);
                }

                let state = ServerAppState::new(
                    coordinator,
                    Arc::new(EventBroadcaster::new()),
                    shutdown_state,
                );
                server::run_server(&server_config, state).await
            })?;
            Ok(0)
        }
    }
}

fn build_coordinator(config: &AppConfig) -> anyhow::Result<Coordinator> {
    let dispatcher =
        AgentDispatcher::from_commands(&config.commands, config.default_command.as_ref());
    let mut coordinator = Coordinator::from_config(config, Arc::new(dispatcher))?;

    if let Some(path) = &config.storage.interaction_log {
        let store = JsonlStore::open(path.clone())?;
        log::info!("Recording interactions to {}", store.path().display());
        coordinator = coordinator.with_store(Arc::new(store));
    }
    Ok(coordinator)
}
