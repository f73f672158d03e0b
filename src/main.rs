use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Select};
use anyhow::{Result, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod terminal;

use aichat_core::models::{self, ModelFamily};
use aichat_core::settings::{self, mask_key};
use aichat_core::{ApiKeys, ChatClient, ChatSession, Config, FileSettingsStore, SettingsStore};
use terminal::TerminalSink;

#[derive(Parser)]
#[command(name = "aichat")]
#[command(about = "Chat with AI models over a streaming chat endpoint")]
struct Cli {
    /// Chat endpoint URL (overrides the config file)
    #[arg(long, global = true, env = "AICHAT_ENDPOINT")]
    endpoint: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat {
        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Ask a single question and stream the answer
    Ask {
        /// Your question
        question: String,
        /// Model to use
        #[arg(short, long)]
        model: Option<String>,
    },
    /// List available models
    Models {
        /// Choose the default model interactively
        #[arg(long)]
        pick: bool,
    },
    /// Manage API keys
    Keys {
        #[command(subcommand)]
        action: KeysAction,
    },
    /// Show the current configuration
    Status,
}

#[derive(Subcommand)]
enum KeysAction {
    /// Show stored keys
    Show {
        /// Print keys in full
        #[arg(long)]
        reveal: bool,
    },
    /// Store API keys
    Set {
        /// OpenAI API key
        #[arg(long)]
        openai: Option<String>,
        /// Google Gemini API key
        #[arg(long)]
        gemini: Option<String>,
    },
    /// Remove all stored keys
    Clear {
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load()?.with_endpoint_override(cli.endpoint);
    tracing::debug!(
        endpoint = %config.chat_endpoint,
        model = config.model(),
        "configuration loaded"
    );

    match cli.command {
        Commands::Chat { model } => chat_interactive(&config, model).await?,
        Commands::Ask { question, model } => ask(&config, &question, model).await?,
        Commands::Models { pick } => list_models(&config, pick)?,
        Commands::Keys { action } => manage_keys(action)?,
        Commands::Status => show_status(&config)?,
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn chat_interactive(config: &Config, model: Option<String>) -> Result<()> {
    let client = ChatClient::from_config(config)?;
    let model = model.unwrap_or_else(|| config.model().to_string());
    let mut session = ChatSession::new(client, model);
    let mut sink = TerminalSink::stdout();

    println!("\n{}", "💬 AI Chat".bold().blue());
    println!(
        "Model: {}  {}",
        models::display_label(session.model()).green(),
        "(/model <id>, /clear, /quit)".dimmed()
    );

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n{} ", "You:".bold().cyan());
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear();
                println!("{}", "Conversation cleared".dimmed());
                continue;
            }
            command if command.starts_with("/model") => {
                let id = command.trim_start_matches("/model").trim();
                if id.is_empty() {
                    println!("Model: {}", session.model().green());
                } else {
                    session.set_model(id);
                    println!("Switched to {}", models::display_label(id).green());
                }
                continue;
            }
            _ => {}
        }

        if session.send(&line, &mut sink).await.is_some() {
            sink.finish_turn();
        }
    }

    Ok(())
}

async fn ask(config: &Config, question: &str, model: Option<String>) -> Result<()> {
    let client = ChatClient::from_config(config)?;
    let model = model.unwrap_or_else(|| config.model().to_string());
    let mut session = ChatSession::new(client, model);
    let mut sink = TerminalSink::stdout();

    let state = session.send(question, &mut sink).await;
    let failed = sink.failed();
    sink.finish_turn();

    match state {
        None => bail!("Question is empty"),
        Some(_) if failed => bail!("Chat request failed"),
        Some(_) => Ok(()),
    }
}

fn list_models(config: &Config, pick: bool) -> Result<()> {
    if pick {
        let labels: Vec<String> = models::MODELS
            .iter()
            .map(|m| format!("{} ({})", m.label, m.family.display_name()))
            .collect();
        let current = models::MODELS
            .iter()
            .position(|m| m.id == config.model())
            .unwrap_or(0);

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select the default model")
            .items(&labels)
            .default(current)
            .interact()?;

        let chosen = &models::MODELS[selection];
        Config::save_default_model(chosen.id)?;
        println!("{} {}", "✓ Default model set to".green(), chosen.label.bold());
        return Ok(());
    }

    println!("\n{}", "🤖 Available Models".bold().blue());
    println!("{}", "=".repeat(30).dimmed());

    for family in ModelFamily::all() {
        println!("\n{}", family.display_name().bold().green());
        for model in models::by_family(family) {
            let marker = if model.id == config.model() { "*" } else { " " };
            println!(" {} {} {}", marker.yellow(), model.label, model.id.dimmed());
        }
    }

    if models::find(config.model()).is_none() {
        println!("\n{} {}", "Custom default:".yellow(), config.model());
    }

    Ok(())
}

fn manage_keys(action: KeysAction) -> Result<()> {
    let mut store = FileSettingsStore::default_location()?;

    match action {
        KeysAction::Show { reveal } => {
            let keys = ApiKeys::load(&store)?;
            let show = |key: &str| {
                if key.is_empty() {
                    "not set".dimmed().to_string()
                } else if reveal {
                    key.to_string()
                } else {
                    mask_key(key)
                }
            };
            println!("OpenAI API Key:        {}", show(&keys.openai_key));
            println!("Google Gemini API Key: {}", show(&keys.gemini_key));
        }
        KeysAction::Set { openai, gemini } => {
            if openai.is_none() && gemini.is_none() {
                bail!("Nothing to set. Pass --openai and/or --gemini");
            }

            let mut keys = ApiKeys::load(&store)?;
            if let Some(key) = openai {
                keys.openai_key = key.trim().to_string();
            }
            if let Some(key) = gemini {
                keys.gemini_key = key.trim().to_string();
            }
            keys.save(&mut store)?;
            println!("{}", "✓ Settings saved successfully!".green());
        }
        KeysAction::Clear { yes } => {
            let confirmed = yes
                || Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Are you sure you want to clear all API keys?")
                    .default(false)
                    .interact()?;
            if confirmed {
                store.clear()?;
                println!("{}", "✓ Settings cleared".green());
            }
        }
    }

    Ok(())
}

fn show_status(config: &Config) -> Result<()> {
    let store = FileSettingsStore::default_location()?;
    let configured = settings::is_configured(&store)?;

    println!("Endpoint: {}", config.chat_endpoint);
    println!("Model:    {} ({})", models::display_label(config.model()), config.model().dimmed());
    println!("Settings: {}", store.path().display().to_string().dimmed());
    if configured {
        println!("API keys: {}", "✓ configured".green());
    } else {
        println!("API keys: {}", "✗ not configured (run `aichat keys set`)".yellow());
    }

    Ok(())
}
