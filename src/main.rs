//! Metasearch CLI - runs searches across the configured engines.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use metasearch::engines::build_engines;
use metasearch::present::{self, SidebarEntry};
use metasearch::{
    Config, Dispatcher, Engine, EngineKind, FileBackend, LogTracker, MemoryHistory,
    NavigationSync, PreferenceStore, Preferences, ResultGroup,
};

/// Metasearch - query several search engines at once
#[derive(Parser)]
#[command(name = "metasearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (JSON). Defaults to English Wikipedia only.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search all configured engines
    Search(SearchArgs),

    /// List configured engines
    Engines,

    /// Hide or show an engine's results
    Toggle {
        /// Engine id
        engine: String,
    },
}

#[derive(Parser)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output, printed as engines answer
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    query: &'a str,
    groups: &'a [ResultGroup],
    sidebar: Vec<SidebarEntry>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Search(args) => run_search(&config, args).await,
        Commands::Engines => list_engines(&config),
        Commands::Toggle { engine } => toggle_engine(&config, &engine),
    }
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Ok(Config::from_file(path)?),
        None => Ok(Config::builtin()),
    }
}

fn load_preferences(config: &Config) -> PreferenceStore {
    PreferenceStore::load(Arc::new(FileBackend::new(config.data_dir())))
}

fn list_engines(config: &Config) -> Result<()> {
    let mut specs: Vec<_> = config.engines.iter().collect();
    specs.sort_by(|a, b| a.config.name.cmp(&b.config.name));

    let preferences = load_preferences(config);
    println!("Configured search engines:\n");
    for spec in specs {
        let kind = match &spec.kind {
            EngineKind::Api { base_url } => format!("api {}", base_url),
            EngineKind::Wikipedia { language } => format!("wikipedia ({})", language),
            EngineKind::Static { results } => format!("static, {} results", results.len()),
        };
        let hidden = if preferences.get().is_hidden(&spec.config.id) {
            " [hidden]"
        } else {
            ""
        };
        println!(
            "  {:<12} {} - {}{}",
            spec.config.id, spec.config.name, kind, hidden
        );
    }
    Ok(())
}

fn toggle_engine(config: &Config, engine_id: &str) -> Result<()> {
    config.engine(engine_id)?;
    let mut preferences = load_preferences(config);
    let updated = preferences.toggle_engine(engine_id)?;

    let state = if updated.is_hidden(engine_id) {
        "hidden"
    } else {
        "shown"
    };
    println!("{} results are now {}", engine_id, state);
    let hidden: Vec<_> = updated.hidden_engines().collect();
    println!("Hidden engines: [{}]", hidden.join(", "));
    Ok(())
}

async fn run_search(config: &Config, args: SearchArgs) -> Result<()> {
    let engines = build_engines(&config.engines)?;
    let preferences = load_preferences(config);

    let history = Arc::new(MemoryHistory::new("/"));
    let mut dispatcher = Dispatcher::new(engines, history);
    if let Some(tracking_id) = &config.tracking_id {
        dispatcher = dispatcher.with_tracker(Arc::new(LogTracker::new(tracking_id.clone())));
    }

    let mut navigation = NavigationSync::new(dispatcher);
    navigation.load();

    let updates = navigation.dispatcher().subscribe();
    navigation.set_query(args.query.clone());
    let Some(search) = navigation.submit() else {
        anyhow::bail!("Query must contain at least one word character");
    };

    let query = search.query().to_string();
    let text = matches!(args.format, OutputFormat::Text);
    if text {
        println!(
            "\nSearching {} engines for \"{}\"\n",
            navigation.dispatcher().engines().len(),
            query
        );
    }

    // Groups arrive in completion order; print each one as it lands.
    let engines = navigation.dispatcher().engines();
    search
        .follow(updates, |group| {
            if text {
                print_group(engines, group, preferences.get());
            }
        })
        .await;

    let state = navigation.dispatcher().snapshot();
    let sidebar = present::sidebar(navigation.dispatcher().engines(), &state, preferences.get());

    match args.format {
        OutputFormat::Text => {
            println!("Engines:");
            for entry in &sidebar {
                let count = entry
                    .status
                    .count()
                    .map(|n| format!(" ({})", n))
                    .unwrap_or_default();
                println!("  {:<20} {}{}", entry.name, entry.status.title(), count);
            }
            if let Some(footer) = &config.footer {
                println!("\n{}", present::plain_text(footer));
            }
        }
        OutputFormat::Json => {
            let output = JsonOutput {
                query: &query,
                groups: state.groups(),
                sidebar,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Compact => {
            for group in present::visible_groups(&state) {
                if preferences.get().is_hidden(&group.engine_id) {
                    continue;
                }
                for result in &group.results {
                    println!(
                        "{}\t{}\t{}",
                        group.engine_id,
                        present::plain_text(&result.title),
                        result.url
                    );
                }
            }
        }
    }

    Ok(())
}

fn print_group(engines: &[Arc<dyn Engine>], group: &ResultGroup, preferences: &Preferences) {
    if group.is_empty() {
        return;
    }
    let name = engines
        .iter()
        .find(|e| e.id() == group.engine_id)
        .map(|e| e.name())
        .unwrap_or(group.engine_id.as_str());
    let hidden = preferences.is_hidden(&group.engine_id);

    println!(
        "== {}{} ==",
        name,
        if hidden { " (hidden)" } else { "" }
    );
    println!("   {}", present::stats_line(group));
    if hidden {
        println!();
        return;
    }

    let now = Utc::now();
    for (i, result) in group.results.iter().enumerate() {
        let modified = result
            .modified
            .and_then(|ts| present::format_modified(ts, now))
            .map(|date| format!("  [{}]", date))
            .unwrap_or_default();
        println!("{}. {}{}", i + 1, present::plain_text(&result.title), modified);
        println!("   {}", result.url);
        if let Some(snippet) = &result.snippet {
            let text = present::plain_text(snippet);
            let mut short: String = text.chars().take(160).collect();
            if short.len() < text.len() {
                short.push_str("...");
            }
            println!("   {}", short);
        }
    }
    println!();
}
