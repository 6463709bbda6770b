//! Vega Population CLI commands
//!
//! Provides commands for searching, installing, and inspecting
//! skills, personas and profiles from a population repository.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use vega_core::population::{
    format_item_name, parse_item_name, Client, InstallAction, InstallOptions, ItemKind,
    PopulationConfig, SearchOptions,
};

const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_TEMPERATURE: f64 = 0.7;
const DEFAULT_BUDGET: &str = "$3.00";

/// Population subcommand for managing skills, personas and profiles
#[derive(Parser, Debug)]
pub struct PopulationCommand {
    #[clap(subcommand)]
    pub command: PopulationSubcommand,
}

#[derive(Subcommand, Debug)]
pub enum PopulationSubcommand {
    /// Search for skills, personas, and profiles
    Search {
        /// Search query (words are joined with spaces)
        #[clap(required = true)]
        query: Vec<String>,

        /// Filter by kind (skill, persona, profile)
        #[clap(long)]
        kind: Option<ItemKind>,

        /// Filter by tags (comma-separated)
        #[clap(long, value_delimiter = ',')]
        tags: Vec<String>,

        /// Maximum number of results (0 for all)
        #[clap(long, default_value_t = 0)]
        limit: usize,

        /// Custom source URL or path
        #[clap(long)]
        source: Option<String>,

        /// Disable caching
        #[clap(long)]
        no_cache: bool,

        /// Output results as JSON
        #[clap(long)]
        json: bool,
    },

    /// Install a skill, persona (@name), or profile (+name)
    Install {
        /// Item names
        #[clap(required = true)]
        names: Vec<String>,

        /// Overwrite existing installation
        #[clap(long)]
        force: bool,

        /// Skip profile dependencies
        #[clap(long)]
        no_deps: bool,

        /// Show what would be installed
        #[clap(long)]
        dry_run: bool,

        /// Custom source URL or path
        #[clap(long)]
        source: Option<String>,

        /// Custom installation directory
        #[clap(long)]
        install_dir: Option<PathBuf>,
    },

    /// List installed items
    #[clap(alias = "ls")]
    List {
        /// Filter by kind (skill, persona, profile)
        #[clap(long)]
        kind: Option<ItemKind>,

        /// Custom installation directory
        #[clap(long)]
        install_dir: Option<PathBuf>,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Show detailed information about an item
    Info {
        /// Item name (@persona, +profile, or skill)
        name: String,

        /// Custom source URL or path
        #[clap(long)]
        source: Option<String>,

        /// Custom installation directory
        #[clap(long)]
        install_dir: Option<PathBuf>,

        /// Output as JSON
        #[clap(long)]
        json: bool,
    },

    /// Export a persona as an agent definition in YAML
    Export {
        /// Persona name (e.g., @cmo)
        name: String,

        /// Agent name to use (default: extracted from persona or capitalized ID)
        #[clap(long = "name")]
        agent_name: Option<String>,

        /// Model to use
        #[clap(long, default_value = DEFAULT_MODEL)]
        model: String,

        /// Temperature setting
        #[clap(long, default_value_t = DEFAULT_TEMPERATURE)]
        temperature: f64,

        /// Budget limit
        #[clap(long, default_value = DEFAULT_BUDGET)]
        budget: String,

        /// Custom source URL or path
        #[clap(long)]
        source: Option<String>,
    },

    /// Update the local index cache
    Update {
        /// Custom source URL or path
        #[clap(long)]
        source: Option<String>,
    },
}

/// Command line overrides layered over the resolved configuration
#[derive(Debug, Default)]
struct Overrides {
    source: Option<String>,
    install_dir: Option<PathBuf>,
    no_cache: bool,
}

impl Overrides {
    fn source(source: Option<String>) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }

    fn apply(self, mut config: PopulationConfig) -> PopulationConfig {
        if let Some(source) = self.source {
            config = config.with_source(source);
        }
        if let Some(install_dir) = self.install_dir {
            config = config.with_install_dir(install_dir);
        }
        if self.no_cache {
            config = config.without_cache();
        }
        config
    }
}

fn build_client(config_path: Option<&Path>, overrides: Overrides) -> Result<Client> {
    let config = PopulationConfig::load(config_path).context("Failed to load configuration")?;
    let config = overrides.apply(config);
    debug!(?config, "Resolved population configuration");
    Ok(Client::new(config))
}

/// Token cancelled when the user presses Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    token
}

impl PopulationCommand {
    pub async fn execute(self, config_path: Option<&Path>) -> Result<()> {
        let cancel = cancel_on_ctrl_c();

        match self.command {
            PopulationSubcommand::Search {
                query,
                kind,
                tags,
                limit,
                source,
                no_cache,
                json,
            } => {
                let overrides = Overrides {
                    source,
                    no_cache,
                    ..Default::default()
                };
                let client = build_client(config_path, overrides)?;
                let options = SearchOptions {
                    kind,
                    tags,
                    limit: Some(limit),
                };
                execute_search(&client, &query.join(" "), &options, json, &cancel).await
            }
            PopulationSubcommand::Install {
                names,
                force,
                no_deps,
                dry_run,
                source,
                install_dir,
            } => {
                let overrides = Overrides {
                    source,
                    install_dir,
                    ..Default::default()
                };
                let client = build_client(config_path, overrides)?;
                let options = InstallOptions {
                    force,
                    no_deps,
                    dry_run,
                };
                execute_install(&client, &names, options, &cancel).await
            }
            PopulationSubcommand::List {
                kind,
                install_dir,
                json,
            } => {
                let overrides = Overrides {
                    install_dir,
                    ..Default::default()
                };
                let client = build_client(config_path, overrides)?;
                execute_list(&client, kind, json)
            }
            PopulationSubcommand::Info {
                name,
                source,
                install_dir,
                json,
            } => {
                let overrides = Overrides {
                    source,
                    install_dir,
                    ..Default::default()
                };
                let client = build_client(config_path, overrides)?;
                execute_info(&client, &name, json, &cancel).await
            }
            PopulationSubcommand::Export {
                name,
                agent_name,
                model,
                temperature,
                budget,
                source,
            } => {
                let settings = AgentSettings {
                    model,
                    temperature,
                    budget,
                };
                let client = build_client(config_path, Overrides::source(source))?;
                execute_export(&client, &name, agent_name, &settings, &cancel).await
            }
            PopulationSubcommand::Update { source } => {
                let client = build_client(config_path, Overrides::source(source))?;
                execute_update(&client, &cancel).await
            }
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}

fn render_table<T: Tabled>(rows: &[T]) -> String {
    Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()))
        .to_string()
}

/// Table row for search results
#[derive(Tabled)]
struct SearchResultRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Score")]
    score: String,
    #[tabled(rename = "Tags")]
    tags: String,
    #[tabled(rename = "Description")]
    description: String,
}

async fn execute_search(
    client: &Client,
    query: &str,
    options: &SearchOptions,
    json_output: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let results = client
        .search(query, options, cancel)
        .await
        .context("Search failed")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found for {query:?}");
        return Ok(());
    }

    println!("Found {} result(s) for {query:?}:\n", results.len());

    let table_rows: Vec<SearchResultRow> = results
        .iter()
        .map(|r| SearchResultRow {
            name: format_item_name(r.kind, &r.name),
            version: r.version.clone(),
            score: format!("{:.1}", r.score),
            tags: r.tags.join(", "),
            description: truncate(&r.description, 50),
        })
        .collect();

    println!("{}", render_table(&table_rows));

    Ok(())
}

async fn execute_install(
    client: &Client,
    names: &[String],
    options: InstallOptions,
    cancel: &CancellationToken,
) -> Result<()> {
    for name in names {
        let (kind, item_name) = parse_item_name(name);

        if !options.dry_run {
            println!("Installing {kind} {item_name:?}...");
        }

        let report = client
            .install(name, options, cancel)
            .await
            .with_context(|| format!("Failed to install {name}"))?;

        for step in report.dependencies() {
            let display = format_item_name(step.kind, &step.name);
            match step.action {
                InstallAction::Installed => println!("  Installed {display}"),
                InstallAction::WouldInstall => {
                    println!("Would install {display} to {}", step.path.display())
                }
                InstallAction::AlreadyPresent => println!("  {display} already installed"),
            }
        }

        if let Some(target) = report.target() {
            let display = format_item_name(target.kind, &target.name);
            if options.dry_run {
                println!("Would install {display} to {}", target.path.display());
            } else {
                println!(
                    "Successfully installed {display} to {}",
                    target.path.display()
                );
            }
        }
    }

    Ok(())
}

/// Table row for installed items
#[derive(Tabled)]
struct InstalledRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Location")]
    path: String,
}

fn execute_list(client: &Client, kind: Option<ItemKind>, json_output: bool) -> Result<()> {
    let items = client.list(kind).context("Failed to list installed items")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("No items installed");
        println!("\nRun 'vega population search <query>' to find items.");
        return Ok(());
    }

    let table_rows: Vec<InstalledRow> = items
        .iter()
        .map(|item| InstalledRow {
            name: format_item_name(item.kind, &item.name),
            kind: item.kind.to_string(),
            version: format!("v{}", item.version),
            path: item.path.display().to_string(),
        })
        .collect();

    println!("{}", render_table(&table_rows));

    Ok(())
}

async fn execute_info(
    client: &Client,
    name: &str,
    json_output: bool,
    cancel: &CancellationToken,
) -> Result<()> {
    let info = client.info(name, cancel).await?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Name:        {}", format_item_name(info.kind, &info.name));
    println!("Kind:        {}", info.kind);
    println!("Version:     {}", info.version);
    println!("Description: {}", info.description);
    println!("Author:      {}", info.author);

    if !info.tags.is_empty() {
        println!("Tags:        {}", info.tags.join(", "));
    }

    if !info.tools.is_empty() {
        println!("Tools:       {}", info.tools.join(", "));
    }

    if let Some(persona) = &info.persona {
        println!("Persona:     {}", format_item_name(ItemKind::Persona, persona));
    }

    if !info.skills.is_empty() {
        println!("Skills:      {}", info.skills.join(", "));
    }

    println!();
    match &info.installed_path {
        Some(path) => println!("Status:      Installed at {}", path.display()),
        None => println!("Status:      Not installed"),
    }

    Ok(())
}

/// Agent settings written by `export`
#[derive(Debug, Clone, PartialEq)]
struct AgentSettings {
    model: String,
    temperature: f64,
    budget: String,
}

async fn execute_export(
    client: &Client,
    name: &str,
    agent_name: Option<String>,
    settings: &AgentSettings,
    cancel: &CancellationToken,
) -> Result<()> {
    let (kind, item_name) = parse_item_name(name);
    if kind != ItemKind::Persona {
        bail!("export only works with personas (use @name format)");
    }

    let manifest = client
        .manifest(name, cancel)
        .await
        .context("Fetching persona")?;

    let agent_name = agent_name
        .or_else(|| extract_agent_name(&manifest.system_prompt))
        .unwrap_or_else(|| title_case(item_name));

    print!(
        "{}",
        render_agent(&agent_name, settings, &manifest.system_prompt)
    );

    Ok(())
}

/// Render a persona as an agent block for a Vega configuration file
fn render_agent(agent_name: &str, settings: &AgentSettings, system_prompt: &str) -> String {
    let system: String = system_prompt
        .split('\n')
        .map(|line| format!("      {line}\n"))
        .collect();
    let tools: String = ["read_file", "write_file", "web_search"]
        .iter()
        .map(|tool| format!("      - {tool}\n"))
        .collect();

    let mut out = format!(
        "  {agent_name}:\n    model: {}\n    temperature: {}\n    budget: \"{}\"\n",
        settings.model, settings.temperature, settings.budget
    );
    out.push_str("    system: |\n");
    out.push_str(&system);
    out.push_str("    tools:\n");
    out.push_str(&tools);
    out.push_str("    supervision:\n      strategy: restart\n      max_restarts: 2\n");
    out
}

/// First word after "You are " in a system prompt
///
/// Only the first line starting with "You are " is considered. An article
/// followed by more words ("You are a helpful...") yields no name.
fn extract_agent_name(system_prompt: &str) -> Option<String> {
    let rest = system_prompt
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("You are "))?;

    let mut words = rest
        .split([' ', ',', '.', '-', ':'])
        .filter(|w| !w.is_empty());

    let name = words.next()?;
    if matches!(name, "a" | "an" | "the") && words.next().is_some() {
        return None;
    }

    Some(name.to_string())
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

async fn execute_update(client: &Client, cancel: &CancellationToken) -> Result<()> {
    println!("Updating cache...");
    client
        .update_cache(cancel)
        .await
        .context("Failed to update cache")?;
    println!("Cache updated successfully");
    Ok(())
}
