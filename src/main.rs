//! Minions command-line host.
//!
//! Usage:
//!   minions place COBBLESTONE --level 1 --x 0 --y 64 --z 0
//!   minions run                 Respawn every minion and tick until Ctrl+C
//!   minions status              Show persisted minions
//!   minions upgrade <id> <lvl>  Raise a minion's level
//!   minions collect <id>        Empty a minion's inventory
//!   minions pickup <id>         Remove a minion and delete its record

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use minions::catalog::{self, Catalog, ItemRegistry};
use minions::clock::ClockDaemon;
use minions::config::{self, MinionsConfig};
use minions::minion::{Minion, MinionServices, Placement, SharedMinion};
use minions::scheduler::TickScheduler;
use minions::state::{self, records, MinionRecord, RecordStore};
use minions::types::{MinionId, Position, RemoveReason};
use minions::world::InMemoryWorld;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "minions")]
#[command(version = "0.1.0")]
#[command(about = "Autonomous resource-generating minions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to minions home directory (defaults to ~/.minions).
    #[arg(long)]
    home: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long)]
    log_level: Option<String>,

    /// Owner whose minions to manage. Overrides the config file.
    #[arg(long)]
    owner: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Place a new minion and persist it.
    Place {
        /// Blueprint identifier, e.g. COBBLESTONE.
        blueprint: String,

        #[arg(long, default_value_t = 1)]
        level: u32,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        x: f64,

        #[arg(long, default_value_t = 64.0, allow_hyphen_values = true)]
        y: f64,

        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        z: f64,
    },

    /// Respawn every persisted minion and drive the clock.
    Run {
        /// Stop after this many ticks instead of waiting for Ctrl+C.
        #[arg(long)]
        ticks: Option<u64>,
    },

    /// Show every persisted minion.
    Status {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Raise a minion to a higher level.
    Upgrade { id: String, level: u32 },

    /// Take everything out of a minion's inventory.
    Collect { id: String },

    /// Remove a minion from the world and delete its record.
    Pickup { id: String },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Resolve home directory
    let home_dir = match &cli.home {
        Some(home) => PathBuf::from(shellexpand::tilde(home).into_owned()),
        None => config::default_home_dir(),
    };
    let mut cfg = load_or_init_config(&home_dir)?;
    if let Some(owner) = cli.owner {
        cfg.owner = owner;
    }

    // Initialize logging
    let level = cli.log_level.unwrap_or_else(|| cfg.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Place {
            blueprint,
            level,
            x,
            y,
            z,
        } => cmd_place(&cfg, &blueprint, level, Position::new(x, y, z)),
        Commands::Run { ticks } => cmd_run(&cfg, ticks).await,
        Commands::Status { json } => cmd_status(&cfg, json),
        Commands::Upgrade { id, level } => cmd_upgrade(&cfg, &id, level),
        Commands::Collect { id } => cmd_collect(&cfg, &id),
        Commands::Pickup { id } => cmd_pickup(&cfg, &id),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_place(cfg: &MinionsConfig, blueprint: &str, level: u32, position: Position) -> Result<()> {
    let mut rt = Runtime::bootstrap(cfg)?;
    let bp = rt.catalog.blueprint(blueprint).with_context(|| {
        format!("Available blueprints: {}", rt.catalog.blueprint_ids().join(", "))
    })?;
    let placement = Placement::new(&cfg.owner, bp, level, position);
    let minion = Minion::spawn(placement, rt.services(), rt.store.as_ref())?;

    let mut m = minion.lock();
    let id = m.id().clone();
    m.remove(RemoveReason::Quit, rt.store.as_mut())?;

    println!(
        "{} Placed {} minion {} (level {}) at {}",
        ">>>".green().bold(),
        blueprint,
        id.to_string().bold(),
        level,
        position
    );
    Ok(())
}

async fn cmd_run(cfg: &MinionsConfig, ticks: Option<u64>) -> Result<()> {
    let mut rt = Runtime::bootstrap(cfg)?;
    let minions = rt.respawn_all()?;

    println!(
        "{} Running {} minion(s) for '{}' ...",
        ">>>".green().bold(),
        minions.len(),
        cfg.owner
    );

    match ticks {
        Some(n) => rt.scheduler.advance_by(n),
        None => {
            let cancel = CancellationToken::new();
            let daemon = ClockDaemon::from_config(rt.scheduler.clone(), cfg);
            let clock_cancel = cancel.clone();
            let clock_handle = tokio::spawn(async move { daemon.run(clock_cancel).await });

            // Wait for shutdown signal
            tokio::signal::ctrl_c()
                .await
                .context("Failed to listen for Ctrl+C")?;
            println!("\n{} Shutting down gracefully...", "<<<".red().bold());

            cancel.cancel();
            match clock_handle.await {
                Ok(ticks) => info!("Clock stopped after {} ticks", ticks),
                Err(e) => warn!("Clock task join error: {}", e),
            }
        }
    }

    // Persist every minion after the clock has stopped
    let mut failures = 0;
    for minion in &minions {
        let mut m = minion.lock();
        if let Err(e) = m.remove(RemoveReason::Quit, rt.store.as_mut()) {
            error!("Failed to save minion {}: {:#}", m.id(), e);
            failures += 1;
        }
    }
    if failures > 0 {
        bail!("{} minion(s) could not be saved", failures);
    }

    info!("Shutdown complete");
    Ok(())
}

fn cmd_status(cfg: &MinionsConfig, json: bool) -> Result<()> {
    let rt = Runtime::bootstrap(cfg)?;
    let records = records::list_records(rt.store.as_ref())?;

    if json {
        let out: Vec<serde_json::Value> = records
            .iter()
            .map(|r| {
                serde_json::json!({
                    "id": r.id.as_str(),
                    "blueprint": r.blueprint,
                    "level": r.level,
                    "location": { "x": r.position.x, "y": r.position.y, "z": r.position.z },
                    "items": r.items.iter().map(|(kind, count)| {
                        serde_json::json!({ "id": kind, "count": count })
                    }).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!("{}", "=== Minions ===".bold());
    println!();
    println!("  {}:  {}", "Owner".bold(), cfg.owner);
    println!("  {}:  {:?}", "Store".bold(), cfg.store_backend);
    println!();

    if records.is_empty() {
        println!("  {}", "no minions placed".dimmed());
        println!();
        return Ok(());
    }

    for record in &records {
        println!("  {} {}", record.id.to_string().bold(), record.blueprint.cyan());
        println!("    Level:    {}", record.level);
        println!("    Location: {}", record.position);
        println!("    Stacks:   {}", colorize_stacks(&rt.catalog, record));
        for (kind, count) in &record.items {
            println!("      {:<16} {}", kind, count);
        }
        println!();
    }
    Ok(())
}

fn cmd_upgrade(cfg: &MinionsConfig, id: &str, level: u32) -> Result<()> {
    let mut rt = Runtime::bootstrap(cfg)?;
    let minion = rt.respawn(id)?;

    let mut m = minion.lock();
    let previous = m.level();
    m.set_level(level)?;
    m.remove(RemoveReason::Quit, rt.store.as_mut())?;

    println!(
        "{} Minion {} upgraded {} -> {} ({} slots)",
        ">>>".green().bold(),
        id.bold(),
        previous,
        level,
        minions::inventory::capacity_for_level(level)
    );
    Ok(())
}

fn cmd_collect(cfg: &MinionsConfig, id: &str) -> Result<()> {
    let mut rt = Runtime::bootstrap(cfg)?;
    let minion = rt.respawn(id)?;

    let mut m = minion.lock();
    let items = m.collect_all();
    m.remove(RemoveReason::Quit, rt.store.as_mut())?;

    println!("{} Collected from {}:", ">>>".green().bold(), id.bold());
    if items.is_empty() {
        println!("  {}", "nothing".dimmed());
    }
    for stack in items {
        println!("  {:<16} {}", stack.kind, stack.count);
    }
    Ok(())
}

fn cmd_pickup(cfg: &MinionsConfig, id: &str) -> Result<()> {
    let mut rt = Runtime::bootstrap(cfg)?;
    let minion = rt.respawn(id)?;

    let mut m = minion.lock();
    let items = m.collect_all();
    m.remove(RemoveReason::Pickup, rt.store.as_mut())?;

    println!(
        "{} Picked up minion {} ({} stacks returned)",
        "<<<".red().bold(),
        id.bold(),
        items.len()
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Everything a command needs: catalog, store, world and clock.
struct Runtime {
    owner: String,
    catalog: Arc<Catalog>,
    store: Box<dyn RecordStore>,
    world: Arc<InMemoryWorld>,
    scheduler: Arc<TickScheduler>,
}

impl Runtime {
    /// Bootstrap the runtime: load catalog and open the owner's record store.
    fn bootstrap(cfg: &MinionsConfig) -> Result<Self> {
        let catalog_path = cfg.resolved_catalog_path();
        let catalog = catalog::load_catalog(Path::new(&catalog_path))
            .with_context(|| format!("Failed to load catalog from {}", catalog_path))?;
        let store = state::open_store(cfg, &cfg.owner)
            .with_context(|| format!("Failed to open records for '{}'", cfg.owner))?;

        Ok(Self {
            owner: cfg.owner.clone(),
            catalog: Arc::new(catalog),
            store,
            world: Arc::new(InMemoryWorld::new()),
            scheduler: Arc::new(TickScheduler::new()),
        })
    }

    fn services(&self) -> MinionServices {
        MinionServices {
            registry: self.catalog.clone(),
            host: self.world.clone(),
            scheduler: self.scheduler.clone(),
        }
    }

    fn spawn_record(&self, record: &MinionRecord) -> Result<SharedMinion> {
        let bp = self.catalog.blueprint(&record.blueprint)?;
        Minion::spawn(
            Placement::from_record(&self.owner, bp, record),
            self.services(),
            self.store.as_ref(),
        )
    }

    /// Respawn one persisted minion.
    fn respawn(&mut self, id: &str) -> Result<SharedMinion> {
        let id = MinionId::from(id);
        let Some(record) = records::load_record(self.store.as_ref(), &id)? else {
            bail!("No minion {} owned by '{}'", id, self.owner);
        };
        self.spawn_record(&record)
    }

    /// Respawn every persisted minion. Ones that fail to load are skipped
    /// and keep their record untouched.
    fn respawn_all(&mut self) -> Result<Vec<SharedMinion>> {
        let mut minions = Vec::new();
        for record in records::list_records(self.store.as_ref())? {
            match self.spawn_record(&record) {
                Ok(minion) => minions.push(minion),
                Err(e) => error!("Skipping minion {}: {:#}", record.id, e),
            }
        }
        Ok(minions)
    }
}

/// Load `minions.toml` from the home directory, writing defaults rooted at
/// that directory on first use.
fn load_or_init_config(home_dir: &Path) -> Result<MinionsConfig> {
    if !home_dir.exists() {
        std::fs::create_dir_all(home_dir).with_context(|| {
            format!("Failed to create home directory: {}", home_dir.display())
        })?;
    }

    let config_path = home_dir.join("minions.toml");
    if config_path.exists() {
        return config::load_config(&config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()));
    }

    let cfg = MinionsConfig::for_home(home_dir);
    config::save_config(&cfg, &config_path)?;
    eprintln!(
        "{} Wrote default config to {}",
        "Note:".yellow().bold(),
        config_path.display()
    );
    Ok(cfg)
}

fn colorize_stacks(catalog: &Catalog, record: &MinionRecord) -> String {
    let capacity = minions::inventory::capacity_for_level(record.level);
    let used = record.items.len();
    let saturated = record.items.iter().all(|(kind, count)| {
        catalog
            .max_stack_size(kind)
            .is_some_and(|max| *count >= max)
    });
    let text = format!("{} / {}", used, capacity);
    if used >= capacity && saturated {
        text.red().bold().to_string()
    } else if used >= capacity {
        text.yellow().to_string()
    } else {
        text.green().to_string()
    }
}
