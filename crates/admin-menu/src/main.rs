//! Trovato admin menu tool
//!
//! Builds the admin menu from module manifests and the menu configuration
//! and prints it as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use trovato_admin_menu::menu::{FilterOptions, MenuConfig, Principal, StaticPrincipal};
use trovato_admin_menu::{MenuCache, MenuService, ModuleRegistry, Settings};

#[derive(Parser)]
#[command(name = "trovato-menu", about = "Build and inspect the Trovato admin menu")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the complete menu tree.
    Build,
    /// Print the permissions index.
    Index,
    /// Print the menu as seen by a user.
    Filter {
        /// Treat the user as an administrator.
        #[arg(long)]
        admin: bool,
        /// Filter for an anonymous visitor (ignores --permission).
        #[arg(long, conflicts_with = "admin")]
        anonymous: bool,
        /// A permission the user holds (repeatable).
        #[arg(long = "permission", short = 'p')]
        permissions: Vec<String>,
    },
    /// Print the alternative presences per module.
    Alternative,
}

fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("failed to load settings")?;

    let config = MenuConfig::load(&settings.menu_config)?;
    let registry = ModuleRegistry::load_dir(&settings.modules_dir)?;
    info!(
        modules = registry.len(),
        strategy = ?config.strategy(),
        "menu inputs loaded"
    );

    let options = FilterOptions {
        bypass_anonymous: settings.bypass_anonymous,
        ..Default::default()
    };
    let service = MenuService::with_options(
        config,
        registry.sources(),
        MenuCache::new(settings.cache_capacity, settings.cache_ttl),
        options,
    );

    match cli.command {
        Command::Build => print_json(&service.compiled()?.layout.to_view()),
        Command::Index => print_json(&service.compiled()?.index),
        Command::Filter {
            admin,
            anonymous,
            permissions,
        } => {
            let user = if admin {
                StaticPrincipal::admin()
            } else {
                StaticPrincipal::new(permissions)
            };
            let principal: Option<&dyn Principal> = (!anonymous).then_some(&user as &dyn Principal);
            print_json(&service.menu_for(principal)?.to_view())
        }
        Command::Alternative => print_json(&service.alternative()?),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{json}");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,trovato_admin_menu=info"));

    // JSON goes to stdout, so logs go to stderr.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
