//! # Command Line Interface
//!
//! Operator commands for database management and the route rule lifecycle.

pub mod output;
pub mod rules;

use std::path::PathBuf;

use crate::config::AppConfig;
use crate::observability::{describe_rule_metrics, init_logging, log_config_info};
use crate::storage::{
    check_connection, create_pool, list_applied_migrations, pending_migrations,
    run_db_migrations, validate_migrations, MigrationInfo,
};
use crate::RuleCore;
use clap::{Parser, Subcommand};
use output::{print_table_header, truncate};

#[derive(Parser)]
#[command(name = "gateway-admin")]
#[command(about = "Route rule administration for the API gateway")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (TOML or YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database URL override
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Database management commands
    Database {
        #[command(subcommand)]
        command: DatabaseCommands,
    },

    /// Route rule commands
    Rule {
        #[command(subcommand)]
        command: rules::RuleCommands,
    },
}

#[derive(Subcommand)]
pub enum DatabaseCommands {
    /// Run pending migrations
    Migrate {
        /// Dry run - show what would be migrated
        #[arg(long)]
        dry_run: bool,
    },

    /// Check connectivity and migration status
    Status,

    /// List all applied migrations
    List,
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }

    init_logging(&config.observability)?;
    describe_rule_metrics();
    log_config_info(&config);

    match cli.command {
        Commands::Database { command } => handle_database_command(command, config).await?,
        Commands::Rule { command } => {
            let core = RuleCore::connect(&config).await?;
            rules::handle_rule_command(command, &core).await?
        }
    }

    Ok(())
}

/// Handle database management commands
async fn handle_database_command(
    command: DatabaseCommands,
    mut config: AppConfig,
) -> anyhow::Result<()> {
    // Migration commands decide for themselves when to migrate
    config.database.auto_migrate = false;
    let pool = create_pool(&config.database).await?;

    match command {
        DatabaseCommands::Migrate { dry_run } => {
            let pending = pending_migrations(&pool).await?;
            if pending.is_empty() {
                println!("Database schema is up to date");
            } else if dry_run {
                println!("Dry run mode - pending migrations:");
                for migration in &pending {
                    println!("  {} {}", migration.version, migration.description);
                }
            } else {
                println!("Running {} database migration(s)...", pending.len());
                run_db_migrations(&pool).await?;
                println!("Migrations completed successfully!");
            }
        }

        DatabaseCommands::Status => {
            check_connection(&pool).await?;
            println!("✅ Database connection OK");
            if validate_migrations(&pool).await? {
                println!("✅ Database schema is up to date");
            } else {
                let pending = pending_migrations(&pool).await?;
                anyhow::bail!(
                    "Database schema is not up to date ({} pending migration(s))",
                    pending.len()
                );
            }
        }

        DatabaseCommands::List => {
            let migrations = list_applied_migrations(&pool).await?;
            if migrations.is_empty() {
                println!("No migrations have been applied");
            } else {
                println!("Applied migrations:");
                print_migrations_table(&migrations);
            }
        }
    }

    Ok(())
}

/// Print migrations in a formatted table
fn print_migrations_table(migrations: &[MigrationInfo]) {
    print_table_header(&[("Version", 15), ("Description", 50), ("Applied On", 25), ("Time", 10)]);

    for migration in migrations {
        println!(
            "{:<15} {:<50} {:<25} {:<10}",
            migration.version,
            truncate(&migration.description, 48),
            truncate(&migration.installed_on, 25),
            migration.execution_time
        );
    }
}
