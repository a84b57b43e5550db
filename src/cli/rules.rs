//! Rule CLI commands
//!
//! Drives the rule lifecycle service directly against the configured database.
//! Mutating commands print the change events they caused.

use anyhow::{Context, Result};
use clap::{ArgGroup, Subcommand};
use tokio::sync::broadcast;

use super::output::{print_output, print_table_header, truncate, OutputFormat};
use crate::domain::{ApplicationId, MatchFields, MatchMethod, MatchObject, RuleId, RuleInput};
use crate::events::{RuleChangeEvent, RuleWithAppName};
use crate::services::RuleView;
use crate::RuleCore;

#[derive(Subcommand)]
pub enum RuleCommands {
    /// List rules, newest first
    List {
        /// Only rules of this application
        #[arg(long)]
        app: Option<String>,

        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table")]
        output: String,
    },

    /// Show the enabled-rule snapshot used to warm up route caches
    Enabled {
        /// Output format (json, yaml, or table)
        #[arg(short, long, default_value = "table")]
        output: String,
    },

    /// Add a rule
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        app_id: i64,

        /// Application instance version the rule routes to
        #[arg(long)]
        version: String,

        /// Create the rule disabled
        #[arg(long)]
        disabled: bool,

        /// DEFAULT, HEADER or QUERY
        #[arg(long, default_value = "DEFAULT")]
        match_object: MatchObject,

        #[arg(long)]
        match_key: Option<String>,

        /// EQUALS, REGEX, PREFIX or CONTAINS
        #[arg(long)]
        match_method: Option<MatchMethod>,

        #[arg(long)]
        match_rule: Option<String>,
    },

    /// Delete a rule
    Delete {
        /// Rule ID
        id: i64,
    },

    /// Enable or disable a rule
    #[command(group(ArgGroup::new("state").required(true).args(["enabled", "disabled"])))]
    Status {
        /// Rule ID
        id: i64,

        #[arg(long)]
        enabled: bool,

        #[arg(long)]
        disabled: bool,

        /// Application name carried in the change event
        #[arg(long)]
        app: String,
    },
}

/// Handle rule commands
pub async fn handle_rule_command(command: RuleCommands, core: &RuleCore) -> Result<()> {
    match command {
        RuleCommands::List { app, output } => {
            let format = output.parse::<OutputFormat>()?;
            let views = core.service.list_rules(app.as_deref()).await?;
            match format {
                OutputFormat::Table => print_rules_table(&views),
                format => print_output(&views, format)?,
            }
        }

        RuleCommands::Enabled { output } => {
            let format = output.parse::<OutputFormat>()?;
            let rules = core.service.get_enabled_rules().await?;
            match format {
                OutputFormat::Table => {
                    print_enabled_table(&rules);
                    println!(
                        "Consumers resync this snapshot every {}s",
                        core.snapshot_refresh_interval().as_secs()
                    );
                }
                format => print_output(&rules, format)?,
            }
        }

        RuleCommands::Add {
            name,
            app_id,
            version,
            disabled,
            match_object,
            match_key,
            match_method,
            match_rule,
        } => {
            let input = RuleInput::new_default(name, ApplicationId::new(app_id), version, !disabled)
                .with_match(
                    match_object,
                    MatchFields { key: match_key, method: match_method, rule: match_rule },
                );

            let mut events = core.events.subscribe();
            let rule = core.service.add_rule(input).await.context("Failed to add rule")?;
            println!("Rule '{}' created with id {}", rule.name, rule.id);
            print_events(&mut events)?;
        }

        RuleCommands::Delete { id } => {
            let mut events = core.events.subscribe();
            core.service
                .delete_rule(RuleId::new(id))
                .await
                .with_context(|| format!("Failed to delete rule {}", id))?;
            println!("Rule {} deleted", id);
            print_events(&mut events)?;
        }

        RuleCommands::Status { id, enabled, disabled: _, app } => {
            let mut events = core.events.subscribe();
            core.service
                .change_status(RuleId::new(id), enabled, &app)
                .await
                .with_context(|| format!("Failed to change status of rule {}", id))?;
            println!("Rule {} {}", id, if enabled { "enabled" } else { "disabled" });
            print_events(&mut events)?;
        }
    }

    Ok(())
}

/// Print every event already queued on `events` as JSON
fn print_events(events: &mut broadcast::Receiver<RuleChangeEvent>) -> Result<()> {
    while let Ok(event) = events.try_recv() {
        let json = serde_json::to_string(&event).context("Failed to serialize event")?;
        println!("event: {}", json);
    }
    Ok(())
}

fn print_rules_table(views: &[RuleView]) {
    if views.is_empty() {
        println!("No rules found");
        return;
    }

    print_table_header(&[
        ("ID", 8),
        ("Name", 24),
        ("Application", 20),
        ("Version", 12),
        ("Enabled", 8),
        ("Match", 40),
    ]);
    for view in views {
        println!(
            "{:<8} {:<24} {:<20} {:<12} {:<8} {}",
            view.id,
            truncate(&view.name, 24),
            truncate(view.application_name.as_deref().unwrap_or("-"), 20),
            truncate(&view.version, 12),
            view.enabled,
            view.match_descriptor
        );
    }
}

fn print_enabled_table(rules: &[RuleWithAppName]) {
    if rules.is_empty() {
        println!("No enabled rules");
        return;
    }

    print_table_header(&[("ID", 8), ("Name", 24), ("Application", 20), ("Version", 12)]);
    for rule in rules {
        println!(
            "{:<8} {:<24} {:<20} {:<12}",
            rule.id,
            truncate(&rule.name, 24),
            truncate(&rule.application_name, 20),
            truncate(&rule.version, 12)
        );
    }
}
