//! relsync CLI
//!
//! Imports asset relationships from a SQL source into a remote CMDB:
//! links, dependencies, and impacts are created, corrected, or removed to
//! match the source rows.

use anyhow::Result;
use clap::Parser;
use colored::{ColoredString, Colorize};
use relsync_connectors::{CmdbRestClient, EndpointConfig};
use relsync_core::{
    graph_module_installed, CmdbApi, Counters, LabelMaps, RemoteStateCache, SyncError,
    SyncOptions, SyncSession,
};
use relsync_observability::{init_logging_with_config, LoggingConfig};
use std::path::PathBuf;
use tracing::{info, warn, Level};

mod config;
mod db;

use config::AppConfig;

#[derive(Parser)]
#[command(name = "relsync")]
#[command(version)]
#[command(about = "Syncs asset relationships from a SQL source into a remote CMDB", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "config/relsync.yaml")]
    config: PathBuf,

    /// Log planned mutations without contacting the remote service
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;

    let logging = if cli.verbose {
        LoggingConfig::verbose()
    } else {
        LoggingConfig {
            level: config.logging.level.parse().unwrap_or(Level::INFO),
            json_format: config.logging.json_format,
            ..Default::default()
        }
    };
    init_logging_with_config(logging);

    info!(version = env!("CARGO_PKG_VERSION"), "relsync starting");
    if cli.dry_run {
        warn!("dry-run mode enabled, no changes will be made");
    }

    let client = CmdbRestClient::new(EndpointConfig {
        base_url: config.remote.base_url.clone(),
        api_key: config.remote.api_key.clone(),
        timeout_secs: config.remote.timeout_secs,
        max_retries: config.remote.max_retries,
    })?;

    // A failed module probe degrades to links-only rather than aborting.
    let graph_module = match client.installed_modules().await {
        Ok(modules) => graph_module_installed(&modules),
        Err(e) => {
            warn!(error = %e, "could not determine installed modules, continuing without the graph module");
            false
        }
    };
    if !graph_module {
        info!("graph module not installed, dependencies and impacts will be skipped");
    }

    let cache = RemoteStateCache::load(&client, config.remote_key, graph_module).await?;

    let pool = db::connect(&config.database).await?;
    let rows = db::fetch_rows(&pool, &config.query).await?;
    let removal_rows = if config.remove_links {
        let query = config.remove_query.as_deref().unwrap_or_default();
        db::fetch_rows(&pool, query).await?
    } else {
        Vec::new()
    };
    pool.close().await;

    if rows.is_empty() && removal_rows.is_empty() {
        return Err(SyncError::NoSourceRows.into());
    }

    let labels = LabelMaps::new(config.dependency_map.clone(), config.impact_map.clone());
    let options = SyncOptions {
        graph_module,
        dry_run: cli.dry_run,
    };
    let mut session = SyncSession::new(&client, cache, labels, options);

    session.process_relationships(&rows, &config.fields).await;
    if config.remove_links {
        if let Some(fields) = &config.remove_fields {
            session.process_removals(&removal_rows, fields).await;
        }
    }

    let counters = session.into_counters();
    print_summary(&counters, config.remove_links, cli.dry_run);
    Ok(())
}

fn failures(n: u64) -> ColoredString {
    if n > 0 {
        n.to_string().red()
    } else {
        n.to_string().normal()
    }
}

fn print_summary(counters: &Counters, removal: bool, dry_run: bool) {
    println!();
    if dry_run {
        println!(
            "{}",
            "Dry run: no changes were made to the remote instance"
                .yellow()
                .bold()
        );
    }
    println!("{}", "==== Relationship Import Summary ====".cyan().bold());
    println!("Links created:          {}", counters.links_created.to_string().green());
    println!("Links skipped:          {}", counters.links_skipped);
    println!("Links failed:           {}", failures(counters.links_failed));
    println!("Dependencies created:   {}", counters.deps_created.to_string().green());
    println!("Dependencies updated:   {}", counters.deps_updated.to_string().green());
    println!("Dependencies skipped:   {}", counters.deps_skipped);
    println!("Dependencies failed:    {}", failures(counters.deps_failed));
    println!("Dependency updates failed: {}", failures(counters.deps_update_failed));
    println!("Impacts created:        {}", counters.imps_created.to_string().green());
    println!("Impacts updated:        {}", counters.imps_updated.to_string().green());
    println!("Impacts skipped:        {}", counters.imps_skipped);
    println!("Impacts failed:         {}", failures(counters.imps_failed));
    println!("Impact updates failed:  {}", failures(counters.imps_update_failed));

    if removal {
        println!("{}", "---- Removal Pass ----".cyan());
        println!("Links removed:          {}", counters.remove_links_success.to_string().green());
        println!("Link removals skipped:  {}", counters.remove_links_skipped);
        println!("Link removals failed:   {}", failures(counters.remove_links_failed));
        println!("Dependencies removed:   {}", counters.remove_deps_success.to_string().green());
        println!("Dependency removals skipped: {}", counters.remove_deps_skipped);
        println!("Dependency removals failed:  {}", failures(counters.remove_deps_failed));
        println!("Impacts removed:        {}", counters.remove_imps_success.to_string().green());
        println!("Impact removals skipped: {}", counters.remove_imps_skipped);
        println!("Impact removals failed:  {}", failures(counters.remove_imps_failed));
    }

    println!("Total changes:          {}", counters.total_changes());
    if !counters.is_clean() {
        println!("{}", "Completed with failures".red().bold());
    }
}
