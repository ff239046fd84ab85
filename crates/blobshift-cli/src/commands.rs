use std::sync::Arc;

use anyhow::Context;
use blobshift_migrate::{
    BlobstoreMigrator, CountingObserver, FanoutObserver, MigrationConfig, StoreTransfer,
    TracingObserver, WorkPool,
};
use colored::Colorize;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Migrate(args) => cmd_migrate(args),
        Command::Config => cmd_config(),
        Command::Buckets(args) => cmd_buckets(args),
    }
}

/// Apply command-line overrides on top of the file configuration.
fn apply_overrides(mut config: MigrationConfig, args: &MigrateArgs) -> MigrationConfig {
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    for bucket in &args.exclusions {
        if !config.exclusions.contains(bucket) {
            config.exclusions.push(bucket.clone());
        }
    }
    config
}

fn cmd_migrate(args: MigrateArgs) -> anyhow::Result<()> {
    let config = MigrationConfig::load(&args.config)?;
    let config = apply_overrides(config, &args);
    config.validate()?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
    let counts = Arc::new(CountingObserver::new());
    runtime.block_on(run_migration(&config, Arc::clone(&counts)))?;

    let summary = counts.summary();
    println!("{} Migration complete", "✓".green().bold());
    println!("  Buckets:  {}", summary.buckets.to_string().bold());
    println!("  Migrated: {}", summary.migrated.to_string().green());
    println!("  Skipped:  {}", summary.skipped.to_string().cyan());
    if summary.failed > 0 {
        println!("  Failed:   {}", summary.failed.to_string().red().bold());
        for (path, reason) in counts.failures() {
            println!("    {} {}: {}", "✗".red(), path.yellow(), reason);
        }
    }
    Ok(())
}

async fn run_migration(config: &MigrationConfig, counts: Arc<CountingObserver>) -> anyhow::Result<()> {
    let src = config
        .source
        .build(&config.buckets)
        .context("failed to open source store")?;
    let dst = config
        .destination
        .build(&config.buckets)
        .context("failed to open destination store")?;
    println!(
        "Migrating {} → {} ({} workers)",
        config.source.describe().bold(),
        config.destination.describe().bold(),
        config.concurrency
    );

    let pool = Arc::new(WorkPool::new(config.concurrency)?);
    let observer = FanoutObserver::new()
        .with(Arc::new(TracingObserver))
        .with(counts);
    let migrator = BlobstoreMigrator::new(
        Arc::clone(&pool),
        Arc::new(StoreTransfer::new(Arc::clone(&dst), Arc::clone(&src))),
        config.buckets.clone(),
        config.exclusions.clone(),
        Arc::new(observer),
    );

    let result = migrator.migrate(Some(dst), Some(src)).await;
    pool.shutdown().await;
    Ok(result?)
}

fn cmd_config() -> anyhow::Result<()> {
    print!("{}", MigrationConfig::default().to_toml_string()?);
    Ok(())
}

fn cmd_buckets(args: BucketsArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => MigrationConfig::load(path)?,
        None => MigrationConfig::default(),
    };
    for bucket in &config.buckets {
        if config.exclusions.contains(bucket) {
            println!("  {} {}", bucket.dimmed(), "(excluded)".yellow());
        } else {
            println!("  {}", bucket.bold());
        }
    }
    Ok(())
}
