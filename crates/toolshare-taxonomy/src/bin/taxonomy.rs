//! toolshare-taxonomy: command-line tool for the category engine.
//!
//! Reads `DATABASE_URL` and the `TOOLSHARE_*` engine settings from the
//! environment (a `.env` file is honored).

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use toolshare_core::{ItemContext, TaxonomyConfig};
use toolshare_db::{Database, PoolConfig};
use toolshare_taxonomy::{
    clamp_confidence, validate_source, CategoryService, ImportSource, TaxonomyImporter,
};

#[derive(Parser)]
#[command(name = "toolshare-taxonomy")]
#[command(author, version, about = "Category taxonomy tools for toolshare")]
#[command(propagate_version = true)]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the first lines of a taxonomy file or URL without importing
    ValidateFormat {
        /// Path or http(s) URL
        source: String,
    },

    /// Replace the stored external taxonomy
    Import {
        /// Path or http(s) URL
        source: String,

        /// Rows per insert batch
        #[arg(long)]
        batch_size: Option<usize>,

        /// Insert batches in flight at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Print the active category tree
    Tree {
        /// One full path per line instead of an indented tree
        #[arg(long)]
        flat: bool,
    },

    /// Rank categories for an item
    Suggest {
        /// Item name
        name: String,

        /// Item description
        #[arg(short, long)]
        description: Option<String>,

        /// Item tags (can specify multiple)
        #[arg(short, long)]
        tag: Vec<String>,

        /// Maximum suggestions to print
        #[arg(short, long, default_value_t = 5)]
        limit: usize,

        /// Rank imported external taxonomy entries instead of internal categories
        #[arg(long)]
        external: bool,
    },

    /// Apply pending database migrations
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let _guard = init_tracing();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr (or `LOG_FILE`) so stdout stays clean for output.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, daily rotation)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "toolshare=info,warn")
fn init_tracing() -> Option<WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "toolshare_taxonomy=info,toolshare_db=info,toolshare_core=info,warn".into()
    });
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("toolshare-taxonomy.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false));
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = TaxonomyConfig::from_env();
    config.validate()?;

    match cli.command {
        Commands::ValidateFormat { source } => {
            let source = ImportSource::parse(&source);
            let client = reqwest::Client::new();
            let report = validate_source(&source, &client, &config).await;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{}: {} lines checked, {} records",
                    source, report.lines_checked, report.record_count
                );
                for e in &report.errors {
                    println!("  {}", e);
                }
                println!("{}", if report.is_valid { "OK" } else { "INVALID" });
            }
            Ok(exit_code(report.is_valid))
        }

        Commands::Import {
            source,
            batch_size,
            concurrency,
        } => {
            let mut config = config;
            if let Some(n) = batch_size {
                config = config.with_batch_size(n);
            }
            if let Some(n) = concurrency {
                config = config.with_concurrency(n);
            }
            config.validate()?;

            let db = connect().await?;
            let importer = TaxonomyImporter::new(Arc::new(db.taxonomy.clone()), config);
            let result = importer
                .import_from_source(&ImportSource::parse(&source))
                .await;
            toolshare_db::log_pool_usage(db.pool(), "import");
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                println!("Imported {} records", result.imported_count);
                for w in &result.warnings {
                    println!("  warning: {}", w);
                }
                for e in &result.errors {
                    println!("  error: {}", e);
                }
            }
            Ok(exit_code(result.success))
        }

        Commands::Tree { flat } => {
            let db = connect().await?;
            let service = CategoryService::new(Arc::new(db.categories.clone()), config);
            let forest = service.tree().await?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&forest.flatten())?);
            } else if flat {
                for entry in forest.flatten() {
                    println!("{}\t{}", entry.id, entry.path);
                }
            } else {
                for node in forest.walk() {
                    println!("{}{}", "  ".repeat(node.depth), node.name());
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Suggest {
            name,
            description,
            tag,
            limit,
            external,
        } => {
            let db = connect().await?;
            let service = CategoryService::new(Arc::new(db.categories.clone()), config)
                .with_taxonomy(Arc::new(db.taxonomy.clone()));
            let mut ctx = ItemContext::named(name).with_tags(tag);
            if let Some(d) = description {
                ctx = ctx.with_description(d);
            }
            let suggestions = if external {
                service.suggest_external(&ctx, limit).await?
            } else {
                service.suggest(&ctx, limit).await?
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&suggestions)?);
            } else {
                for s in &suggestions {
                    println!("{:>5.1}  {}", clamp_confidence(s.confidence), s.path);
                    for reason in &s.reasons {
                        println!("         - {}", reason);
                    }
                }
            }
            Ok(ExitCode::SUCCESS)
        }

        Commands::Migrate => {
            let db = connect().await?;
            db.migrate().await?;
            info!(subsystem = "database", op = "migrate", "Migrations applied");
            println!("Migrations applied");
            Ok(ExitCode::SUCCESS)
        }
    }
}

async fn connect() -> anyhow::Result<Database> {
    let url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
    Ok(Database::connect_with_config(&url, PoolConfig::from_env()).await?)
}

fn exit_code(ok: bool) -> ExitCode {
    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
