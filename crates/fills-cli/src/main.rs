use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fills_config::{load_layered_yaml, ServiceConfig};
use fills_db::{FillStore, FilterCatalog, StoreOptions};
use fills_pnl::export;
use fills_schemas::FilterSpec;

#[derive(Parser)]
#[command(name = "fills")]
#[command(about = "Fill filtering and cumulative PnL CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order; `FILLS_*` env vars override them
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Load fills from a CSV file (header: timestamp,symbol,exchange,side,fill_price,fill_quantity)
    Seed {
        #[arg(long)]
        csv: PathBuf,
    },

    /// Print the distinct filter values per categorical column
    Filters,

    /// Compute the cumulative PnL series for a filter spec
    Pnl {
        /// JSON object of column -> [values], e.g. '{"symbol": ["BTC"]}'
        #[arg(long, default_value = "{}")]
        filters: String,

        /// Also write the per-fill breakdown to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Print the series as JSON instead of text lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> local...)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    /// Connectivity and schema presence
    Status,

    /// Create the fills table if missing
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Db { cmd } => {
            let create = matches!(cmd, DbCmd::Init);
            let store = open_store(&cli.config_paths, create).await?;
            match cmd {
                DbCmd::Status => {
                    let s = fills_db::status(&store).await?;
                    println!("db_ok={} has_fills_table={}", s.ok, s.has_fills_table);
                }
                DbCmd::Init => {
                    fills_db::migrate(&store).await?;
                    println!("migrations_applied=true");
                }
            }
            store.close().await;
        }

        Commands::Seed { csv } => {
            let fills = fills_db::load_fills_csv(&csv)?;
            let store = open_store(&cli.config_paths, true).await?;
            fills_db::migrate(&store).await?;
            let n = fills_db::insert_fills(&store, &fills).await?;
            println!("inserted={n}");
            store.close().await;
        }

        Commands::Filters => {
            let store = open_store(&cli.config_paths, false).await?;
            let options = FilterCatalog::default().options(&store).await?;
            println!("{}", serde_json::to_string_pretty(&options)?);
            store.close().await;
        }

        Commands::Pnl { filters, csv, json } => {
            let spec = FilterSpec::from_json_str(&filters)?;
            let store = open_store(&cli.config_paths, false).await?;
            let series = fills_db::pnl_by_filters(&store, &spec).await?;
            store.close().await;

            if let Some(path) = &csv {
                export::write_csv_path(&series, path)?;
                eprintln!("csv_written={} rows={}", path.display(), series.len());
            }

            if json {
                println!("{}", export::to_json_list(&series)?);
            } else {
                for p in series.points() {
                    println!("{} {}", p.timestamp, p.cumulative_pnl);
                }
                match series.final_pnl() {
                    Some(v) => println!("final_pnl={v}"),
                    None => println!("final_pnl=none"),
                }
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .init();
}

/// Only `db init` and `seed` pass `create`; every other command needs an
/// existing database.
async fn open_store(config_paths: &[String], create: bool) -> Result<FillStore> {
    let base = if config_paths.is_empty() {
        ServiceConfig::default()
    } else {
        let refs: Vec<&str> = config_paths.iter().map(|s| s.as_str()).collect();
        load_layered_yaml(&refs)?.service()?
    };
    let cfg = base.with_env_overrides()?;
    let db = &cfg.database;

    let opts = StoreOptions {
        create_if_missing: create,
        max_connections: db.max_connections,
        query_timeout: db.query_timeout(),
        connect_attempts: db.connect_attempts,
        connect_backoff: db.connect_backoff(),
    };
    FillStore::open(&db.url, opts)
        .await
        .with_context(|| format!("open fills store: {}", db.url))
}
