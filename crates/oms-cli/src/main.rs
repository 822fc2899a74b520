use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::pipeline;

#[derive(Parser)]
#[command(name = "oms")]
#[command(about = "OMS order collection and processing CLI", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (defaults when omitted)
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

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> site...)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Collect orders from channel collectors into raw storage
    Collect {
        #[command(subcommand)]
        cmd: CollectCmd,
    },

    /// Normalize unprocessed raw orders into canonical orders
    Process {
        #[command(subcommand)]
        cmd: ProcessCmd,
    },

    /// Print order and backlog counters
    Stats,

    /// List unprocessed raw orders (errored included)
    Unprocessed {
        /// Restrict to one channel code
        #[arg(long)]
        channel: Option<String>,
    },

    /// List configured collectors and check their connections
    Collectors,

    /// Order lookups
    Order {
        #[command(subcommand)]
        cmd: OrderCmd,
    },

    /// Run the periodic scheduler until Ctrl-C
    Schedule,
}

#[derive(Subcommand)]
enum DbCmd {
    Status,
    /// Apply SQL migrations.
    Migrate,
}

#[derive(clap::Args)]
struct WindowArgs {
    /// Window start (RFC 3339)
    #[arg(long)]
    from: Option<String>,

    /// Window end (RFC 3339, default now)
    #[arg(long)]
    to: Option<String>,

    /// Lookback when --from is omitted (default collection.lookback_minutes)
    #[arg(long)]
    minutes: Option<i64>,
}

impl WindowArgs {
    fn resolve(&self, default_minutes: i64) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
        commands::resolve_window(
            self.from.as_deref(),
            self.to.as_deref(),
            self.minutes.unwrap_or(default_minutes),
            Utc::now(),
        )
    }
}

#[derive(Subcommand)]
enum CollectCmd {
    /// Every active channel; records the collection time on each
    All {
        #[command(flatten)]
        window: WindowArgs,
    },
    /// One channel by code
    Channel {
        #[arg(long)]
        code: String,

        #[command(flatten)]
        window: WindowArgs,
    },
}

#[derive(Subcommand)]
enum ProcessCmd {
    /// Every unprocessed raw order
    All,
    /// Unprocessed raw orders of one channel
    Channel {
        #[arg(long)]
        code: String,
    },
    /// A single raw order by id
    One {
        #[arg(long)]
        raw_order_id: String,
    },
}

#[derive(Subcommand)]
enum OrderCmd {
    /// Print an order and its items
    Show {
        #[arg(long)]
        order_no: String,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Dev-only convenience: a missing file is fine.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = oms_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = oms_db::status(&pool).await?;
                    println!("db_ok={} has_raw_orders_table={}", s.ok, s.has_raw_orders_table);
                }
                DbCmd::Migrate => {
                    oms_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let (loaded, _) = commands::load_config(&paths)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Collectors => {
            let (_, cfg) = commands::load_config(&cli.config_paths)?;
            pipeline::collectors(&cfg).await?;
        }

        Commands::Collect { cmd } => {
            let (cfg, svc) = commands::connect(&cli.config_paths).await?;
            let lookback = cfg.collection.lookback_minutes;
            match cmd {
                CollectCmd::All { window } => {
                    let (start, end) = window.resolve(lookback)?;
                    pipeline::collect_all(&svc, start, end).await?;
                }
                CollectCmd::Channel { code, window } => {
                    let (start, end) = window.resolve(lookback)?;
                    pipeline::collect_channel(&svc, &code, start, end).await?;
                }
            }
        }

        Commands::Process { cmd } => {
            let (_, svc) = commands::connect(&cli.config_paths).await?;
            match cmd {
                ProcessCmd::All => pipeline::process_all(&svc).await?,
                ProcessCmd::Channel { code } => pipeline::process_channel(&svc, &code).await?,
                ProcessCmd::One { raw_order_id } => {
                    pipeline::process_one(&svc, &raw_order_id).await?
                }
            }
        }

        Commands::Stats => {
            let (_, svc) = commands::connect(&cli.config_paths).await?;
            pipeline::stats(&svc).await?;
        }

        Commands::Unprocessed { channel } => {
            let (_, svc) = commands::connect(&cli.config_paths).await?;
            pipeline::unprocessed(&svc, channel.as_deref()).await?;
        }

        Commands::Order { cmd } => {
            let (_, svc) = commands::connect(&cli.config_paths).await?;
            match cmd {
                OrderCmd::Show { order_no } => pipeline::show_order(&svc, &order_no).await?,
            }
        }

        Commands::Schedule => {
            let (cfg, svc) = commands::connect(&cli.config_paths).await?;
            pipeline::schedule(&svc, &cfg).await?;
        }
    }

    Ok(())
}
