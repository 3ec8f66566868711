//! litebench command-line interface.

use std::net::IpAddr;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use litebench::capacity::HostCapacity;
use litebench::engine::{
    BenchmarkEngine, RunParams, DEFAULT_BATCH_SIZE, DEFAULT_MAX_READ_SAMPLE,
    DEFAULT_TOTAL_INSERTS,
};
use litebench::server::{self, ServerOptions};
use litebench::store::{Store, StoreOptions};

#[derive(Parser, Debug)]
#[command(
    name = "litebench",
    version,
    about = "SQLite insert/read throughput benchmark with a JSON API dashboard"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the JSON API and dashboard page.
    Serve(ServeArgs),
    /// Run one benchmark and print the result as JSON.
    Run(RunArgs),
    /// Print the host capacity probe as JSON.
    Capacity,
}

#[derive(Args, Debug)]
struct StoreArgs {
    /// Path to the SQLite database file. Defaults to ./database.sqlite,
    /// or /data/database.sqlite in production mode.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Production mode (y/n). Enables result caching and the /data
    /// default path.
    #[arg(long, env = "IS_PROD", value_parser = prod_flag, default_value = "n", value_name = "y|n")]
    prod: bool,
}

impl StoreArgs {
    fn db_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(|| {
            if self.prod {
                PathBuf::from("/data/database.sqlite")
            } else {
                PathBuf::from("./database.sqlite")
            }
        })
    }
}

#[derive(Args, Debug)]
struct BenchArgs {
    /// Insert attempts for the write phase.
    #[arg(long, default_value_t = DEFAULT_TOTAL_INSERTS)]
    inserts: u64,

    /// Inserts committed per transaction.
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: u64,

    /// Upper bound on the read-phase sample size.
    #[arg(long, default_value_t = DEFAULT_MAX_READ_SAMPLE)]
    read_sample: u64,

    /// RNG seed for repeatable runs.
    #[arg(long)]
    seed: Option<u64>,
}

impl BenchArgs {
    fn params(&self) -> RunParams {
        RunParams {
            total_inserts: self.inserts,
            batch_size: self.batch_size,
            max_read_sample: self.read_sample,
            seed: self.seed,
        }
    }
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    bench: BenchArgs,

    /// Network interface to bind to.
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Listening port.
    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Result cache TTL in seconds. Defaults to 300 in production mode
    /// and 0 otherwise.
    #[arg(long)]
    cache_ttl_secs: Option<u64>,

    /// Allowed CORS origin for remote dashboards (repeatable).
    #[arg(long = "allow-origin", value_name = "ORIGIN")]
    allow_origins: Vec<String>,
}

#[derive(Args, Debug)]
struct RunArgs {
    #[command(flatten)]
    store: StoreArgs,

    #[command(flatten)]
    bench: BenchArgs,
}

fn prod_flag(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" | "true" | "1" => Ok(true),
        "" | "n" | "no" | "false" | "0" => Ok(false),
        other => Err(format!("expected y or n, got {other:?}")),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("litebench failed: {err}");
        process::exit(1);
    }
}

fn try_main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => {
            let options = ServerOptions {
                db_path: args.store.db_path(),
                production: args.store.prod,
                host: args.host,
                port: args.port,
                cache_ttl: args.cache_ttl_secs.map(Duration::from_secs),
                allow_origins: args.allow_origins,
                run_params: args.bench.params(),
            };
            tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?
                .block_on(server::serve(options))?;
        }
        Command::Run(args) => {
            init_tracing();
            let opts = StoreOptions::new(args.store.db_path()).production(args.store.prod);
            let mut store = Store::open(&opts)?;
            let result = BenchmarkEngine::new(args.bench.params()).run(&mut store)?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Capacity => {
            println!("{}", serde_json::to_string_pretty(&HostCapacity::probe())?);
        }
    }
    Ok(())
}
