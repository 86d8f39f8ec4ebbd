mod logging;
mod serve;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use verificat_almanac::AlmanacStore;
use verificat_verify::{ConfigError, Verifier, VerifierConfig, VerifyError};

/// Default almanac database file.
const DEFAULT_DB: &str = "almanac.db.json";

/// Service owner readiness verification.
#[derive(Parser)]
#[command(
    name = "verificat",
    version,
    about = "Service owner readiness verification"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct StoreArgs {
    /// Path to the almanac JSON database
    #[arg(long, default_value = DEFAULT_DB)]
    db: PathBuf,
}

#[derive(Args)]
struct VerifyArgs {
    #[command(flatten)]
    store: StoreArgs,
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Service catalog base URL (overrides config and environment)
    #[arg(long)]
    catalog_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the verification HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "4330")]
        port: u16,
        #[command(flatten)]
        args: VerifyArgs,
    },

    /// Run one verification for a service and print the result
    Verify {
        /// Service name as known to the catalog
        service: String,
        #[command(flatten)]
        args: VerifyArgs,
    },

    /// Print the almanac, most-verified service first
    Almanac {
        #[command(flatten)]
        store: StoreArgs,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init_tracing();

    match cli.command {
        Commands::Serve { port, args } => {
            let (config, store) = prepare(&args);
            let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");
            if let Err(e) = rt.block_on(serve::start_server(port, config, store)) {
                eprintln!("Server error: {}", e);
                process::exit(1);
            }
        }
        Commands::Verify { service, args } => {
            let (config, store) = prepare(&args);
            cmd_verify(&service, &config, store);
        }
        Commands::Almanac { store } => {
            cmd_almanac(&store.db);
        }
    }
}

/// Resolve configuration and open the store, exiting on failure.
fn prepare(args: &VerifyArgs) -> (VerifierConfig, Arc<AlmanacStore<std::fs::File>>) {
    let config = match load_config(args.config.as_deref(), args.catalog_url.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };
    let store = match AlmanacStore::open(&args.store.db) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            eprintln!(
                "error: problem opening almanac {}: {}",
                args.store.db.display(),
                e
            );
            process::exit(1);
        }
    };
    (config, store)
}

fn load_config(path: Option<&Path>, catalog_url: Option<&str>) -> Result<VerifierConfig, ConfigError> {
    let mut config = match path {
        Some(p) => VerifierConfig::load(p)?,
        None => VerifierConfig::default(),
    };
    config.apply_env()?;
    if let Some(url) = catalog_url {
        config.catalog_url = url.to_string();
    }
    config.validate()?;
    Ok(config)
}

fn cmd_verify(service: &str, config: &VerifierConfig, store: Arc<AlmanacStore<std::fs::File>>) {
    let verifier = Verifier::from_config(config, store);
    let rt = tokio::runtime::Runtime::new().expect("failed to create tokio runtime");

    match rt.block_on(verifier.run_verification(service)) {
        Ok(result) => {
            let pretty = serde_json::to_string_pretty(&result).unwrap_or_default();
            println!("{}", pretty);
        }
        Err(e @ VerifyError::Catalog { .. }) => {
            eprintln!("error: {}", e);
            process::exit(2);
        }
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

fn cmd_almanac(db: &Path) {
    let store = match AlmanacStore::open(db) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: problem opening almanac {}: {}", db.display(), e);
            process::exit(1);
        }
    };
    let pretty = serde_json::to_string_pretty(&store.list()).unwrap_or_default();
    println!("{}", pretty);
}
