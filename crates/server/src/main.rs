//! Docgate gateway binary.
//!
//! `docgate [--config docgate.toml] [--listen 0.0.0.0:5000] [--init]`

use std::path::PathBuf;
use std::process;

use clap::Parser;
use docgate_server::config::CONFIG_FILE_NAME;
use docgate_server::{build_gateway, install_tracing_subscriber, serve, GatewayConfig, ServeError};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "docgate", version, about = "Validating document gateway")]
struct Args {
    /// Config file; defaults apply when it is absent.
    #[arg(long, env = "DOCGATE_CONFIG", default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    /// Override the configured listen address.
    #[arg(long, env = "DOCGATE_LISTEN")]
    listen: Option<String>,

    /// Write a commented default config file if none exists, then exit.
    #[arg(long)]
    init: bool,
}

fn main() {
    let args = Args::parse();
    install_tracing_subscriber();

    if args.init {
        if let Err(e) = GatewayConfig::write_default_if_missing(&args.config) {
            eprintln!("{}", e);
            process::exit(1);
        }
        println!("Config written to {}", args.config.display());
        return;
    }

    if let Err(e) = run(args) {
        eprintln!("{}", e);
        process::exit(1);
    }
}

fn load_config(args: &Args) -> Result<GatewayConfig, ServeError> {
    let mut config = if args.config.exists() {
        GatewayConfig::from_file(&args.config)?
    } else {
        info!(path = %args.config.display(), "config file not found, using defaults");
        GatewayConfig::default()
    };
    if let Some(listen) = &args.listen {
        config.listen = listen.clone();
        config.validate()?;
    }
    Ok(config)
}

fn run(args: Args) -> Result<(), ServeError> {
    let config = load_config(&args)?;
    let addr = config.listen_addr()?;
    let gateway = build_gateway(&config)?;
    info!(
        backend = ?config.backend.kind,
        spec_dir = %config.spec_dir.display(),
        page_size = config.cursor.page_size,
        cursor_ttl_secs = config.cursor.ttl_secs,
        "gateway ready"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(
        gateway,
        config.token_table(),
        addr,
        config.sweep_interval(),
    ))
}
