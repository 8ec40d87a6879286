use std::path::PathBuf;
use std::process::exit;

use clap::Parser;
use remote_catalog::cli::RemoteCatalogCli;
use remote_catalog::config::context::build_catalog;
use remote_catalog::config::schema::{load_config, LogFormat};
use tracing::{error, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[clap(
    name = "remote-catalog",
    version,
    about = "Frontend-side replica of a cluster catalog"
)]
struct Args {
    #[clap(short, long, default_value = "remote-catalog.toml")]
    config_path: PathBuf,

    #[clap(long, help = "Run a single command (e.g. '\\l') and exit")]
    one_off: Option<String>,

    #[clap(long, help = "Start an interactive shell")]
    cli: bool,
}

fn init_logging(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Logs go to stderr, stdout is for command output
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let config = match load_config(&args.config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Error loading the config from {}: {e}",
                args.config_path.display()
            );
            exit(1);
        }
    };
    init_logging(config.misc.log_format);

    let catalog = match build_catalog(&config).await {
        Ok(catalog) => catalog,
        Err(e) => {
            error!("Error loading the catalog: {e}");
            exit(1);
        }
    };
    let cli = RemoteCatalogCli::new(catalog.clone(), config.misc.default_schema.clone());

    if let Some(line) = args.one_off {
        match cli.run_line(&line).await {
            Ok(output) => {
                if !output.is_empty() {
                    println!("{output}")
                }
            }
            Err(e) => {
                eprintln!("{e}");
                exit(1);
            }
        }
        return;
    }

    let heartbeat = catalog.start_heartbeat();

    if args.cli {
        if let Err(e) = cli.repl_loop().await {
            error!("CLI error: {e}");
        }
    } else {
        info!("Catalog loaded, press Ctrl+C to exit");
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Unable to listen for the shutdown signal: {e}");
        }
    }

    info!("Shutting down...");
    heartbeat.shutdown().await;
}
