//! digitd - handwritten digit recognition service
//!
//! Commands:
//! - `digitd serve` - run the HTTP inference API (default)
//! - `digitd train` - train the MNIST classifier and export the artifact

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use digitd::config::AppConfig;
use digitd::{server, training};

#[derive(Parser, Debug)]
#[command(name = "digitd")]
#[command(author, version, about = "MNIST digit classifier with an HTTP inference endpoint")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP inference API
    Serve {
        /// Listening port (overrides PORT env and config file)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Train the classifier on MNIST and export the model artifact
    Train {
        /// Number of training epochs
        #[arg(long)]
        epochs: Option<usize>,

        /// Batch size
        #[arg(long)]
        batch_size: Option<usize>,

        /// Test predictions to render after training (0 disables)
        #[arg(long)]
        show: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();

    let mut config = AppConfig::load()?;

    match Cli::parse().command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            validate(&config)?;
            server::start_api_server(&config).await?;
        }
        Commands::Train {
            epochs,
            batch_size,
            show,
        } => {
            if let Some(epochs) = epochs {
                config.training.epochs = epochs;
            }
            if let Some(batch_size) = batch_size {
                config.training.batch_size = batch_size;
            }
            if let Some(show) = show {
                config.training.show_predictions = show;
            }
            validate(&config)?;

            info!("training digit classifier");
            tokio::task::spawn_blocking(move || training::train(&config)).await??;
        }
    }

    Ok(())
}

fn validate(config: &AppConfig) -> Result<()> {
    config
        .validate()
        .map_err(|errors| anyhow::anyhow!("invalid configuration: {}", errors.join("; ")))
}

fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,digitd=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
