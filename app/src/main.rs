#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

mod command;

use clap::{Parser, Subcommand};
use command::{
    AskInput, AskStrategy, CommandStrategy, InfoStrategy, InitStrategy, ServeInput,
    ServeStrategy, VersionStrategy,
};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "medrag")]
#[command(about = "Conversational medical question answering over a document index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the web chat server
    Serve {
        /// Address to bind (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Ask questions from the terminal
    Ask {
        /// Single question to ask
        #[arg(short = 'm', long)]
        message: Option<String>,
    },
    /// Initialize configuration
    Init,
    /// Show configuration and index status
    Info,
    /// Show version
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { host, port } => {
            ServeStrategy.execute(ServeInput { host, port }).await?;
        }
        Commands::Ask { message } => {
            AskStrategy.execute(AskInput { message }).await?;
        }
        Commands::Init => InitStrategy.execute(()).await?,
        Commands::Info => InfoStrategy.execute(()).await?,
        Commands::Version => VersionStrategy.execute(()).await?,
    }

    Ok(())
}
