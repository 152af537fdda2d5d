#![forbid(unsafe_code)]
use authchain::api::run_api_server;
use authchain::blockchain::{genesis_bootstrap, Ledger};
use authchain::client::{submit_entry, LedgerClient};
use authchain::config::load_config;
use authchain::crypto::Identity;
use authchain::node::{resolve_genesis, Node};
use authchain::persistence::{BlockStore, FileStore};
use clap::{Parser, Subcommand};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the ledger HTTP server
    Serve {
        /// Overrides server.port from authchain.toml
        #[arg(long)]
        port: Option<u16>,
    },
    /// Signs an entry block on top of a server's tip and submits it
    Entry {
        /// Base URL of the ledger server
        server_url: String,
        /// Identity label; keys are created on first use
        identity: String,
        /// Text to record
        entry: String,
        /// Append the block instead of only validating it
        #[arg(long)]
        append: bool,
    },
    /// Creates a genesis block rooted at a local identity
    Bootstrap {
        /// Identity label; keys are created on first use
        identity: String,
    },
    /// Loads a stored chain and replays it
    Verify {
        /// Chain label; defaults to chain.label from authchain.toml
        label: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_config()?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.server.port = port;
            }
            let node = Node::open(config)?;
            run_api_server(node).await?;
        }
        Commands::Entry {
            server_url,
            identity,
            entry,
            append,
        } => {
            let signer = Identity::load_or_create(&config.storage.keys_dir(), &identity)?;
            let client = LedgerClient::new(server_url, Duration::from_secs(config.client.timeout_secs))?;
            let (block, reply) = submit_entry(&client, entry.as_bytes(), &signer).await?;
            print!("{}", reply);
            if append {
                println!("{}", client.append(&block).await?);
            }
        }
        Commands::Bootstrap { identity } => {
            let signer = Identity::load_or_create(&config.storage.keys_dir(), &identity)?;
            let root = genesis_bootstrap(&signer)?;
            let store = FileStore::open(&config.storage.data_dir);
            store.save_block(&root)?;
            println!("{}", root.hash_str());
            println!("Set chain.genesis_hash = \"{}\" in authchain.toml to serve this chain.", root.hash_str());
        }
        Commands::Verify { label } => {
            let label = label.unwrap_or_else(|| config.chain.label.clone());
            let store = FileStore::open(&config.storage.data_dir);
            let root = resolve_genesis(&config, &store)?;
            let ledger = Ledger::load_with_genesis(&store, &label, &root)?;
            ledger.verify()?;
            print!("{}", ledger);
        }
    }

    Ok(())
}
