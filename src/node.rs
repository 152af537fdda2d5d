//! Process-level wiring: one ledger instance, its store and configuration.

use crate::blockchain::{genesis, Block, Ledger};
use crate::config::Config;
use crate::crypto::Sha256Hash;
use crate::error::{ChainError, Result};
use crate::persistence::{BlockStore, ChainPointer, ChainPointerStore, FileStore};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// A store that holds both blocks and chain pointers.
pub trait LedgerStore: BlockStore + ChainPointerStore {}

impl<T: BlockStore + ChainPointerStore> LedgerStore for T {}

/// Shared handle to the served chain. The write lock on `ledger` is the
/// single-writer guard for append-and-persist sequences.
#[derive(Clone)]
pub struct Node {
    pub config: Config,
    pub store: Arc<dyn LedgerStore>,
    pub ledger: Arc<RwLock<Ledger>>,
}

impl Node {
    /// Opens the file store named by `config` and loads or creates the chain.
    pub fn open(config: Config) -> Result<Self> {
        let store = FileStore::with_dirs(config.storage.blocks_dir(), config.storage.chains_dir());
        Self::with_store(config, Arc::new(store))
    }

    pub fn with_store(config: Config, store: Arc<dyn LedgerStore>) -> Result<Self> {
        let root = resolve_genesis(&config, store.as_ref())?;
        let ledger = Ledger::load_or_init(store.as_ref(), &config.chain.label, &root)?;
        info!(
            chain = %ledger.label(),
            height = ledger.len(),
            genesis = %hex::encode(ledger.genesis_hash()),
            "node ready"
        );
        Ok(Node {
            config,
            store,
            ledger: Arc::new(RwLock::new(ledger)),
        })
    }

    /// Appends `block` and persists it together with the new chain pointer,
    /// all under the ledger write lock. The block and pointer reach the store
    /// before the in-memory ledger moves, so a failed write leaves the served
    /// tip where it was. Returns the new tip hash and its height.
    pub async fn append_and_persist(&self, block: Block) -> Result<(Sha256Hash, usize)> {
        let mut ledger = self.ledger.write().await;
        ledger.check_append(&block)?;

        self.store.save_block(&block)?;
        self.store.save_pointer(&ChainPointer {
            label: ledger.label().to_string(),
            genesis_hash: ledger.genesis_hash(),
            tip_hash: block.hash(),
        })?;

        ledger.append(block)?;
        let height = ledger.len() - 1;
        info!(chain = %ledger.label(), height, hash = %hex::encode(ledger.tip_hash()), "accepted and stored block");
        Ok((ledger.tip_hash(), height))
    }

    pub async fn tip_hash(&self) -> Sha256Hash {
        self.ledger.read().await.tip_hash()
    }
}

/// The root block configured for this node: a bootstrapped genesis from the
/// store when `chain.genesis_hash` is set, otherwise the built-in one.
pub fn resolve_genesis(config: &Config, store: &dyn LedgerStore) -> Result<Block> {
    match &config.chain.genesis_hash {
        None => Ok(genesis()),
        Some(hash_hex) => {
            let bytes = hex::decode(hash_hex.trim())?;
            let hash: Sha256Hash = bytes
                .try_into()
                .map_err(|_| ChainError::Config("chain.genesis_hash must be 32 bytes".to_string()))?;
            store.load_block(&hash)
        }
    }
}
