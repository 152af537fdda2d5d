//! Content-addressed block storage and chain pointers for AuthChain
//!
//! Blocks are stored under the hex encoding of their own hash, so keys are
//! self-verifying and entries are write-once. A chain pointer records the
//! genesis and tip hashes of a named chain; everything else is rebuilt by
//! replay.

use crate::blockchain::Block;
use crate::crypto::Sha256Hash;
use crate::error::{ChainError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::{debug, info};

/// Abstraction for content-addressed block storage backends.
pub trait BlockStore: Send + Sync {
    /// Verifies `block` and stores its marshaled bytes under its hash.
    fn save_block(&self, block: &Block) -> Result<()>;
    /// Loads, decodes and verifies the block stored under `hash`.
    fn load_block(&self, hash: &Sha256Hash) -> Result<Block>;
    fn contains_block(&self, hash: &Sha256Hash) -> bool;
}

/// Abstraction for the per-chain {genesis, tip} record.
pub trait ChainPointerStore: Send + Sync {
    fn save_pointer(&self, pointer: &ChainPointer) -> Result<()>;
    fn load_pointer(&self, label: &str) -> Result<ChainPointer>;
    fn pointer_exists(&self, label: &str) -> bool;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainPointer {
    pub label: String,
    pub genesis_hash: Sha256Hash,
    pub tip_hash: Sha256Hash,
}

/// On-disk JSON form; hashes are base64 strings.
#[derive(Serialize, Deserialize)]
struct PointerFile {
    #[serde(with = "base64_hash")]
    genesis: Sha256Hash,
    #[serde(with = "base64_hash")]
    tip: Sha256Hash,
}

mod base64_hash {
    use super::*;

    pub fn serialize<S: Serializer>(hash: &Sha256Hash, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(hash))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Sha256Hash, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        let bytes = STANDARD.decode(encoded).map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| serde::de::Error::custom(format!("hash must be 32 bytes, got {}", b.len())))
    }
}

impl ChainPointer {
    pub fn to_json(&self) -> Result<String> {
        let file = PointerFile {
            genesis: self.genesis_hash,
            tip: self.tip_hash,
        };
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        file.serialize(&mut serializer)?;
        String::from_utf8(out).map_err(|e| ChainError::Decode(e.to_string()))
    }

    pub fn from_json(label: &str, json: &str) -> Result<Self> {
        let file: PointerFile = serde_json::from_str(json)?;
        Ok(ChainPointer {
            label: label.to_string(),
            genesis_hash: file.genesis,
            tip_hash: file.tip,
        })
    }
}

/// Decodes stored bytes and checks them against the key they were read from.
fn decode_stored_block(hash: &Sha256Hash, bytes: &[u8]) -> Result<Block> {
    let block = Block::unmarshal(bytes)?;
    block.verify()?;
    if &block.hash() != hash {
        return Err(ChainError::Decode(format!(
            "Stored block hashes to {}, expected {}",
            block.hash_str(),
            hex::encode(hash)
        )));
    }
    Ok(block)
}

/// Directory-backed store: `<blocks>/<hex(hash)>.dat` and `<chains>/<label>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    blocks_dir: PathBuf,
    chains_dir: PathBuf,
}

impl FileStore {
    /// Uses `<data_dir>/blocks` and `<data_dir>/blockchains`.
    pub fn open(data_dir: &Path) -> Self {
        Self::with_dirs(data_dir.join("blocks"), data_dir.join("blockchains"))
    }

    pub fn with_dirs(blocks_dir: PathBuf, chains_dir: PathBuf) -> Self {
        FileStore {
            blocks_dir,
            chains_dir,
        }
    }

    pub fn block_path(&self, hash: &Sha256Hash) -> PathBuf {
        self.blocks_dir.join(format!("{}.dat", hex::encode(hash)))
    }

    pub fn pointer_path(&self, label: &str) -> PathBuf {
        self.chains_dir.join(format!("{}.json", label))
    }
}

fn read_or_not_found(path: &Path, what: String) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ChainError::NotFound(what),
        _ => ChainError::from(e),
    })
}

impl BlockStore for FileStore {
    fn save_block(&self, block: &Block) -> Result<()> {
        block.verify()?;

        let path = self.block_path(&block.hash());
        if path.exists() {
            debug!(hash = %block.hash_str(), "block already stored");
            return Ok(());
        }

        fs::create_dir_all(&self.blocks_dir)?;
        // Write then rename so a crash never leaves a partial file under a
        // content-addressed name.
        let tmp = path.with_extension("dat.tmp");
        fs::write(&tmp, block.marshal())?;
        fs::rename(&tmp, &path)?;
        debug!(hash = %block.hash_str(), path = %path.display(), "stored block");
        Ok(())
    }

    fn load_block(&self, hash: &Sha256Hash) -> Result<Block> {
        let bytes = read_or_not_found(&self.block_path(hash), format!("block {}", hex::encode(hash)))?;
        decode_stored_block(hash, &bytes)
    }

    fn contains_block(&self, hash: &Sha256Hash) -> bool {
        self.block_path(hash).exists()
    }
}

impl ChainPointerStore for FileStore {
    fn save_pointer(&self, pointer: &ChainPointer) -> Result<()> {
        fs::create_dir_all(&self.chains_dir)?;
        let path = self.pointer_path(&pointer.label);
        fs::write(&path, pointer.to_json()?)?;
        info!(chain = %pointer.label, path = %path.display(), "wrote chain pointer");
        Ok(())
    }

    fn load_pointer(&self, label: &str) -> Result<ChainPointer> {
        let bytes = read_or_not_found(&self.pointer_path(label), format!("chain '{}'", label))?;
        let json = String::from_utf8(bytes).map_err(|e| ChainError::Decode(e.to_string()))?;
        ChainPointer::from_json(label, &json)
    }

    fn pointer_exists(&self, label: &str) -> bool {
        self.pointer_path(label).exists()
    }
}

/// Simple in-memory store useful for tests and ephemeral runs. Blocks are
/// kept in marshaled form so loads take the same decode path as files.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    blocks: RwLock<HashMap<Sha256Hash, Vec<u8>>>,
    pointers: RwLock<HashMap<String, ChainPointer>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block_count(&self) -> usize {
        self.blocks.read().map(|b| b.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> ChainError {
    ChainError::Io("Store lock poisoned".to_string())
}

impl BlockStore for InMemoryStore {
    fn save_block(&self, block: &Block) -> Result<()> {
        block.verify()?;
        let mut blocks = self.blocks.write().map_err(poisoned)?;
        blocks.entry(block.hash()).or_insert_with(|| block.marshal());
        Ok(())
    }

    fn load_block(&self, hash: &Sha256Hash) -> Result<Block> {
        let blocks = self.blocks.read().map_err(poisoned)?;
        let bytes = blocks
            .get(hash)
            .ok_or_else(|| ChainError::NotFound(format!("block {}", hex::encode(hash))))?;
        decode_stored_block(hash, bytes)
    }

    fn contains_block(&self, hash: &Sha256Hash) -> bool {
        self.blocks.read().map(|b| b.contains_key(hash)).unwrap_or(false)
    }
}

impl ChainPointerStore for InMemoryStore {
    fn save_pointer(&self, pointer: &ChainPointer) -> Result<()> {
        let mut pointers = self.pointers.write().map_err(poisoned)?;
        pointers.insert(pointer.label.clone(), pointer.clone());
        Ok(())
    }

    fn load_pointer(&self, label: &str) -> Result<ChainPointer> {
        let pointers = self.pointers.read().map_err(poisoned)?;
        pointers
            .get(label)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("chain '{}'", label)))
    }

    fn pointer_exists(&self, label: &str) -> bool {
        self.pointers.read().map(|p| p.contains_key(label)).unwrap_or(false)
    }
}
