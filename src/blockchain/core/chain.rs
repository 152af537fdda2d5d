use super::block::Block;
use super::genesis::{genesis, GENESIS_PERMISSIONS};
use super::state::PermissionState;
use crate::crypto::{Sha256Hash, ValidatorKey, HASH_SIZE};
use crate::error::{ChainError, Result};
use crate::persistence::{BlockStore, ChainPointer, ChainPointerStore};
use std::fmt;
use tracing::{debug, info, warn};

/// Label used for the throwaway chain built during replay.
const VERIFICATION_LABEL: &str = "verification_chain";

/// The chain-extension state machine.
///
/// Holds the ordered block sequence (index 0 is genesis) and the permission
/// map derived from it. Single-writer: callers sharing a ledger must
/// serialize `append` and `save` behind one lock.
#[derive(Debug, Clone)]
pub struct Ledger {
    label: String,
    blocks: Vec<Block>,
    state: PermissionState,
}

impl Ledger {
    /// A new chain containing only the built-in genesis block, whose
    /// validator holds the maximum permission count.
    pub fn new(label: &str) -> Self {
        Self::seeded(label, genesis())
    }

    /// A new chain rooted at a custom genesis block, e.g. one produced by
    /// [`genesis_bootstrap`](super::genesis::genesis_bootstrap).
    pub fn with_genesis(label: &str, root: Block) -> Result<Self> {
        root.verify()?;
        Ok(Self::seeded(label, root))
    }

    fn seeded(label: &str, root: Block) -> Self {
        let state = PermissionState::seeded(*root.validator(), GENESIS_PERMISSIONS);
        Ledger {
            label: label.to_string(),
            blocks: vec![root],
            state,
        }
    }

    /// Runs the checks of [`Ledger::append`] in the same order without
    /// changing anything.
    pub fn check_append(&self, block: &Block) -> Result<()> {
        block.verify()?;

        let tip_hash = self.tip_hash();
        if block.prev_hash() != &tip_hash {
            return Err(ChainError::ChainLinkageMismatch {
                expected: hex::encode(tip_hash),
                actual: hex::encode(block.prev_hash()),
            });
        }

        self.state.check_transaction(block.validator(), block.tx())
    }

    /// Validates `block` against the current tip and permission map and, on
    /// success, appends it. On error the ledger is left unchanged.
    pub fn append(&mut self, block: Block) -> Result<()> {
        self.check_append(&block)?;
        self.state.apply_transaction(block.validator(), block.tx())?;

        debug!(
            chain = %self.label,
            height = self.blocks.len(),
            hash = %block.hash_str(),
            "appended block"
        );
        self.blocks.push(block);
        Ok(())
    }

    /// Rebuilds a fresh chain from the same genesis and replays every
    /// non-genesis block through [`Ledger::append`]. This is the only
    /// authoritative validity check; the permission map is never trusted.
    pub fn verify(&self) -> Result<()> {
        Self::replay(VERIFICATION_LABEL, self.genesis().clone(), &self.blocks[1..]).map(|_| ())
    }

    fn replay(label: &str, root: Block, blocks: &[Block]) -> Result<Self> {
        let mut ledger = Self::with_genesis(label, root)?;
        for (i, block) in blocks.iter().enumerate() {
            ledger.append(block.clone()).map_err(|e| {
                warn!(chain = %label, height = i + 1, "replay failed: {}", e);
                e
            })?;
        }
        Ok(ledger)
    }

    /// Persists every block and the chain pointer.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory chain fails replay verification; a ledger
    /// only ever grows through `append`, so this indicates a broken invariant.
    pub fn save<S>(&self, store: &S) -> Result<()>
    where
        S: BlockStore + ChainPointerStore + ?Sized,
    {
        if let Err(e) = self.verify() {
            panic!("refusing to save invalid chain '{}': {}", self.label, e);
        }

        for block in &self.blocks {
            store.save_block(block)?;
        }
        store.save_pointer(&self.pointer())?;
        info!(chain = %self.label, height = self.len(), tip = %hex::encode(self.tip_hash()), "saved chain");
        Ok(())
    }

    /// Reconstructs a chain rooted at the built-in genesis block.
    pub fn load<S>(store: &S, label: &str) -> Result<Self>
    where
        S: BlockStore + ChainPointerStore + ?Sized,
    {
        Self::load_with_genesis(store, label, &genesis())
    }

    /// Walks `prev_hash` links back from the stored tip to the stored
    /// genesis, checks the root is `expected_root`, then replays the result.
    pub fn load_with_genesis<S>(store: &S, label: &str, expected_root: &Block) -> Result<Self>
    where
        S: BlockStore + ChainPointerStore + ?Sized,
    {
        let pointer = store.load_pointer(label)?;
        if pointer.genesis_hash != expected_root.hash() {
            return Err(ChainError::ChainLinkageMismatch {
                expected: expected_root.hash_str(),
                actual: hex::encode(pointer.genesis_hash),
            });
        }

        let mut blocks = vec![store.load_block(&pointer.tip_hash)?];
        loop {
            let current = &blocks[blocks.len() - 1];
            if current.hash() == pointer.genesis_hash {
                break;
            }
            if current.prev_hash() == &[0u8; HASH_SIZE] {
                return Err(ChainError::ChainLinkageMismatch {
                    expected: hex::encode(pointer.genesis_hash),
                    actual: current.hash_str(),
                });
            }
            let prev = *current.prev_hash();
            blocks.push(store.load_block(&prev)?);
        }
        blocks.reverse();

        let root = blocks[0].clone();
        let ledger = Self::replay(label, root, &blocks[1..])?;
        info!(chain = %label, height = ledger.len(), "loaded chain");
        Ok(ledger)
    }

    /// Loads `label` if a pointer exists, otherwise creates and saves a new
    /// chain rooted at `root`.
    pub fn load_or_init<S>(store: &S, label: &str, root: &Block) -> Result<Self>
    where
        S: BlockStore + ChainPointerStore + ?Sized,
    {
        if store.pointer_exists(label) {
            Self::load_with_genesis(store, label, root)
        } else {
            info!(chain = %label, "no stored chain found, starting from genesis");
            let ledger = Self::with_genesis(label, root.clone())?;
            ledger.save(store)?;
            Ok(ledger)
        }
    }

    pub fn pointer(&self) -> ChainPointer {
        ChainPointer {
            label: self.label.clone(),
            genesis_hash: self.genesis_hash(),
            tip_hash: self.tip_hash(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks, genesis included.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Always false; a ledger holds at least its genesis block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn tip(&self) -> &Block {
        &self.blocks[self.blocks.len() - 1]
    }

    pub fn tip_hash(&self) -> Sha256Hash {
        self.tip().hash()
    }

    pub fn genesis(&self) -> &Block {
        &self.blocks[0]
    }

    pub fn genesis_hash(&self) -> Sha256Hash {
        self.genesis().hash()
    }

    pub fn permissions(&self, validator: &ValidatorKey) -> u32 {
        self.state.get_balance(validator)
    }

    /// Validators with their remaining permissions, in no particular order.
    pub fn validators(&self) -> impl Iterator<Item = (&ValidatorKey, u32)> {
        self.state.validators()
    }

    pub fn state(&self) -> &PermissionState {
        &self.state
    }
}

impl fmt::Display for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Blocks")?;
        for (i, block) in self.blocks.iter().enumerate() {
            writeln!(f, "{} {}", i, block)?;
        }
        writeln!(f, "Validators")?;
        let mut validators: Vec<_> = self.state.validators().collect();
        validators.sort();
        for (key, count) in validators {
            writeln!(f, "{} {}", count, key)?;
        }
        Ok(())
    }
}
