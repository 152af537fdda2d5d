//! Validation entry points for blocks arriving from outside the process.
//!
//! `validate_block` is a read-only probe; `validate_and_append_block`
//! additionally extends a ledger. Transports choose which one to expose.

use super::block::Block;
use super::chain::Ledger;
use crate::error::Result;
use chrono::Utc;
use tracing::{debug, info};

/// Current UTC time in whole seconds, as stored in block timestamps.
pub fn current_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Stateless check: structural and cryptographic validity only.
pub fn validate_block(block: &Block) -> Result<()> {
    block.verify()
}

/// Decodes a hex-encoded marshaled block and runs [`validate_block`] on it.
pub fn validate_block_hex(body: &str) -> Result<Block> {
    let block = Block::from_hex(body)?;
    validate_block(&block)?;
    debug!(hash = %block.hash_str(), "validated submitted block");
    Ok(block)
}

/// Validates `block` and appends it to `ledger`. The ledger is unchanged
/// on error.
pub fn validate_and_append_block(ledger: &mut Ledger, block: Block) -> Result<()> {
    validate_block(&block)?;
    let hash = block.hash_str();
    ledger.append(block)?;
    info!(chain = %ledger.label(), height = ledger.len() - 1, %hash, "accepted block");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::core::genesis::{genesis, genesis_bootstrap};
    use crate::crypto::Identity;
    use crate::error::ChainError;
    use crate::transaction::Transaction;

    #[test]
    fn test_validate_block_hex_accepts_genesis() {
        let block = validate_block_hex(&genesis().to_hex()).unwrap();
        assert_eq!(block, genesis());
    }

    #[test]
    fn test_validate_block_hex_rejects_garbage() {
        assert!(matches!(validate_block_hex("zz"), Err(ChainError::Decode(_))));
        assert!(matches!(validate_block_hex("00ff"), Err(ChainError::Decode(_))));
    }

    #[test]
    fn test_validate_does_not_append() {
        let root = Identity::generate("root");
        let ledger = Ledger::with_genesis("probe", genesis_bootstrap(&root).unwrap()).unwrap();
        let block = Block::new(current_timestamp(), ledger.tip_hash(), Transaction::entry(b"p".to_vec()), &root).unwrap();

        validate_block_hex(&block.to_hex()).unwrap();
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_validate_and_append() {
        let root = Identity::generate("root");
        let mut ledger = Ledger::with_genesis("probe", genesis_bootstrap(&root).unwrap()).unwrap();
        let block = Block::new(current_timestamp(), ledger.tip_hash(), Transaction::entry(b"p".to_vec()), &root).unwrap();

        validate_and_append_block(&mut ledger, block.clone()).unwrap();
        assert_eq!(ledger.tip(), &block);
        assert!(matches!(
            validate_and_append_block(&mut ledger, block),
            Err(ChainError::ChainLinkageMismatch { .. })
        ));
    }

    #[test]
    fn test_current_timestamp_is_recent() {
        assert!(current_timestamp() > 1_600_000_000);
    }
}
