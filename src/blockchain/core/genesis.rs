//! The hard-coded genesis block.
//!
//! Genesis is pre-signed by a fixed P-384 identity and is never produced by
//! [`Block::new`]. Its hash is recomputed from the embedded constants.

use super::block::Block;
use crate::crypto::{sha256, BlockSigner, Sha256Hash, ValidatorKey, HASH_SIZE};
use crate::error::Result;
use crate::transaction::Transaction;
use once_cell::sync::Lazy;

/// Seed hashed into the genesis Entry payload.
pub const GENESIS_SEED: &[u8] = b"redd";

/// Mint permissions held by the genesis validator on every fresh chain.
pub const GENESIS_PERMISSIONS: u32 = u32::MAX;

pub const GENESIS_VALIDATOR: &str = "3076301006072a8648ce3d020106052b8104002203620004d985ce1893c962f0dfe389b6193e4149a54eca746f9c1ba1f56b1ed898009a4669520de0b5e53e91336115c668e304b6d6a9b1e98bee50c0b0f1cf80b13e0f554c9df3a51bbee2ab1f7c37f12d563d6fb174bd7315cfbac97c09ad47e852afc9";

pub const GENESIS_SIGNATURE: &str = "3066023100fe4adf500ae5f67c0274283315c1430e11eec469c7a7a5b68135615b5d80a540cd49d22eb593e5ebae16f257614a2559023100d8a760339f133c73db4eda3ef300959a29fa453271c6b7c4b166d4a783f8c97c84f166e8cb5621d1a9190403f08f7d1a";

/// Hex hash of the block built from the constants above.
pub const GENESIS_HASH: &str = "612f79769cc02928e9298843c060c2eae20cab8602232275745f5688c5e95d4a";

static GENESIS: Lazy<Block> =
    Lazy::new(|| decode_genesis().expect("embedded genesis constants are well-formed"));

fn decode_genesis() -> Result<Block> {
    let validator = ValidatorKey::from_hex(GENESIS_VALIDATOR)?;
    let signature = hex::decode(GENESIS_SIGNATURE)?;
    Block::from_parts(0, [0u8; HASH_SIZE], validator, signature, genesis_transaction())
}

/// Entry transaction carried by every genesis block.
pub fn genesis_transaction() -> Transaction {
    Transaction::entry(sha256(GENESIS_SEED).to_vec())
}

pub fn genesis() -> Block {
    GENESIS.clone()
}

pub fn genesis_hash() -> Sha256Hash {
    GENESIS.hash()
}

/// Creates a fresh genesis candidate signed by `signer`, for operators who
/// want to root a new network under their own identity.
pub fn genesis_bootstrap<S: BlockSigner + ?Sized>(signer: &S) -> Result<Block> {
    Block::new(0, [0u8; HASH_SIZE], genesis_transaction(), signer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::Identity;

    #[test]
    fn test_genesis_verifies() {
        assert!(genesis().verify().is_ok());
    }

    #[test]
    fn test_genesis_hash_is_fixed() {
        assert_eq!(genesis().hash_str(), GENESIS_HASH);
        assert_eq!(hex::encode(genesis_hash()), GENESIS_HASH);
    }

    #[test]
    fn test_genesis_fields() {
        let block = genesis();
        assert_eq!(block.timestamp(), 0);
        assert_eq!(block.prev_hash(), &[0u8; HASH_SIZE]);
        assert_eq!(block.signature().len(), 0x68);
        assert_eq!(block.validator().to_hex(), GENESIS_VALIDATOR);
        assert_eq!(block.tx(), &genesis_transaction());
    }

    #[test]
    fn test_genesis_survives_codec() {
        let block = genesis();
        let decoded = Block::unmarshal(&block.marshal()).unwrap();
        assert_eq!(decoded.hash_str(), GENESIS_HASH);
        assert!(decoded.verify().is_ok());
    }

    #[test]
    fn test_bootstrap_produces_distinct_root() {
        let identity = Identity::generate("root");
        let block = genesis_bootstrap(&identity).unwrap();
        assert!(block.verify().is_ok());
        assert_eq!(block.tx(), &genesis_transaction());
        assert_ne!(block.hash_str(), GENESIS_HASH);
    }
}
