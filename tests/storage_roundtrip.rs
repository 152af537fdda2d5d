//! Saving and reloading chains through the file store, including on-disk
//! tampering.

use authchain::blockchain::{genesis_bootstrap, Block, Ledger, BLOCK_FIXED_SIZE};
use authchain::crypto::Identity;
use authchain::error::ChainError;
use authchain::persistence::{BlockStore, ChainPointerStore, FileStore};
use authchain::transaction::Transaction;
use std::fs;
use tempfile::TempDir;

fn build_chain(root: &Identity, label: &str) -> Ledger {
    let v2 = Identity::generate("v2");
    let mut ledger = Ledger::with_genesis(label, genesis_bootstrap(root).unwrap()).unwrap();
    let tx = Transaction::permission(10, v2.validator_key().unwrap());
    ledger.append(Block::new(1, ledger.tip_hash(), tx, root).unwrap()).unwrap();
    ledger
        .append(Block::new(2, ledger.tip_hash(), Transaction::entry(b"payload".to_vec()), &v2).unwrap())
        .unwrap();
    ledger
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path());
    let root = Identity::generate("root");
    let ledger = build_chain(&root, "main");
    ledger.save(&store).unwrap();

    assert!(store.pointer_path("main").exists());
    for block in ledger.blocks() {
        assert!(store.contains_block(&block.hash()));
    }

    let loaded = Ledger::load_with_genesis(&store, "main", ledger.genesis()).unwrap();
    assert_eq!(loaded.blocks(), ledger.blocks());
    assert_eq!(loaded.state(), ledger.state());
    assert_eq!(loaded.label(), "main");
}

#[test]
fn test_load_rejects_unexpected_genesis() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path());
    let ledger = build_chain(&Identity::generate("root"), "main");
    ledger.save(&store).unwrap();

    // The built-in root is not the root of this chain.
    assert!(matches!(
        Ledger::load(&store, "main"),
        Err(ChainError::ChainLinkageMismatch { .. })
    ));
}

#[test]
fn test_load_or_init_creates_then_reloads() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path());
    let root = Identity::generate("root");
    let root_block = genesis_bootstrap(&root).unwrap();

    let mut ledger = Ledger::load_or_init(&store, "fresh", &root_block).unwrap();
    assert_eq!(ledger.len(), 1);
    assert!(store.pointer_exists("fresh"));

    ledger
        .append(Block::new(3, ledger.tip_hash(), Transaction::entry(b"x".to_vec()), &root).unwrap())
        .unwrap();
    ledger.save(&store).unwrap();

    let reloaded = Ledger::load_or_init(&store, "fresh", &root_block).unwrap();
    assert_eq!(reloaded.len(), 2);
    assert_eq!(reloaded.tip_hash(), ledger.tip_hash());
}

#[test]
fn test_tampered_payload_detected() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path());
    let ledger = build_chain(&Identity::generate("root"), "main");
    ledger.save(&store).unwrap();

    let path = store.block_path(&ledger.tip_hash());
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        Ledger::load_with_genesis(&store, "main", ledger.genesis()),
        Err(ChainError::InvalidSignature(_))
    ));
}

#[test]
fn test_tampered_signature_detected() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path());
    let ledger = build_chain(&Identity::generate("root"), "main");
    ledger.save(&store).unwrap();

    let path = store.block_path(&ledger.tip_hash());
    let mut bytes = fs::read(&path).unwrap();
    // Inside the DER-encoded r value, past the sequence and integer headers.
    bytes[BLOCK_FIXED_SIZE + 12] ^= 0x80;
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        store.load_block(&ledger.tip_hash()),
        Err(ChainError::InvalidSignature(_))
    ));
}

#[test]
fn test_truncated_block_is_decode_error() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path());
    let ledger = build_chain(&Identity::generate("root"), "main");
    ledger.save(&store).unwrap();

    let path = store.block_path(&ledger.tip_hash());
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..BLOCK_FIXED_SIZE - 1]).unwrap();

    assert!(matches!(
        store.load_block(&ledger.tip_hash()),
        Err(ChainError::Decode(_))
    ));
}

#[test]
fn test_missing_intermediate_block() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path());
    let ledger = build_chain(&Identity::generate("root"), "main");
    ledger.save(&store).unwrap();

    fs::remove_file(store.block_path(&ledger.blocks()[1].hash())).unwrap();
    assert!(matches!(
        Ledger::load_with_genesis(&store, "main", ledger.genesis()),
        Err(ChainError::NotFound(_))
    ));
}

#[test]
fn test_missing_chain_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = FileStore::open(dir.path());
    assert!(matches!(Ledger::load(&store, "nope"), Err(ChainError::NotFound(_))));
}
