//! Integration tests for the ledger HTTP endpoints

use authchain::api::{build_api_router, INVALID_BLOCK, VALID_BLOCK, WELCOME_MESSAGE};
use authchain::blockchain::{genesis, genesis_bootstrap, genesis_hash, Block};
use authchain::config::Config;
use authchain::crypto::Identity;
use authchain::node::Node;
use authchain::persistence::{BlockStore, ChainPointerStore, InMemoryStore};
use authchain::transaction::Transaction;
use axum_test::TestServer;
use serde_json::Value;
use std::sync::Arc;

fn builtin_server() -> TestServer {
    let node = Node::with_store(Config::default(), Arc::new(InMemoryStore::new())).unwrap();
    TestServer::new(build_api_router(node)).unwrap()
}

fn bootstrapped_node(root: &Identity, store: Arc<InMemoryStore>) -> Node {
    let root_block = genesis_bootstrap(root).unwrap();
    store.save_block(&root_block).unwrap();
    let mut config = Config::default();
    config.chain.genesis_hash = Some(root_block.hash_str());
    Node::with_store(config, store).unwrap()
}

#[tokio::test]
async fn test_welcome_and_tip() {
    let server = builtin_server();

    let response = server.get("/").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), WELCOME_MESSAGE);

    let response = server.get("/tip").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), format!("{}\n", hex::encode(genesis_hash())));
}

#[tokio::test]
async fn test_submit_validates_only() {
    let server = builtin_server();

    let response = server.post("/submit").text(genesis().to_hex()).await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), VALID_BLOCK);

    let response = server.post("/submit").text("not hex at all").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.text(), INVALID_BLOCK);

    // A well-signed block from an unknown validator is still structurally valid.
    let stranger = Identity::generate("stranger");
    let block = Block::new(1, genesis_hash(), Transaction::entry(b"hi".to_vec()), &stranger).unwrap();
    let response = server.post("/submit").text(block.to_hex()).await;
    assert_eq!(response.text(), VALID_BLOCK);

    // Nothing was appended.
    let response = server.get("/tip").await;
    assert_eq!(response.text(), format!("{}\n", hex::encode(genesis_hash())));
}

#[tokio::test]
async fn test_submit_rejects_tampered_block() {
    let server = builtin_server();
    let mut bytes = genesis().marshal();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;

    let response = server.post("/submit").text(hex::encode(bytes)).await;
    assert_eq!(response.text(), INVALID_BLOCK);
}

#[tokio::test]
async fn test_append_extends_and_persists() {
    let root = Identity::generate("root");
    let store = Arc::new(InMemoryStore::new());
    let node = bootstrapped_node(&root, store.clone());
    let tip = node.tip_hash().await;
    let server = TestServer::new(build_api_router(node)).unwrap();

    let block = Block::new(9, tip, Transaction::entry(b"entry".to_vec()), &root).unwrap();
    let response = server.post("/append").text(block.to_hex()).await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["hash"], block.hash_str());
    assert_eq!(json["height"], 1);

    let response = server.get("/tip").await;
    assert_eq!(response.text(), format!("{}\n", block.hash_str()));
    assert!(store.contains_block(&block.hash()));
    assert_eq!(store.load_pointer("main").unwrap().tip_hash, block.hash());

    // Replaying the same block breaks linkage.
    let response = server.post("/append").text(block.to_hex()).await;
    assert_eq!(response.status_code(), 400);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("linkage"));
}

#[tokio::test]
async fn test_append_rejects_unauthorized() {
    let server = builtin_server();
    let stranger = Identity::generate("stranger");
    let block = Block::new(1, genesis_hash(), Transaction::entry(b"hi".to_vec()), &stranger).unwrap();

    let response = server.post("/append").text(block.to_hex()).await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_health() {
    let server = builtin_server();
    let response = server.get("/health").await;
    assert_eq!(response.status_code(), 200);
    let json: Value = response.json();
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["chain"], "main");
    assert_eq!(json["height"], 1);
    assert_eq!(json["tip"], hex::encode(genesis_hash()));
}
