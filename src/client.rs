//! HTTP client for a running ledger server.

use crate::blockchain::{current_timestamp, Block};
use crate::crypto::{BlockSigner, Sha256Hash};
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use reqwest::Client;
use std::time::Duration;
use tracing::info;

fn network_error(e: reqwest::Error) -> ChainError {
    ChainError::Network(e.to_string())
}

#[derive(Clone, Debug)]
pub struct LedgerClient {
    base: String,
    client: Client,
}

impl LedgerClient {
    pub fn new(base: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(network_error)?;
        Ok(LedgerClient {
            base: base.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub async fn welcome(&self) -> Result<String> {
        self.get_text("/").await
    }

    /// Fetches the server's current tip hash.
    pub async fn tip(&self) -> Result<Sha256Hash> {
        let body = self.get_text("/tip").await?;
        let bytes = hex::decode(body.trim())?;
        bytes
            .try_into()
            .map_err(|b: Vec<u8>| ChainError::Decode(format!("tip hash must be 32 bytes, got {}", b.len())))
    }

    /// Asks the server to validate `block` without appending it. Returns the
    /// server's verdict text.
    pub async fn submit(&self, block: &Block) -> Result<String> {
        self.post_hex("/submit", block).await
    }

    /// Asks the server to validate, append and persist `block`.
    pub async fn append(&self, block: &Block) -> Result<String> {
        self.post_hex("/append", block).await
    }

    async fn get_text(&self, path: &str) -> Result<String> {
        let url = format!("{}{}", self.base, path);
        let resp = self.client.get(&url).send().await.map_err(network_error)?;
        let status = resp.status();
        let text = resp.text().await.map_err(network_error)?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(ChainError::Network(format!("GET {} failed {} {}", path, status, text)))
        }
    }

    async fn post_hex(&self, path: &str, block: &Block) -> Result<String> {
        let url = format!("{}{}", self.base, path);
        let resp = self
            .client
            .post(&url)
            .body(block.to_hex())
            .send()
            .await
            .map_err(network_error)?;
        let status = resp.status();
        let text = resp.text().await.map_err(network_error)?;
        if status.is_success() {
            Ok(text)
        } else {
            Err(ChainError::Network(format!("POST {} failed {} {}", path, status, text)))
        }
    }
}

/// Builds an entry block on top of the server's tip, signed by `signer`,
/// and submits it for validation. Returns the block and the server's reply.
pub async fn submit_entry<S: BlockSigner + ?Sized>(
    client: &LedgerClient,
    entry: &[u8],
    signer: &S,
) -> Result<(Block, String)> {
    let tip = client.tip().await?;
    let block = Block::new(current_timestamp(), tip, Transaction::entry(entry.to_vec()), signer)?;
    info!(hash = %block.hash_str(), prev = %hex::encode(tip), "submitting entry block");
    let reply = client.submit(&block).await?;
    Ok((block, reply))
}
