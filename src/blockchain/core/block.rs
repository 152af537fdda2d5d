use crate::crypto::{
    verify_signature, BlockSigner, Sha256Hash, ValidatorKey, HASH_SIZE, VALIDATOR_SIZE,
};
use crate::error::{ChainError, Result};
use crate::transaction::{Transaction, TxType, TX_MAX_SIZE};
use sha2::{Digest, Sha256};
use std::fmt;

pub const TIMESTAMP_SIZE: usize = 8;

/// Bytes preceding the variable-length signature:
/// timestamp ∥ prev_hash ∥ validator ∥ sig_len.
pub const BLOCK_FIXED_SIZE: usize = TIMESTAMP_SIZE + HASH_SIZE + VALIDATOR_SIZE + 1;

/// One ledger-extension event.
///
/// Blocks are immutable values. `signed_hash` and `hash` are derived from
/// the other fields at construction time and can never be set directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    timestamp: u64,
    prev_hash: Sha256Hash,
    validator: ValidatorKey,
    signature: Vec<u8>,
    tx: Transaction,
    signed_hash: Sha256Hash,
    hash: Sha256Hash,
}

impl Block {
    /// Builds, signs and self-verifies a new block.
    pub fn new<S: BlockSigner + ?Sized>(
        timestamp: u64,
        prev_hash: Sha256Hash,
        tx: Transaction,
        signer: &S,
    ) -> Result<Self> {
        let validator = ValidatorKey::from_slice(&signer.public_key_bytes()?)?;
        let signed_hash = Self::compute_signed_hash(timestamp, &prev_hash, &validator, &tx);
        let signature = signer.sign_digest(&signed_hash)?;

        let block = Self::from_parts(timestamp, prev_hash, validator, signature, tx)?;
        block.verify()?;
        Ok(block)
    }

    /// Assembles a block from already-signed fields, deriving both digests.
    /// No signature check happens here; call [`Block::verify`].
    pub fn from_parts(
        timestamp: u64,
        prev_hash: Sha256Hash,
        validator: ValidatorKey,
        signature: Vec<u8>,
        tx: Transaction,
    ) -> Result<Self> {
        if signature.len() > u8::MAX as usize {
            return Err(ChainError::SizeMismatch {
                field: "signature",
                expected: u8::MAX as usize,
                actual: signature.len(),
            });
        }

        let signed_hash = Self::compute_signed_hash(timestamp, &prev_hash, &validator, &tx);
        let mut block = Block {
            timestamp,
            prev_hash,
            validator,
            signature,
            tx,
            signed_hash,
            hash: [0u8; HASH_SIZE],
        };
        block.hash = Sha256::digest(block.marshal()).into();
        Ok(block)
    }

    /// Digest covered by the validator's signature.
    pub fn compute_signed_hash(
        timestamp: u64,
        prev_hash: &Sha256Hash,
        validator: &ValidatorKey,
        tx: &Transaction,
    ) -> Sha256Hash {
        let mut hasher = Sha256::new();
        hasher.update(timestamp.to_be_bytes());
        hasher.update(prev_hash);
        hasher.update(validator.as_bytes());
        hasher.update(tx.marshal());
        hasher.finalize().into()
    }

    /// Structural and cryptographic validity, independent of any chain.
    ///
    /// Checks run in order and stop at the first failure: transaction size,
    /// signature over a freshly recomputed digest, transaction type.
    pub fn verify(&self) -> Result<()> {
        let tx_len = self.tx.marshaled_len();
        if tx_len >= TX_MAX_SIZE {
            return Err(ChainError::TransactionTooLarge(tx_len));
        }

        let signed_hash =
            Self::compute_signed_hash(self.timestamp, &self.prev_hash, &self.validator, &self.tx);
        verify_signature(&self.validator, &signed_hash, &self.signature)?;

        match self.tx.tx_type() {
            TxType::Entry | TxType::Permission => Ok(()),
        }
    }

    pub fn marshal(&self) -> Vec<u8> {
        let tx_bytes = self.tx.marshal();
        let mut out = Vec::with_capacity(BLOCK_FIXED_SIZE + self.signature.len() + tx_bytes.len());
        out.extend_from_slice(&self.timestamp.to_be_bytes());
        out.extend_from_slice(&self.prev_hash);
        out.extend_from_slice(self.validator.as_bytes());
        out.push(self.signature.len() as u8);
        out.extend_from_slice(&self.signature);
        out.extend_from_slice(&tx_bytes);
        out
    }

    /// Parses the fixed-offset layout and recomputes both digests. The
    /// result is not verified; callers decide when to call [`Block::verify`].
    pub fn unmarshal(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < BLOCK_FIXED_SIZE {
            return Err(ChainError::Decode(format!(
                "Block is {} bytes, shorter than the {} byte header",
                bytes.len(),
                BLOCK_FIXED_SIZE
            )));
        }

        let (timestamp, rest) = bytes.split_at(TIMESTAMP_SIZE);
        let (prev_hash, rest) = rest.split_at(HASH_SIZE);
        let (validator, rest) = rest.split_at(VALIDATOR_SIZE);
        let (sig_len, rest) = rest.split_at(1);
        let sig_len = sig_len[0] as usize;
        if rest.len() < sig_len {
            return Err(ChainError::Decode(format!(
                "Block declares a {} byte signature but only {} bytes remain",
                sig_len,
                rest.len()
            )));
        }
        let (signature, tx_bytes) = rest.split_at(sig_len);

        let mut timestamp_bytes = [0u8; TIMESTAMP_SIZE];
        timestamp_bytes.copy_from_slice(timestamp);
        let mut prev = [0u8; HASH_SIZE];
        prev.copy_from_slice(prev_hash);

        Self::from_parts(
            u64::from_be_bytes(timestamp_bytes),
            prev,
            ValidatorKey::from_slice(validator)?,
            signature.to_vec(),
            Transaction::unmarshal(tx_bytes)?,
        )
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.marshal())
    }

    pub fn from_hex(hex_str: &str) -> Result<Self> {
        Self::unmarshal(&hex::decode(hex_str.trim())?)
    }

    pub fn hash(&self) -> Sha256Hash {
        self.hash
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash)
    }

    pub fn signed_hash(&self) -> Sha256Hash {
        self.signed_hash
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn prev_hash(&self) -> &Sha256Hash {
        &self.prev_hash
    }

    pub fn validator(&self) -> &ValidatorKey {
        &self.validator
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    pub fn tx(&self) -> &Transaction {
        &self.tx
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block {}", self.hash_str())?;
        writeln!(f, "  timestamp:  {}", self.timestamp)?;
        writeln!(f, "  prev_hash:  {}", hex::encode(self.prev_hash))?;
        writeln!(f, "  validator:  {}", self.validator)?;
        writeln!(f, "  sig_length: {}", self.signature.len())?;
        writeln!(f, "  signature:  {}", hex::encode(&self.signature))?;
        write!(f, "  tx:         {}", self.tx)
    }
}
