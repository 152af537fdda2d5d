//! Binary framing for transactions: `{tag: 1 byte}{payload}`.
//!
//! `Entry` payloads are the raw data bytes. `Permission` payloads are a
//! 4-byte big-endian amount followed by the delegate's encoded public key.

use super::types::{EntryTx, PermissionTx, Transaction, TxType};
use crate::crypto::{ValidatorKey, VALIDATOR_SIZE};
use crate::error::{ChainError, Result};

const AMOUNT_SIZE: usize = 4;
const PERMISSION_PAYLOAD_SIZE: usize = AMOUNT_SIZE + VALIDATOR_SIZE;

impl Transaction {
    /// Serializes the transaction, always tagging it with its own variant.
    pub fn marshal(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + self.payload_len());
        out.push(self.tx_type() as u8);
        match self {
            Transaction::Entry(tx) => out.extend_from_slice(&tx.data),
            Transaction::Permission(tx) => {
                out.extend_from_slice(&tx.amount.to_be_bytes());
                out.extend_from_slice(tx.delegate.as_bytes());
            }
        }
        out
    }

    /// Length of `marshal()` output without allocating it.
    pub fn marshaled_len(&self) -> usize {
        1 + self.payload_len()
    }

    fn payload_len(&self) -> usize {
        match self {
            Transaction::Entry(tx) => tx.data.len(),
            Transaction::Permission(_) => PERMISSION_PAYLOAD_SIZE,
        }
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self> {
        let (&tag, payload) = bytes
            .split_first()
            .ok_or_else(|| ChainError::Decode("Empty transaction".to_string()))?;

        match TxType::try_from(tag)? {
            TxType::Entry => Ok(Transaction::Entry(EntryTx {
                data: payload.to_vec(),
            })),
            TxType::Permission => {
                if payload.len() != PERMISSION_PAYLOAD_SIZE {
                    return Err(ChainError::Decode(format!(
                        "Permission payload must be {} bytes, got {}",
                        PERMISSION_PAYLOAD_SIZE,
                        payload.len()
                    )));
                }
                let (amount, delegate) = payload.split_at(AMOUNT_SIZE);
                let mut amount_bytes = [0u8; AMOUNT_SIZE];
                amount_bytes.copy_from_slice(amount);
                Ok(Transaction::Permission(PermissionTx {
                    amount: u32::from_be_bytes(amount_bytes),
                    delegate: ValidatorKey::from_slice(delegate)?,
                }))
            }
        }
    }
}
