/// Transaction types for AuthChain
use crate::crypto::ValidatorKey;
use crate::error::ChainError;
use std::fmt;

/// Maximum marshaled transaction size. A transaction must be strictly
/// smaller than this (1 MB plus the tag byte).
pub const TX_MAX_SIZE: usize = 1_048_577;

/// Wire tag identifying a transaction variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxType {
    /// Arbitrary data added to the chain
    Entry = 0,
    /// Delegation of mint permissions to another validator
    Permission = 1,
}

impl TryFrom<u8> for TxType {
    type Error = ChainError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(TxType::Entry),
            1 => Ok(TxType::Permission),
            other => Err(ChainError::InvalidTransactionType(other)),
        }
    }
}

/// The single transaction carried by a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transaction {
    Entry(EntryTx),
    Permission(PermissionTx),
}

/// Opaque payload. Costs the minting validator one permission unit and has
/// no other ledger effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryTx {
    pub data: Vec<u8>,
}

/// Moves `amount` mint permissions from the block's validator to `delegate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionTx {
    pub amount: u32,
    pub delegate: ValidatorKey,
}

impl Transaction {
    pub fn entry(data: impl Into<Vec<u8>>) -> Self {
        Transaction::Entry(EntryTx { data: data.into() })
    }

    pub fn permission(amount: u32, delegate: ValidatorKey) -> Self {
        Transaction::Permission(PermissionTx { amount, delegate })
    }

    pub fn tx_type(&self) -> TxType {
        match self {
            Transaction::Entry(_) => TxType::Entry,
            Transaction::Permission(_) => TxType::Permission,
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transaction::Entry(tx) => write!(f, "Entry({} bytes)", tx.data.len()),
            Transaction::Permission(tx) => {
                let delegate = tx.delegate.to_hex();
                write!(f, "Permission({} -> {}..)", tx.amount, &delegate[delegate.len() - 16..])
            }
        }
    }
}
