//! AuthChain - a permissioned append-only ledger with delegable minting authority
//!
//! # Architecture
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the genesis root, permission accounting and the chain state machine
//! - [`transaction`] - Entry and permission transactions and their binary codec
//!
//! ## Cryptography
//! - [`crypto`] - SHA-256, P-384 ECDSA verification and named signing identities
//!
//! ## Storage
//! - [`persistence`] - Content-addressed block store and chain pointers
//!
//! ## Integration
//! - [`node`] - One served ledger with its store
//! - [`api`] - HTTP endpoints
//! - [`client`] - HTTP client for a ledger server
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Cryptography
// ============================================================================
pub mod crypto;

// ============================================================================
// Storage
// ============================================================================
pub mod persistence;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;
pub mod client;
pub mod node;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
