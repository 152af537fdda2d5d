// Thin re-export module: implementation is in `blockchain/core.rs` to allow
// progressive decomposition of ledger responsibilities (framing, genesis,
// permission accounting, chain management, validation).

pub mod core;
pub use core::*;
