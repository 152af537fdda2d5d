//! Transaction module split into types and binary codec

pub mod codec;
pub mod types;

pub use types::*;
