// core.rs splits ledger responsibilities into submodules: block framing,
// the genesis root, permission accounting, the chain state machine and
// boundary validation helpers.
pub mod block;
pub mod chain;
pub mod genesis;
pub mod state;
pub mod validation;

pub use block::*;
pub use chain::*;
pub use genesis::*;
pub use state::*;
pub use validation::*;
