//! Photo Vault - SigV4 signing engine

pub mod canonical;
pub mod signer;

pub use signer::*;
