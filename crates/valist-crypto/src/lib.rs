//! Cryptographic primitives for the Valist registry client.
//!
//! Provides domain-separated BLAKE3 hashing (transaction hashes,
//! organization ID derivation, event topics) and Ed25519 account keys
//! that sign transaction hashes.
//!
//! All crypto operations wrap established libraries.

pub mod hasher;
pub mod signer;

pub use hasher::{ContentHasher, HasherError};
pub use signer::{AccountKey, PublicKey, SignatureError, TxSignature};
