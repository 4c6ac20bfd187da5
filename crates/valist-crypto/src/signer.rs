//! Account keys and transaction signatures.
//!
//! An account signs the domain-separated hash of a transaction request and
//! nothing else; there is no API for signing arbitrary bytes.

use std::fmt;

use valist_types::{Address, TxHash};

/// Secret key controlling one registry account.
pub struct AccountKey(ed25519_dalek::SigningKey);

/// Public half of an [`AccountKey`], as carried in a signed envelope.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey(ed25519_dalek::VerifyingKey);

/// Signature over a [`TxHash`].
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TxSignature(ed25519_dalek::Signature);

impl AccountKey {
    pub fn generate() -> Self {
        Self(ed25519_dalek::SigningKey::generate(&mut rand::thread_rng()))
    }

    /// Deterministic key from a 32-byte secret.
    pub fn from_secret(secret: [u8; 32]) -> Self {
        Self(ed25519_dalek::SigningKey::from_bytes(&secret))
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    pub fn address(&self) -> Address {
        self.public_key().address()
    }

    pub fn sign_tx(&self, tx_hash: &TxHash) -> TxSignature {
        use ed25519_dalek::Signer;
        TxSignature(self.0.sign(tx_hash.as_bytes()))
    }
}

impl PublicKey {
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map(Self)
            .map_err(|_| SignatureError::MalformedKey)
    }

    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.to_bytes()
    }

    /// Address this key controls.
    pub fn address(&self) -> Address {
        Address::from_public_key(&self.0.to_bytes())
    }

    /// Check that `signature` was made over `tx_hash` by this key.
    ///
    /// Uses strict verification, so weak keys and malleable signatures are
    /// refused.
    pub fn verify_tx(&self, tx_hash: &TxHash, signature: &TxSignature) -> Result<(), SignatureError> {
        self.0
            .verify_strict(tx_hash.as_bytes(), &signature.0)
            .map_err(|_| SignatureError::BadSignature(*tx_hash))
    }
}

impl fmt::Debug for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AccountKey").field(&self.address()).finish()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0.to_bytes()))
    }
}

impl fmt::Debug for TxSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxSignature({}..)", hex::encode(&self.0.to_bytes()[..8]))
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature does not match transaction {0}")]
    BadSignature(TxHash),
    #[error("malformed public key")]
    MalformedKey,
}
