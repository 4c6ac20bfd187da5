//! Ledger boundary for the Valist registry.
//!
//! This crate provides:
//! - Transaction envelopes, receipts, and logs (`tx`)
//! - Typed registry contract events with topic-based identification (`abi`)
//! - `LedgerReader` / `LedgerWriter` trait boundaries
//! - `await_mined`, a cancellable confirmation wait driven by `CallContext`
//! - `InMemoryLedger`, a reference ledger that simulates block production
//!   and the registry contract for tests and embedding

pub mod abi;
pub mod confirm;
pub mod context;
mod contract;
pub mod error;
pub mod memory;
pub mod traits;
pub mod tx;

pub use abi::{
    ContractEvent, MetaUpdate, OrgCreated, RepoCreated, VoteKeyEvent, VoteThresholdEvent,
};
pub use confirm::{await_mined, PollPolicy};
pub use context::{CallContext, CancelHandle};
pub use error::{LedgerError, LedgerResult};
pub use memory::{InMemoryLedger, LedgerConfig, MiningMode};
pub use traits::{Ledger, LedgerReader, LedgerWriter};
pub use tx::{
    Call, Log, LogFilter, Receipt, ReceiptStatus, SignedTransaction, TxHandle, TxRequest,
    TxStatus,
};
