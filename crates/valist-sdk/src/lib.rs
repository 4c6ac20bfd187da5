//! Client SDK for the Valist registry.
//!
//! Every registry mutation runs through one pipeline: stage metadata in the
//! content store, submit a signed transaction, wait for it to be mined, and
//! decode the event that proves what happened. [`Client`] is the entry point
//! for applications; [`TransactionOrchestrator`] and
//! [`GovernanceCoordinator`] are exposed for callers that want the pipeline
//! without the read cache.

pub mod account;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod governance;
pub mod orchestrator;

pub use account::{LocalAccount, TransactionSigner};
pub use cache::{InMemoryRecordCache, RecordCache};
pub use client::Client;
pub use config::{CacheConfig, ClientConfig, ConfirmationConfig};
pub use error::{SdkError, SdkResult, Stage};
pub use events::{EventDecoder, RegistryEvent};
pub use governance::GovernanceCoordinator;
pub use orchestrator::{Confirmed, Operation, PendingTransaction, TransactionOrchestrator, TxState};

// Re-export the types callers need to drive the client
pub use valist_ledger::{
    CallContext, CancelHandle, MetaUpdate, OrgCreated, RepoCreated, TxStatus, VoteKeyEvent,
    VoteThresholdEvent,
};
pub use valist_types::{
    Address, Cid, KeyOperation, OrgId, Organization, OrganizationMeta, ProjectType, Repository,
    RepositoryMeta, Scope, TxHash,
};
