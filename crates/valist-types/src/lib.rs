//! Foundation types for the Valist registry client.
//!
//! Every other crate in the workspace depends on `valist-types`.
//!
//! # Key Types
//!
//! - [`Cid`]: Self-describing content identifier (BLAKE3 digest)
//! - [`OrgId`]: Ledger-derived organization identifier
//! - [`Address`]: Account address derived from a public key
//! - [`TxHash`] / [`EventTopic`]: Transaction and event signature hashes
//! - [`OrganizationMeta`] / [`RepositoryMeta`]: Off-chain metadata payloads
//! - [`Organization`] / [`Repository`]: On-chain records
//! - [`OperationKind`]: The six mutating registry operations

pub mod cid;
pub mod error;
pub mod ids;
pub mod meta;
pub mod operation;
pub mod record;

pub use cid::Cid;
pub use error::TypeError;
pub use ids::{Address, EventTopic, OrgId, TxHash};
pub use meta::{OrganizationMeta, ProjectType, RepositoryMeta};
pub use operation::{KeyOperation, OperationId, OperationKind};
pub use record::{Organization, Repository, Scope};
