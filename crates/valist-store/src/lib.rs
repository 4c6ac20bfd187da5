//! Content-addressed blob storage for Valist registry metadata.
//!
//! Organization and repository metadata live off-chain; the ledger only
//! stores their [`Cid`](valist_types::Cid). This crate defines the
//! [`ContentStore`] boundary the registry client writes through and two
//! backends:
//!
//! - [`InMemoryContentStore`] -- `HashMap`-based store for tests and embedding
//! - [`FsContentStore`] -- one file per blob under a root directory
//!
//! # Design Rules
//!
//! 1. Blobs are immutable once written (content addressing guarantees this).
//! 2. Write-then-reference: a CID is handed out only after the blob is stored.
//! 3. Concurrent reads are always safe.
//! 4. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod fs;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fs::FsContentStore;
pub use memory::InMemoryContentStore;
pub use traits::ContentStore;
