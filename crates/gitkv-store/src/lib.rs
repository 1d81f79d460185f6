//! Content-addressed git object storage on an embedded transactional
//! key-value engine.
//!
//! Objects are keyed by their raw 20-byte SHA-1 ID and stored in a single
//! `redb` file. The stored value is the payload plus a one-byte object type
//! tag; where the tag sits is fixed per file (see [`ValueLayout`]).
//!
//! # Backends
//!
//! All backends implement the [`OdbBackend`] trait:
//!
//! - [`TransactionalBackend`] -- tag-first layout, cheap header reads, and
//!   explicit begin/commit/rollback through [`TransactionCoordinator`]
//! - [`KvBackend`] -- tag-last layout, every call in its own transaction
//! - [`InMemoryBackend`] -- `BTreeMap`-based store for tests and embedding
//!
//! [`ObjectDatabase`] stacks several backends by priority, the way a git
//! repository consults its object stores.
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; the ID is computed, never supplied.
//! 2. A missing object is `NotFound`, distinct from every failure.
//! 3. Reads return owned copies; engine memory never leaves a call.
//! 4. Engine errors are propagated on first occurrence, never retried.
//! 5. One outer transaction per backend; operations inside it are children.

mod accessor;
pub mod backend;
pub mod config;
pub mod env;
pub mod error;
pub mod iter;
pub mod layout;
pub mod memory;
pub mod object;
pub mod odb;
pub mod traits;
pub mod transactional;

// Re-export primary types at crate root for ergonomic imports.
pub use backend::KvBackend;
pub use config::{DurabilityMode, StoreConfig};
pub use env::Environment;
pub use error::{StoreError, StoreResult};
pub use iter::Visitor;
pub use layout::{LayoutError, ValueLayout};
pub use memory::InMemoryBackend;
pub use object::{ObjectHeader, RawObject};
pub use odb::{ObjectDatabase, DEFAULT_PRIORITY};
pub use traits::{OdbBackend, TransactionCoordinator, TxState};
pub use transactional::TransactionalBackend;
