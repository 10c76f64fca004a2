//! # Pronto Utils
//!
//! Support layer for an ontology-processing library.
//!
//! ## Features
//!
//! - **Identifier canonicalization**: Clark-notation expansion of `prefix:local`
//!   names and `PREFIX:LOCAL` formatting of accession URIs
//! - **Order-preserving deduplication**: lazy, works on unbounded input
//! - **Worker pool**: fixed-size pool for independent, long-running jobs such
//!   as parsing many ontology documents concurrently
//! - **Nested parallelism**: a job may build and use a pool of its own
//! - **Guaranteed cleanup**: every pool is registered and closed/joined when
//!   its owning context ends, including at process exit
//!
//! ## Quick Start
//!
//! ```rust
//! use pronto_utils::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(4)?;
//!
//! let sources = vec!["go.obo", "uo.obo", "chebi.obo"];
//! let sizes = pool.map(|path: &str| Ok(path.len()), sources)?;
//! assert_eq!(sizes, vec![6, 6, 9]);
//!
//! pool.close();
//! pool.join()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Nested Pools
//!
//! ```rust
//! use pronto_utils::prelude::*;
//!
//! # fn main() -> Result<()> {
//! let pool = WorkerPool::new(2)?;
//! let handle = pool.submit(|| {
//!     // Fan out over imported documents from inside a job
//!     let imports = WorkerPool::new(2)?;
//!     let parsed = imports.map(|n: u32| Ok(n * 10), vec![1, 2, 3])?;
//!     Ok(parsed.iter().sum::<u32>())
//! })?;
//! assert_eq!(handle.wait()?, 60);
//! # Ok(())
//! # }
//! ```
//!
//! ## Identifiers
//!
//! ```rust
//! use pronto_utils::prelude::*;
//!
//! let ids = ["UO_1000003", "UO_1000003", "GO_0008150"];
//! let unique: Vec<String> = unique_everseen(ids.iter().map(|id| format_accession(id, None))).collect();
//! assert_eq!(unique, vec!["UO:1000003", "GO:0008150"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod core;
pub mod ident;
pub mod iter;
pub mod pool;
pub mod prelude;
pub mod queue;
#[cfg(feature = "tracing")]
pub mod tracing;

pub use self::core::{BoxError, JobHandle, JobResult, ProntoError, Result};
pub use self::pool::{PoolConfig, PoolRegistry, PoolState, WorkerPool};
