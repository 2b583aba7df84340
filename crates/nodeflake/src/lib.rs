//! Time-sortable 64-bit identifiers for a fleet of processes.
//!
//! Every identifier packs three fields into the positive range of an `i64`:
//!
//! ```text
//!  Bit Index:  63  62            24 23            16 15             0
//!              +---+----------------+----------------+---------------+
//!  Field:      | 0 |    time (39)   |  sequence (8)  |   node (16)   |
//!              +---+----------------+----------------+---------------+
//! ```
//!
//! `time` counts 10 ms units since the generator epoch, `sequence` counts
//! identifiers within one unit, and `node` is a 16-bit identity resolved once
//! per [`Generator`] (see [`resolve_node_id`]).
//!
//! [`Generator::new`] is the primary API. The free functions in this crate
//! ([`next_id`], [`next_id_with_retry`], ...) operate on a lazily initialized
//! process-wide [`Registry`].
//!
//! ```no_run
//! use nodeflake::{CancelToken, Generator, Settings};
//! use std::time::Duration;
//!
//! let generator = Generator::new(Settings::default().max_wait(Duration::from_millis(100)))?;
//! let id = generator.next_id_with_retry(&CancelToken::new())?;
//! let parts = nodeflake::decompose(id)?;
//! assert_eq!(parts.node, generator.node_id()?);
//! # Ok::<(), nodeflake::Error>(())
//! ```
#![cfg_attr(docsrs, feature(doc_cfg))]

mod counter;
mod error;
mod generator;
mod id;
mod node;
mod registry;
#[cfg(feature = "async-tokio")]
mod runtime;
#[cfg(feature = "serde")]
pub mod serde;
mod time;

pub use crate::counter::*;
pub use crate::error::*;
pub use crate::generator::*;
pub use crate::id::*;
pub use crate::node::*;
pub use crate::registry::*;
#[cfg_attr(docsrs, doc(cfg(feature = "async-tokio")))]
#[cfg(feature = "async-tokio")]
pub use crate::runtime::*;
pub use crate::time::*;
