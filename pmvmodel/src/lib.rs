//! # pmvmodel - Browsable view model
//!
//! Projects the lazily loaded entity tree of `pmvlibrary` into a stable
//! row/column index space a UI can drive:
//!
//! - [`TreeModel`] — an arena of view nodes addressed by [`NodeId`], with
//!   on-demand child materialization and an unbounded per-node child
//!   cache (invalidated only by dropping the model).
//! - [`FlatProxy`] — re-addresses one subtree as a flat single-level
//!   list, with a movable anchor for drill-down / go-up navigation.
//!
//! Parent and child links are arena indices, so the ownership graph is
//! acyclic even though the logical graph has cycles. Everything here is
//! single-threaded and synchronous: methods that need remote data block
//! until it is parsed or a typed error is returned.

mod errors;
mod flat;
mod tree;

pub use errors::ModelError;
pub use flat::{FlatProxy, ResetPhase, SourceIndex};
pub use tree::{Expansion, NodeId, TreeModel};
