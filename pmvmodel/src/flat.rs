//! Flat re-projection of one subtree.

use tracing::debug;

use crate::errors::ModelError;
use crate::tree::{NodeId, TreeModel};

/// Structural reset notification phases, emitted around every anchor
/// swap so observers never read a half-updated index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPhase {
    AboutToReset,
    Reset,
}

/// A flat row resolved back into the source tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceIndex {
    /// Anchor the row is relative to; `None` is the root sentinel.
    pub parent: Option<NodeId>,
    pub row: usize,
}

/// Projects the children of one "anchor" node as a flat list.
///
/// The proxy owns no entity state — only the anchor pointer and its
/// observers; every mapping is a pure function of `(row, anchor)`
/// evaluated against the source model passed into each call. One proxy
/// belongs to exactly one model; pairing it with another model is a
/// caller bug.
#[derive(Default)]
pub struct FlatProxy {
    anchor: Option<NodeId>,
    observers: Vec<Box<dyn FnMut(ResetPhase) + Send>>,
}

impl FlatProxy {
    /// New proxy anchored at the root (top-level sections).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anchor(&self) -> Option<NodeId> {
        self.anchor
    }

    pub fn observe(&mut self, observer: impl FnMut(ResetPhase) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    fn notify(&mut self, phase: ResetPhase) {
        for observer in &mut self.observers {
            observer(phase);
        }
    }

    /// Moves the anchor. The swap sits between the two reset
    /// notifications with no model reads in between.
    pub fn set_anchor(&mut self, anchor: Option<NodeId>) {
        debug!(?anchor, "flat proxy anchor swap");
        self.notify(ResetPhase::AboutToReset);
        self.anchor = anchor;
        self.notify(ResetPhase::Reset);
    }

    /// Drills down into `node`.
    pub fn descend(&mut self, node: NodeId) {
        self.set_anchor(Some(node));
    }

    /// Moves the anchor to its parent. A no-op at the root sentinel, so
    /// repeated calls are idempotent at the top.
    pub fn go_up(&mut self, model: &TreeModel) {
        if let Some(anchor) = self.anchor {
            let parent = model.parent_of(anchor);
            self.set_anchor(parent);
        }
    }

    pub fn row_count(&self, model: &mut TreeModel) -> Result<u64, ModelError> {
        model.child_count(self.anchor.unwrap_or(TreeModel::ROOT))
    }

    pub fn column_count(&self) -> usize {
        1
    }

    /// Pure mapping of a flat row into the source tree.
    pub fn map_to_source(&self, row: usize) -> SourceIndex {
        SourceIndex {
            parent: self.anchor,
            row,
        }
    }

    /// Resolves a flat row to its source node, materializing it if
    /// needed. `Ok(None)` past the end, as everywhere.
    pub fn source_node(
        &self,
        model: &mut TreeModel,
        row: usize,
    ) -> Result<Option<NodeId>, ModelError> {
        model.child(self.anchor.unwrap_or(TreeModel::ROOT), row)
    }
}
