//! Arena-backed hierarchical view model.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use pmvconnect::ServerLink;
use pmvcovers::CoverCache;
use pmvlibrary::{Container, Item, LibraryItem, Section, Video, sections};
use tracing::debug;

use crate::errors::ModelError;

/// Stable handle into the model's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// Child-fetch state of one node.
///
/// `Expanding` covers the blocking listing fetch; once `Expanded`, child
/// lookups are served from the node cache without re-entering it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expansion {
    Unexpanded,
    Expanding,
    Expanded,
}

enum NodeData {
    /// The connection itself; its children are the top-level sections.
    Root { sections: Vec<Section> },
    Section(Section),
    Container(Container),
    Video(Video),
}

struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    row: usize,
    children: HashMap<usize, NodeId>,
    expansion: Expansion,
    /// Stable per-entity key, so independently fetched wrappers of one
    /// remote resource compare equal.
    identity: Option<String>,
}

/// Index-addressable tree over the server's library.
///
/// Nodes are created on demand and cached forever (the cache dies with
/// the model); parent links are arena indices, never owning references.
pub struct TreeModel {
    server: Arc<dyn ServerLink>,
    nodes: Vec<Node>,
}

impl TreeModel {
    pub const ROOT: NodeId = NodeId(0);

    /// Builds the model for one server, fetching its section listing.
    pub fn connect(server: Arc<dyn ServerLink>) -> Result<Self, ModelError> {
        let sections = sections(&server)?;
        debug!(count = sections.len(), "view model connected");
        Ok(Self {
            server,
            nodes: vec![Node {
                data: NodeData::Root { sections },
                parent: None,
                row: 0,
                children: HashMap::new(),
                expansion: Expansion::Expanded,
                identity: None,
            }],
        })
    }

    pub fn server(&self) -> &Arc<dyn ServerLink> {
        &self.server
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn entity_loaded(data: &NodeData) -> bool {
        match data {
            NodeData::Root { .. } | NodeData::Video(_) => true,
            NodeData::Section(section) => section.is_loaded(),
            NodeData::Container(container) => container.is_loaded(),
        }
    }

    fn sync_expansion(&mut self, id: NodeId) {
        if Self::entity_loaded(&self.node(id).data) {
            self.node_mut(id).expansion = Expansion::Expanded;
        }
    }

    pub fn expansion(&self, id: NodeId) -> Expansion {
        self.node(id).expansion
    }

    /// Child of `parent` at `row`, materializing it on first access.
    ///
    /// Out-of-range rows are a normal `Ok(None)` — "no such row" is a
    /// boundary condition, not an error. Unknown child kinds and remote
    /// failures surface as errors.
    pub fn child(&mut self, parent: NodeId, row: usize) -> Result<Option<NodeId>, ModelError> {
        if let Some(&id) = self.node(parent).children.get(&row) {
            return Ok(Some(id));
        }

        if !Self::entity_loaded(&self.node(parent).data) {
            self.node_mut(parent).expansion = Expansion::Expanding;
        }

        let resolved = match &self.node(parent).data {
            NodeData::Root { sections } => Ok(sections.get(row).cloned().map(|section| {
                let identity = section.key();
                (NodeData::Section(section), identity)
            })),
            NodeData::Section(section) => section
                .child_at(row)
                .map(|item| item.map(Self::wrap_item)),
            NodeData::Container(container) => container
                .child_at(row)
                .map(|item| item.map(Self::wrap_item)),
            NodeData::Video(_) => Ok(None),
        };

        let resolved = match resolved {
            Ok(resolved) => resolved,
            Err(err) => {
                // Failed fetch: back to square one, nothing was cached.
                self.node_mut(parent).expansion = Expansion::Unexpanded;
                return Err(err.into());
            }
        };
        self.sync_expansion(parent);

        let Some((data, identity)) = resolved else {
            return Ok(None);
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data,
            parent: Some(parent),
            row,
            children: HashMap::new(),
            expansion: Expansion::Unexpanded,
            identity,
        });
        self.node_mut(parent).children.insert(row, id);
        Ok(Some(id))
    }

    fn wrap_item(item: Item) -> (NodeData, Option<String>) {
        let identity = item.key();
        let data = match item {
            Item::Container(container) => NodeData::Container(container),
            Item::Video(video) => NodeData::Video(video),
        };
        (data, identity)
    }

    /// Parent of `node`; `None` is the root sentinel (top of tree), also
    /// returned for nodes sitting directly under the root.
    pub fn parent_of(&self, node: NodeId) -> Option<NodeId> {
        match self.node(node).parent {
            None | Some(Self::ROOT) => None,
            Some(parent) => Some(parent),
        }
    }

    pub fn row_of(&self, node: NodeId) -> usize {
        self.node(node).row
    }

    pub fn column_count(&self) -> usize {
        1
    }

    /// Row count under `node`, delegating to the entity's size. May block
    /// on a first enumeration when the listing declares no count.
    pub fn child_count(&mut self, node: NodeId) -> Result<u64, ModelError> {
        let count = match &self.node(node).data {
            NodeData::Root { sections } => sections.len() as u64,
            NodeData::Section(section) => section.size()?,
            NodeData::Container(container) => container.size()?,
            NodeData::Video(_) => 0,
        };
        self.sync_expansion(node);
        Ok(count)
    }

    /// Whether `node` is a branch with children to offer. Answered from
    /// the node kind and the declared count alone; never fetches.
    pub fn has_children(&self, node: NodeId) -> Result<bool, ModelError> {
        Ok(match &self.node(node).data {
            NodeData::Root { .. } => true,
            NodeData::Section(section) => section.has_child_hint()?,
            NodeData::Container(container) => container.has_child_hint()?,
            NodeData::Video(_) => false,
        })
    }

    pub fn is_leaf(&self, node: NodeId) -> bool {
        matches!(self.node(node).data, NodeData::Video(_))
    }

    /// Arena identity or stable entity key equality.
    pub fn same_entity(&self, a: NodeId, b: NodeId) -> bool {
        if a == b {
            return true;
        }
        match (&self.node(a).identity, &self.node(b).identity) {
            (Some(left), Some(right)) => left == right,
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Presentation projections
    // ------------------------------------------------------------------

    pub fn label(&self, node: NodeId) -> String {
        match &self.node(node).data {
            NodeData::Root { .. } => self.server.identity_name().to_owned(),
            NodeData::Section(section) => section.title(),
            NodeData::Container(container) => container.title(),
            NodeData::Video(video) => video.title(),
        }
    }

    /// Richer one-line description, for tooltips and status lines.
    pub fn detail(&self, node: NodeId) -> Result<String, ModelError> {
        match &self.node(node).data {
            NodeData::Container(container) => {
                let Some(leaves) = container.leaf_count()? else {
                    return Ok(container.title());
                };
                let viewed = container.viewed_count()?;
                let viewed = if viewed > 0 {
                    format!("{}/", viewed)
                } else {
                    String::new()
                };
                Ok(format!(
                    "{} ({:4}, {}{}Eps, {:.1})",
                    container.title(),
                    container.year()?,
                    viewed,
                    leaves,
                    container.rating()?,
                ))
            }
            _ => Ok(self.label(node)),
        }
    }

    /// A leaf nobody has watched yet.
    pub fn unfinished(&self, node: NodeId) -> Result<bool, ModelError> {
        match &self.node(node).data {
            NodeData::Video(video) => Ok(video.views()? == 0),
            _ => Ok(false),
        }
    }

    /// Local path of the node's thumbnail, downloading through `cache` on
    /// miss. The only model operation touching the disk.
    pub fn thumbnail(
        &self,
        node: NodeId,
        cache: &CoverCache,
    ) -> Result<Option<PathBuf>, ModelError> {
        let thumb = match &self.node(node).data {
            NodeData::Root { .. } => None,
            NodeData::Section(section) => section.thumb_path(),
            NodeData::Container(container) => container.thumb_path(),
            NodeData::Video(video) => video.thumb_path(),
        };
        match thumb {
            None => Ok(None),
            Some(path) => Ok(Some(cache.fetch(self.server.as_ref(), &path)?)),
        }
    }

    // ------------------------------------------------------------------
    // Entity access, for the activation decision the caller owns
    // ------------------------------------------------------------------

    pub fn video(&self, node: NodeId) -> Option<&Video> {
        match &self.node(node).data {
            NodeData::Video(video) => Some(video),
            _ => None,
        }
    }

    pub fn video_mut(&mut self, node: NodeId) -> Option<&mut Video> {
        match &mut self.node_mut(node).data {
            NodeData::Video(video) => Some(video),
            _ => None,
        }
    }

    pub fn section(&self, node: NodeId) -> Option<&Section> {
        match &self.node(node).data {
            NodeData::Section(section) => Some(section),
            _ => None,
        }
    }
}
