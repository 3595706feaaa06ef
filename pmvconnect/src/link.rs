//! The narrow collaborator contract the rest of the workspace browses
//! through.

use xmltree::{Element, XMLNode};

use crate::errors::ConnectionError;

/// Server-access contract.
///
/// Entities, view models and caches depend on this trait rather than on
/// [`Connection`](crate::Connection); tests substitute scripted fakes.
/// Implementations are synchronous and perform exactly one request per
/// call.
pub trait ServerLink: Send + Sync {
    /// Name identifying the server, used as a cache namespace key.
    fn identity_name(&self) -> &str;

    /// Fetches and parses the document at `path`, returning its root node.
    fn fetch_node(&self, path: &str) -> Result<Element, ConnectionError>;

    /// Fires a side-effecting request and reports plain success/failure.
    fn ping(&self, path: &str) -> Result<(), ConnectionError>;

    /// Fetches the raw bytes at `path` (thumbnails, media segments).
    fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, ConnectionError>;

    /// Absolute locator for `path`, for hand-off to external consumers.
    fn absolute_url(&self, path: &str) -> String;

    /// Fetches the listing at `path` and returns its direct element
    /// children in document order.
    fn fetch_children(&self, path: &str) -> Result<Vec<Element>, ConnectionError> {
        let root = self.fetch_node(path)?;
        Ok(root
            .children
            .into_iter()
            .filter_map(|node| match node {
                XMLNode::Element(el) => Some(el),
                _ => None,
            })
            .collect())
    }
}
