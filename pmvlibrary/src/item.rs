//! Common metadata surface and kind-tag dispatch.

use std::sync::Arc;

use pmvbind::Attr;
use pmvconnect::ServerLink;
use xmltree::Element;

use crate::container::Container;
use crate::errors::{LibraryError, Result};
use crate::video::Video;

pub(crate) const DIRECTORY_TAG: &str = "Directory";
pub(crate) const VIDEO_TAG: &str = "Video";

/// Reads a string attribute through a descriptor.
// String coercion is total, so the conversion arm cannot trigger.
pub(crate) fn string_attr(node: &Element, key: &'static str) -> Option<String> {
    Attr::<String>::new(key).get(node).unwrap_or(None)
}

/// Metadata shared by everything the library hands out.
pub trait LibraryItem {
    fn server(&self) -> &Arc<dyn ServerLink>;
    fn node(&self) -> &Element;

    /// Stable identifier of this item.
    ///
    /// Listing keys sometimes come as paths (`/library/<x>/<key>/...`);
    /// the bare key is the fourth segment.
    fn key(&self) -> Option<String> {
        let raw = string_attr(self.node(), "key")?;
        if raw.starts_with('/') {
            raw.split('/').nth(3).map(str::to_owned)
        } else {
            Some(raw)
        }
    }

    fn metadata_path(&self) -> Option<String> {
        self.key().map(|key| format!("/library/metadata/{}", key))
    }

    fn title(&self) -> String {
        string_attr(self.node(), "title").unwrap_or_else(|| "Title Unknown".to_owned())
    }

    fn thumb_path(&self) -> Option<String> {
        string_attr(self.node(), "thumb")
    }

    fn summary(&self) -> Option<String> {
        string_attr(self.node(), "summary")
    }

    /// Library flavor ("movie", "show", "episode", ...), not the kind tag.
    fn media_type(&self) -> Option<String> {
        string_attr(self.node(), "type")
    }
}

/// One library child, wrapped according to its kind tag.
#[derive(Clone)]
pub enum Item {
    Container(Container),
    Video(Video),
}

impl Item {
    /// Wraps `node` by its kind tag: a directory-tagged node becomes a
    /// [`Container`], a video-tagged node a [`Video`]. Anything else is an
    /// [`LibraryError::UnknownEntityKind`].
    pub fn wrap(server: Arc<dyn ServerLink>, node: Element) -> Result<Item> {
        match node.name.as_str() {
            DIRECTORY_TAG => Ok(Item::Container(Container::new(server, node))),
            VIDEO_TAG => Ok(Item::Video(Video::new(server, node))),
            other => Err(LibraryError::UnknownEntityKind(other.to_owned())),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, Item::Container(_))
    }

    pub fn as_container(&self) -> Option<&Container> {
        match self {
            Item::Container(container) => Some(container),
            Item::Video(_) => None,
        }
    }

    pub fn as_video(&self) -> Option<&Video> {
        match self {
            Item::Video(video) => Some(video),
            Item::Container(_) => None,
        }
    }
}

impl LibraryItem for Item {
    fn server(&self) -> &Arc<dyn ServerLink> {
        match self {
            Item::Container(c) => c.server(),
            Item::Video(v) => v.server(),
        }
    }

    fn node(&self) -> &Element {
        match self {
            Item::Container(c) => c.node(),
            Item::Video(v) => v.node(),
        }
    }

    fn key(&self) -> Option<String> {
        match self {
            Item::Container(c) => c.key(),
            Item::Video(v) => v.key(),
        }
    }
}

/// Looks one item up by its metadata key.
pub fn fetch_item(server: Arc<dyn ServerLink>, key: &str) -> Result<Item> {
    let path = format!("/library/metadata/{}", key);
    let mut children = server.fetch_children(&path)?;
    if children.is_empty() {
        return Err(LibraryError::NotFound(path));
    }
    Item::wrap(server, children.remove(0))
}
