//! Leaf entities: playable videos and their physical renditions.

use std::sync::Arc;

use pmvbind::Attr;
use pmvconnect::ServerLink;
use tracing::debug;
use xmltree::{Element, XMLNode};

use crate::errors::Result;
use crate::item::{LibraryItem, string_attr};

const SCROBBLE_IDENTIFIER: &str = "com.plexapp.plugins.library";

/// A playable leaf.
#[derive(Clone)]
pub struct Video {
    server: Arc<dyn ServerLink>,
    node: Element,
}

impl Video {
    pub fn new(server: Arc<dyn ServerLink>, node: Element) -> Self {
        Self { server, node }
    }

    pub fn duration_ms(&self) -> Result<Option<u64>> {
        Ok(Attr::<u64>::new("duration").get(&self.node)?)
    }

    pub fn index(&self) -> Result<Option<u64>> {
        Ok(Attr::<u64>::new("index").get(&self.node)?)
    }

    pub fn originally_available(&self) -> Option<String> {
        string_attr(&self.node, "originallyAvailableAt")
    }

    pub fn rating(&self) -> Result<Option<f64>> {
        Ok(Attr::<f64>::new("rating").get(&self.node)?)
    }

    /// Times this video was watched, per local state.
    pub fn views(&self) -> Result<u64> {
        Ok(Attr::with_fallback("viewCount", 0u64).get_or_default(&self.node)?)
    }

    /// Playable renditions embedded in the node, in document order.
    /// Order matters: it is the tie-break for equally scored formats in
    /// the playback chooser.
    pub fn formats(&self) -> Vec<Media> {
        self.node
            .children
            .iter()
            .filter_map(|node| match node {
                XMLNode::Element(el) if el.name == "Media" => Some(el),
                _ => None,
            })
            .enumerate()
            .map(|(index, el)| Media::new(Arc::clone(&self.server), el.clone(), index))
            .collect()
    }

    fn scrobble_path(&self, endpoint: &str) -> Result<String> {
        let key = self
            .key()
            .ok_or_else(|| crate::LibraryError::MissingKey(self.title()))?;
        Ok(format!(
            "/:/{}?key={}&identifier={}",
            endpoint, key, SCROBBLE_IDENTIFIER
        ))
    }

    /// Tells the server this video was watched. The local view counter
    /// moves only once the server confirmed; a failed call leaves it
    /// untouched.
    pub fn mark_watched(&mut self) -> Result<()> {
        let path = self.scrobble_path("scrobble")?;
        self.server.ping(&path)?;

        let views = self.views()?;
        Attr::new("viewCount").set(&mut self.node, &(views + 1));
        debug!(views = views + 1, "marked watched");
        Ok(())
    }

    /// Confirm-then-update counterpart of [`Video::mark_watched`].
    pub fn mark_unwatched(&mut self) -> Result<()> {
        let path = self.scrobble_path("unscrobble")?;
        self.server.ping(&path)?;

        Attr::new("viewCount").set(&mut self.node, &0u64);
        debug!("marked unwatched");
        Ok(())
    }
}

impl LibraryItem for Video {
    fn server(&self) -> &Arc<dyn ServerLink> {
        &self.server
    }

    fn node(&self) -> &Element {
        &self.node
    }

    /// Videos are keyed by their rating key, not the listing key.
    fn key(&self) -> Option<String> {
        string_attr(&self.node, "ratingKey")
    }
}

/// One physical rendition of a video: codec, resolution, bitrate.
/// Pure attribute bag plus part enumeration.
#[derive(Clone)]
pub struct Media {
    server: Arc<dyn ServerLink>,
    node: Element,
    index: usize,
}

impl Media {
    pub fn new(server: Arc<dyn ServerLink>, node: Element, index: usize) -> Self {
        Self {
            server,
            node,
            index,
        }
    }

    /// Position among the owning video's formats.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> Option<String> {
        string_attr(&self.node, "id")
    }

    pub fn duration_ms(&self) -> Result<Option<u64>> {
        Ok(Attr::<u64>::new("duration").get(&self.node)?)
    }

    /// Container format of the file ("mkv", "mp4", ...).
    pub fn container_format(&self) -> Option<String> {
        string_attr(&self.node, "container")
    }

    pub fn aspect_ratio(&self) -> Result<Option<f64>> {
        Ok(Attr::<f64>::new("aspectRatio").get(&self.node)?)
    }

    pub fn bitrate(&self) -> Result<Option<u64>> {
        Ok(Attr::<u64>::new("bitrate").get(&self.node)?)
    }

    pub fn height(&self) -> Result<u64> {
        Ok(Attr::with_fallback("height", 0u64).get_or_default(&self.node)?)
    }

    pub fn width(&self) -> Result<u64> {
        Ok(Attr::with_fallback("width", 0u64).get_or_default(&self.node)?)
    }

    pub fn video_codec(&self) -> Option<String> {
        string_attr(&self.node, "videoCodec")
    }

    pub fn framerate(&self) -> Option<String> {
        string_attr(&self.node, "videoFrameRate")
    }

    pub fn video_resolution(&self) -> Option<String> {
        string_attr(&self.node, "videoResolution")
    }

    pub fn audio_channels(&self) -> Result<Option<u64>> {
        Ok(Attr::<u64>::new("audioChannels").get(&self.node)?)
    }

    pub fn audio_codec(&self) -> Option<String> {
        string_attr(&self.node, "audioCodec")
    }

    /// File segments of this rendition, in document order.
    pub fn parts(&self) -> Vec<Part> {
        self.node
            .children
            .iter()
            .filter_map(|node| match node {
                XMLNode::Element(el) if el.name == "Part" => Some(el),
                _ => None,
            })
            .enumerate()
            .map(|(index, el)| Part::new(Arc::clone(&self.server), el.clone(), index))
            .collect()
    }
}

/// One file segment of a rendition.
#[derive(Clone)]
pub struct Part {
    server: Arc<dyn ServerLink>,
    node: Element,
    index: usize,
}

impl Part {
    pub fn new(server: Arc<dyn ServerLink>, node: Element, index: usize) -> Self {
        Self {
            server,
            node,
            index,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> Option<String> {
        string_attr(&self.node, "id")
    }

    pub fn duration_ms(&self) -> Result<Option<u64>> {
        Ok(Attr::<u64>::new("duration").get(&self.node)?)
    }

    pub fn size_bytes(&self) -> Result<Option<u64>> {
        Ok(Attr::<u64>::new("size").get(&self.node)?)
    }

    /// Path of the file on the server's filesystem.
    pub fn fs_path(&self) -> Option<String> {
        string_attr(&self.node, "file")
    }

    /// Server path streaming this part's bytes; raw, unlike the
    /// normalized metadata keys.
    pub fn stream_path(&self) -> Option<String> {
        string_attr(&self.node, "key")
    }

    pub fn server(&self) -> &Arc<dyn ServerLink> {
        &self.server
    }

    /// Absolute locator for direct playback of this part.
    pub fn stream_url(&self) -> Option<String> {
        self.stream_path().map(|path| self.server.absolute_url(&path))
    }
}
