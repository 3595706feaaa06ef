//! Branch entities: library sections and directory containers.

use std::sync::Arc;

use once_cell::sync::OnceCell;
use pmvbind::Attr;
use pmvconnect::ServerLink;
use tracing::debug;
use xmltree::{Element, XMLNode};

use crate::errors::{LibraryError, Result};
use crate::item::{Item, LibraryItem, string_attr};

/// Fetches the child listing exactly once for the entity's lifetime.
fn listing<'a>(
    cell: &'a OnceCell<Element>,
    server: &Arc<dyn ServerLink>,
    path: &str,
) -> Result<&'a Element> {
    cell.get_or_try_init(|| {
        debug!(path, "fetching child listing");
        server.fetch_node(path).map_err(LibraryError::from)
    })
}

fn element_children(listing: &Element) -> impl Iterator<Item = &Element> {
    listing.children.iter().filter_map(|node| match node {
        XMLNode::Element(el) => Some(el),
        _ => None,
    })
}

/// Random access into the listing. Out-of-range rows are a normal
/// "absent" result; only unknown kind tags are errors.
fn child_at(server: &Arc<dyn ServerLink>, listing: &Element, row: usize) -> Result<Option<Item>> {
    match element_children(listing).nth(row) {
        Some(el) => Item::wrap(Arc::clone(server), el.clone()).map(Some),
        None => Ok(None),
    }
}

/// A top-level library section.
#[derive(Clone)]
pub struct Section {
    server: Arc<dyn ServerLink>,
    node: Element,
    listing: OnceCell<Element>,
}

impl Section {
    pub fn new(server: Arc<dyn ServerLink>, node: Element) -> Self {
        Self {
            server,
            node,
            listing: OnceCell::new(),
        }
    }

    pub fn uuid(&self) -> Option<String> {
        string_attr(&self.node, "uuid")
    }

    /// Raw section key, as listed (sections are keyed by bare ids).
    fn raw_key(&self) -> Result<String> {
        string_attr(&self.node, "key")
            .ok_or_else(|| LibraryError::MissingKey(self.title()))
    }

    pub fn section_path(&self) -> Result<String> {
        Ok(format!("/library/sections/{}", self.raw_key()?))
    }

    fn listing_path(&self) -> Result<String> {
        Ok(format!("{}/all", self.section_path()?))
    }

    /// Asks the server to rescan this section. Local state is untouched;
    /// picking up the result means browsing again.
    pub fn refresh(&self) -> Result<()> {
        let path = format!("{}/refresh", self.section_path()?);
        self.server.ping(&path)?;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.listing.get().is_some()
    }

    pub fn size(&self) -> Result<u64> {
        if let Some(count) = Attr::<u64>::new("childCount").get(&self.node)? {
            return Ok(count);
        }
        let listing = listing(&self.listing, &self.server, &self.listing_path()?)?;
        Ok(element_children(listing).count() as u64)
    }

    /// Whether children can be expected, from the declared count alone.
    /// Sections rarely declare one, in which case children are assumed.
    pub fn has_child_hint(&self) -> Result<bool> {
        Ok(match Attr::<u64>::new("childCount").get(&self.node)? {
            None => true,
            Some(count) => count > 0,
        })
    }

    pub fn child_at(&self, row: usize) -> Result<Option<Item>> {
        let listing = listing(&self.listing, &self.server, &self.listing_path()?)?;
        child_at(&self.server, listing, row)
    }

    pub fn children(&self) -> Result<Vec<Item>> {
        let listing = listing(&self.listing, &self.server, &self.listing_path()?)?;
        element_children(listing)
            .map(|el| Item::wrap(Arc::clone(&self.server), el.clone()))
            .collect()
    }
}

impl LibraryItem for Section {
    fn server(&self) -> &Arc<dyn ServerLink> {
        &self.server
    }

    fn node(&self) -> &Element {
        &self.node
    }

    fn title(&self) -> String {
        string_attr(&self.node, "title").unwrap_or_else(|| "Unknown Section".to_owned())
    }
}

/// A directory container anywhere below a section: show, season,
/// playlist folder.
#[derive(Clone)]
pub struct Container {
    server: Arc<dyn ServerLink>,
    node: Element,
    listing: OnceCell<Element>,
}

impl Container {
    pub fn new(server: Arc<dyn ServerLink>, node: Element) -> Self {
        Self {
            server,
            node,
            listing: OnceCell::new(),
        }
    }

    /// Listing path: the raw key attribute, which the server hands out as
    /// a ready-to-fetch path.
    fn listing_path(&self) -> Result<String> {
        string_attr(&self.node, "key")
            .ok_or_else(|| LibraryError::MissingKey(self.title()))
    }

    /// Declared child count, when the listing advertises one.
    pub fn child_count_attr(&self) -> Result<Option<u64>> {
        Ok(Attr::<u64>::new("childCount").get(&self.node)?)
    }

    /// Authoritative size: the declared count when present (trusted even
    /// against a disagreeing enumeration, so a count never forces a
    /// fetch), otherwise the actual child tally.
    pub fn size(&self) -> Result<u64> {
        if let Some(count) = self.child_count_attr()? {
            return Ok(count);
        }
        let listing = listing(&self.listing, &self.server, &self.listing_path()?)?;
        Ok(element_children(listing).count() as u64)
    }

    /// Whether children can be expected, from the declared count alone.
    /// Never fetches.
    pub fn has_child_hint(&self) -> Result<bool> {
        Ok(match self.child_count_attr()? {
            None => true,
            Some(count) => count > 0,
        })
    }

    pub fn is_loaded(&self) -> bool {
        self.listing.get().is_some()
    }

    pub fn child_at(&self, row: usize) -> Result<Option<Item>> {
        let listing = listing(&self.listing, &self.server, &self.listing_path()?)?;
        child_at(&self.server, listing, row)
    }

    pub fn children(&self) -> Result<Vec<Item>> {
        let listing = listing(&self.listing, &self.server, &self.listing_path()?)?;
        element_children(listing)
            .map(|el| Item::wrap(Arc::clone(&self.server), el.clone()))
            .collect()
    }

    pub fn leaf_count(&self) -> Result<Option<u64>> {
        Ok(Attr::<u64>::new("leafCount").get(&self.node)?)
    }

    pub fn viewed_count(&self) -> Result<u64> {
        Ok(Attr::with_fallback("viewedLeafCount", 0u64).get_or_default(&self.node)?)
    }

    pub fn year(&self) -> Result<u64> {
        Ok(Attr::with_fallback("year", 0u64).get_or_default(&self.node)?)
    }

    pub fn rating(&self) -> Result<f64> {
        Ok(Attr::with_fallback("rating", 0.0f64).get_or_default(&self.node)?)
    }
}

impl LibraryItem for Container {
    fn server(&self) -> &Arc<dyn ServerLink> {
        &self.server
    }

    fn node(&self) -> &Element {
        &self.node
    }
}

/// Lists the server's top-level sections.
pub fn sections(server: &Arc<dyn ServerLink>) -> Result<Vec<Section>> {
    let children = server.fetch_children("/library/sections")?;
    Ok(children
        .into_iter()
        .map(|el| Section::new(Arc::clone(server), el))
        .collect())
}
