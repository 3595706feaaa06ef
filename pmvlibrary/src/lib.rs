//! # pmvlibrary - Library entities
//!
//! Typed wrappers over the XML nodes a media server returns when its
//! library is browsed: [`Section`] and [`Container`] for branch listings,
//! [`Video`] for playable leaves, [`Media`] and [`Part`] for the physical
//! renditions behind a leaf.
//!
//! Entities pair a shared [`ServerLink`](pmvconnect::ServerLink) handle
//! with one backing node and expose their fields through the `pmvbind`
//! descriptors. Child listings are fetched lazily, exactly once per
//! entity; refreshing means building a new entity.

mod container;
mod errors;
mod item;
mod video;

pub use container::{Container, Section, sections};
pub use errors::{LibraryError, Result};
pub use item::{Item, LibraryItem, fetch_item};
pub use video::{Media, Part, Video};
