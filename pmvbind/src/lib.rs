//! # pmvbind - Typed attribute binding
//!
//! Declarative accessors that bind a typed in-memory value to a string
//! keyed backing store. The protocol speaks in string attributes (XML
//! attribute nodes, URL query options), the rest of the workspace wants
//! typed fields; this crate is the bridge.
//!
//! A [`Attr`] descriptor declares a backing key, a value type and an
//! optional fallback. Reading resolves the raw string through the value
//! type's coercion; an absent key resolves to the fallback untouched.
//! Writing serializes through the value type's textual form.
//!
//! Backing stores implement [`AttrStore`] / [`AttrStoreMut`]. Three
//! families are supported out of the box:
//!
//! - `xmltree::Element` — attribute node of a parsed document,
//! - [`OptionMap`] — ordered options later rendered as a query string,
//! - any user type routing keys to its own fields (object aliasing).
//!
//! The owner picks its store statically, so a missing store implementation
//! is a compile error rather than a runtime one.

mod attr;
mod store;
mod value;

pub use attr::{Attr, ConversionError};
pub use store::{AttrStore, AttrStoreMut, OptionMap};
pub use value::AttrValue;
