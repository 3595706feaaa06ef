//! The bound attribute descriptor itself.

use thiserror::Error;

use crate::store::{AttrStore, AttrStoreMut};
use crate::value::AttrValue;

/// A stored value that could not be coerced to its declared type.
///
/// Surfaced to the caller of the failing read; never swallowed or turned
/// into a default.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("attribute '{key}': cannot read {raw:?} as {target}")]
pub struct ConversionError {
    pub key: String,
    pub raw: String,
    pub target: &'static str,
}

/// A bound attribute descriptor: backing key, value type, optional
/// fallback.
///
/// Descriptors are cheap values; entities construct them inside their
/// accessors rather than holding them as state.
///
/// ```
/// use pmvbind::{Attr, OptionMap};
///
/// let mut store = OptionMap::new();
/// let bitrate = Attr::<u64>::with_fallback("bitrate", 2000);
///
/// assert_eq!(bitrate.get(&store).unwrap(), Some(2000));
/// bitrate.set(&mut store, &4713);
/// assert_eq!(store.get("bitrate"), Some("4713"));
/// ```
#[derive(Debug, Clone)]
pub struct Attr<T: AttrValue> {
    key: &'static str,
    fallback: Option<T>,
}

impl<T: AttrValue + Clone> Attr<T> {
    pub fn new(key: &'static str) -> Self {
        Self {
            key,
            fallback: None,
        }
    }

    pub fn with_fallback(key: &'static str, fallback: T) -> Self {
        Self {
            key,
            fallback: Some(fallback),
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Reads through the descriptor.
    ///
    /// An absent key resolves to the declared fallback, unmodified by the
    /// value coercion; `None` when no fallback was declared. A present key
    /// is decoded through the value type, and a failed coercion is an
    /// error, not a default.
    pub fn get<S: AttrStore + ?Sized>(&self, store: &S) -> Result<Option<T>, ConversionError> {
        match store.read_raw(self.key) {
            None => Ok(self.fallback.clone()),
            Some(raw) => match T::decode(raw) {
                Some(value) => Ok(Some(value)),
                None => Err(ConversionError {
                    key: self.key.to_owned(),
                    raw: raw.to_owned(),
                    target: T::LABEL,
                }),
            },
        }
    }

    /// Like [`Attr::get`], with `T::default()` closing the case of an
    /// absent key on a descriptor without a fallback.
    pub fn get_or_default<S: AttrStore + ?Sized>(&self, store: &S) -> Result<T, ConversionError>
    where
        T: Default,
    {
        Ok(self.get(store)?.unwrap_or_default())
    }

    /// Writes through the descriptor, serializing via the value type's
    /// textual form. No side effects beyond the store mutation.
    pub fn set<S: AttrStoreMut + ?Sized>(&self, store: &mut S, value: &T) {
        store.write_raw(self.key, value.encode());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OptionMap;
    use xmltree::Element;

    #[test]
    fn absent_key_returns_fallback_unmodified() {
        let store = OptionMap::new();
        let attr = Attr::with_fallback("leafCount", 17u64);
        assert_eq!(attr.get(&store).unwrap(), Some(17));

        let bare = Attr::<u64>::new("leafCount");
        assert_eq!(bare.get(&store).unwrap(), None);
    }

    #[test]
    fn typed_read_and_write_round_trip_through_text() {
        let mut el = Element::new("Directory");
        el.attributes
            .insert("childCount".to_owned(), "42".to_owned());

        let count = Attr::<u64>::new("childCount");
        assert_eq!(count.get(&el).unwrap(), Some(42));

        count.set(&mut el, &42);
        assert_eq!(el.attributes.get("childCount").map(String::as_str), Some("42"));
    }

    #[test]
    fn round_trip_equals_decode_of_encode() {
        let mut store = OptionMap::new();
        let rating = Attr::<f64>::new("rating");
        for v in [0.0, 7.5, 9.933333] {
            rating.set(&mut store, &v);
            assert_eq!(rating.get(&store).unwrap(), f64::decode(&v.encode()));
        }
    }

    #[test]
    fn failed_coercion_is_an_error_not_a_default() {
        let mut el = Element::new("Video");
        el.attributes
            .insert("duration".to_owned(), "soon".to_owned());

        let err = Attr::<u64>::new("duration").get(&el).unwrap_err();
        assert_eq!(err.key, "duration");
        assert_eq!(err.raw, "soon");
        assert_eq!(err.target, "u64");
    }

    // The generic-object store: any type can route descriptor keys to its
    // own fields, which is how one attribute aliases another.
    struct Aliased {
        key: String,
    }

    impl crate::AttrStore for Aliased {
        fn read_raw(&self, key: &str) -> Option<&str> {
            match key {
                "key" | "ratingKey" => Some(&self.key),
                _ => None,
            }
        }
    }

    #[test]
    fn generic_object_store_aliases_fields() {
        let owner = Aliased {
            key: "4711".to_owned(),
        };
        assert_eq!(
            Attr::<String>::new("ratingKey").get(&owner).unwrap(),
            Some("4711".to_owned())
        );
        assert_eq!(Attr::<u64>::new("key").get(&owner).unwrap(), Some(4711));
    }
}
