//! Backing stores a descriptor can read and write through.

use xmltree::Element;

/// Read side of a string keyed backing store.
pub trait AttrStore {
    fn read_raw(&self, key: &str) -> Option<&str>;
}

/// Write side of a string keyed backing store.
pub trait AttrStoreMut: AttrStore {
    fn write_raw(&mut self, key: &str, value: String);
}

// Attribute-node store: the attributes of a parsed XML element.
impl AttrStore for Element {
    fn read_raw(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

impl AttrStoreMut for Element {
    fn write_raw(&mut self, key: &str, value: String) {
        self.attributes.insert(key.to_owned(), value);
    }
}

/// Ordered option map, rendered as a URL query string.
///
/// Insertion order is preserved; re-inserting an existing key updates the
/// entry in place. Used by transcode-session negotiation, where the server
/// is sensitive to neither order nor duplicates but stable output keeps
/// session URLs reproducible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionMap {
    entries: Vec<(String, String)>,
}

impl OptionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders `k=v&k2=v2` with percent-encoded keys and values.
    pub fn to_query(&self) -> String {
        self.entries
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl AttrStore for OptionMap {
    fn read_raw(&self, key: &str) -> Option<&str> {
        self.get(key)
    }
}

impl AttrStoreMut for OptionMap {
    fn write_raw(&mut self, key: &str, value: String) {
        self.insert(key, value);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OptionMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = OptionMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_map_preserves_insertion_order() {
        let mut map = OptionMap::new();
        map.insert("session", "abc");
        map.insert("protocol", "http");
        map.insert("fastSeek", "1");
        map.insert("session", "def");

        let keys: Vec<&str> = map.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["session", "protocol", "fastSeek"]);
        assert_eq!(map.get("session"), Some("def"));
    }

    #[test]
    fn to_query_percent_encodes() {
        let mut map = OptionMap::new();
        map.insert("path", "http://127.0.0.1:32400/library/metadata/7");
        map.insert("videoResolution", "720");

        assert_eq!(
            map.to_query(),
            "path=http%3A%2F%2F127.0.0.1%3A32400%2Flibrary%2Fmetadata%2F7&videoResolution=720"
        );
    }

    #[test]
    fn element_attributes_are_a_store() {
        let mut el = Element::new("Video");
        el.write_raw("title", "Some Title".to_owned());
        assert_eq!(el.read_raw("title"), Some("Some Title"));
        assert_eq!(el.read_raw("missing"), None);
    }
}
