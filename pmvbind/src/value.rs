//! Coercions between typed values and their wire text.

/// Conversion between a typed value and the textual form every backing
/// store works with.
///
/// `decode` returns `None` on malformed input; the descriptor layer turns
/// that into a [`ConversionError`](crate::ConversionError) so a bad stored
/// value is surfaced instead of silently defaulted.
pub trait AttrValue: Sized {
    /// Type label used in conversion diagnostics.
    const LABEL: &'static str;

    fn decode(raw: &str) -> Option<Self>;
    fn encode(&self) -> String;
}

impl AttrValue for String {
    const LABEL: &'static str = "string";

    fn decode(raw: &str) -> Option<Self> {
        Some(raw.to_owned())
    }

    fn encode(&self) -> String {
        self.clone()
    }
}

macro_rules! impl_numeric_attr_value {
    ($ty:ty, $label:expr) => {
        impl AttrValue for $ty {
            const LABEL: &'static str = $label;

            fn decode(raw: &str) -> Option<Self> {
                raw.trim().parse().ok()
            }

            fn encode(&self) -> String {
                self.to_string()
            }
        }
    };
}

impl_numeric_attr_value!(u32, "u32");
impl_numeric_attr_value!(u64, "u64");
impl_numeric_attr_value!(i64, "i64");
impl_numeric_attr_value!(f64, "f64");

impl AttrValue for bool {
    const LABEL: &'static str = "bool";

    // The wire encodes booleans as "1"/"0" (e.g. the multiuser flag);
    // literal true/false is accepted for robustness.
    fn decode(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        }
    }

    fn encode(&self) -> String {
        if *self { "1".to_owned() } else { "0".to_owned() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_decode_rejects_garbage() {
        assert_eq!(u64::decode("42"), Some(42));
        assert_eq!(u64::decode(" 42 "), Some(42));
        assert_eq!(u64::decode("forty-two"), None);
        assert_eq!(f64::decode("7.5"), Some(7.5));
    }

    #[test]
    fn bool_uses_wire_form() {
        assert_eq!(bool::decode("1"), Some(true));
        assert_eq!(bool::decode("0"), Some(false));
        assert_eq!(bool::decode("yes"), None);
        assert_eq!(true.encode(), "1");
        assert_eq!(false.encode(), "0");
    }
}
