//! Identifier casing rules and the name-conversion helper used when
//! lifting an inline record's synthesized name from a `lower_underscore`
//! field/method name (§4.3 "Declaration pass", "Casing").

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasingRule {
    UpperCamel,
    LowerCamel,
    LowerUnderscore,
    UpperUnderscore,
}

impl CasingRule {
    pub fn describe(self) -> &'static str {
        match self {
            CasingRule::UpperCamel => "UpperCamelCase",
            CasingRule::LowerCamel => "lowerCamelCase",
            CasingRule::LowerUnderscore => "lower_underscore",
            CasingRule::UpperUnderscore => "UPPER_UNDERSCORE",
        }
    }

    pub fn matches(self, text: &str) -> bool {
        if !self.regex().is_match(text) {
            return false;
        }
        // §4.3 "Casing": an UpperCamel name must not consist solely of
        // uppercase letters/digits (that would be indistinguishable from
        // an UPPER_UNDERSCORE constant with no separators, e.g. `ID`).
        if matches!(self, CasingRule::UpperCamel) && text.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
            return false;
        }
        true
    }

    fn regex(self) -> &'static Regex {
        match self {
            CasingRule::UpperCamel => {
                static RE: OnceLock<Regex> = OnceLock::new();
                RE.get_or_init(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").unwrap())
            }
            CasingRule::LowerCamel => {
                static RE: OnceLock<Regex> = OnceLock::new();
                RE.get_or_init(|| Regex::new(r"^[a-z][A-Za-z0-9]*$").unwrap())
            }
            CasingRule::LowerUnderscore => {
                static RE: OnceLock<Regex> = OnceLock::new();
                RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9]*(_[a-z][a-z0-9]*)*$").unwrap())
            }
            CasingRule::UpperUnderscore => {
                static RE: OnceLock<Regex> = OnceLock::new();
                RE.get_or_init(|| Regex::new(r"^[A-Z][A-Z0-9]*(_[A-Z][A-Z0-9]*)*$").unwrap())
            }
        }
    }
}

/// Converts a `lower_underscore` (or already-camel) field/method name
/// into the `UpperCamel` name synthesized for an inline record type,
/// e.g. a field `shipping_address: struct { .. }` becomes a nested
/// record named `ShippingAddress`.
pub fn to_upper_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut capitalize_next = true;
    for ch in name.chars() {
        if ch == '_' {
            capitalize_next = true;
            continue;
        }
        if capitalize_next {
            out.extend(ch.to_uppercase());
            capitalize_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upper_camel_matches_plain_type_names() {
        assert!(CasingRule::UpperCamel.matches("Foo"));
        assert!(!CasingRule::UpperCamel.matches("foo"));
    }

    #[test]
    fn lower_underscore_matches_field_names() {
        assert!(CasingRule::LowerUnderscore.matches("shipping_address"));
        assert!(!CasingRule::LowerUnderscore.matches("ShippingAddress"));
    }

    #[test]
    fn upper_underscore_matches_enum_constants() {
        assert!(CasingRule::UpperUnderscore.matches("UNKNOWN"));
        assert!(CasingRule::UpperUnderscore.matches("NOT_FOUND"));
    }

    #[test]
    fn underscore_segments_must_start_with_a_letter() {
        assert!(!CasingRule::LowerUnderscore.matches("foo_2"));
        assert!(!CasingRule::UpperUnderscore.matches("BAR_3"));
    }

    #[test]
    fn converts_lower_underscore_to_upper_camel() {
        assert_eq!(to_upper_camel("shipping_address"), "ShippingAddress");
        assert_eq!(to_upper_camel("id"), "Id");
        assert_eq!(to_upper_camel("already_camel"), "AlreadyCamel");
    }
}
