//! Query parameters and their canonical encoding
//!
//! The canonical form sorts keys byte-wise, keeps multiple values for a key
//! in insertion order and escapes each component the way HTML form query
//! strings are escaped: unreserved characters (`A-Z a-z 0-9 - _ . ~`) stay
//! literal, a space becomes `+`, every other byte becomes `%XX` with
//! uppercase hex digits. Signatures are computed over this form, so it must
//! never change.

use std::collections::BTreeMap;
use std::fmt;

/// Multi-valued query parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    values: BTreeMap<String, Vec<String>>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a raw query string (without the leading `?`)
    pub fn parse(query: &str) -> Self {
        url::form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
            .into_owned()
            .collect()
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.values.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Replace every value for `key` with `value`
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), vec![value.into()]);
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.entry(key.into()).or_default().push(value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<String>> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Copy of these parameters without the given keys
    pub fn without(&self, keys: &[&str]) -> Self {
        let values = self
            .values
            .iter()
            .filter(|(key, _)| !keys.contains(&key.as_str()))
            .map(|(key, values)| (key.clone(), values.clone()))
            .collect();
        Self { values }
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |v| (key.as_str(), v.as_str())))
    }

    /// Canonical `key=value&...` encoding
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (key, value) in self.iter() {
            if !out.is_empty() {
                out.push('&');
            }
            query_escape_into(key, &mut out);
            out.push('=');
            query_escape_into(value, &mut out);
        }
        out
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = QueryParams::new();
        for (key, value) in iter {
            params.append(key, value);
        }
        params
    }
}

/// Escape a single query component
pub fn query_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    query_escape_into(input, &mut out);
    out
}

fn query_escape_into(input: &str, out: &mut String) {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    for &byte in input.as_bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push('+'),
            _ => {
                out.push('%');
                out.push(HEX[(byte >> 4) as usize] as char);
                out.push(HEX[(byte & 0x0F) as usize] as char);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_sorts_keys() {
        let params: QueryParams = [("w", "100"), ("h", "50"), ("fit", "clip")]
            .into_iter()
            .collect();
        assert_eq!(params.encode(), "fit=clip&h=50&w=100");
    }

    #[test]
    fn test_encode_keeps_value_order_for_repeated_keys() {
        let mut params = QueryParams::new();
        params.append("tag", "b");
        params.append("tag", "a");
        assert_eq!(params.encode(), "tag=b&tag=a");
    }

    #[test]
    fn test_escape_rules() {
        assert_eq!(query_escape("a b"), "a+b");
        assert_eq!(query_escape("-_.~"), "-_.~");
        assert_eq!(query_escape("a/b?c=d&e"), "a%2Fb%3Fc%3Dd%26e");
        assert_eq!(query_escape("*+"), "%2A%2B");
        assert_eq!(query_escape("é"), "%C3%A9");
    }

    #[test]
    fn test_empty_params_encode_to_empty_string() {
        assert_eq!(QueryParams::new().encode(), "");
    }

    #[test]
    fn test_parse_decodes_components() {
        let params = QueryParams::parse("?name=a+b&path=x%2Fy&tag=1&tag=2");
        assert_eq!(params.get("name"), Some("a b"));
        assert_eq!(params.get("path"), Some("x/y"));
        assert_eq!(params.get_all("tag"), ["1".to_string(), "2".to_string()]);
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_parse_then_encode_is_stable() {
        let raw = "dl=1&fm=webp&w=100";
        assert_eq!(QueryParams::parse(raw).encode(), raw);
    }

    #[test]
    fn test_set_replaces_and_without_filters() {
        let mut params = QueryParams::new();
        params.append("kid", "old");
        params.append("kid", "older");
        params.set("kid", "v2");
        params.set("w", "10");
        assert_eq!(params.get_all("kid"), ["v2".to_string()]);

        let stripped = params.without(&["kid"]);
        assert!(!stripped.contains_key("kid"));
        assert_eq!(stripped.len(), 1);
        assert_eq!(params.len(), 2);
    }
}
