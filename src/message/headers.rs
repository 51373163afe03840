//! Case-insensitive header map with canonical-capitalization rendering.
//!
//! Keyed internally by lowercased field name, backed by an indexed map
//! rather than a linear scan since every builder reads `Session` and
//! every response read checks `CSeq`/`Content-Length`.

use std::collections::HashMap;

/// Headers this crate gives a canonical hyphenated spelling on output.
/// Anything else renders with the casing it was first set or parsed with.
const CANONICAL: &[&str] = &[
    "CSeq",
    "Content-Length",
    "Content-Type",
    "Content-Base",
    "Session",
    "Transport",
    "Range",
    "Public",
    "WWW-Authenticate",
    "Accept",
    "Authorization",
    "Server",
    "User-Agent",
    "Date",
    "RTP-Info",
    "Unsupported",
    "Require",
    "Supported",
];

fn canonical_name(lower: &str) -> Option<&'static str> {
    CANONICAL
        .iter()
        .copied()
        .find(|c| c.eq_ignore_ascii_case(lower))
}

#[derive(Debug, Clone, Default)]
pub struct HeaderMap {
    /// Lowercased field names in first-seen order, so rendering and
    /// iteration are stable regardless of `HashMap` bucket order.
    order: Vec<String>,
    values: HashMap<String, String>,
    /// Display name to fall back on for headers outside [`CANONICAL`],
    /// recorded the first time each header is seen.
    display_name: HashMap<String, String>,
}

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, overwriting any existing value. Used by builders,
    /// which are always authoritative over whatever was there before
    /// (e.g. refreshing `Session` on every outbound request).
    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let lower = name.to_ascii_lowercase();
        if !self.values.contains_key(&lower) {
            self.order.push(lower.clone());
            self.display_name.insert(lower.clone(), name.to_string());
        }
        self.values.insert(lower, value.into());
    }

    /// Insert a header only if absent — the wire parser's "first
    /// occurrence wins" rule: a server sending `CSeq` twice with different
    /// values must not let the second overwrite the first.
    pub fn insert_first_wins(&mut self, name: &str, value: String) {
        let lower = name.to_ascii_lowercase();
        if self.values.contains_key(&lower) {
            return;
        }
        self.order.push(lower.clone());
        self.display_name.insert(lower.clone(), name.to_string());
        self.values.insert(lower, value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let lower = name.to_ascii_lowercase();
        self.order.retain(|k| k != &lower);
        self.display_name.remove(&lower);
        self.values.remove(&lower)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate headers in first-seen order, rendered with canonical
    /// capitalization where known, else the original casing.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.order.iter().map(move |lower| {
            let name = canonical_name(lower)
                .or_else(|| self.display_name.get(lower).map(String::as_str))
                .unwrap_or(lower.as_str());
            (name, self.values[lower].as_str())
        })
    }
}
