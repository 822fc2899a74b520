//! Channel product code -> internal product code.
//!
//! Mappings are data: callers build a [`ProductCodeMap`] from config and the
//! `product_mappings` table. An unmapped code passes through unchanged.

use std::collections::HashMap;

/// Lookup seam used by the normalizer.
pub trait ProductCodeLookup: Send + Sync {
    /// Internal code for `channel_product_code`, if one is mapped.
    fn lookup(&self, channel_product_code: &str) -> Option<&str>;

    /// Mapped code, or the channel code itself when unmapped.
    fn map_to_product_code(&self, channel_product_code: &str) -> String {
        match self.lookup(channel_product_code) {
            Some(code) => code.to_string(),
            None => {
                tracing::debug!(
                    channel_product_code,
                    "no product mapping, using channel code"
                );
                channel_product_code.to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductCodeMap {
    map: HashMap<String, String>,
}

impl ProductCodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, channel_product_code: impl Into<String>, product_code: impl Into<String>) {
        self.map
            .insert(channel_product_code.into(), product_code.into());
    }

    /// Layer `other` on top; its entries win.
    pub fn merge<I, K, V>(&mut self, other: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (k, v) in other {
            self.insert(k, v);
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProductCodeMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = ProductCodeMap::new();
        m.merge(iter);
        m
    }
}

impl ProductCodeLookup for ProductCodeMap {
    fn lookup(&self, channel_product_code: &str) -> Option<&str> {
        self.map.get(channel_product_code).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mapped_and_passthrough() {
        let m: ProductCodeMap = [("NAVER-PRD-1001", "XEXYMIX-LEG-001")].into_iter().collect();
        assert_eq!(m.map_to_product_code("NAVER-PRD-1001"), "XEXYMIX-LEG-001");
        assert_eq!(m.map_to_product_code("11ST-PRD-3001"), "11ST-PRD-3001");
    }

    #[test]
    fn merge_overrides() {
        let mut m: ProductCodeMap = [("A", "X")].into_iter().collect();
        m.merge([("A", "Y"), ("B", "Z")]);
        assert_eq!(m.lookup("A"), Some("Y"));
        assert_eq!(m.len(), 2);
    }
}
