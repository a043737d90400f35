//! The resolved taxonomy filter.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Taxonomy name to term slugs, both in first-insertion order.
///
/// Terms within a bucket are unique, and a taxonomy never appears with zero
/// terms once resolution has finished. Serializes as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFilter {
    buckets: Vec<(String, Vec<String>)>,
}

impl ResolvedFilter {
    /// Build a filter from pairs, deduplicating terms and dropping empty buckets.
    pub fn from_pairs<T, I, S>(pairs: impl IntoIterator<Item = (T, I)>) -> Self
    where
        T: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut filter = Self::default();
        for (taxonomy, terms) in pairs {
            let taxonomy = taxonomy.into();
            filter.bucket_mut(&taxonomy);
            for term in terms {
                let term: String = term.into();
                filter.add_term(&taxonomy, &term);
            }
        }
        filter.prune_empty();
        filter
    }

    /// A filter with empty buckets in the given order.
    pub(crate) fn seeded(taxonomies: &[String]) -> Self {
        let mut filter = Self::default();
        for taxonomy in taxonomies {
            filter.bucket_mut(taxonomy);
        }
        filter
    }

    fn bucket_mut(&mut self, taxonomy: &str) -> &mut Vec<String> {
        let index = match self.buckets.iter().position(|(name, _)| name == taxonomy) {
            Some(index) => index,
            None => {
                self.buckets.push((taxonomy.to_string(), Vec::new()));
                self.buckets.len() - 1
            }
        };
        &mut self.buckets[index].1
    }

    pub(crate) fn add_term(&mut self, taxonomy: &str, term: &str) {
        let bucket = self.bucket_mut(taxonomy);
        if !bucket.iter().any(|existing| existing == term) {
            bucket.push(term.to_string());
        }
    }

    pub(crate) fn prune_empty(&mut self) {
        self.buckets.retain(|(_, terms)| !terms.is_empty());
    }

    /// Terms for a taxonomy.
    pub fn get(&self, taxonomy: &str) -> Option<&[String]> {
        self.buckets
            .iter()
            .find(|(name, _)| name == taxonomy)
            .map(|(_, terms)| terms.as_slice())
    }

    /// Whether a taxonomy contains a term.
    pub fn contains(&self, taxonomy: &str, term: &str) -> bool {
        self.get(taxonomy)
            .is_some_and(|terms| terms.iter().any(|t| t == term))
    }

    /// Taxonomy names in bucket order.
    pub fn taxonomies(&self) -> impl Iterator<Item = &str> {
        self.buckets.iter().map(|(name, _)| name.as_str())
    }

    /// Buckets in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.buckets
            .iter()
            .map(|(name, terms)| (name.as_str(), terms.as_slice()))
    }

    /// Number of taxonomies.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// True when no taxonomy has terms.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Total number of terms across all taxonomies.
    pub fn term_count(&self) -> usize {
        self.buckets.iter().map(|(_, terms)| terms.len()).sum()
    }
}

impl Serialize for ResolvedFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.buckets.len()))?;
        for (taxonomy, terms) in &self.buckets {
            map.serialize_entry(taxonomy, terms)?;
        }
        map.end()
    }
}

struct FilterVisitor;

impl<'de> Visitor<'de> for FilterVisitor {
    type Value = ResolvedFilter;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of taxonomy names to term lists")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut pairs: Vec<(String, Vec<String>)> = Vec::new();
        while let Some((taxonomy, terms)) = access.next_entry::<String, Vec<String>>()? {
            pairs.push((taxonomy, terms));
        }
        Ok(ResolvedFilter::from_pairs(pairs))
    }
}

impl<'de> Deserialize<'de> for ResolvedFilter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FilterVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_pairs_dedups_and_prunes() {
        let filter = ResolvedFilter::from_pairs([
            ("resource_tags", vec!["a", "b", "a"]),
            ("resource_category", vec![]),
            ("resource_tags", vec!["c", "b"]),
        ]);

        assert_eq!(filter.len(), 1);
        assert_eq!(
            filter.get("resource_tags").unwrap(),
            &["a".to_string(), "b".to_string(), "c".to_string()]
        );
        assert!(filter.get("resource_category").is_none());
        assert_eq!(filter.term_count(), 3);
        assert!(filter.contains("resource_tags", "c"));
        assert!(!filter.contains("resource_tags", "z"));
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let filter = ResolvedFilter::from_pairs([
            ("zeta", vec!["z2", "z1"]),
            ("alpha", vec!["a1"]),
        ]);

        let text = serde_json::to_string(&filter).unwrap();
        assert_eq!(text, r#"{"zeta":["z2","z1"],"alpha":["a1"]}"#);
    }

    #[test]
    fn test_deserializes_and_normalizes() {
        let filter: ResolvedFilter =
            serde_json::from_value(json!({"resource_tags": ["x", "x"], "empty": []})).unwrap();
        assert_eq!(filter, ResolvedFilter::from_pairs([("resource_tags", vec!["x"])]));
    }

    #[test]
    fn test_iter_yields_buckets() {
        let filter = ResolvedFilter::from_pairs([("a", vec!["1"]), ("b", vec!["2", "3"])]);
        let collected: Vec<(&str, usize)> = filter.iter().map(|(t, terms)| (t, terms.len())).collect();
        assert_eq!(collected, vec![("a", 1), ("b", 2)]);
    }
}
