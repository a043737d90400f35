//! Tag resolution: collected quiz tags to a taxonomy filter.
//!
//! Each tag is looked up exactly first; failing that, a tag shaped
//! `prefix:value` falls back to the pattern key `prefix:*`. Terms from every
//! matching fragment are unioned into per-taxonomy buckets in first-seen order,
//! and buckets left empty are dropped from the result.

mod filter;

pub use filter::ResolvedFilter;

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::MappingIssue;

/// Taxonomies seeded into every resolution, in bucket order.
pub const DEFAULT_TAXONOMIES: [&str; 2] = ["resource_category", "resource_tags"];

/// Pattern key a `prefix:value` tag falls back to.
pub fn pattern_key(tag: &str) -> Option<String> {
    tag.split_once(':').map(|(prefix, _)| format!("{}:*", prefix))
}

/// Tag-to-taxonomy mapping.
///
/// Entries are kept as authored; a malformed entry is only skipped when a
/// resolution actually reaches it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagFilterMapping {
    entries: HashMap<String, Value>,
}

impl TagFilterMapping {
    /// An empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a mapping document: either `{"mappings": {...}}` or the bare map.
    pub fn from_value(raw: &Value) -> Self {
        let entries = match raw.get("mappings").and_then(Value::as_object) {
            Some(mappings) => mappings,
            None => match raw.as_object() {
                Some(bare) => bare,
                None => {
                    warn!("Tag mapping document is not an object, using empty mapping");
                    return Self::default();
                }
            },
        };

        Self {
            entries: entries
                .iter()
                .map(|(key, fragment)| (key.clone(), fragment.clone()))
                .collect(),
        }
    }

    /// Add an entry from typed taxonomy/term pairs.
    pub fn with_entry<K, T, I, S>(mut self, key: K, fragment: impl IntoIterator<Item = (T, I)>) -> Self
    where
        K: Into<String>,
        T: Into<String>,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragment: Map<String, Value> = fragment
            .into_iter()
            .map(|(taxonomy, terms)| {
                let terms = terms
                    .into_iter()
                    .map(|term| Value::String(term.into()))
                    .collect();
                (taxonomy.into(), Value::Array(terms))
            })
            .collect();
        self.entries.insert(key.into(), Value::Object(fragment));
        self
    }

    /// Add or replace an entry as authored.
    pub fn insert_raw(&mut self, key: impl Into<String>, fragment: Value) {
        self.entries.insert(key.into(), fragment);
    }

    /// Raw entry for an exact key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Entry for a tag: exact key first, then its `prefix:*` pattern.
    pub fn lookup(&self, tag: &str) -> Option<(String, &Value)> {
        if let Some(fragment) = self.entries.get(tag) {
            return Some((tag.to_string(), fragment));
        }
        let key = pattern_key(tag)?;
        let fragment = self.entries.get(&key)?;
        Some((key, fragment))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A filter plus the mapping entries skipped while building it.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Resolved filter.
    pub filter: ResolvedFilter,
    /// Skipped entries, each reported once.
    pub issues: Vec<MappingIssue>,
}

/// Resolves collected tags against a mapping. Holds no per-call state.
#[derive(Debug, Clone)]
pub struct TagResolver {
    mapping: TagFilterMapping,
    default_taxonomies: Vec<String>,
}

impl TagResolver {
    /// Create a resolver seeded with [`DEFAULT_TAXONOMIES`].
    pub fn new(mapping: TagFilterMapping) -> Self {
        Self {
            mapping,
            default_taxonomies: DEFAULT_TAXONOMIES.iter().map(|t| t.to_string()).collect(),
        }
    }

    /// Replace the seeded taxonomies (and thereby the leading bucket order).
    pub fn with_default_taxonomies<I, S>(mut self, taxonomies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_taxonomies = taxonomies.into_iter().map(Into::into).collect();
        self
    }

    /// The mapping in use.
    pub fn mapping(&self) -> &TagFilterMapping {
        &self.mapping
    }

    /// Resolve tags into a filter.
    pub fn resolve(&self, tags: &[String]) -> ResolvedFilter {
        self.resolve_detailed(tags).filter
    }

    /// Resolve tags, also returning the malformed entries that were skipped.
    pub fn resolve_detailed(&self, tags: &[String]) -> Resolution {
        let mut filter = ResolvedFilter::seeded(&self.default_taxonomies);
        let mut issues: Vec<MappingIssue> = Vec::new();
        let mut report = |issue: MappingIssue| {
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        };

        for tag in tags {
            let Some((key, fragment)) = self.mapping.lookup(tag) else {
                continue;
            };

            let Some(fragment) = fragment.as_object() else {
                report(MappingIssue::FragmentNotMapping { key });
                continue;
            };

            for (taxonomy, terms) in fragment {
                let Some(terms) = terms.as_array() else {
                    report(MappingIssue::TermsNotSequence {
                        key: key.clone(),
                        taxonomy: taxonomy.clone(),
                    });
                    continue;
                };

                for (index, term) in terms.iter().enumerate() {
                    match term.as_str() {
                        Some(term) => filter.add_term(taxonomy, term),
                        None => report(MappingIssue::TermNotString {
                            key: key.clone(),
                            taxonomy: taxonomy.clone(),
                            index,
                        }),
                    }
                }
            }
        }

        filter.prune_empty();

        for issue in &issues {
            warn!(issue = %issue, "Skipping malformed tag mapping entry");
        }

        Resolution { filter, issues }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_pattern_key() {
        assert_eq!(pattern_key("audience:self"), Some("audience:*".to_string()));
        assert_eq!(pattern_key("a:b:c"), Some("a:*".to_string()));
        assert_eq!(pattern_key("plain"), None);
    }

    #[test]
    fn test_from_value_accepts_wrapped_and_bare() {
        let wrapped = TagFilterMapping::from_value(&json!({
            "version": "1",
            "mappings": {"need:grief": {"resource_tags": ["grief-support"]}}
        }));
        assert_eq!(wrapped.len(), 1);
        assert!(wrapped.get("need:grief").is_some());

        let bare = TagFilterMapping::from_value(&json!({"need:grief": {"resource_tags": []}}));
        assert_eq!(bare.len(), 1);

        assert!(TagFilterMapping::from_value(&json!(["nope"])).is_empty());
    }

    #[test]
    fn test_exact_match_wins_over_pattern() {
        let mapping = TagFilterMapping::new()
            .with_entry("audience:*", [("resource_tags", vec!["generic"])])
            .with_entry("audience:family", [("resource_tags", vec!["for-families"])]);

        let (key, _) = mapping.lookup("audience:family").unwrap();
        assert_eq!(key, "audience:family");
        let (key, _) = mapping.lookup("audience:partner").unwrap();
        assert_eq!(key, "audience:*");
        assert!(mapping.lookup("stage:crisis").is_none());
    }

    #[test]
    fn test_empty_tags_resolve_to_empty_filter() {
        let resolver = TagResolver::new(
            TagFilterMapping::new().with_entry("stage:crisis", [("resource_tags", vec!["treatment"])]),
        );
        let filter = resolver.resolve(&[]);
        assert!(filter.is_empty());
        assert_eq!(serde_json::to_value(&filter).unwrap(), json!({}));
    }

    #[test]
    fn test_unmapped_tags_are_ignored() {
        let resolver = TagResolver::new(TagFilterMapping::new());
        assert!(resolver.resolve(&tags(&["stage:crisis", "plain"])).is_empty());
    }

    #[test]
    fn test_custom_taxonomy_bucket_order() {
        let resolver = TagResolver::new(
            TagFilterMapping::new()
                .with_entry("need:grief", [("support_type", vec!["grief"])])
                .with_entry("stage:crisis", [("resource_tags", vec!["treatment"])]),
        )
        .with_default_taxonomies(["resource_tags", "support_type"]);

        let filter = resolver.resolve(&tags(&["need:grief", "stage:crisis"]));
        assert_eq!(
            filter.taxonomies().collect::<Vec<_>>(),
            vec!["resource_tags", "support_type"]
        );
    }

    #[test]
    fn test_unseeded_taxonomy_appends_after_defaults() {
        let resolver = TagResolver::new(
            TagFilterMapping::new()
                .with_entry("need:grief", [("support_type", vec!["grief"])])
                .with_entry("stage:crisis", [("resource_category", vec!["help"])]),
        );

        let filter = resolver.resolve(&tags(&["need:grief", "stage:crisis"]));
        assert_eq!(
            filter.taxonomies().collect::<Vec<_>>(),
            vec!["resource_category", "support_type"]
        );
    }

    #[test]
    fn test_unseeded_taxonomies_follow_authored_fragment_order() {
        let raw: Value = serde_json::from_str(
            r#"{"mappings": {"need:grief": {"support_type": ["peer"], "age_group": ["adult"]}}}"#,
        )
        .unwrap();
        let resolver = TagResolver::new(TagFilterMapping::from_value(&raw));

        let filter = resolver.resolve(&tags(&["need:grief"]));
        assert_eq!(
            filter.taxonomies().collect::<Vec<_>>(),
            vec!["support_type", "age_group"]
        );
        assert_eq!(
            serde_json::to_string(&filter).unwrap(),
            r#"{"support_type":["peer"],"age_group":["adult"]}"#
        );
    }

    #[test]
    fn test_malformed_entries_are_skipped_per_entry() {
        let mut mapping = TagFilterMapping::new()
            .with_entry("stage:crisis", [("resource_tags", vec!["treatment"])]);
        mapping.insert_raw("need:grief", json!("grief-support"));
        mapping.insert_raw(
            "need:education",
            json!({"resource_category": "literature", "resource_tags": ["articles", 5, "pdfs"]}),
        );

        let resolution = TagResolver::new(mapping).resolve_detailed(&tags(&[
            "need:grief",
            "need:education",
            "stage:crisis",
            "need:grief",
        ]));

        assert_eq!(
            resolution.filter,
            ResolvedFilter::from_pairs([("resource_tags", vec!["articles", "pdfs", "treatment"])])
        );
        assert_eq!(
            resolution.issues,
            vec![
                MappingIssue::FragmentNotMapping {
                    key: "need:grief".to_string()
                },
                MappingIssue::TermsNotSequence {
                    key: "need:education".to_string(),
                    taxonomy: "resource_category".to_string()
                },
                MappingIssue::TermNotString {
                    key: "need:education".to_string(),
                    taxonomy: "resource_tags".to_string(),
                    index: 1
                },
            ]
        );
    }
}
