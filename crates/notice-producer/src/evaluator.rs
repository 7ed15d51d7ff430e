//! The query evaluator: the collaborator that turns a saved search's
//! query text into the set of matching feature keys. The real feature
//! search/pagination backend is out of scope here;
//! [`InMemoryEvaluator`] is a reference implementation good enough for
//! tests and the CLI demo.

use std::fmt;

use notice_types::{FeatureCatalog, FeatureKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationError(pub String);

impl fmt::Display for EvaluationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to evaluate query: {}", self.0)
    }
}

impl std::error::Error for EvaluationError {}

pub trait QueryEvaluator: Send + Sync {
    fn evaluate(
        &self,
        query: &str,
        catalog: &FeatureCatalog,
    ) -> Result<Vec<FeatureKey>, EvaluationError>;
}

/// A minimal `key:`/`baseline:`/`browser:` predicate grammar, linear-scanned
/// over the catalog. Terms are space-separated and implicitly ANDed;
/// an empty query matches every feature.
///
/// Supported terms:
/// - `key:<substring>` — feature key contains `<substring>`
/// - `baseline:limited|newly|widely` — exact baseline tag match
/// - `browser:<name>:available|unavailable` — exact per-browser status
#[derive(Debug, Default)]
pub struct InMemoryEvaluator;

impl QueryEvaluator for InMemoryEvaluator {
    fn evaluate(
        &self,
        query: &str,
        catalog: &FeatureCatalog,
    ) -> Result<Vec<FeatureKey>, EvaluationError> {
        let terms: Vec<&str> = query.split_whitespace().collect();
        let mut matched = Vec::new();
        for (key, record) in catalog {
            if terms.iter().all(|term| term_matches(term, key, record)) {
                matched.push(key.clone());
            }
        }
        Ok(matched)
    }
}

fn term_matches(term: &str, key: &FeatureKey, record: &notice_types::FeatureRecord) -> bool {
    if let Some(needle) = term.strip_prefix("key:") {
        return key.as_str().contains(needle);
    }
    if let Some(tag) = term.strip_prefix("baseline:") {
        return record.baseline.tag().to_string() == tag;
    }
    if let Some(rest) = term.strip_prefix("browser:") {
        if let Some((browser, status)) = rest.split_once(':') {
            return record
                .browsers
                .get(&notice_types::BrowserName(browser.to_string()))
                .map(|impl_| {
                    let want_available = status == "available";
                    let is_available =
                        impl_.status == notice_types::BrowserSupportStatus::Available;
                    want_available == is_available
                })
                .unwrap_or(false);
        }
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use notice_types::{BaselineStatus, BrowserImpl, BrowserName, BrowserSupportStatus, FeatureRecord};

    use super::*;

    fn catalog() -> FeatureCatalog {
        let mut catalog = FeatureCatalog::new();
        catalog.insert(
            FeatureKey::new("grid").unwrap(),
            FeatureRecord {
                name: "Grid".to_string(),
                baseline: BaselineStatus::Widely {
                    low_date: None,
                    high_date: None,
                },
                browsers: BTreeMap::from([(
                    BrowserName("chrome".to_string()),
                    BrowserImpl {
                        status: BrowserSupportStatus::Available,
                        version: Some("100".to_string()),
                    },
                )]),
                spec_links: Vec::new(),
                discouraged: false,
            },
        );
        catalog.insert(
            FeatureKey::new("anchor-positioning").unwrap(),
            FeatureRecord {
                name: "Anchor positioning".to_string(),
                baseline: BaselineStatus::Limited,
                browsers: BTreeMap::from([(
                    BrowserName("chrome".to_string()),
                    BrowserImpl {
                        status: BrowserSupportStatus::Unavailable,
                        version: None,
                    },
                )]),
                spec_links: Vec::new(),
                discouraged: false,
            },
        );
        catalog
    }

    #[test]
    fn empty_query_matches_everything() {
        let matched = InMemoryEvaluator.evaluate("", &catalog()).unwrap();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn key_term_filters_by_substring() {
        let matched = InMemoryEvaluator.evaluate("key:grid", &catalog()).unwrap();
        assert_eq!(matched, vec![FeatureKey::new("grid").unwrap()]);
    }

    #[test]
    fn baseline_term_filters_by_tag() {
        let matched = InMemoryEvaluator
            .evaluate("baseline:limited", &catalog())
            .unwrap();
        assert_eq!(matched, vec![FeatureKey::new("anchor-positioning").unwrap()]);
    }

    #[test]
    fn browser_term_filters_by_status() {
        let matched = InMemoryEvaluator
            .evaluate("browser:chrome:available", &catalog())
            .unwrap();
        assert_eq!(matched, vec![FeatureKey::new("grid").unwrap()]);
    }

    #[test]
    fn multiple_terms_are_anded() {
        let matched = InMemoryEvaluator
            .evaluate("baseline:widely browser:chrome:available", &catalog())
            .unwrap();
        assert_eq!(matched, vec![FeatureKey::new("grid").unwrap()]);
    }
}
