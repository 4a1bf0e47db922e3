use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key for a data request: the sorted, deduplicated set of source ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScopeKey(Vec<String>);

impl ScopeKey {
    pub fn new<I, S>(sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids: Vec<String> = sources.into_iter().map(Into::into).collect();
        ids.sort();
        ids.dedup();
        Self(ids)
    }

    pub fn sources(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, source: &str) -> bool {
        self.0.binary_search_by(|s| s.as_str().cmp(source)).is_ok()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if every source in `self` is also in `other`.
    pub fn is_subset_of(&self, other: &ScopeKey) -> bool {
        self.0.iter().all(|s| other.contains(s))
    }

    /// Comma-joined form used in request query strings.
    pub fn query_value(&self) -> String {
        self.0.join(",")
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(","))
    }
}
