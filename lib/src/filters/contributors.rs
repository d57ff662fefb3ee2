use std::sync::Arc;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A person credited on content items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    #[serde(default)]
    pub id: Arc<str>,
    pub name: Arc<str>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<Arc<str>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Contributor {
    pub fn new(id: impl Into<Arc<str>>, name: impl Into<Arc<str>>) -> Self {
        Contributor {
            id: id.into(),
            name: name.into(),
            url: None,
            avatar: None,
            bio: None,
            extra: Default::default(),
        }
    }
}

/// Contributors keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ContributorDirectory {
    map: FxHashMap<Arc<str>, Arc<Contributor>>,
}

impl ContributorDirectory {
    pub fn new<I: IntoIterator<Item = Contributor>>(contributors: I) -> Self {
        let map = contributors.into_iter()
            .map(|c| (c.id.clone(), Arc::new(c)))
            .collect();

        ContributorDirectory { map }
    }

    /// Reads a JSON object of `id => contributor`. A missing `id` field is
    /// filled in from the key.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: FxHashMap<Arc<str>, Contributor> = serde_json::from_str(json)?;
        Ok(ContributorDirectory::new(raw.into_iter().map(|(id, mut contributor)| {
            if contributor.id.is_empty() {
                contributor.id = id;
            }

            contributor
        })))
    }

    pub fn get(&self, id: &str) -> Option<&Arc<Contributor>> {
        self.map.get(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Resolves contributor `ids` in order. Ids with no directory entry are
/// dropped with a warning.
pub fn expand_contributors<S: AsRef<str>>(
    ids: &[S],
    directory: &ContributorDirectory,
) -> Vec<Arc<Contributor>> {
    ids.iter()
        .filter_map(|id| {
            let id = id.as_ref();
            let contributor = directory.get(id);
            if contributor.is_none() {
                tracing::warn!(id, "dropping unknown contributor");
            }

            contributor.cloned()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> ContributorDirectory {
        ContributorDirectory::from_json(r#"{
            "ada": { "name": "Ada Lovelace", "url": "https://example.com/ada" },
            "alan": { "name": "Alan Turing", "team": "crypto" }
        }"#).unwrap()
    }

    #[test]
    fn loads_json() {
        let directory = directory();
        assert_eq!(directory.len(), 2);

        let alan = directory.get("alan").unwrap();
        assert_eq!(&*alan.id, "alan");
        assert_eq!(alan.extra["team"], "crypto");
        assert!(ContributorDirectory::from_json("[1, 2]").is_err());
    }

    #[test]
    fn expands_in_order_dropping_unknown() {
        let directory = directory();
        let names: Vec<_> = expand_contributors(&["alan", "nobody", "ada"], &directory)
            .into_iter()
            .map(|c| c.name.to_string())
            .collect();

        assert_eq!(names, ["Alan Turing", "Ada Lovelace"]);
        assert!(expand_contributors::<&str>(&[], &directory).is_empty());
    }
}
