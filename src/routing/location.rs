//! Locations and query strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A navigable location split into its parts.
///
/// `search` keeps its leading `?` and `hash` its leading `#`, both empty
/// when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Location {
    pub pathname: String,
    pub search: String,
    pub hash: String,
    /// Identity of this history entry. Not part of equality checks made by
    /// [`Location::same_target`].
    #[serde(default)]
    pub key: Option<String>,
}

impl Location {
    /// Parse an href such as `/users/1?tab=posts#top`.
    pub fn parse(href: &str) -> Self {
        let (rest, hash) = match href.find('#') {
            Some(idx) => (&href[..idx], &href[idx..]),
            None => (href, ""),
        };
        let (pathname, search) = match rest.find('?') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, ""),
        };
        let pathname = if pathname.is_empty() { "/" } else { pathname };

        Self {
            pathname: pathname.to_string(),
            search: if search == "?" { String::new() } else { search.to_string() },
            hash: if hash == "#" { String::new() } else { hash.to_string() },
            key: None,
        }
    }

    /// Attach a fresh history key.
    pub fn with_fresh_key(mut self) -> Self {
        self.key = Some(Uuid::new_v4().simple().to_string());
        self
    }

    /// Pathname, search and hash joined back together.
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname, self.search, self.hash)
    }

    /// Same pathname, search and hash, regardless of key.
    pub fn same_target(&self, other: &Location) -> bool {
        self.pathname == other.pathname && self.search == other.search && self.hash == other.hash
    }

    /// Parsed query of `search`.
    pub fn query(&self) -> Query {
        Query::parse(&self.search)
    }
}

/// Multi-valued query parameters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(BTreeMap<String, Vec<String>>);

impl Query {
    /// Parse `a=1&b=2&a=3`, with or without a leading `?`.
    pub fn parse(search: &str) -> Self {
        let raw = search.strip_prefix('?').unwrap_or(search);
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (key, value) in url::form_urlencoded::parse(raw.as_bytes()) {
            map.entry(key.into_owned()).or_default().push(value.into_owned());
        }
        Self(map)
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.first()).map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Query {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut query = Query::default();
        for (k, v) in iter {
            query.insert(k, v);
        }
        query
    }
}
