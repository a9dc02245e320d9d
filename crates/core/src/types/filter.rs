//! Product listing filters and their query-string form.
//!
//! A filter is a map of facet key to a single scalar value plus the 1-based
//! page and the page size. Empty values never appear in a query string.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

pub const PAGE_KEY: &str = "page";
pub const LIMIT_KEY: &str = "limit";

/// Page size used when the query does not say otherwise.
pub const DEFAULT_LIMIT: u32 = 20;

/// Upper bound on page size the backend accepts.
pub const MAX_LIMIT: u32 = 100;

/// Current filter selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    facets: BTreeMap<String, String>,
    page: u32,
    limit: u32,
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            facets: BTreeMap::new(),
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// A partial update. `None` or an empty string removes the facet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch(BTreeMap<String, Option<String>>);

impl FilterPatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a facet (builder style).
    #[must_use]
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), Some(value.into()));
        self
    }

    /// Clear a facet (builder style).
    #[must_use]
    pub fn unset(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), None);
        self
    }

    /// Jump to a page (builder style).
    #[must_use]
    pub fn page(self, page: u32) -> Self {
        self.set(PAGE_KEY, page.to_string())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `key=value` pairs, as typed on a command line.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut patch = Self::new();
        for (key, value) in pairs {
            patch.0.insert(key.to_owned(), Some(value.to_owned()));
        }
        patch
    }
}

impl ProductFilter {
    /// Parse filters from a URL query string (with or without the leading `?`).
    ///
    /// Invalid or zero `page` values fall back to 1; `limit` is clamped to
    /// `1..=MAX_LIMIT`.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut filter = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            filter.set_raw(&key, Some(value.trim()));
        }
        filter
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    #[must_use]
    pub fn facet(&self, key: &str) -> Option<&str> {
        self.facets.get(key).map(String::as_str)
    }

    #[must_use]
    pub const fn facets(&self) -> &BTreeMap<String, String> {
        &self.facets
    }

    /// Merge a patch into this filter.
    ///
    /// When the patch changes any facet other than `page`, the page goes
    /// back to 1, unless the patch sets `page` itself. Returns whether
    /// anything changed.
    pub fn apply(&mut self, patch: &FilterPatch) -> bool {
        let before = self.clone();
        let mut explicit_page = None;

        for (key, value) in &patch.0 {
            if key == PAGE_KEY {
                explicit_page = Some(value.as_deref());
                continue;
            }
            self.set_raw(key, value.as_deref());
        }

        let facets_changed = self.facets != before.facets || self.limit != before.limit;
        match explicit_page {
            Some(value) => self.set_raw(PAGE_KEY, value),
            None if facets_changed => self.page = 1,
            None => {}
        }

        *self != before
    }

    /// Visible query string for the address bar. Defaults (`page=1`, the
    /// default limit) are left out to keep URLs short.
    #[must_use]
    pub fn to_query(&self) -> String {
        self.encode(false)
    }

    /// Query string sent to the API. Always carries `page` and `limit`.
    #[must_use]
    pub fn to_api_query(&self) -> String {
        self.encode(true)
    }

    fn encode(&self, with_defaults: bool) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.facets {
            serializer.append_pair(key, value);
        }
        if with_defaults || self.page != 1 {
            serializer.append_pair(PAGE_KEY, &self.page.to_string());
        }
        if with_defaults || self.limit != DEFAULT_LIMIT {
            serializer.append_pair(LIMIT_KEY, &self.limit.to_string());
        }
        serializer.finish()
    }

    fn set_raw(&mut self, key: &str, value: Option<&str>) {
        let value = value.map(str::trim).filter(|v| !v.is_empty());
        match key {
            PAGE_KEY => {
                self.page = value
                    .and_then(|v| v.parse::<u32>().ok())
                    .filter(|page| *page >= 1)
                    .unwrap_or(1);
            }
            LIMIT_KEY => {
                self.limit = value
                    .and_then(|v| v.parse::<u32>().ok())
                    .map_or(DEFAULT_LIMIT, |limit| limit.clamp(1, MAX_LIMIT));
            }
            _ => match value {
                Some(value) => {
                    self.facets.insert(key.to_owned(), value.to_owned());
                }
                None => {
                    self.facets.remove(key);
                }
            },
        }
    }
}

/// Page metadata reported by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    /// Total number of matching items.
    pub total: u64,
    /// Total number of pages.
    pub pages: u32,
}
