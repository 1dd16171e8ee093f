//! Accumulated search results

use std::collections::{HashMap, HashSet};

use serde_json::{json, Value};

use super::compiler::SearchPayload;
use crate::StacItem;

/// Features accumulated across search pages, in arrival order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResult {
    request_body: SearchPayload,
    features: Vec<StacItem>,
    pages: usize,
}

impl SearchResult {
    /// Empty result for the search described by `request_body`
    pub fn new(request_body: SearchPayload) -> Self {
        Self {
            request_body,
            features: Vec::new(),
            pages: 0,
        }
    }

    /// Append one page of features, returning how many were added
    ///
    /// Features whose `id` is already present are skipped unless
    /// `keep_duplicates` is set.
    pub fn add<I>(&mut self, page: I, keep_duplicates: bool) -> usize
    where
        I: IntoIterator<Item = StacItem>,
    {
        self.pages += 1;
        let before = self.features.len();
        if keep_duplicates {
            self.features.extend(page);
        } else {
            let mut seen: HashSet<String> = self.features.iter().map(|f| f.id.clone()).collect();
            for feature in page {
                if seen.insert(feature.id.clone()) {
                    self.features.push(feature);
                }
            }
        }
        self.features.len() - before
    }

    /// New result holding the features of `self` followed by those of `other`
    pub fn merge(&self, other: &SearchResult, keep_duplicates: bool) -> SearchResult {
        let mut merged = self.clone();
        merged.add(other.features.iter().cloned(), keep_duplicates);
        merged.pages = self.pages + other.pages;
        merged
    }

    /// Order features by position in `ids`; unknown ids keep their relative
    /// order at the end
    pub fn sort_by_ids(&mut self, ids: &[String]) {
        let position: HashMap<&str, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        self.features
            .sort_by_key(|f| position.get(f.id.as_str()).copied().unwrap_or(usize::MAX));
    }

    /// Keep at most `limit` features
    pub fn truncate(&mut self, limit: usize) {
        self.features.truncate(limit);
    }

    /// Number of features
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether no feature matched
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Number of pages added
    pub fn page_count(&self) -> usize {
        self.pages
    }

    /// Payload of the first request
    pub fn request_body(&self) -> &SearchPayload {
        &self.request_body
    }

    /// Features in order
    pub fn features(&self) -> &[StacItem] {
        &self.features
    }

    /// Consume into the feature list
    pub fn into_features(self) -> Vec<StacItem> {
        self.features
    }

    /// Ids of all features, in order
    pub fn stac_ids(&self) -> Vec<String> {
        self.features.iter().map(|f| f.id.clone()).collect()
    }

    /// GeoJSON `FeatureCollection` view
    pub fn to_feature_collection(&self) -> Value {
        json!({
            "type": "FeatureCollection",
            "features": self.features,
        })
    }
}

impl<'a> IntoIterator for &'a SearchResult {
    type Item = &'a StacItem;
    type IntoIter = std::slice::Iter<'a, StacItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
