// Query parameters understood by the Eve backend.

use serde_json::Value;

/// Filter, projection, and paging parameters for a collection read.
///
/// `where` and `projection` are JSON documents serialized into the query
/// string, e.g. `?where={"_is_template":false}&projection={"name":1}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pub filter: Option<Value>,
    pub projection: Vec<String>,
    pub sort: Option<String>,
    pub max_results: Option<u32>,
    pub page: Option<u32>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Value) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_projection<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.projection = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = Some(max_results);
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Render as `(key, value)` pairs for `RequestBuilder::query`.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(ref filter) = self.filter {
            pairs.push(("where", filter.to_string()));
        }
        if !self.projection.is_empty() {
            let map: serde_json::Map<String, Value> = self
                .projection
                .iter()
                .map(|f| (f.clone(), Value::from(1)))
                .collect();
            pairs.push(("projection", Value::Object(map).to_string()));
        }
        if let Some(ref sort) = self.sort {
            pairs.push(("sort", sort.clone()));
        }
        if let Some(max) = self.max_results {
            pairs.push(("max_results", max.to_string()));
        }
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        pairs
    }
}
