/// Builder for constructing document queries.
///
/// Filters a single collection by top-level body field equality, with
/// optional ordering and a result limit.
#[derive(Debug, Clone, Default)]
pub struct DocumentQuery {
    /// Collection to scan.
    pub collection: String,

    /// Top-level body fields that must equal the given JSON values.
    pub fields: serde_json::Map<String, serde_json::Value>,

    /// Return newest documents first instead of oldest first.
    pub newest_first: bool,

    /// Maximum number of documents to return.
    pub limit: Option<usize>,
}

impl DocumentQuery {
    /// Creates a query over every document of a collection.
    pub fn collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Requires a top-level body field to equal a value.
    pub fn field_eq(mut self, field: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Orders results newest first.
    pub fn newest_first(mut self) -> Self {
        self.newest_first = true;
        self
    }

    /// Limits the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}
