use serde_json::{Map, Value, json};

/// Subset of the OpenSearch query DSL used for user lookups.
///
/// String equality always targets the `.keyword` sub-field so that analysed
/// text fields are compared verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Exact match on `<field>.keyword`
    Keyword { field: String, value: String },
    /// Every sub-query must match
    Must(Vec<Query>),
    MatchAll,
}

impl Query {
    pub fn keyword(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Keyword {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn must(queries: impl IntoIterator<Item = Query>) -> Self {
        Self::Must(queries.into_iter().collect())
    }

    /// Render the query clause, i.e. the value of the `"query"` key.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Keyword { field, value } => {
                json!({ "term": { format!("{field}.keyword"): value } })
            }
            Self::Must(queries) => {
                let must: Vec<Value> = queries.iter().map(Query::to_json).collect();
                json!({ "bool": { "must": must } })
            }
            Self::MatchAll => json!({ "match_all": {} }),
        }
    }

    /// Evaluate the query against a document source held in memory.
    pub(crate) fn matches(&self, source: &Map<String, Value>) -> bool {
        match self {
            Self::Keyword { field, value } => {
                matches!(source.get(field), Some(Value::String(s)) if s == value)
            }
            Self::Must(queries) => queries.iter().all(|q| q.matches(source)),
            Self::MatchAll => true,
        }
    }
}
