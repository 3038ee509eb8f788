use serde::{Deserialize, Serialize};

/// String-valued field access by key. Unknown keys and absent values are `None`
/// and compare as the empty string.
pub trait FieldLookup {
    fn field(&self, key: &str) -> Option<&str>;
}

impl FieldLookup for serde_json::Value {
    fn field(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(serde_json::Value::as_str)
    }
}

/// Free-text plus exact-status predicate, ANDed. Empty parts match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterQuery {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub status_exact: Option<String>,
}

impl FilterQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status_exact = Some(status.into());
        self
    }

    /// Active status selector; an empty selection means "all".
    pub fn status(&self) -> Option<&str> {
        self.status_exact.as_deref().filter(|s| !s.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.status().is_none()
    }
}

/// Which record keys the query's text and status predicates read.
///
/// Several name keys are joined with a single space before matching, so a
/// device search can span `device_id` and `driver_name` at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldBindings {
    name: Vec<String>,
    status: Option<String>,
}

impl FieldBindings {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: vec![name.into()],
            status: None,
        }
    }

    pub fn searching<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: keys.into_iter().map(Into::into).collect(),
            status: None,
        }
    }

    pub fn with_status(mut self, key: impl Into<String>) -> Self {
        self.status = Some(key.into());
        self
    }

    pub fn status_key(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn haystack<R: FieldLookup>(&self, row: &R) -> String {
        let joined = self
            .name
            .iter()
            .map(|key| row.field(key).unwrap_or(""))
            .collect::<Vec<_>>()
            .join(" ");
        joined.to_lowercase()
    }
}

pub fn matches<R: FieldLookup>(row: &R, query: &FilterQuery, fields: &FieldBindings) -> bool {
    if !query.text.is_empty() && !fields.haystack(row).contains(&query.text.to_lowercase()) {
        return false;
    }

    match query.status() {
        None => true,
        Some(wanted) => {
            let actual = fields
                .status_key()
                .and_then(|key| row.field(key))
                .unwrap_or("");
            actual.to_lowercase() == wanted.to_lowercase()
        }
    }
}

/// Returns the rows that pass `query`, in their original order. The input is
/// left untouched.
pub fn filter_rows<R>(rows: &[R], query: &FilterQuery, fields: &FieldBindings) -> Vec<R>
where
    R: FieldLookup + Clone,
{
    rows.iter()
        .filter(|row| matches(*row, query, fields))
        .cloned()
        .collect()
}
