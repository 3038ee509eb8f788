use serde::Serialize;

use super::query::{filter_rows, FieldBindings, FieldLookup, FilterQuery};

/// A fetched collection plus the query state one table applies to it.
///
/// Each table owns its query and bindings; two tables on the same view never
/// share either.
#[derive(Debug, Clone)]
pub struct FilterTable<R> {
    rows: Vec<R>,
    query: FilterQuery,
    bindings: FieldBindings,
    status_options: Vec<String>,
}

/// Rows numbered from 1 in display order, ready to hand to the presentation
/// layer.
#[derive(Debug, Clone, Serialize)]
pub struct TableView<R> {
    pub query: FilterQuery,
    pub status_options: Vec<String>,
    pub total: usize,
    pub rows: Vec<NumberedRow<R>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NumberedRow<R> {
    pub no: usize,
    #[serde(flatten)]
    pub row: R,
}

impl<R: FieldLookup + Clone> FilterTable<R> {
    pub fn new(bindings: FieldBindings) -> Self {
        Self {
            rows: Vec::new(),
            query: FilterQuery::default(),
            bindings,
            status_options: Vec::new(),
        }
    }

    pub fn with_status_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status_options = options.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the collection wholesale; query state is kept.
    pub fn set_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.query.text = text.into();
    }

    pub fn query_mut(&mut self) -> &mut FilterQuery {
        &mut self.query
    }

    pub fn visible(&self) -> Vec<R> {
        filter_rows(&self.rows, &self.query, &self.bindings)
    }

    pub fn view(&self) -> TableView<R> {
        TableView {
            query: self.query.clone(),
            status_options: self.status_options.clone(),
            total: self.rows.len(),
            rows: self
                .visible()
                .into_iter()
                .enumerate()
                .map(|(idx, row)| NumberedRow { no: idx + 1, row })
                .collect(),
        }
    }
}
