//! Client-side row filtering for the console's tables.

pub mod query;
pub mod table;

pub use query::{filter_rows, matches, FieldBindings, FieldLookup, FilterQuery};
pub use table::{FilterTable, NumberedRow, TableView};
