//! Data model shared by the engine and the exporters
//!
//! - [`FieldValue`] / [`FieldType`]: typed values and their converters
//! - [`Row`] / [`WorkItem`]: extracted records and units of fan-out
//! - [`DataStore`]: per-entity results of a run

mod row;
mod store;
mod value;

pub use row::{merge_rows, row_from, Row, WorkItem};
pub use store::DataStore;
pub use value::{ConversionError, FieldType, FieldValue};
