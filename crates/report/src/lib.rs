//! `ofdconv-report`: fiscal report engine.
//!
//! Pure engine crate: receives a parsed input table, returns named report
//! tables ready to be serialized. No spreadsheet or archive IO here.

pub mod aggregate;
pub mod classify;
pub mod columns;
pub mod engine;
pub mod error;
pub mod load;
pub mod model;
pub mod money;
pub mod normalize;
pub mod partition;
pub mod prorate;
pub mod table;

pub use engine::{run, ReportRun};
pub use error::ReportError;
pub use model::{Dataset, Flavor, OutCell, ReportRow, ReportTable, RowKind};
pub use table::{Cell, Table};
