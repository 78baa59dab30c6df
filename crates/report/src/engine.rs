use serde::Serialize;

use crate::classify::classify;
use crate::error::ReportError;
use crate::load::load;
use crate::model::{Flavor, ReportTable};
use crate::normalize::normalize;
use crate::partition::partition;
use crate::table::Table;

/// Outcome of one report conversion, before serialization.
#[derive(Debug, Clone)]
pub struct ReportRun {
    pub flavor: Flavor,
    pub tables: Vec<ReportTable>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub requested: Flavor,
    pub flavor: Flavor,
    pub input_rows: usize,
    pub exported_rows: usize,
    /// Rows matching no partition. Non-zero values are worth a look.
    pub excluded_rows: usize,
    pub tables: usize,
}

/// Classify → load → normalize → partition → aggregate.
///
/// `stem` is the input file name without extension. An empty `tables` list
/// is returned as-is; deciding that this is a failure is the caller's job.
pub fn run(table: &Table, requested: Flavor, stem: &str) -> Result<ReportRun, ReportError> {
    let columns = table.column_names();
    log::debug!("input columns: {:?}", columns);

    let flavor = classify(&columns, requested)?;
    log::info!("resolved flavor: {flavor} (requested {requested})");

    let dataset = normalize(load(table, flavor)?);
    let input_rows = dataset.len();

    let parts = partition(&dataset, stem);
    let exported_rows = parts.tables.iter().map(|t| t.detail_count()).sum();
    if parts.excluded > 0 {
        log::warn!("{} of {input_rows} rows matched no partition and were left out", parts.excluded);
    }

    let summary = RunSummary {
        requested,
        flavor,
        input_rows,
        exported_rows,
        excluded_rows: parts.excluded,
        tables: parts.tables.len(),
    };

    Ok(ReportRun { flavor, tables: parts.tables, summary })
}
