use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::columns::{DAILY_TOTAL_LABEL, GRAND_TOTAL_DATE, GRAND_TOTAL_LABEL};
use crate::model::{OutCell, ReportRecord, ReportRow, ReportTable, RowKind};

/// Blank rows between the detail block and the totals block.
pub const GAP_ROWS: usize = 2;

/// Sum the record amounts per calendar date, ascending by date.
pub fn daily_totals<R: ReportRecord>(rows: &[R]) -> Vec<(NaiveDate, Vec<i64>)> {
    let width = R::summed_columns().len();
    let mut days: BTreeMap<NaiveDate, Vec<i64>> = BTreeMap::new();

    for row in rows {
        let sums = days.entry(row.timestamp().date()).or_insert_with(|| vec![0; width]);
        for (sum, amount) in sums.iter_mut().zip(row.amounts()) {
            *sum = sum.saturating_add(amount);
        }
    }

    days.into_iter().collect()
}

/// Lay out detail rows followed by a gap and one total row per day.
///
/// With `grand_total`, a last row sums all daily totals. The input must be
/// detail rows only; feeding an aggregated table back in double-counts.
pub fn aggregate<R: ReportRecord>(
    name: impl Into<String>,
    sheet: impl Into<String>,
    rows: &[R],
    grand_total: bool,
) -> ReportTable {
    let header: Vec<String> = R::header().iter().map(|h| h.to_string()).collect();
    let summed = R::summed_columns();
    let width = header.len();

    let mut out: Vec<ReportRow> = rows
        .iter()
        .map(|r| ReportRow { kind: RowKind::Detail, cells: r.cells() })
        .collect();

    for _ in 0..GAP_ROWS {
        out.push(ReportRow { kind: RowKind::Gap, cells: Vec::new() });
    }

    let days = daily_totals(rows);
    let mut grand = vec![0i64; summed.len()];

    for (date, sums) in &days {
        let mut cells = vec![OutCell::Blank; width];
        cells[0] = OutCell::Date(*date);
        cells[1] = OutCell::Text(DAILY_TOTAL_LABEL.to_string());
        for (i, (&col, &sum)) in summed.iter().zip(sums).enumerate() {
            cells[col] = OutCell::Money(sum);
            grand[i] = grand[i].saturating_add(sum);
        }
        out.push(ReportRow { kind: RowKind::DailyTotal, cells });
    }

    if grand_total {
        let mut cells = vec![OutCell::Blank; width];
        cells[0] = OutCell::Text(GRAND_TOTAL_DATE.to_string());
        cells[1] = OutCell::Text(GRAND_TOTAL_LABEL.to_string());
        for (&col, &sum) in summed.iter().zip(&grand) {
            cells[col] = OutCell::Money(sum);
        }
        out.push(ReportRow { kind: RowKind::GrandTotal, cells });
    }

    ReportTable {
        name: name.into(),
        sheet: sheet.into(),
        header,
        rows: out,
    }
}
