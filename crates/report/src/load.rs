// Typed record loading: parsed table → Dataset for a resolved flavor.

use chrono::NaiveDateTime;

use crate::columns::*;
use crate::error::ReportError;
use crate::model::{CheckRow, Dataset, Flavor, ItemRow, TaxcomRow};
use crate::money::{parse_kopecks, parse_timestamp};
use crate::table::{Cell, Table};

/// Resolved column positions plus row access with error context.
struct Columns<'a> {
    table: &'a Table,
}

impl<'a> Columns<'a> {
    fn index(&self, name: &str, flavor: Flavor) -> Result<usize, ReportError> {
        self.table.column_index(name).ok_or_else(|| ReportError::MissingColumns {
            flavor,
            missing: vec![name.to_string()],
        })
    }

    fn text(&self, row: usize, col: usize) -> String {
        self.table.cell(row, col).as_text()
    }

    fn optional_text(&self, row: usize, col: Option<usize>) -> Option<String> {
        col.map(|c| self.text(row, c)).filter(|s| !s.is_empty())
    }

    fn kopecks(&self, row: usize, col: usize) -> Result<i64, ReportError> {
        let cell = self.table.cell(row, col);
        parse_kopecks(cell).ok_or_else(|| ReportError::Amount {
            row: sheet_row(row),
            column: self.table.headers[col].clone(),
            value: cell.as_text(),
        })
    }

    fn timestamp(&self, row: usize, col: usize) -> Result<NaiveDateTime, ReportError> {
        let cell = self.table.cell(row, col);
        parse_timestamp(cell).ok_or_else(|| ReportError::Timestamp {
            row: sheet_row(row),
            column: self.table.headers[col].clone(),
            value: cell.as_text(),
        })
    }
}

/// 1-based sheet row of a data row (header is row 1).
fn sheet_row(row: usize) -> usize {
    row + 2
}

fn is_blank_row(cells: &[Cell]) -> bool {
    cells.iter().all(Cell::is_empty)
}

/// Build typed records for `flavor`. Blank rows are skipped.
pub fn load(table: &Table, flavor: Flavor) -> Result<Dataset, ReportError> {
    let dataset = match flavor {
        Flavor::Checks => Dataset::Checks(load_checks(table)?),
        Flavor::Nomenclature => Dataset::Nomenclature(load_items(table)?),
        Flavor::Taxcom => Dataset::Taxcom(load_taxcom(table)?),
    };
    log::debug!("loaded {} {} rows", dataset.len(), flavor);
    Ok(dataset)
}

fn load_checks(table: &Table) -> Result<Vec<CheckRow>, ReportError> {
    let c = Columns { table };
    let f = Flavor::Checks;
    let ts = c.index(CHECKS_TIMESTAMP, f)?;
    let sign = c.index(CHECKS_SIGN, f)?;
    let regime = c.index(CHECKS_TAX_REGIME, f)?;
    let cash = c.index(CHECKS_CASH, f)?;
    let electronic = c.index(CHECKS_ELECTRONIC, f)?;
    let prepayment = c.index(CHECKS_PREPAYMENT, f)?;
    let offset = c.index(CHECKS_ADVANCE_OFFSET, f)?;
    let receipt = table.column_index(CHECKS_RECEIPT);

    let mut rows = Vec::with_capacity(table.len());
    for (i, cells) in table.rows.iter().enumerate() {
        if is_blank_row(cells) {
            continue;
        }
        rows.push(CheckRow {
            timestamp: c.timestamp(i, ts)?,
            sign: c.text(i, sign),
            tax_regime: c.text(i, regime),
            receipt_id: c.optional_text(i, receipt),
            cash: c.kopecks(i, cash)?,
            electronic: c.kopecks(i, electronic)?,
            prepayment: c.kopecks(i, prepayment)?,
            advance_offset: c.kopecks(i, offset)?,
            total: 0,
        });
    }
    Ok(rows)
}

fn load_items(table: &Table) -> Result<Vec<ItemRow>, ReportError> {
    let c = Columns { table };
    let f = Flavor::Nomenclature;
    let ts = c.index(ITEM_TIMESTAMP, f)?;
    let receipt = c.index(ITEM_RECEIPT, f)?;
    let sign = c.index(ITEM_SIGN, f)?;
    let name = c.index(ITEM_NAME, f)?;
    let item_type = c.index(ITEM_TYPE, f)?;
    let amount = c.index(ITEM_AMOUNT, f)?;
    let cash = c.index(ITEM_CASH, f)?;
    let electronic = c.index(ITEM_ELECTRONIC, f)?;
    let advance = c.index(ITEM_ADVANCE, f)?;

    let mut rows = Vec::with_capacity(table.len());
    for (i, cells) in table.rows.iter().enumerate() {
        if is_blank_row(cells) {
            continue;
        }
        rows.push(ItemRow {
            timestamp: c.timestamp(i, ts)?,
            receipt_id: c.optional_text(i, Some(receipt)),
            sign: c.text(i, sign),
            name: c.text(i, name),
            item_type: c.text(i, item_type),
            amount: c.kopecks(i, amount)?,
            cash: c.kopecks(i, cash)?,
            electronic: c.kopecks(i, electronic)?,
            advance: c.kopecks(i, advance)?,
        });
    }
    Ok(rows)
}

/// Taxcom exports may already contain summary rows; those are dropped here,
/// before their date cell would fail timestamp parsing.
fn load_taxcom(table: &Table) -> Result<Vec<TaxcomRow>, ReportError> {
    let c = Columns { table };
    let f = Flavor::Taxcom;
    let ts = c.index(TAXCOM_TIMESTAMP, f)?;
    let operation = c.index(TAXCOM_OPERATION, f)?;
    let system = c.index(TAXCOM_TAX_SYSTEM, f)?;
    let cash = c.index(TAXCOM_CASH, f)?;
    let cashless = c.index(TAXCOM_CASHLESS, f)?;
    let total = c.index(TAXCOM_TOTAL, f)?;

    let mut rows = Vec::with_capacity(table.len());
    let mut dropped = 0usize;
    for (i, cells) in table.rows.iter().enumerate() {
        if is_blank_row(cells) {
            continue;
        }
        if is_taxcom_summary(table.cell(i, ts)) {
            dropped += 1;
            continue;
        }
        rows.push(TaxcomRow {
            timestamp: c.timestamp(i, ts)?,
            operation: c.text(i, operation),
            tax_system: c.text(i, system),
            cash: c.kopecks(i, cash)?,
            cashless: c.kopecks(i, cashless)?,
            total: c.kopecks(i, total)?,
        });
    }
    if dropped > 0 {
        log::debug!("dropped {dropped} pre-existing summary rows");
    }
    Ok(rows)
}

pub fn is_taxcom_summary(date_cell: &Cell) -> bool {
    match date_cell {
        Cell::Text(s) => s.contains(TAXCOM_SUMMARY_MARKER),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Cell {
        Cell::Text(s.into())
    }

    fn taxcom_table(rows: Vec<Vec<Cell>>) -> Table {
        Table::new(TAXCOM_REQUIRED.iter().map(|s| s.to_string()).collect(), rows)
    }

    #[test]
    fn taxcom_summary_rows_are_dropped() {
        let table = taxcom_table(vec![
            vec![text("15.01.2024 10:00:00"), text("Приход"), text("ПСН"), Cell::Number(100.0), Cell::Empty, Cell::Number(100.0)],
            vec![text("Итого за 15.01.2024"), Cell::Empty, Cell::Empty, Cell::Number(100.0), Cell::Empty, Cell::Number(100.0)],
        ]);
        let Dataset::Taxcom(rows) = load(&table, Flavor::Taxcom).unwrap() else {
            panic!("expected taxcom dataset");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].cash, 10000);
    }

    #[test]
    fn bad_timestamp_names_sheet_row() {
        let table = taxcom_table(vec![vec![
            text("вчера"), text("Приход"), text("ПСН"), Cell::Number(1.0), Cell::Empty, Cell::Number(1.0),
        ]]);
        match load(&table, Flavor::Taxcom) {
            Err(ReportError::Timestamp { row, column, value }) => {
                assert_eq!(row, 2);
                assert_eq!(column, TAXCOM_TIMESTAMP);
                assert_eq!(value, "вчера");
            }
            other => panic!("expected Timestamp error, got {other:?}"),
        }
    }

    #[test]
    fn bad_amount_is_reported() {
        let table = taxcom_table(vec![vec![
            text("15.01.2024"), text("Приход"), text("ПСН"), text("сто"), Cell::Empty, Cell::Number(1.0),
        ]]);
        assert!(matches!(load(&table, Flavor::Taxcom), Err(ReportError::Amount { .. })));
    }

    #[test]
    fn blank_rows_skipped_and_receipt_optional() {
        let headers = CHECKS_REQUIRED.iter().map(|s| s.to_string()).collect();
        let table = Table::new(
            headers,
            vec![
                vec![text("15.01.2024 09:00"), text("Приход"), text("УСН"), Cell::Number(10.0)],
                vec![Cell::Empty, text(" ")],
            ],
        );
        let Dataset::Checks(rows) = load(&table, Flavor::Checks).unwrap() else {
            panic!("expected checks dataset");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].receipt_id, None);
        assert_eq!(rows[0].cash, 1000);
        assert_eq!(rows[0].electronic, 0);
    }
}
