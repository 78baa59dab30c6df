use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::columns::*;

// ---------------------------------------------------------------------------
// Flavor
// ---------------------------------------------------------------------------

/// Which OFD export layout a table follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flavor {
    #[default]
    Checks,
    Nomenclature,
    Taxcom,
}

impl Flavor {
    /// Fallback priority when the requested flavor does not fit.
    pub const ALL: [Flavor; 3] = [Flavor::Checks, Flavor::Nomenclature, Flavor::Taxcom];

    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Checks => CHECKS_REQUIRED,
            Self::Nomenclature => ITEM_REQUIRED,
            Self::Taxcom => TAXCOM_REQUIRED,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checks => "checks",
            Self::Nomenclature => "nomenclature",
            Self::Taxcom => "taxcom",
        }
    }
}

impl std::fmt::Display for Flavor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flavor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "checks" => Ok(Self::Checks),
            "nomenclature" => Ok(Self::Nomenclature),
            "taxcom" => Ok(Self::Taxcom),
            other => Err(format!(
                "unknown flavor \"{other}\" (expected checks, nomenclature or taxcom)"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed records
// ---------------------------------------------------------------------------

/// One receipt from a checks export. Amounts in kopecks.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRow {
    pub timestamp: NaiveDateTime,
    pub sign: String,
    pub tax_regime: String,
    pub receipt_id: Option<String>,
    pub cash: i64,
    pub electronic: i64,
    pub prepayment: i64,
    pub advance_offset: i64,
    /// Sum of the four payment fields; filled in by normalization.
    pub total: i64,
}

impl CheckRow {
    pub fn is_return(&self) -> bool {
        self.sign == RETURN_SIGN
    }
}

/// One line of a receipt from a nomenclature export. Amounts in kopecks.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemRow {
    pub timestamp: NaiveDateTime,
    pub receipt_id: Option<String>,
    pub sign: String,
    pub name: String,
    pub item_type: String,
    pub amount: i64,
    pub cash: i64,
    pub electronic: i64,
    /// Prepayment credited against the whole receipt, repeated on each line.
    pub advance: i64,
}

impl ItemRow {
    pub fn is_return(&self) -> bool {
        self.sign == RETURN_SIGN
    }
}

/// One receipt from a Taxcom export. Amounts in kopecks.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxcomRow {
    pub timestamp: NaiveDateTime,
    pub operation: String,
    pub tax_system: String,
    pub cash: i64,
    pub cashless: i64,
    pub total: i64,
}

/// Typed rows of one input table, tagged by flavor.
#[derive(Debug, Clone, PartialEq)]
pub enum Dataset {
    Checks(Vec<CheckRow>),
    Nomenclature(Vec<ItemRow>),
    Taxcom(Vec<TaxcomRow>),
}

impl Dataset {
    pub fn flavor(&self) -> Flavor {
        match self {
            Self::Checks(_) => Flavor::Checks,
            Self::Nomenclature(_) => Flavor::Nomenclature,
            Self::Taxcom(_) => Flavor::Taxcom,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Checks(rows) => rows.len(),
            Self::Nomenclature(rows) => rows.len(),
            Self::Taxcom(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Report output
// ---------------------------------------------------------------------------

/// A value in an output report cell.
#[derive(Debug, Clone, PartialEq)]
pub enum OutCell {
    Blank,
    Text(String),
    /// Kopecks, written as rubles with two decimals.
    Money(i64),
    DateTime(NaiveDateTime),
    Date(NaiveDate),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Detail,
    Gap,
    DailyTotal,
    GrandTotal,
}

impl RowKind {
    /// Summary rows are highlighted in the written workbook.
    pub fn is_summary(&self) -> bool {
        matches!(self, Self::DailyTotal | Self::GrandTotal)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub kind: RowKind,
    pub cells: Vec<OutCell>,
}

/// One output table: a named sheet with detail rows and summaries.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    /// Output file name inside the archive.
    pub name: String,
    /// Worksheet name.
    pub sheet: String,
    pub header: Vec<String>,
    pub rows: Vec<ReportRow>,
}

impl ReportTable {
    pub fn rows_of(&self, kind: RowKind) -> impl Iterator<Item = &ReportRow> {
        self.rows.iter().filter(move |r| r.kind == kind)
    }

    pub fn detail_count(&self) -> usize {
        self.rows_of(RowKind::Detail).count()
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }
}

/// A normalized record that can be laid out as a report row.
pub trait ReportRecord {
    /// Header row of the report sheet.
    fn header() -> &'static [&'static str];

    /// Header positions of the fields summed by daily totals, in the
    /// same order as [`ReportRecord::amounts`].
    fn summed_columns() -> &'static [usize];

    fn timestamp(&self) -> NaiveDateTime;

    fn amounts(&self) -> Vec<i64>;

    fn cells(&self) -> Vec<OutCell>;
}

fn receipt_cell(id: &Option<String>) -> OutCell {
    match id {
        Some(id) => OutCell::Text(id.clone()),
        None => OutCell::Blank,
    }
}

impl ReportRecord for CheckRow {
    fn header() -> &'static [&'static str] {
        &[
            CHECKS_TIMESTAMP,
            CHECKS_SIGN,
            CHECKS_TAX_REGIME,
            CHECKS_RECEIPT,
            CHECKS_CASH,
            CHECKS_ELECTRONIC,
            CHECKS_PREPAYMENT,
            CHECKS_ADVANCE_OFFSET,
            CHECKS_TOTAL,
        ]
    }

    fn summed_columns() -> &'static [usize] {
        &[4, 5, 6, 7, 8]
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn amounts(&self) -> Vec<i64> {
        vec![self.cash, self.electronic, self.prepayment, self.advance_offset, self.total]
    }

    fn cells(&self) -> Vec<OutCell> {
        vec![
            OutCell::DateTime(self.timestamp),
            OutCell::Text(self.sign.clone()),
            OutCell::Text(self.tax_regime.clone()),
            receipt_cell(&self.receipt_id),
            OutCell::Money(self.cash),
            OutCell::Money(self.electronic),
            OutCell::Money(self.prepayment),
            OutCell::Money(self.advance_offset),
            OutCell::Money(self.total),
        ]
    }
}

impl ReportRecord for ItemRow {
    fn header() -> &'static [&'static str] {
        &[
            ITEM_TIMESTAMP,
            ITEM_SIGN,
            ITEM_RECEIPT,
            ITEM_NAME,
            ITEM_TYPE,
            ITEM_AMOUNT,
            ITEM_CASH,
            ITEM_ELECTRONIC,
            ITEM_ADVANCE,
        ]
    }

    fn summed_columns() -> &'static [usize] {
        &[5, 6, 7]
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn amounts(&self) -> Vec<i64> {
        vec![self.amount, self.cash, self.electronic]
    }

    fn cells(&self) -> Vec<OutCell> {
        vec![
            OutCell::DateTime(self.timestamp),
            OutCell::Text(self.sign.clone()),
            receipt_cell(&self.receipt_id),
            OutCell::Text(self.name.clone()),
            OutCell::Text(self.item_type.clone()),
            OutCell::Money(self.amount),
            OutCell::Money(self.cash),
            OutCell::Money(self.electronic),
            OutCell::Money(self.advance),
        ]
    }
}

impl ReportRecord for TaxcomRow {
    fn header() -> &'static [&'static str] {
        &[
            TAXCOM_TIMESTAMP,
            TAXCOM_OPERATION,
            TAXCOM_TAX_SYSTEM,
            TAXCOM_CASH,
            TAXCOM_CASHLESS,
            TAXCOM_TOTAL,
        ]
    }

    fn summed_columns() -> &'static [usize] {
        &[3, 4, 5]
    }

    fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    fn amounts(&self) -> Vec<i64> {
        vec![self.cash, self.cashless, self.total]
    }

    fn cells(&self) -> Vec<OutCell> {
        vec![
            OutCell::DateTime(self.timestamp),
            OutCell::Text(self.operation.clone()),
            OutCell::Text(self.tax_system.clone()),
            OutCell::Money(self.cash),
            OutCell::Money(self.cashless),
            OutCell::Money(self.total),
        ]
    }
}
