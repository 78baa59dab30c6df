// Row normalization per flavor. Each step consumes rows and returns new ones.

use crate::model::{CheckRow, Dataset, ItemRow, TaxcomRow};
use crate::prorate::prorate;

pub fn normalize(dataset: Dataset) -> Dataset {
    match dataset {
        Dataset::Checks(rows) => Dataset::Checks(normalize_checks(rows)),
        Dataset::Nomenclature(rows) => Dataset::Nomenclature(normalize_items(rows)),
        Dataset::Taxcom(rows) => Dataset::Taxcom(normalize_taxcom(rows)),
    }
}

/// Sort by time, record returns as negative payments, compute row totals.
pub fn normalize_checks(mut rows: Vec<CheckRow>) -> Vec<CheckRow> {
    rows.sort_by_key(|r| r.timestamp);

    rows.into_iter()
        .map(|mut r| {
            if r.is_return() {
                r.cash = -r.cash.saturating_abs();
                r.electronic = -r.electronic.saturating_abs();
                r.prepayment = -r.prepayment.saturating_abs();
                r.advance_offset = -r.advance_offset.saturating_abs();
            }
            r.total = r.cash + r.electronic + r.prepayment + r.advance_offset;
            r
        })
        .collect()
}

/// Prorate advances, clamp payments to the item amount, flip returns, then
/// derive the item amount from the two payment columns.
///
/// Proration runs on the original row order; the final sort by time is stable.
pub fn normalize_items(rows: Vec<ItemRow>) -> Vec<ItemRow> {
    let mut rows: Vec<ItemRow> = prorate(rows)
        .into_iter()
        .map(|mut r| {
            r.cash = r.cash.min(r.amount);
            r.electronic = r.electronic.min(r.amount);
            if r.is_return() {
                r.cash = -r.cash;
                r.electronic = -r.electronic;
                r.amount = -r.amount;
            }
            r.amount = r.cash + r.electronic;
            r
        })
        .collect();

    rows.sort_by_key(|r| r.timestamp);
    rows
}

/// Summary rows are already gone at load time; only ordering remains.
pub fn normalize_taxcom(mut rows: Vec<TaxcomRow>) -> Vec<TaxcomRow> {
    rows.sort_by_key(|r| r.timestamp);
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    fn check(ts: NaiveDateTime, sign: &str, cash: i64, electronic: i64, prepayment: i64, offset: i64) -> CheckRow {
        CheckRow {
            timestamp: ts,
            sign: sign.into(),
            tax_regime: "УСН".into(),
            receipt_id: None,
            cash,
            electronic,
            prepayment,
            advance_offset: offset,
            total: 0,
        }
    }

    #[test]
    fn check_returns_are_negative_regardless_of_input_sign() {
        let rows = vec![check(at(15, 10), "Возврат прихода", 100, -50, 20, -5)];
        let out = normalize_checks(rows);
        assert_eq!(out[0].cash, -100);
        assert_eq!(out[0].electronic, -50);
        assert_eq!(out[0].prepayment, -20);
        assert_eq!(out[0].advance_offset, -5);
        assert_eq!(out[0].total, -175);
    }

    #[test]
    fn check_return_of_minimum_amount_does_not_overflow() {
        let out = normalize_checks(vec![check(at(15, 10), "Возврат прихода", i64::MIN, 0, 0, 0)]);
        assert_eq!(out[0].cash, -i64::MAX);
        assert_eq!(out[0].total, -i64::MAX);
    }

    #[test]
    fn check_sales_keep_sign_and_get_total() {
        let out = normalize_checks(vec![check(at(15, 10), "Приход", 100, 50, 0, 0)]);
        assert_eq!(out[0].total, 150);
    }

    #[test]
    fn check_sort_is_stable() {
        let rows = vec![
            check(at(16, 9), "Приход", 1, 0, 0, 0),
            check(at(15, 9), "Приход", 2, 0, 0, 0),
            check(at(15, 9), "Приход", 3, 0, 0, 0),
        ];
        let cash: Vec<i64> = normalize_checks(rows).iter().map(|r| r.cash).collect();
        assert_eq!(cash, vec![2, 3, 1]);
    }

    fn item(receipt: &str, ts: NaiveDateTime, sign: &str, name: &str, amount: i64, cash: i64, electronic: i64, advance: i64) -> ItemRow {
        ItemRow {
            timestamp: ts,
            receipt_id: Some(receipt.into()),
            sign: sign.into(),
            name: name.into(),
            item_type: "Товар".into(),
            amount,
            cash,
            electronic,
            advance,
        }
    }

    #[test]
    fn items_prorated_then_clamped() {
        let ts = at(15, 12);
        let rows = vec![
            item("1", ts, "Приход", "Чай", 100, 100, 0, 120),
            item("1", ts, "Приход", "Кофе", 50, 0, 50, 120),
            item("1", ts, "Приход", "Сахар", 30, 30, 0, 120),
        ];
        let out = normalize_items(rows);
        let amounts: Vec<i64> = out.iter().map(|r| r.amount).collect();
        assert_eq!(amounts, vec![0, 30, 30]);
        assert_eq!(out[0].cash, 0);
        assert_eq!(out[1].electronic, 30);
        assert_eq!(out[2].cash, 30);
    }

    #[test]
    fn item_returns_negated_after_clamping() {
        let rows = vec![item("9", at(15, 12), "Возврат прихода", "Чай", 80, 100, 30, 0)];
        let out = normalize_items(rows);
        assert_eq!(out[0].cash, -80);
        assert_eq!(out[0].electronic, -30);
        assert_eq!(out[0].amount, -110);
    }

    #[test]
    fn item_amount_is_always_derived_from_payments() {
        // Input amount 500 is not trusted: the row paid 70 + 20.
        let out = normalize_items(vec![item("3", at(15, 12), "Приход", "Чай", 500, 70, 20, 0)]);
        assert_eq!(out[0].amount, 90);
    }

    #[test]
    fn items_sorted_after_proration() {
        let rows = vec![
            item("1", at(16, 9), "Приход", "A", 100, 100, 0, 120),
            item("1", at(15, 9), "Приход", "B", 50, 50, 0, 120),
        ];
        let out = normalize_items(rows);
        // Proration saw A first (zeroed), then B (50 - 20 = 30); output sorted by time.
        assert_eq!(out[0].name, "B");
        assert_eq!(out[0].amount, 30);
        assert_eq!(out[1].amount, 0);
    }

    #[test]
    fn taxcom_sorted() {
        let row = |ts| TaxcomRow {
            timestamp: ts,
            operation: "Приход".into(),
            tax_system: "ПСН".into(),
            cash: 0,
            cashless: 0,
            total: 0,
        };
        let out = normalize_taxcom(vec![row(at(17, 1)), row(at(15, 1))]);
        assert_eq!(out[0].timestamp, at(15, 1));
    }
}
