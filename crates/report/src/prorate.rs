// Prepayment proration for nomenclature rows.
//
// A receipt paid partly from an earlier advance lists the advance on every
// line. The advance is consumed line by line in original order: lines are
// zeroed until the remainder fits into one line, which is reduced by it.
// Later lines with that line's item name are then zeroed so a repeated SKU
// is not discounted twice.

use std::collections::HashMap;

use crate::model::ItemRow;

/// Apply advance credits per receipt. Row order is preserved.
pub fn prorate(rows: Vec<ItemRow>) -> Vec<ItemRow> {
    let mut rows = rows;

    // Receipt id → row positions, in original order.
    let mut receipts: HashMap<String, Vec<usize>> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for (idx, row) in rows.iter().enumerate() {
        if let Some(id) = &row.receipt_id {
            receipts
                .entry(id.clone())
                .or_insert_with(|| {
                    order.push(id.clone());
                    Vec::new()
                })
                .push(idx);
        }
    }

    for id in &order {
        let positions = &receipts[id];
        let advance = positions
            .iter()
            .map(|&i| rows[i].advance)
            .find(|&a| a > 0)
            .unwrap_or(0);
        if advance > 0 {
            consume_advance(&mut rows, positions, advance);
        }
    }

    rows
}

fn consume_advance(rows: &mut [ItemRow], positions: &[usize], advance: i64) {
    let mut remaining = advance;

    for (n, &idx) in positions.iter().enumerate() {
        if remaining <= 0 {
            break;
        }
        let amount = rows[idx].amount;
        if amount >= remaining {
            rows[idx].amount = amount - remaining;
            remaining = 0;

            let name = rows[idx].name.clone();
            for &later in &positions[n + 1..] {
                if rows[later].name == name {
                    rows[later].amount = 0;
                }
            }
        } else {
            rows[idx].amount = 0;
            remaining -= amount;
        }
    }
}
