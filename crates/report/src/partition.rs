// Split normalized rows into named report tables.
//
// Partitions never overlap: each row lands in at most one table. Rows that
// match no partition are counted as excluded, not treated as errors.

use std::collections::{BTreeMap, HashSet};

use crate::aggregate::aggregate;
use crate::model::{CheckRow, Dataset, ItemRow, ReportTable, TaxcomRow};

/// Tax regimes split out of a checks export, matched as case-insensitive substrings.
pub const CHECKS_REGIMES: [&str; 2] = ["ПАТЕНТ", "УСН"];

/// Taxcom tax system name → output label.
pub const TAXCOM_SYSTEMS: [(&str, &str); 2] = [("ПСН", "ПАТЕНТ"), ("УСН доход", "УСН")];

/// Longest label kept for nomenclature partitions.
pub const MAX_LABEL_CHARS: usize = 50;

/// Excel rejects longer worksheet names.
pub const MAX_SHEET_CHARS: usize = 31;

/// Used when an item type sanitizes to nothing.
pub const FALLBACK_LABEL: &str = "Без категории";

#[derive(Debug, Clone)]
pub struct Partitioned {
    pub tables: Vec<ReportTable>,
    /// Rows that matched no partition.
    pub excluded: usize,
}

/// Partition and aggregate every non-empty partition. `stem` is the input
/// file name without extension; it names checks and taxcom outputs.
pub fn partition(dataset: &Dataset, stem: &str) -> Partitioned {
    match dataset {
        Dataset::Checks(rows) => partition_checks(rows, stem),
        Dataset::Nomenclature(rows) => partition_items(rows),
        Dataset::Taxcom(rows) => partition_taxcom(rows, stem),
    }
}

fn output_name(label: &str, stem: &str) -> String {
    format!("processed_{label}_{stem}.xlsx")
}

pub fn sheet_name(label: &str) -> String {
    label.chars().take(MAX_SHEET_CHARS).collect()
}

pub fn partition_checks(rows: &[CheckRow], stem: &str) -> Partitioned {
    let patterns: Vec<String> = CHECKS_REGIMES.iter().map(|r| r.to_lowercase()).collect();
    let mut buckets: Vec<Vec<CheckRow>> = vec![Vec::new(); CHECKS_REGIMES.len()];
    let mut excluded = 0;

    for row in rows {
        let regime = row.tax_regime.to_lowercase();
        match patterns.iter().position(|p| regime.contains(p.as_str())) {
            Some(i) => buckets[i].push(row.clone()),
            None => excluded += 1,
        }
    }

    let tables = CHECKS_REGIMES
        .iter()
        .zip(buckets)
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|(label, bucket)| aggregate(output_name(label, stem), sheet_name(label), &bucket, false))
        .collect();

    Partitioned { tables, excluded }
}

pub fn partition_taxcom(rows: &[TaxcomRow], stem: &str) -> Partitioned {
    let mut buckets: Vec<Vec<TaxcomRow>> = vec![Vec::new(); TAXCOM_SYSTEMS.len()];
    let mut excluded = 0;

    for row in rows {
        match TAXCOM_SYSTEMS.iter().position(|(name, _)| row.tax_system == *name) {
            Some(i) => buckets[i].push(row.clone()),
            None => excluded += 1,
        }
    }

    let tables = TAXCOM_SYSTEMS
        .iter()
        .zip(buckets)
        .filter(|(_, bucket)| !bucket.is_empty())
        .map(|((_, label), bucket)| aggregate(output_name(label, stem), sheet_name(label), &bucket, true))
        .collect();

    Partitioned { tables, excluded }
}

/// One table per distinct item type, in sorted order of the raw value.
pub fn partition_items(rows: &[ItemRow]) -> Partitioned {
    let mut groups: BTreeMap<&str, Vec<ItemRow>> = BTreeMap::new();
    let mut excluded = 0;

    for row in rows {
        if row.item_type.is_empty() {
            excluded += 1;
            continue;
        }
        groups.entry(row.item_type.as_str()).or_default().push(row.clone());
    }

    let mut used: HashSet<String> = HashSet::new();
    let tables = groups
        .into_iter()
        .map(|(value, bucket)| {
            let label = unique_label(sanitize_label(value), &mut used);
            aggregate(format!("{label}.xlsx"), sheet_name(&label), &bucket, false)
        })
        .collect();

    Partitioned { tables, excluded }
}

/// Keep alphanumerics, space, hyphen and underscore; clip to 50 characters.
pub fn sanitize_label(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .take(MAX_LABEL_CHARS)
        .collect();
    let trimmed = kept.trim();
    if trimmed.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Distinct raw values can sanitize to the same label; suffix repeats.
///
/// The base is clipped so that label and suffix together stay within
/// [`MAX_LABEL_CHARS`].
fn unique_label(label: String, used: &mut HashSet<String>) -> String {
    let key = |s: &str| s.to_lowercase();
    if used.insert(key(&label)) {
        return label;
    }
    let mut n = 2;
    loop {
        let suffix = format!("_{n}");
        let base: String = label.chars().take(MAX_LABEL_CHARS.saturating_sub(suffix.chars().count())).collect();
        let candidate = format!("{base}{suffix}");
        if used.insert(key(&candidate)) {
            return candidate;
        }
        n += 1;
    }
}
