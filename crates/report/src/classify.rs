use std::collections::BTreeSet;

use crate::error::ReportError;
use crate::model::Flavor;

/// Required columns of `flavor` that `columns` lacks, in declaration order.
pub fn missing_columns(columns: &BTreeSet<String>, flavor: Flavor) -> Vec<String> {
    flavor
        .required_columns()
        .iter()
        .filter(|c| !columns.contains(**c))
        .map(|c| c.to_string())
        .collect()
}

/// Resolve which flavor a table follows.
///
/// The requested flavor wins when its columns are all present. Otherwise the
/// first fully satisfied flavor in checks → nomenclature → taxcom order is
/// used. When nothing fits, the error lists what the requested flavor lacks.
pub fn classify(columns: &BTreeSet<String>, requested: Flavor) -> Result<Flavor, ReportError> {
    let missing = missing_columns(columns, requested);
    if missing.is_empty() {
        return Ok(requested);
    }

    for candidate in Flavor::ALL {
        if candidate != requested && missing_columns(columns, candidate).is_empty() {
            log::info!("table does not fit {requested}, falling back to {candidate}");
            return Ok(candidate);
        }
    }

    Err(ReportError::MissingColumns { flavor: requested, missing })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols(flavor: Flavor) -> BTreeSet<String> {
        flavor.required_columns().iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn requested_flavor_kept_when_satisfied() {
        assert_eq!(classify(&cols(Flavor::Checks), Flavor::Checks).unwrap(), Flavor::Checks);
        assert_eq!(
            classify(&cols(Flavor::Nomenclature), Flavor::Nomenclature).unwrap(),
            Flavor::Nomenclature
        );
    }

    #[test]
    fn taxcom_columns_requested_as_checks_fall_back() {
        assert_eq!(classify(&cols(Flavor::Taxcom), Flavor::Checks).unwrap(), Flavor::Taxcom);
    }

    #[test]
    fn fallback_follows_priority_order() {
        // Superset of nomenclature and taxcom; requested checks cannot be met.
        let mut columns = cols(Flavor::Nomenclature);
        columns.extend(cols(Flavor::Taxcom));
        assert_eq!(classify(&columns, Flavor::Checks).unwrap(), Flavor::Nomenclature);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let mut columns = cols(Flavor::Checks);
        columns.insert("Кассир".into());
        assert_eq!(classify(&columns, Flavor::Checks).unwrap(), Flavor::Checks);
    }

    #[test]
    fn missing_columns_reported_for_requested_flavor() {
        let mut columns = cols(Flavor::Checks);
        columns.remove("Электронными");
        columns.remove("Тип налогообложения");

        match classify(&columns, Flavor::Checks) {
            Err(ReportError::MissingColumns { flavor, missing }) => {
                assert_eq!(flavor, Flavor::Checks);
                assert_eq!(missing, vec!["Тип налогообложения", "Электронными"]);
            }
            other => panic!("expected MissingColumns, got {other:?}"),
        }
    }
}
