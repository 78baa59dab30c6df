// Column names of the OFD export flavors.
//
// Headers are matched by name after trimming; column order in the input
// sheet does not matter.

// ---------------------------------------------------------------------------
// Checks (receipt list export)
// ---------------------------------------------------------------------------

pub const CHECKS_TIMESTAMP: &str = "Дата/время";
pub const CHECKS_SIGN: &str = "Признак расчета";
pub const CHECKS_TAX_REGIME: &str = "Тип налогообложения";
pub const CHECKS_RECEIPT: &str = "Номер ФД";
pub const CHECKS_CASH: &str = "Наличными";
pub const CHECKS_ELECTRONIC: &str = "Электронными";
pub const CHECKS_PREPAYMENT: &str = "Предоплата (аванс)";
pub const CHECKS_ADVANCE_OFFSET: &str = "Зачет предоплаты (аванса)";
/// Derived by normalization, not read from input.
pub const CHECKS_TOTAL: &str = "Итого";

pub const CHECKS_PAYMENTS: [&str; 4] = [
    CHECKS_CASH,
    CHECKS_ELECTRONIC,
    CHECKS_PREPAYMENT,
    CHECKS_ADVANCE_OFFSET,
];

pub const CHECKS_REQUIRED: &[&str] = &[
    CHECKS_TIMESTAMP,
    CHECKS_SIGN,
    CHECKS_TAX_REGIME,
    CHECKS_CASH,
    CHECKS_ELECTRONIC,
    CHECKS_PREPAYMENT,
    CHECKS_ADVANCE_OFFSET,
];

// ---------------------------------------------------------------------------
// Nomenclature (per-item export)
// ---------------------------------------------------------------------------

pub const ITEM_TIMESTAMP: &str = "Дата/время";
pub const ITEM_RECEIPT: &str = "Номер ФД";
pub const ITEM_SIGN: &str = "Признак расчета";
pub const ITEM_NAME: &str = "Наименование";
pub const ITEM_TYPE: &str = "Признак предмета расчета";
pub const ITEM_AMOUNT: &str = "Сумма";
pub const ITEM_CASH: &str = "Наличными";
pub const ITEM_ELECTRONIC: &str = "Электронными";
pub const ITEM_ADVANCE: &str = "Зачет предоплаты (аванса)";

pub const ITEM_REQUIRED: &[&str] = &[
    ITEM_TIMESTAMP,
    ITEM_RECEIPT,
    ITEM_SIGN,
    ITEM_NAME,
    ITEM_TYPE,
    ITEM_AMOUNT,
    ITEM_CASH,
    ITEM_ELECTRONIC,
    ITEM_ADVANCE,
];

// ---------------------------------------------------------------------------
// Taxcom (operator-specific export)
// ---------------------------------------------------------------------------

pub const TAXCOM_TIMESTAMP: &str = "Дата и время";
pub const TAXCOM_OPERATION: &str = "Тип операции";
pub const TAXCOM_TAX_SYSTEM: &str = "Система налогообложения";
pub const TAXCOM_CASH: &str = "Наличными";
pub const TAXCOM_CASHLESS: &str = "Безналичными";
pub const TAXCOM_TOTAL: &str = "Сумма чека";

pub const TAXCOM_REQUIRED: &[&str] = &[
    TAXCOM_TIMESTAMP,
    TAXCOM_OPERATION,
    TAXCOM_TAX_SYSTEM,
    TAXCOM_CASH,
    TAXCOM_CASHLESS,
    TAXCOM_TOTAL,
];

/// Summary rows already present in a Taxcom export carry this in the date column.
pub const TAXCOM_SUMMARY_MARKER: &str = "Итого";

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Calculation sign of a refund of an incoming payment.
pub const RETURN_SIGN: &str = "Возврат прихода";

/// Label written into the sign column of a daily total row.
pub const DAILY_TOTAL_LABEL: &str = "ИТОГО за день";

/// Labels written into the first two columns of the grand total row.
pub const GRAND_TOTAL_DATE: &str = "Итого";
pub const GRAND_TOTAL_LABEL: &str = "ИТОГО за период";
