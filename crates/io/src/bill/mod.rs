//! E-invoice → exchange container conversion.
//!
//! One source XML document becomes three archive entries:
//!
//! ```text
//! meta.xml            transmission envelope (docflow id, reglament, file paths)
//! 1/<original name>   the source document, re-encoded to windows-1251
//! 1/card.xml          document card (title, number, date, sender, receiver)
//! ```
//!
//! Only an undecodable or malformed source is fatal. Missing optional fields
//! fall back to defaults (see [`source::InvoiceFields`]).

pub mod container;
pub mod decode;
pub mod source;

use std::path::Path;

use chrono::{Local, NaiveDateTime, Timelike};
use thiserror::Error;
use uuid::Uuid;

use crate::archive::ArchiveEntry;

pub use source::{InvoiceFields, Party};

/// Archive path of the envelope.
pub const META_PATH: &str = "meta.xml";
/// Archive path of the document card.
pub const CARD_PATH: &str = "1/card.xml";
/// Directory holding the source document and its card.
pub const DOCUMENT_DIR: &str = "1";

const FALLBACK_FILE_NAME: &str = "document.xml";

#[derive(Debug, Error)]
pub enum BillError {
    /// No candidate encoding produced well-formed XML.
    #[error("cannot decode document; tried {}", .attempted.join(", "))]
    Encoding { attempted: Vec<String> },

    #[error("malformed XML: {0}")]
    Parse(String),

    #[error("cannot write {file}: {message}")]
    Write { file: &'static str, message: String },
}

/// Document type carried in the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reglament {
    Invoice,
    Nonformalized,
}

impl Reglament {
    /// Function code of a universal transfer document acting as an invoice.
    pub const INVOICE_FUNCTION: &'static str = "СЧФ";

    pub fn from_function(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            Some(Self::INVOICE_FUNCTION) => Reglament::Invoice,
            _ => Reglament::Nonformalized,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Reglament::Invoice => "Invoice",
            Reglament::Nonformalized => "Nonformalized",
        }
    }
}

/// Identifiers and clock for one conversion. Tests pin these.
#[derive(Debug, Clone, Copy)]
pub struct Stamp {
    pub package_id: Uuid,
    pub docflow_id: Uuid,
    pub now: NaiveDateTime,
}

impl Stamp {
    pub fn fresh() -> Self {
        let now = Local::now().naive_local();
        Self {
            package_id: Uuid::new_v4(),
            docflow_id: Uuid::new_v4(),
            now: now.with_nanosecond(0).unwrap_or(now),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BillOutput {
    /// `meta.xml`, `1/<original>`, `1/card.xml`, in that order.
    pub entries: Vec<ArchiveEntry>,
    pub fields: InvoiceFields,
    pub reglament: Reglament,
    /// Encoding the source was decoded with.
    pub source_encoding: &'static str,
}

/// Convert with fresh identifiers and the current local time.
pub fn convert_bill(file_name: &str, bytes: &[u8]) -> Result<BillOutput, BillError> {
    convert_bill_with(file_name, bytes, Stamp::fresh())
}

pub fn convert_bill_with(file_name: &str, bytes: &[u8], stamp: Stamp) -> Result<BillOutput, BillError> {
    let decoded = decode::decode(bytes)?;
    log::info!("bill decoded as {}", decoded.encoding.name());

    let root = source::parse(&decoded.text)?;
    let fields = InvoiceFields::extract(&root, stamp.now);
    let reglament = Reglament::from_function(fields.function.as_deref());
    log::info!(
        "bill '{}' no. '{}' → reglament {}",
        fields.title,
        fields.number,
        reglament.as_str()
    );

    let original = original_name(file_name);
    let main_path = format!("{DOCUMENT_DIR}/{original}");

    let card = container::card_xml(&fields, &stamp.package_id)?;
    let meta = container::meta_xml(&fields, reglament, &stamp.docflow_id, &main_path)?;
    let body = container::reencode_cp1251(&decoded.text);

    Ok(BillOutput {
        entries: vec![
            ArchiveEntry::new(META_PATH, meta),
            ArchiveEntry::new(main_path, body),
            ArchiveEntry::new(CARD_PATH, card),
        ],
        fields,
        reglament,
        source_encoding: decoded.encoding.name(),
    })
}

/// Base name of the upload; client-supplied directories are dropped.
fn original_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_code_maps_to_reglament() {
        assert_eq!(Reglament::from_function(Some("СЧФ")), Reglament::Invoice);
        assert_eq!(Reglament::from_function(Some(" СЧФ ")), Reglament::Invoice);
        assert_eq!(Reglament::from_function(Some("ДОП")), Reglament::Nonformalized);
        assert_eq!(Reglament::from_function(None), Reglament::Nonformalized);
    }

    #[test]
    fn original_name_strips_directories() {
        assert_eq!(original_name("C:/upload/ON_NSCHFDOPPR_1.xml"), "ON_NSCHFDOPPR_1.xml");
        assert_eq!(original_name("bill.xml"), "bill.xml");
        assert_eq!(original_name(""), FALLBACK_FILE_NAME);
    }

    #[test]
    fn fresh_stamps_differ() {
        let a = Stamp::fresh();
        let b = Stamp::fresh();
        assert_ne!(a.package_id, b.package_id);
        assert_ne!(a.package_id, a.docflow_id);
    }
}
