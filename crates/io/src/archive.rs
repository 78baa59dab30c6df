// In-memory zip packaging of converter outputs.

use std::collections::HashSet;
use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::error::IoError;

/// One named blob destined for the result archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    /// Path inside the archive, `/`-separated.
    pub name: String,
    pub bytes: Vec<u8>,
}

impl ArchiveEntry {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }
}

/// Build a deflate-compressed zip from `entries`, preserving their order.
///
/// Every entry must be non-empty and uniquely named. The finished archive is
/// reopened and its entry count checked before it is returned.
pub fn package(entries: &[ArchiveEntry]) -> Result<Vec<u8>, IoError> {
    if entries.is_empty() {
        return Err(IoError::NothingToArchive);
    }

    let mut seen = HashSet::new();
    for entry in entries {
        if entry.bytes.is_empty() {
            return Err(IoError::MissingEntry(entry.name.clone()));
        }
        if !seen.insert(entry.name.as_str()) {
            return Err(IoError::DuplicateEntry(entry.name.clone()));
        }
    }

    let mut buf = Cursor::new(Vec::new());
    {
        let mut zip = ZipWriter::new(&mut buf);
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        for entry in entries {
            zip.start_file(entry.name.as_str(), options)
                .map_err(|e| IoError::Archive(e.to_string()))?;
            zip.write_all(&entry.bytes)
                .map_err(|e| IoError::Archive(e.to_string()))?;
        }

        zip.finish().map_err(|e| IoError::Archive(e.to_string()))?;
    }
    let bytes = buf.into_inner();

    let reopened = ZipArchive::new(Cursor::new(bytes.as_slice()))
        .map_err(|e| IoError::Archive(format!("written archive is unreadable: {e}")))?;
    if reopened.len() != entries.len() {
        return Err(IoError::Archive(format!(
            "archive holds {} entries, expected {}",
            reopened.len(),
            entries.len()
        )));
    }

    log::debug!("packaged {} entries into {} bytes", entries.len(), bytes.len());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn entries_keep_order_and_content() {
        let bytes = package(&[
            ArchiveEntry::new("meta.xml", b"<meta/>".to_vec()),
            ArchiveEntry::new("1/card.xml", b"<card/>".to_vec()),
        ])
        .unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(0).unwrap().name(), "meta.xml");

        let mut card = String::new();
        archive.by_name("1/card.xml").unwrap().read_to_string(&mut card).unwrap();
        assert_eq!(card, "<card/>");
    }

    #[test]
    fn cyrillic_names_survive() {
        let bytes = package(&[ArchiveEntry::new("processed_УСН_январь.xlsx", vec![1, 2, 3])]).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert!(archive.by_name("processed_УСН_январь.xlsx").is_ok());
    }

    #[test]
    fn empty_list_is_rejected() {
        assert!(matches!(package(&[]), Err(IoError::NothingToArchive)));
    }

    #[test]
    fn empty_blob_is_rejected() {
        let err = package(&[ArchiveEntry::new("a.xlsx", vec![])]).unwrap_err();
        assert!(matches!(err, IoError::MissingEntry(name) if name == "a.xlsx"));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = package(&[
            ArchiveEntry::new("a.xlsx", vec![1]),
            ArchiveEntry::new("a.xlsx", vec![2]),
        ])
        .unwrap_err();
        assert!(matches!(err, IoError::DuplicateEntry(_)));
    }
}
