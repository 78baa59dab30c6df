// Source document decoding.
//
// Order: byte-order mark, then a charset token near the top of the file,
// then the candidate list. A candidate is accepted only when it decodes
// without malformed sequences AND the result is well-formed XML, since
// single-byte Cyrillic encodings accept almost any input.

use encoding_rs::{Encoding, IBM866, ISO_8859_5, KOI8_R, UTF_8, WINDOWS_1251};

use super::source::is_well_formed;
use super::BillError;

/// Tried in order when neither a BOM nor a charset token settles it.
pub const CANDIDATES: [&Encoding; 5] = [UTF_8, WINDOWS_1251, KOI8_R, IBM866, ISO_8859_5];

/// Charset tokens looked for in the document head, as encoding labels.
const HINT_TOKENS: [&str; 5] = ["windows-1251", "cp1251", "utf-8", "koi8-r", "cp866"];

/// Bytes scanned for a charset token.
const HEAD_LEN: usize = 512;

#[derive(Debug)]
pub struct Decoded {
    pub text: String,
    pub encoding: &'static Encoding,
}

pub fn decode(bytes: &[u8]) -> Result<Decoded, BillError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        log::debug!("BOM found: {}", encoding.name());
        if let Some(text) = strict_decode(encoding, &bytes[bom_len..]) {
            return Ok(Decoded { text, encoding });
        }
    }

    let mut attempted: Vec<&'static Encoding> = Vec::new();

    if let Some(encoding) = hinted_encoding(bytes) {
        log::debug!("charset token suggests {}", encoding.name());
        attempted.push(encoding);
        if let Some(text) = accept(encoding, bytes) {
            return Ok(Decoded { text, encoding });
        }
    }

    for encoding in CANDIDATES {
        if attempted.contains(&encoding) {
            continue;
        }
        log::debug!("trying {}", encoding.name());
        attempted.push(encoding);
        if let Some(text) = accept(encoding, bytes) {
            return Ok(Decoded { text, encoding });
        }
    }

    Err(BillError::Encoding {
        attempted: attempted.iter().map(|e| e.name().to_string()).collect(),
    })
}

/// Earliest charset token in the head of the document.
fn hinted_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(HEAD_LEN)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();

    HINT_TOKENS
        .iter()
        .filter_map(|token| head.find(token).map(|pos| (pos, *token)))
        .min_by_key(|(pos, _)| *pos)
        .and_then(|(_, token)| Encoding::for_label(token.as_bytes()))
}

fn accept(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    strict_decode(encoding, bytes).filter(|text| is_well_formed(text))
}

fn strict_decode(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}
