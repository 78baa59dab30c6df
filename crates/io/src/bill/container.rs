// card.xml / meta.xml generation and source re-encoding.
//
// The descriptor layout is fixed by the receiving exchange; element order,
// namespaces and DocumentVersion must not drift.

use std::borrow::Cow;
use std::sync::LazyLock;

use encoding_rs::WINDOWS_1251;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use regex::Regex;
use uuid::Uuid;

use super::source::{InvoiceFields, Party};
use super::{BillError, Reglament, CARD_PATH};

pub const CARD_NAMESPACE: &str = "http://api-invoice.taxcom.ru/card";
pub const META_NAMESPACE: &str = "http://api-invoice.taxcom.ru/meta";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const DOCUMENT_VERSION: &str = "1.0";

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const TARGET_ENCODING: &str = "windows-1251";

/// Thin wrapper that tags write failures with the file being produced.
struct Xml {
    file: &'static str,
    writer: Writer<Vec<u8>>,
}

impl Xml {
    fn new(file: &'static str) -> Result<Self, BillError> {
        let mut xml = Self { file, writer: Writer::new_with_indent(Vec::new(), b' ', 2) };
        xml.event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
        Ok(xml)
    }

    fn event(&mut self, event: Event<'_>) -> Result<(), BillError> {
        self.writer.write_event(event).map_err(|e| BillError::Write {
            file: self.file,
            message: e.to_string(),
        })
    }

    fn open(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), BillError> {
        self.event(Event::Start(BytesStart::new(name).with_attributes(attrs.iter().copied())))
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<(), BillError> {
        self.event(Event::Empty(BytesStart::new(name).with_attributes(attrs.iter().copied())))
    }

    fn text(&mut self, name: &str, value: &str) -> Result<(), BillError> {
        self.open(name, &[])?;
        self.event(Event::Text(BytesText::new(value)))?;
        self.close(name)
    }

    fn close(&mut self, name: &str) -> Result<(), BillError> {
        self.event(Event::End(BytesEnd::new(name)))
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Document card: what the document is and who sends it to whom.
pub fn card_xml(fields: &InvoiceFields, package_id: &Uuid) -> Result<Vec<u8>, BillError> {
    let mut xml = Xml::new("card.xml")?;
    let package_id = package_id.to_string();
    let date = fields.date.format(DATE_FORMAT).to_string();

    xml.open(
        "Card",
        &[
            ("xmlns", CARD_NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("DocumentVersion", DOCUMENT_VERSION),
        ],
    )?;
    xml.empty("Identifiers", &[("ExternalIdentifier", package_id.as_str())])?;
    xml.empty(
        "Description",
        &[("Title", fields.title.as_str()), ("Date", date.as_str()), ("Number", fields.number.as_str())],
    )?;
    xml.text("Direction", "Outbound")?;
    abonent(&mut xml, "Sender", &fields.seller)?;
    abonent(&mut xml, "Receiver", &fields.buyer)?;
    xml.text("DocumentState", "Sent")?;
    xml.close("Card")?;

    Ok(xml.finish())
}

fn abonent(xml: &mut Xml, role: &str, party: &Party) -> Result<(), BillError> {
    xml.open(role, &[])?;
    xml.open(
        "Abonent",
        &[("Id", party.id.as_str()), ("Name", party.name.as_str()), ("Inn", party.inn.as_str()), ("Kpp", party.kpp.as_str())],
    )?;
    xml.empty("Department", &[("Id", "0")])?;
    xml.close("Abonent")?;
    xml.close(role)
}

/// Transmission envelope pointing at the document and its card.
pub fn meta_xml(
    fields: &InvoiceFields,
    reglament: Reglament,
    docflow_id: &Uuid,
    main_path: &str,
) -> Result<Vec<u8>, BillError> {
    let mut xml = Xml::new("meta.xml")?;
    let docflow_id = docflow_id.to_string();
    let date = fields.date.format(DATE_FORMAT).to_string();

    xml.open(
        "Meta",
        &[
            ("xmlns", META_NAMESPACE),
            ("xmlns:xsi", XSI_NAMESPACE),
            ("DocumentVersion", DOCUMENT_VERSION),
        ],
    )?;
    xml.open("DocFlow", &[("Id", docflow_id.as_str()), ("DocumentCount", "1")])?;
    xml.open("Documents", &[])?;
    xml.open(
        "Document",
        &[
            ("ReglamentCode", reglament.as_str()),
            ("TransactionCode", reglament.as_str()),
            ("DocumentDate", date.as_str()),
            ("DocumentNumber", fields.number.as_str()),
        ],
    )?;
    xml.open("Files", &[])?;
    xml.empty("MainImage", &[("Path", main_path)])?;
    xml.empty("ExternalCard", &[("Path", CARD_PATH)])?;
    xml.close("Files")?;
    xml.close("Document")?;
    xml.close("Documents")?;
    xml.close("DocFlow")?;
    xml.text("ProcessingState", "New")?;
    xml.close("Meta")?;

    Ok(xml.finish())
}

/// Encode the decoded source as windows-1251, declaring that encoding.
///
/// Characters outside the code page become numeric character references.
pub fn reencode_cp1251(text: &str) -> Vec<u8> {
    let text = declare_encoding(text);
    let (bytes, _, lossy) = WINDOWS_1251.encode(&text);
    if lossy {
        log::warn!("document has characters outside windows-1251; written as character references");
    }
    bytes.into_owned()
}

static WITH_ENCODING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^(\s*<\?xml[^>]*?\bencoding\s*=\s*)(["'])[^"']*["']"#).unwrap());
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"^\s*<\?xml[^>]*?(\s*\?>)"#).unwrap());

fn declare_encoding(text: &str) -> Cow<'_, str> {
    if WITH_ENCODING.is_match(text) {
        return WITH_ENCODING.replace(text, format!("${{1}}${{2}}{TARGET_ENCODING}${{2}}"));
    }
    if let Some(caps) = DECLARATION.captures(text) {
        if let Some(end) = caps.get(1) {
            let mut out = String::with_capacity(text.len() + 32);
            out.push_str(&text[..end.start()]);
            out.push_str(&format!(" encoding=\"{TARGET_ENCODING}\""));
            out.push_str(&text[end.start()..]);
            return Cow::Owned(out);
        }
    }
    Cow::Owned(format!("<?xml version=\"1.0\" encoding=\"{TARGET_ENCODING}\"?>\n{text}"))
}
