// Source e-invoice reading: a small element tree plus field extraction.

use chrono::{NaiveDate, NaiveDateTime};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::BillError;

pub const DEFAULT_TITLE: &str = "Счет на оплату";
const SOLE_TRADER_PREFIX: &str = "ИП ";

/// Element with attributes and child elements. Text content is not kept;
/// the invoice format carries everything of interest in attributes.
#[derive(Debug, Clone, Default)]
pub struct Node {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// First element named `name` in document order, this node included.
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Shorthand for `find(element)?.attr(attr)`.
    pub fn find_attr(&self, element: &str, attr: &str) -> Option<&str> {
        self.find(element).and_then(|n| n.attr(attr))
    }
}

/// Parse a decoded document into its root element. Namespace prefixes are dropped.
pub fn parse(text: &str) -> Result<Node, BillError> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => stack.push(element(e)?),
            Ok(Event::Empty(ref e)) => {
                let node = element(e)?;
                attach(&mut stack, &mut root, node);
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| BillError::Parse("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, node);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BillError::Parse(format!(
                    "at byte {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(BillError::Parse(format!("element <{}> is never closed", open.name)));
    }
    root.ok_or_else(|| BillError::Parse("document has no root element".to_string()))
}

/// Cheap check used while probing encodings.
pub fn is_well_formed(text: &str) -> bool {
    parse(text).is_ok()
}

fn element(e: &BytesStart) -> Result<Node, BillError> {
    let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| BillError::Parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let raw = String::from_utf8_lossy(&attr.value);
        let value = quick_xml::escape::unescape(&raw)
            .map_err(|e| BillError::Parse(e.to_string()))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok(Node { name, attrs, children: Vec::new() })
}

fn attach(stack: &mut [Node], root: &mut Option<Node>, node: Node) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            // Only the first top-level element counts.
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

/// Seller or buyer as shown on the card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Party {
    /// Exchange participant id (abonent id).
    pub id: String,
    pub name: String,
    pub inn: String,
    pub kpp: String,
}

impl Party {
    /// Legal entity details win over sole-trader details.
    fn from_node(node: Option<&Node>, id: Option<&str>) -> Self {
        let legal = node.and_then(|n| n.find("СвЮЛУч"));
        let trader = node.and_then(|n| n.find("СвИП"));

        let inn = legal
            .and_then(|n| n.attr("ИННЮЛ"))
            .or_else(|| trader.and_then(|n| n.attr("ИННФЛ")))
            .unwrap_or_default();

        let name = match legal.and_then(|n| n.attr("НаимОрг")) {
            Some(org) => org.to_string(),
            None => trader
                .and_then(|n| n.find("ФИО"))
                .map(full_name)
                .filter(|fio| !fio.is_empty())
                .map(|fio| format!("{SOLE_TRADER_PREFIX}{fio}"))
                .unwrap_or_default(),
        };

        Party {
            id: id.unwrap_or_default().to_string(),
            name,
            inn: inn.to_string(),
            kpp: legal.and_then(|n| n.attr("КПП")).unwrap_or_default().to_string(),
        }
    }
}

fn full_name(fio: &Node) -> String {
    ["Фамилия", "Имя", "Отчество"]
        .iter()
        .filter_map(|part| fio.attr(part))
        .map(str::trim)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything the card and envelope need from the source document.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceFields {
    /// `Документ/@НаимДокОпр`, default [`DEFAULT_TITLE`].
    pub title: String,
    /// `СвСчФакт/@НомерСчФ`, default empty.
    pub number: String,
    /// `СвСчФакт/@ДатаСчФ` at midnight; the conversion time when absent or malformed.
    pub date: NaiveDateTime,
    /// `Документ/@Функция`.
    pub function: Option<String>,
    pub seller: Party,
    pub buyer: Party,
}

impl InvoiceFields {
    pub fn extract(root: &Node, now: NaiveDateTime) -> Self {
        let document = root.find("Документ");
        let invoice = root.find("СвСчФакт");
        let exchange = root.find("СвУчДокОбор");

        let date = invoice
            .and_then(|n| n.attr("ДатаСчФ"))
            .and_then(|d| NaiveDate::parse_from_str(d.trim(), "%d.%m.%Y").ok())
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(now);

        InvoiceFields {
            title: document
                .and_then(|n| n.attr("НаимДокОпр"))
                .unwrap_or(DEFAULT_TITLE)
                .to_string(),
            number: invoice.and_then(|n| n.attr("НомерСчФ")).unwrap_or_default().to_string(),
            date,
            function: document.and_then(|n| n.attr("Функция")).map(str::to_string),
            seller: Party::from_node(
                invoice.and_then(|n| n.find("СвПрод")),
                exchange.and_then(|n| n.attr("ИдОтпр")),
            ),
            buyer: Party::from_node(
                invoice.and_then(|n| n.find("СвПокуп")),
                exchange.and_then(|n| n.attr("ИдПол")),
            ),
        }
    }
}
