// Excel import (first sheet → Table) and report export (ReportTable → xlsx)
//
// Import: only the first sheet is read; its first row is the header.
// Export: presentation snapshot. Summary rows are filled so they stand out
//         from detail rows; amounts are written as rubles.

use std::io::{Cursor, Read};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use quick_xml::events::Event;
use ofdconv_report::money::{from_excel_serial, to_excel_serial};
use ofdconv_report::{Cell, OutCell, ReportTable, RowKind, Table};
use rust_xlsxwriter::{Color, Format, FormatPattern, Workbook as XlsxWorkbook, Worksheet};

use crate::error::IoError;

const DATETIME_FORMAT: &str = "dd.mm.yyyy hh:mm:ss";
const DATE_FORMAT: &str = "dd.mm.yyyy";
const MONEY_FORMAT: &str = "#,##0.00";

/// Days from the 1900-system epoch to the 1904-system epoch.
const EPOCH_1904_OFFSET: f64 = 1462.0;

const WIDE_COLUMN: f64 = 20.0;
const NARROW_COLUMN: f64 = 16.0;

/// Read the first sheet of an Excel workbook (xlsx, xls, xlsb, ods).
pub fn read_table(bytes: &[u8]) -> Result<Table, IoError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| IoError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| IoError::EmptyWorkbook("file contains no sheets".to_string()))?
        .map_err(|e| IoError::Workbook(format!("cannot read first sheet: {}", e)))?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| IoError::EmptyWorkbook("first sheet is empty".to_string()))?;

    let date1904 = uses_1904_dates(bytes);
    let headers: Vec<String> = header_row.iter().map(|d| import_cell(d, date1904).as_text()).collect();
    let data: Vec<Vec<Cell>> = rows.map(|r| r.iter().map(|d| import_cell(d, date1904)).collect()).collect();

    log::debug!("read {} rows x {} columns (1904 dates: {})", data.len(), headers.len(), date1904);
    Ok(Table::new(headers, data))
}

/// Whether an xlsx workbook declares `<workbookPr date1904="1"/>`.
///
/// Only xlsx carries the flag where we can see it; xls and ods are read in
/// the 1900 system.
fn uses_1904_dates(bytes: &[u8]) -> bool {
    let Ok(mut archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
        return false;
    };
    let mut xml = String::new();
    match archive.by_name("xl/workbook.xml") {
        Ok(mut entry) => {
            if entry.read_to_string(&mut xml).is_err() {
                return false;
            }
        }
        Err(_) => return false,
    }

    let mut reader = quick_xml::Reader::from_str(&xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) if e.local_name().as_ref() == b"workbookPr" => {
                return e.attributes().flatten().any(|a| {
                    a.key.local_name().as_ref() == b"date1904" && matches!(a.value.as_ref(), b"1" | b"true")
                });
            }
            Ok(Event::Eof) | Err(_) => return false,
            _ => {}
        }
    }
}

/// Serial day number in the 1900 system.
fn serial_1900(serial: f64, date1904: bool) -> f64 {
    if date1904 {
        serial + EPOCH_1904_OFFSET
    } else {
        serial
    }
}

fn import_cell(data: &Data, date1904: bool) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Text(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            // calamine hands back the raw serial of the workbook's own epoch.
            let serial = serial_1900(dt.as_f64(), date1904);
            match from_excel_serial(serial) {
                Some(ts) => Cell::DateTime(ts),
                None => Cell::Number(serial),
            }
        }
        Data::DateTimeIso(s) => Cell::Text(s.clone()),
        Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Cell formats for one report; summary variants carry the fill.
struct Formats {
    header: Format,
    text: Format,
    datetime: Format,
    date: Format,
    money: Format,
    summary_text: Format,
    summary_date: Format,
    summary_money: Format,
}

impl Formats {
    fn new(fill: u32) -> Self {
        let filled = |f: Format| {
            f.set_bold()
                .set_background_color(Color::RGB(fill))
                .set_pattern(FormatPattern::Solid)
        };
        Self {
            header: Format::new().set_bold(),
            text: Format::new(),
            datetime: Format::new().set_num_format(DATETIME_FORMAT),
            date: Format::new().set_num_format(DATE_FORMAT),
            money: Format::new().set_num_format(MONEY_FORMAT),
            summary_text: filled(Format::new()),
            summary_date: filled(Format::new().set_num_format(DATE_FORMAT)),
            summary_money: filled(Format::new().set_num_format(MONEY_FORMAT)),
        }
    }
}

/// Serialize one report table into an xlsx workbook held in memory.
///
/// `fill` is the 0xRRGGBB background of daily and grand total rows.
pub fn write_report(table: &ReportTable, fill: u32) -> Result<Vec<u8>, IoError> {
    let err = |e: rust_xlsxwriter::XlsxError| IoError::ReportWrite {
        name: table.name.clone(),
        message: e.to_string(),
    };

    let formats = Formats::new(fill);
    let mut workbook = XlsxWorkbook::new();
    let worksheet = workbook.add_worksheet().set_name(&table.sheet).map_err(err)?;

    for (col, title) in table.header.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, title, &formats.header)
            .map_err(err)?;
        let width = if col == 0 { WIDE_COLUMN } else { NARROW_COLUMN };
        worksheet.set_column_width(col as u16, width).map_err(err)?;
    }
    worksheet.set_freeze_panes(1, 0).map_err(err)?;

    let width = table.header.len();
    for (idx, row) in table.rows.iter().enumerate() {
        let row_num = (idx + 1) as u32;
        if row.kind == RowKind::Gap {
            continue;
        }
        write_row(worksheet, row_num, &row.cells, row.kind.is_summary(), width, &formats).map_err(err)?;
    }

    workbook.save_to_buffer().map_err(err)
}

fn write_row(
    worksheet: &mut Worksheet,
    row: u32,
    cells: &[OutCell],
    summary: bool,
    width: usize,
    formats: &Formats,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    for col in 0..width {
        let c = col as u16;
        match cells.get(col) {
            None | Some(OutCell::Blank) => {
                if summary {
                    worksheet.write_blank(row, c, &formats.summary_text)?;
                }
            }
            Some(OutCell::Text(s)) => {
                let f = if summary { &formats.summary_text } else { &formats.text };
                worksheet.write_string_with_format(row, c, s, f)?;
            }
            Some(OutCell::Money(kop)) => {
                let f = if summary { &formats.summary_money } else { &formats.money };
                worksheet.write_number_with_format(row, c, *kop as f64 / 100.0, f)?;
            }
            Some(OutCell::DateTime(ts)) => {
                worksheet.write_number_with_format(row, c, to_excel_serial(ts), &formats.datetime)?;
            }
            Some(OutCell::Date(d)) => {
                let f = if summary { &formats.summary_date } else { &formats.date };
                let midnight = d.and_hms_opt(0, 0, 0).unwrap_or_default();
                worksheet.write_number_with_format(row, c, to_excel_serial(&midnight), f)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use ofdconv_report::ReportRow;
    use std::collections::HashMap;
    use std::io::Write;

    fn sample_input() -> Vec<u8> {
        let mut wb = XlsxWorkbook::new();
        let ws = wb.add_worksheet();
        ws.write_string(0, 0, "Дата/время").unwrap();
        ws.write_string(0, 1, " Наличными ").unwrap();
        ws.write_string(0, 2, "Номер ФД").unwrap();
        ws.write_string(1, 0, "15.01.2024 10:30:00").unwrap();
        ws.write_number(1, 1, 100.5).unwrap();
        ws.write_number(1, 2, 42.0).unwrap();
        ws.write_number_with_format(2, 0, 45306.4375, &Format::new().set_num_format("dd.mm.yyyy hh:mm")).unwrap();
        ws.write_number(2, 1, -40.0).unwrap();
        wb.save_to_buffer().unwrap()
    }

    #[test]
    fn read_first_sheet_with_header() {
        let table = read_table(&sample_input()).unwrap();
        assert_eq!(table.headers, vec!["Дата/время", "Наличными", "Номер ФД"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 0), &Cell::Text("15.01.2024 10:30:00".into()));
        assert_eq!(table.cell(0, 1), &Cell::Number(100.5));
        assert_eq!(table.cell(0, 2).as_text(), "42");
        assert_eq!(table.cell(1, 1), &Cell::Number(-40.0));
    }

    #[test]
    fn garbage_is_not_a_workbook() {
        assert!(matches!(read_table(b"not a spreadsheet"), Err(IoError::Workbook(_))));
    }

    fn sample_report() -> ReportTable {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(10, 30, 0).unwrap();
        ReportTable {
            name: "processed_УСН_jan.xlsx".into(),
            sheet: "УСН".into(),
            header: vec!["Дата/время".into(), "Признак расчета".into(), "Наличными".into()],
            rows: vec![
                ReportRow {
                    kind: RowKind::Detail,
                    cells: vec![OutCell::DateTime(ts), OutCell::Text("Приход".into()), OutCell::Money(10050)],
                },
                ReportRow { kind: RowKind::Gap, cells: vec![] },
                ReportRow { kind: RowKind::Gap, cells: vec![] },
                ReportRow {
                    kind: RowKind::DailyTotal,
                    cells: vec![OutCell::Date(ts.date()), OutCell::Text("ИТОГО за день".into()), OutCell::Money(10050)],
                },
            ],
        }
    }

    #[test]
    fn report_round_trips_through_calamine() {
        let bytes = write_report(&sample_report(), 0xD3D3D3).unwrap();
        let table = read_table(&bytes).unwrap();

        assert_eq!(table.headers, vec!["Дата/время", "Признак расчета", "Наличными"]);
        assert_eq!(table.cell(0, 2), &Cell::Number(100.5));
        // Two blank gap rows, then the daily total on sheet row 5.
        assert!(table.cell(1, 0).is_empty());
        assert!(table.cell(2, 0).is_empty());
        assert_eq!(table.cell(3, 1), &Cell::Text("ИТОГО за день".into()));
        assert_eq!(table.cell(3, 2), &Cell::Number(100.5));
    }

    fn zip_text(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut out).unwrap();
        out
    }

    fn attr(e: &quick_xml::events::BytesStart, key: &[u8]) -> Option<String> {
        e.attributes()
            .flatten()
            .find(|a| a.key.as_ref() == key)
            .map(|a| String::from_utf8(a.value.into_owned()).unwrap())
    }

    /// Cell reference → style index, from a worksheet part.
    fn cell_styles(sheet_xml: &str) -> HashMap<String, usize> {
        let mut reader = quick_xml::Reader::from_str(sheet_xml);
        let mut styles = HashMap::new();
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"c" => {
                    let r = attr(&e, b"r").unwrap();
                    let s = attr(&e, b"s").map(|s| s.parse().unwrap()).unwrap_or(0);
                    styles.insert(r, s);
                }
                Event::Eof => return styles,
                _ => {}
            }
        }
    }

    /// Fill colour (`fgColor@rgb`) of each `cellXfs` entry, by style index.
    fn style_fills(styles_xml: &str) -> Vec<Option<String>> {
        let mut reader = quick_xml::Reader::from_str(styles_xml);
        let mut fills: Vec<Option<String>> = Vec::new();
        let mut xf_fill_ids: Vec<usize> = Vec::new();
        let (mut in_fills, mut in_cell_xfs) = (false, false);
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) => match e.name().as_ref() {
                    b"fills" => in_fills = true,
                    b"cellXfs" => in_cell_xfs = true,
                    b"fill" if in_fills => fills.push(None),
                    b"fgColor" if in_fills => {
                        if let Some(last) = fills.last_mut() {
                            *last = attr(&e, b"rgb");
                        }
                    }
                    b"xf" if in_cell_xfs => {
                        xf_fill_ids.push(attr(&e, b"fillId").map(|s| s.parse().unwrap()).unwrap_or(0));
                    }
                    _ => {}
                },
                Event::End(e) => match e.name().as_ref() {
                    b"fills" => in_fills = false,
                    b"cellXfs" => in_cell_xfs = false,
                    _ => {}
                },
                Event::Eof => break,
                _ => {}
            }
        }
        xf_fill_ids.into_iter().map(|id| fills.get(id).cloned().flatten()).collect()
    }

    #[test]
    fn summary_fill_is_written() {
        let bytes = write_report(&sample_report(), 0xD3D3D3).unwrap();
        let cells = cell_styles(&zip_text(&bytes, "xl/worksheets/sheet1.xml"));
        let fills = style_fills(&zip_text(&bytes, "xl/styles.xml"));
        let fill_of = |cell: &str| fills[cells[cell]].clone();

        // Daily total on sheet row 5: every cell is filled, blanks included.
        for cell in ["A5", "B5", "C5"] {
            assert_eq!(fill_of(cell).as_deref(), Some("FFD3D3D3"), "{cell}");
        }
        // Detail row 2 and the header carry no fill.
        for cell in ["A1", "A2", "B2", "C2"] {
            assert_ne!(fill_of(cell).as_deref(), Some("FFD3D3D3"), "{cell}");
        }
        // Gap rows are not written at all.
        assert!(!cells.contains_key("A3") && !cells.contains_key("A4"));
    }

    /// Rewrite a workbook so that it declares the 1904 date system.
    fn with_1904_dates(bytes: &[u8]) -> Vec<u8> {
        let mut source = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut out = zip::ZipWriter::new(Cursor::new(Vec::new()));
        for i in 0..source.len() {
            let mut entry = source.by_index(i).unwrap();
            let name = entry.name().to_string();
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            if name == "xl/workbook.xml" {
                let xml = String::from_utf8(content).unwrap();
                let xml = if xml.contains("<workbookPr") {
                    xml.replacen("<workbookPr", "<workbookPr date1904=\"1\"", 1)
                } else {
                    xml.replacen("<bookViews", "<workbookPr date1904=\"1\"/><bookViews", 1)
                };
                assert!(xml.contains("date1904"), "unexpected workbook.xml: {xml}");
                content = xml.into_bytes();
            }
            out.start_file(name, zip::write::SimpleFileOptions::default()).unwrap();
            out.write_all(&content).unwrap();
        }
        out.finish().unwrap().into_inner()
    }

    #[test]
    fn dates_in_1904_workbooks_are_shifted() {
        let input = sample_input();
        assert!(!uses_1904_dates(&input));
        assert!(!uses_1904_dates(b"not a zip"));

        let shifted = with_1904_dates(&input);
        assert!(uses_1904_dates(&shifted));

        // The same stored serial means a date 1462 days later in the 1904 system.
        let table = read_table(&shifted).unwrap();
        let expected = NaiveDate::from_ymd_opt(2028, 1, 16).unwrap().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(table.cell(1, 0), &Cell::DateTime(expected));

        let table = read_table(&input).unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(10, 30, 0).unwrap();
        assert_eq!(table.cell(1, 0), &Cell::DateTime(expected));
    }

    #[test]
    fn serial_epoch_offset() {
        assert_eq!(serial_1900(45306.5, false), 45306.5);
        // Day 0 of the 1904 system is 1904-01-01.
        let first = from_excel_serial(serial_1900(0.0, true)).unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(1904, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap());
    }

    #[test]
    fn sheet_name_comes_from_table() {
        let bytes = write_report(&sample_report(), 0xD3D3D3).unwrap();
        let workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec!["УСН".to_string()]);
    }
}
