//! Request-level conversion: validate the upload, run the engine, package the
//! outputs and deliver one zip archive.
//!
//! Every request gets its own [`WorkContext`]; it is removed on every exit
//! path, successful or not. Validation faults short-circuit before anything
//! is created on disk.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use ofdconv_io::bill::{self, BillError};
use ofdconv_io::{package, xlsx, ArchiveEntry, IoError, WorkContext};
use ofdconv_report::classify::classify;
use ofdconv_report::{run, Flavor, ReportError};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

/// Accepted spreadsheet extensions, lowercase.
pub const REPORT_EXTENSIONS: &[&str] = &["xlsx", "xls"];
pub const BILL_EXTENSIONS: &[&str] = &["xml"];

const SCRATCH_ARCHIVE: &str = "results.zip";

#[derive(Debug, Error)]
pub enum ConvertError {
    /// Wrong extension, missing or empty upload.
    #[error("{0}")]
    InvalidInput(String),

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Bill(#[from] BillError),

    #[error(transparent)]
    Io(#[from] IoError),

    /// Every row was filtered out; there is nothing to deliver.
    #[error("no report files were produced: no rows matched a known tax regime or category")]
    NoOutput,
}

impl ConvertError {
    /// HTTP-style status: 400 for faults in the upload, 500 for our own.
    pub fn status(&self) -> u16 {
        match self {
            ConvertError::Bill(BillError::Write { .. }) => 500,
            ConvertError::InvalidInput(_)
            | ConvertError::Read { .. }
            | ConvertError::Report(_)
            | ConvertError::Bill(_) => 400,
            ConvertError::Io(IoError::Workbook(_) | IoError::EmptyWorkbook(_)) => 400,
            ConvertError::Io(_) | ConvertError::NoOutput => 500,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConvertError::InvalidInput(_) | ConvertError::Read { .. } => "invalid_input",
            ConvertError::Report(ReportError::MissingColumns { .. }) => "missing_columns",
            ConvertError::Report(_) => "invalid_value",
            ConvertError::Bill(BillError::Encoding { .. }) => "encoding",
            ConvertError::Bill(BillError::Parse(_)) => "parse",
            ConvertError::Bill(BillError::Write { .. }) => "pipeline",
            ConvertError::Io(IoError::Workbook(_) | IoError::EmptyWorkbook(_)) => "invalid_input",
            ConvertError::Io(_) | ConvertError::NoOutput => "pipeline",
        }
    }

    /// Structured error body, `{"status", "error", "kind"}`.
    pub fn body(&self) -> serde_json::Value {
        json!({
            "status": self.status(),
            "error": self.to_string(),
            "kind": self.kind(),
        })
    }
}

/// Where outputs go and how they look.
#[derive(Debug, Clone)]
pub struct Options {
    /// Summary row fill, 0xRRGGBB.
    pub highlight: u32,
    /// Parent of per-request scratch areas.
    pub scratch_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Self { highlight: ofdconv_io::DEFAULT_HIGHLIGHT, scratch_dir: None }
    }
}

/// Successful conversion, as reported to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct Conversion {
    pub status: u16,
    pub archive: PathBuf,
    pub entries: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flavor: Option<Flavor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded_rows: Option<usize>,
}

/// `results_<YYYYmmdd_HHMMSS>.zip`
pub fn default_archive_name() -> String {
    format!("results_{}.zip", Local::now().format("%Y%m%d_%H%M%S"))
}

/// Spreadsheet export → per-partition report workbooks in one zip at `dest`.
pub fn convert_report(
    input: &Path,
    requested: Flavor,
    dest: &Path,
    opts: &Options,
) -> Result<Conversion, ConvertError> {
    let (name, bytes) = read_upload(input, REPORT_EXTENSIONS)?;
    with_scratch(opts, |ctx| {
        ctx.stage(&name, &bytes)?;

        let table = xlsx::read_table(&bytes)?;
        let stem = file_stem(&name);
        let result = run(&table, requested, &stem)?;
        if result.tables.is_empty() {
            return Err(ConvertError::NoOutput);
        }

        let mut entries = Vec::with_capacity(result.tables.len());
        for table in &result.tables {
            let workbook = xlsx::write_report(table, opts.highlight)?;
            log::info!("{}: {} rows", table.name, table.detail_count());
            entries.push(ArchiveEntry::new(table.name.clone(), workbook));
        }

        let archive = deliver(ctx, &entries, dest)?;
        Ok(Conversion {
            status: 200,
            archive,
            entries: entries.into_iter().map(|e| e.name).collect(),
            flavor: Some(result.flavor),
            excluded_rows: Some(result.summary.excluded_rows),
        })
    })
}

/// E-invoice XML → exchange container zip at `dest`.
pub fn convert_bill(input: &Path, dest: &Path, opts: &Options) -> Result<Conversion, ConvertError> {
    let (name, bytes) = read_upload(input, BILL_EXTENSIONS)?;
    with_scratch(opts, |ctx| {
        ctx.stage(&name, &bytes)?;

        let output = bill::convert_bill(&name, &bytes)?;
        let archive = deliver(ctx, &output.entries, dest)?;
        Ok(Conversion {
            status: 200,
            archive,
            entries: output.entries.into_iter().map(|e| e.name).collect(),
            flavor: None,
            excluded_rows: None,
        })
    })
}

/// Which flavor a spreadsheet resolves to, and how many data rows it has.
pub fn classify_file(input: &Path, requested: Flavor) -> Result<(Flavor, usize), ConvertError> {
    let (_, bytes) = read_upload(input, REPORT_EXTENSIONS)?;
    let table = xlsx::read_table(&bytes)?;
    let flavor = classify(&table.column_names(), requested)?;
    Ok((flavor, table.len()))
}

/// Check the extension and read the whole file. No side effects.
fn read_upload(input: &Path, allowed: &[&str]) -> Result<(String, Vec<u8>), ConvertError> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| ConvertError::InvalidInput(format!("{} is not a file", input.display())))?;

    let ext = input
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if !allowed.contains(&ext.as_str()) {
        return Err(ConvertError::InvalidInput(format!(
            "{name}: unsupported file type (expected .{})",
            allowed.join(", .")
        )));
    }

    let bytes = fs::read(input).map_err(|source| ConvertError::Read {
        path: input.to_path_buf(),
        source,
    })?;
    if bytes.is_empty() {
        return Err(ConvertError::InvalidInput(format!("{name} is empty")));
    }
    log::debug!("read {} bytes from {}", bytes.len(), input.display());
    Ok((name, bytes))
}

fn file_stem(name: &str) -> String {
    Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Run `body` inside a fresh scratch area and remove it afterwards.
fn with_scratch<F>(opts: &Options, body: F) -> Result<Conversion, ConvertError>
where
    F: FnOnce(&WorkContext) -> Result<Conversion, ConvertError>,
{
    let ctx = WorkContext::create(opts.scratch_dir.as_deref())?;
    let outcome = body(&ctx);
    if let Err(e) = &outcome {
        log::error!("conversion failed ({}): {}", e.kind(), e);
    }
    ctx.close();
    outcome
}

/// Package entries, stage the archive, then copy it to `dest`.
fn deliver(ctx: &WorkContext, entries: &[ArchiveEntry], dest: &Path) -> Result<PathBuf, ConvertError> {
    let archive = package(entries)?;
    let staged = ctx.stage(SCRATCH_ARCHIVE, &archive)?;
    let size = ctx.deliver(&staged, dest)?;
    log::info!("archive {} ({} entries, {} bytes)", dest.display(), entries.len(), size);
    Ok(dest.to_path_buf())
}
