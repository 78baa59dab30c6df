// ofdconv - OFD export and e-invoice conversion from the command line

mod exit_codes;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use ofdconv_cli::{classify_file, convert_bill, convert_report, default_archive_name, Conversion, ConvertError, Options};
use ofdconv_config::{ConfigError, Settings};
use ofdconv_report::Flavor;

use exit_codes::{status_exit_code, EXIT_ERROR, EXIT_SUCCESS};

#[derive(Parser)]
#[command(name = "ofdconv")]
#[command(about = "Convert OFD cash-register exports and e-invoices into ready-to-file archives")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Settings file (default: <config dir>/ofdconv/config.toml)
    #[arg(long, global = true, env = "OFDCONV_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split an OFD export into per-regime (or per-category) report workbooks
    #[command(after_help = "\
Examples:
  ofdconv report january.xlsx
  ofdconv report items.xlsx --flavor nomenclature -o items.zip
  ofdconv report taxcom.xlsx --json")]
    Report {
        /// OFD export (.xlsx or .xls)
        input: PathBuf,

        /// Export layout to try first (falls back to whichever layout fits)
        #[arg(long, short = 'f')]
        flavor: Option<FlavorArg>,

        /// Output archive (default: results_<timestamp>.zip)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Repackage an e-invoice XML into an exchange container
    #[command(after_help = "\
Examples:
  ofdconv bill ON_NSCHFDOPPR_1.xml
  ofdconv bill invoice.xml -o container.zip --json")]
    Bill {
        /// Source e-invoice (.xml)
        input: PathBuf,

        /// Output archive (default: results_<timestamp>.zip)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Print the result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Show which export layout a spreadsheet resolves to
    Classify {
        /// OFD export (.xlsx or .xls)
        input: PathBuf,

        /// Export layout to try first
        #[arg(long, short = 'f')]
        flavor: Option<FlavorArg>,

        /// Print the result as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Inspect settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the settings file location
    Path,
    /// Print the effective settings as TOML
    Show,
}

#[derive(Clone, Copy, ValueEnum)]
enum FlavorArg {
    Checks,
    Nomenclature,
    Taxcom,
}

impl From<FlavorArg> for Flavor {
    fn from(arg: FlavorArg) -> Self {
        match arg {
            FlavorArg::Checks => Flavor::Checks,
            FlavorArg::Nomenclature => Flavor::Nomenclature,
            FlavorArg::Taxcom => Flavor::Taxcom,
        }
    }
}

fn long_version() -> &'static str {
    concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_COMMIT_HASH"), ")")
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = match cli.command {
        Commands::Config(ConfigCommands::Path) => cmd_config_path(cli.config),
        Commands::Config(ConfigCommands::Show) => cmd_config_show(cli.config),
        Commands::Report { input, flavor, output, json } => {
            load_settings(cli.config).and_then(|s| cmd_report(&s, input, flavor, output, json))
        }
        Commands::Bill { input, output, json } => {
            load_settings(cli.config).and_then(|s| cmd_bill(&s, input, output, json))
        }
        Commands::Classify { input, flavor, json } => {
            load_settings(cli.config).and_then(|s| cmd_classify(&s, input, flavor, json))
        }
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// Log records go to stderr; `RUST_LOG` overrides the default `info`.
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn config(err: ConfigError) -> Self {
        Self {
            code: EXIT_ERROR,
            message: err.to_string(),
            hint: Some(format!("fix or remove {}", Settings::config_path_display())),
        }
    }

    /// Conversion failure; in JSON mode the body already went to stdout.
    pub fn convert(err: &ConvertError, json: bool) -> Self {
        let hint = match err {
            ConvertError::Report(ofdconv_report::ReportError::MissingColumns { .. }) => {
                Some("check that the first row of the first sheet holds the column names".to_string())
            }
            ConvertError::NoOutput => Some("run `ofdconv classify` to see which layout was detected".to_string()),
            _ => None,
        };
        Self {
            code: status_exit_code(err.status()),
            message: if json { String::new() } else { err.to_string() },
            hint: if json { None } else { hint },
        }
    }
}

// ============================================================================
// settings
// ============================================================================

fn settings_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(Settings::config_path)
}

fn load_settings(explicit: Option<PathBuf>) -> Result<Settings, CliError> {
    Settings::load_from(&settings_path(explicit)).map_err(CliError::config)
}

fn options(settings: &Settings) -> Result<Options, CliError> {
    Ok(Options {
        highlight: settings.highlight().map_err(CliError::config)?,
        scratch_dir: settings.scratch_dir.clone(),
    })
}

fn archive_path(settings: &Settings, output: Option<PathBuf>) -> PathBuf {
    output.unwrap_or_else(|| {
        let name = default_archive_name();
        match &settings.output_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    })
}

fn cmd_config_path(explicit: Option<PathBuf>) -> Result<(), CliError> {
    println!("{}", settings_path(explicit).display());
    Ok(())
}

fn cmd_config_show(explicit: Option<PathBuf>) -> Result<(), CliError> {
    let settings = load_settings(explicit)?;
    let text = settings.to_toml().map_err(CliError::config)?;
    print!("{}", text);
    Ok(())
}

// ============================================================================
// report / bill / classify
// ============================================================================

fn cmd_report(
    settings: &Settings,
    input: PathBuf,
    flavor: Option<FlavorArg>,
    output: Option<PathBuf>,
    json: bool,
) -> Result<(), CliError> {
    let requested = flavor.map(Flavor::from).unwrap_or(settings.default_flavor);
    let dest = archive_path(settings, output);
    let outcome = convert_report(&input, requested, &dest, &options(settings)?);
    finish(outcome, json)
}

fn cmd_bill(settings: &Settings, input: PathBuf, output: Option<PathBuf>, json: bool) -> Result<(), CliError> {
    let dest = archive_path(settings, output);
    let outcome = convert_bill(&input, &dest, &options(settings)?);
    finish(outcome, json)
}

fn cmd_classify(settings: &Settings, input: PathBuf, flavor: Option<FlavorArg>, json: bool) -> Result<(), CliError> {
    let requested = flavor.map(Flavor::from).unwrap_or(settings.default_flavor);
    match classify_file(&input, requested) {
        Ok((resolved, rows)) => {
            if json {
                let body = serde_json::json!({
                    "status": 200,
                    "requested": requested,
                    "flavor": resolved,
                    "rows": rows,
                });
                println!("{}", body);
            } else {
                println!("{}: {} ({} rows)", display_name(&input), resolved, rows);
            }
            Ok(())
        }
        Err(e) => Err(fail(&e, json)),
    }
}

fn finish(outcome: Result<Conversion, ConvertError>, json: bool) -> Result<(), CliError> {
    let conversion = outcome.map_err(|e| fail(&e, json))?;

    if json {
        match serde_json::to_string(&conversion) {
            Ok(body) => println!("{}", body),
            Err(e) => {
                return Err(CliError { code: EXIT_ERROR, message: e.to_string(), hint: None });
            }
        }
        return Ok(());
    }

    println!("{}", conversion.archive.display());
    for entry in &conversion.entries {
        println!("  {}", entry);
    }
    if let Some(excluded) = conversion.excluded_rows.filter(|n| *n > 0) {
        eprintln!("note: {} rows matched no tax regime or category and were left out", excluded);
    }
    Ok(())
}

fn fail(err: &ConvertError, json: bool) -> CliError {
    if json {
        println!("{}", err.body());
    }
    CliError::convert(err, json)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
