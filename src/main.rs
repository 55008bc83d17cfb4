//! Purpose: `csvtojl` CLI entry point.
//! Role: Binary crate root; parses args, runs one conversion, reports failures.
//! Invariants: Argument errors are reported before any file is opened.
//! Invariants: Success writes nothing to stdout or stderr at the default log level.
//! Invariants: Errors go to stderr (human text on a TTY, JSON otherwise).
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{Parser, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Map, Value, json};
use std::error::Error as StdError;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use csvtojl::api::{
    ConvertOptions, Error, ErrorKind, Escaping, Profiler, WriteOptions, convert_file,
    to_exit_code,
};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

fn main() {
    let exit_code = match run(std::env::args_os()) {
        Ok(outcome) => outcome.exit_code,
        Err((err, color_mode)) => {
            emit_error(&err, color_mode);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

#[derive(Parser, Debug)]
#[command(
    name = "csvtojl",
    version,
    about = "Convert CSV to JSON Lines",
    long_about = None,
    after_help = r#"EXAMPLES
  $ csvtojl people.csv people.jsonl
  $ csvtojl --raw people.csv people.jsonl
  $ csvtojl --profile profile.json people.csv people.jsonl

Each data row becomes one JSON object per line, keys in header order,
values as strings. Set RUST_LOG=debug for progress logs on stderr."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(help = "Input CSV file (first row is the header)", value_hint = ValueHint::FilePath)]
    input: PathBuf,
    #[arg(help = "Output JSON Lines file (created or truncated)", value_hint = ValueHint::FilePath)]
    output: PathBuf,
    #[arg(
        long,
        help = "Copy field text verbatim between quotes without JSON escaping"
    )]
    raw: bool,
    #[arg(
        long,
        value_name = "PATH",
        help = "Write a JSON timing report to PATH when the run ends",
        value_hint = ValueHint::FilePath
    )]
    profile: Option<PathBuf>,
    #[arg(
        long,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never"
    )]
    color: ColorMode,
}

impl Cli {
    fn convert_options(&self) -> ConvertOptions {
        let escaping = if self.raw {
            Escaping::Raw
        } else {
            Escaping::Json
        };
        ConvertOptions {
            write: WriteOptions { escaping },
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

fn run<I>(args: I) -> Result<RunOutcome, (Error, ColorMode)>
where
    I: IntoIterator<Item = OsString>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        ColorMode::Auto,
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    to_exit_code(ErrorKind::Usage)
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(clap_error_summary(&err))
                        .with_hint("Usage: csvtojl <INPUT> <OUTPUT>. Try `csvtojl --help`."),
                    ColorMode::Auto,
                ));
            }
        },
    };

    init_tracing();
    let color_mode = cli.color;
    let options = cli.convert_options();

    let profiler = cli.profile.as_deref().map(Profiler::start);
    let result = convert_file(&cli.input, &cli.output, options);
    let profiled = match profiler {
        Some(profiler) => profiler.finish(&result).map(|_| ()),
        None => Ok(()),
    };

    let outcome = result
        .map_err(add_hint)
        .map_err(|err| (err, color_mode))?;
    profiled.map_err(|err| (add_hint(err), color_mode))?;
    debug!(
        records = outcome.records,
        columns = outcome.columns,
        bytes = outcome.bytes_written,
        "conversion finished"
    );
    Ok(RunOutcome::ok())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn add_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    match err.kind() {
        ErrorKind::NotFound => err.with_hint("Check that the path exists and the directory is present."),
        ErrorKind::Permission => err.with_hint("Permission denied. Check file and directory permissions."),
        ErrorKind::Io => err.with_hint("I/O error. Check the path, filesystem, and disk space."),
        ErrorKind::Parse => err.with_hint("Input must be comma-delimited UTF-8 CSV with balanced quotes."),
        ErrorKind::Shape => err.with_hint("Every data row needs at least as many fields as the header."),
        ErrorKind::Internal => err.with_hint(
            "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share the input if it persists.",
        ),
        ErrorKind::Usage | ErrorKind::Empty => err,
    }
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("{}", error_text(err, color_mode.use_color(is_tty)));
        return;
    }

    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
        ErrorKind::Parse => "malformed csv".to_string(),
        ErrorKind::Empty => "empty input".to_string(),
        ErrorKind::Shape => "row shorter than header".to_string(),
    }
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut cur = err.source();
    while let Some(source) = cur {
        causes.push(source.to_string());
        cur = source.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some(line) = err.line() {
        inner.insert("line".to_string(), json!(line));
    }
    if let Some(record) = err.record() {
        inner.insert("record".to_string(), json!(record));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some(line) = err.line() {
        lines.push(format!(
            "{} {line}",
            colorize_label("line:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(record) = err.record() {
        lines.push(format!(
            "{} {record}",
            colorize_label("record:", use_color, AnsiColor::Yellow)
        ));
    }

    let causes = error_causes(err);
    if let Some(cause) = causes.first() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}
