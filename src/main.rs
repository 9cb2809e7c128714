//! Purpose: `rowline` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs commands, emits one JSON array per row on stdout.
//! Invariants: stdout carries only row payloads; logs, notices and errors go to stderr.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code` of the root cause.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, IsTerminal, Read, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind};
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use rowline::api::{
    BufLineSource, ColumnCount, ColumnSerializer, DEFAULT_DATE_FORMAT, DEFAULT_TIMESTAMP_FORMAT,
    DecimalFormat, Error, ErrorKind, ForbiddenText, JsonTable, LineValidatorAggregator,
    MaxLength, NotBlank, QuotedFieldTokenizer, ReaderConfig, RowIterator, RowReader,
    RowValidatorAggregator, SerializerConfig, column_names, to_exit_code,
};
use rowline::notice::{Notice, notice_json};

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(code) => code,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.root_cause().kind())
        }
    };
    std::process::exit(exit_code);
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn run() -> Result<i32, Error> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    Error::new(ErrorKind::Io)
                        .with_message("failed to write help")
                        .with_source(io_err)
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(exit_code);
            }
            _ => {
                return Err(Error::new(ErrorKind::Usage)
                    .with_message(clap_error_summary(&err))
                    .with_hint(clap_error_hint(&err)));
            }
        },
    };

    let result = match cli.command {
        Command::Read(args) => run_read(args),
        Command::Export(args) => run_export(args),
    };
    result.map_err(add_io_hint).map_err(add_internal_hint)
}

#[derive(Parser)]
#[command(
    name = "rowline",
    version,
    about = "Validate delimited rows and render typed rows as text",
    long_about = None,
    after_help = r#"EXAMPLES
  $ rowline read data.csv --skip-lines 1 --columns 3
  $ rowline read - --reject-blank --multiline-limit 4 -e skip < data.csv
  $ rowline export table.json --header --null NULL --date-format yyyy-MM-dd

OUTPUT
  One JSON array of strings per row on stdout. Errors are JSON on stderr.
  Set RUST_LOG=debug for reader diagnostics."#,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a delimited file and print one JSON array per row.
    Read(ReadArgs),
    /// Render a JSON table document through the column serializer.
    Export(ExportArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ErrorPolicy {
    /// Stop at the first rejected record.
    Stop,
    /// Report rejected records as notices and keep reading.
    Skip,
}

#[derive(Args)]
struct ReadArgs {
    #[arg(help = "Input file, or - for stdin", value_hint = ValueHint::FilePath)]
    input: PathBuf,
    #[arg(long, default_value_t = 0, help = "Discard this many leading lines")]
    skip_lines: usize,
    #[arg(
        long,
        default_value_t = 0,
        allow_negative_numbers = true,
        help = "Maximum physical lines per record (0 or less: unlimited)"
    )]
    multiline_limit: i64,
    #[arg(long, help = "Keep a trailing carriage return on each line")]
    keep_cr: bool,
    #[arg(long, default_value_t = QuotedFieldTokenizer::DEFAULT_SEPARATOR)]
    separator: char,
    #[arg(long, default_value_t = QuotedFieldTokenizer::DEFAULT_QUOTE)]
    quote: char,
    #[arg(long, help = "Reject blank lines")]
    reject_blank: bool,
    #[arg(long, value_name = "CHARS", help = "Reject lines longer than CHARS characters")]
    max_line_length: Option<usize>,
    #[arg(long = "forbid", value_name = "TEXT", help = "Reject lines containing TEXT")]
    forbid: Vec<String>,
    #[arg(long, value_name = "N", help = "Reject rows that do not have exactly N fields")]
    columns: Option<usize>,
    #[arg(short = 'e', long, value_enum, default_value = "stop")]
    errors: ErrorPolicy,
}

#[derive(Args)]
struct ExportArgs {
    #[arg(help = "JSON table document, or - for stdin", value_hint = ValueHint::FilePath)]
    input: PathBuf,
    #[arg(long, default_value = DEFAULT_DATE_FORMAT)]
    date_format: String,
    #[arg(long, default_value = DEFAULT_TIMESTAMP_FORMAT)]
    timestamp_format: String,
    #[arg(long = "null", value_name = "TEXT", default_value = "", help = "Text for null values")]
    null_default: String,
    #[arg(long, help = "Trim surrounding whitespace from text columns")]
    trim: bool,
    #[arg(long, help = "Print the column labels first")]
    header: bool,
    #[arg(long, help = "Group integer digits in thousands")]
    grouping: bool,
    #[arg(
        long,
        value_name = "DIGITS",
        help = "Render floating and decimal columns with exactly DIGITS fraction digits"
    )]
    fraction_digits: Option<usize>,
}

fn run_read(args: ReadArgs) -> Result<i32, Error> {
    let tokenizer = QuotedFieldTokenizer::new(args.separator, args.quote)?;
    let label = input_label(&args.input);
    let input = open_input(&args.input)?;

    let config = ReaderConfig::new()
        .with_skip_lines(args.skip_lines)
        .with_multiline_limit(args.multiline_limit)
        .with_keep_cr(args.keep_cr);

    let mut line_validators = LineValidatorAggregator::new();
    if args.reject_blank {
        line_validators.add_validator(NotBlank);
    }
    if let Some(max) = args.max_line_length {
        line_validators.add_validator(MaxLength(max));
    }
    for text in args.forbid {
        line_validators.add_validator(ForbiddenText(text));
    }
    let mut row_validators = RowValidatorAggregator::new();
    if let Some(columns) = args.columns {
        row_validators.add_validator(ColumnCount(columns));
    }
    debug!(
        input = %label,
        line_validators = line_validators.len(),
        row_validators = row_validators.len(),
        "reading rows"
    );

    let mut reader = RowReader::new(
        BufLineSource::new(BufReader::new(input)),
        tokenizer,
        config,
    )
    .with_line_validators(line_validators)
    .with_row_validators(row_validators);

    let mut out = BufWriter::new(io::stdout().lock());
    match args.errors {
        ErrorPolicy::Stop => {
            for row in RowIterator::new(reader)? {
                write_row(&mut out, &row?)?;
            }
        }
        ErrorPolicy::Skip => {
            let mut skipped = 0u64;
            loop {
                match reader.read_next() {
                    Ok(Some(row)) => write_row(&mut out, &row)?,
                    Ok(None) => break,
                    Err(err) if is_record_local(&err) => {
                        skipped += 1;
                        emit_notice(&Notice::record_skip(&err, &label));
                    }
                    Err(err) => return Err(err),
                }
            }
            if skipped > 0 {
                emit_notice(&Notice::read_summary(reader.records_read(), skipped, &label));
            }
        }
    }
    flush(&mut out)?;
    Ok(0)
}

fn run_export(args: ExportArgs) -> Result<i32, Error> {
    let input = open_input(&args.input)?;
    let table = JsonTable::from_reader(BufReader::new(input))?;

    let mut config = SerializerConfig::new()
        .with_date_format(args.date_format)
        .with_timestamp_format(args.timestamp_format)
        .with_null_default(args.null_default);
    if args.grouping {
        config = config.with_integer_format(DecimalFormat::integer().with_grouping(true));
    }
    if let Some(digits) = args.fraction_digits {
        config = config
            .with_float_format(DecimalFormat::new(digits, digits).with_grouping(args.grouping));
    }
    let serializer = ColumnSerializer::new(config)?;
    debug!(rows = table.len(), columns = table.metadata().column_count(), "exporting table");

    let mut out = BufWriter::new(io::stdout().lock());
    if args.header {
        write_row(&mut out, &column_names(table.metadata()))?;
    }
    for (idx, mut row) in table.rows().enumerate() {
        let values = serializer
            .column_values_trimmed(&mut row, args.trim)
            .map_err(|err| match err.row() {
                Some(_) => err,
                None => err.with_row(idx as u64 + 1),
            })?;
        write_row(&mut out, &values)?;
    }
    flush(&mut out)?;
    Ok(0)
}

fn is_record_local(err: &Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::Validation | ErrorKind::MultilineLimit | ErrorKind::Parse
    )
}

fn input_label(path: &Path) -> String {
    if path.as_os_str() == "-" {
        "stdin".to_string()
    } else {
        path.display().to_string()
    }
}

fn open_input(path: &Path) -> Result<Box<dyn Read>, Error> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(path).map_err(|err| {
        let kind = match err.kind() {
            io::ErrorKind::NotFound => ErrorKind::Usage,
            _ => ErrorKind::Io,
        };
        Error::new(kind)
            .with_message(format!("failed to open input {}", path.display()))
            .with_hint("Check the input path, or pass - to read stdin.")
            .with_source(err)
    })?;
    Ok(Box::new(file))
}

fn write_row<W: Write>(out: &mut W, row: &[String]) -> Result<(), Error> {
    serde_json::to_writer(&mut *out, row).map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write row")
            .with_source(err)
    })?;
    out.write_all(b"\n").map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to write row")
            .with_source(err)
    })
}

fn flush<W: Write>(out: &mut W) -> Result<(), Error> {
    out.flush().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to flush output")
            .with_source(err)
    })
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path, permissions, and that the input is readable.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_LOG=debug and share the input if it persists.",
    )
}

/// Field labels of the human-readable stderr form.
#[derive(Copy, Clone, Debug)]
enum Label {
    Error,
    Hint,
    Row,
    Line,
    CausedBy,
    Notice,
}

impl Label {
    fn text(self) -> &'static str {
        match self {
            Label::Error => "error:",
            Label::Hint => "hint:",
            Label::Row => "row:",
            Label::Line => "line:",
            Label::CausedBy => "caused by:",
            Label::Notice => "notice:",
        }
    }

    /// Red for the failure itself, yellow for everything describing it.
    fn paint(self, use_color: bool) -> String {
        if !use_color {
            return self.text().to_string();
        }
        let code = match self {
            Label::Error => "31",
            _ => "33",
        };
        format!("\u{1b}[{code}m{}\u{1b}[0m", self.text())
    }
}

fn emit_notice(notice: &Notice) {
    if io::stderr().is_terminal() {
        eprintln!(
            "{} {} (input: {})",
            Label::Notice.paint(true),
            notice.message,
            notice.input
        );
        return;
    }
    eprintln!("{}", notice_json(notice));
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err, true));
        return;
    }
    eprintln!("{}", error_json(err));
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    let fallback = match err.kind() {
        ErrorKind::Internal => "internal error",
        ErrorKind::Usage => "usage error",
        ErrorKind::Validation => "validation failed",
        ErrorKind::MultilineLimit => "multiline limit exceeded",
        ErrorKind::Parse => "parse error",
        ErrorKind::Exhausted => "no more rows",
        ErrorKind::Io => "i/o error",
        ErrorKind::DataAccess => "data access error",
    };
    fallback.to_string()
}

/// Messages of the wrapped errors, outermost first.
fn error_causes(err: &Error) -> Vec<String> {
    std::iter::successors(err.source(), |&cause| cause.source())
        .map(ToString::to_string)
        .collect()
}

/// Row and line come from the outer error when set, else from the root cause, so an
/// iterator `Exhausted` wrapper still names the record that ended the read.
fn error_json(err: &Error) -> Value {
    let root = err.root_cause();
    let mut inner = json!({
        "kind": format!("{:?}", root.kind()),
        "message": error_message(err),
    });
    let optional = [
        ("hint", err.hint().or(root.hint()).map(Value::from)),
        ("row", err.row().or(root.row()).map(Value::from)),
        ("line", err.line().or(root.line()).map(Value::from)),
        ("context", err.context().or(root.context()).map(Value::from)),
    ];
    for (key, value) in optional {
        if let Some(value) = value {
            inner[key] = value;
        }
    }
    if !root.related().is_empty() {
        let related: Vec<String> = root.related().iter().map(error_message).collect();
        inner["related"] = json!(related);
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner["causes"] = json!(causes);
    }
    json!({ "error": inner })
}

fn error_text(err: &Error, use_color: bool) -> String {
    let root = err.root_cause();
    let mut lines = vec![format!("{} {}", Label::Error.paint(use_color), error_message(err))];
    let mut field = |label: Label, value: Option<String>| {
        if let Some(value) = value {
            lines.push(format!("{} {value}", label.paint(use_color)));
        }
    };
    field(Label::Hint, err.hint().or(root.hint()).map(str::to_string));
    field(Label::Row, err.row().or(root.row()).map(|row| row.to_string()));
    field(Label::Line, err.line().or(root.line()).map(str::to_string));
    field(Label::CausedBy, error_causes(err).into_iter().next());
    lines.join("\n")
}

/// First non-empty line of clap's rendering, without its `error:` prefix.
fn clap_error_summary(err: &clap::Error) -> String {
    let rendered = err.to_string();
    rendered
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| line.strip_prefix("error:").unwrap_or(line).trim().to_string())
        .unwrap_or_else(|| "invalid arguments".to_string())
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);
    let subcommand = usage.and_then(|usage| {
        let mut tokens = usage.split_whitespace();
        tokens.find(|token| *token == "rowline")?;
        tokens
            .next()
            .filter(|token| !token.starts_with(['-', '<', '[']))
    });
    match subcommand {
        Some(subcommand) => format!("Try `rowline {subcommand} --help`."),
        None => "Try `rowline --help`.".to_string(),
    }
}
