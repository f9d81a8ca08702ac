//! Command-line interface for the XML formatter
//!
//! Usage:
//!   xmlfmt [PATHS]...                     - Print formatted files (stdin when no path or `-`)
//!   xmlfmt --check [PATHS]...             - Show a diff and exit 1 if anything would change
//!   xmlfmt --write [PATHS]...             - Rewrite files in place
//!   xmlfmt --lines START:END [PATHS]...   - Only format the given 1-based inclusive lines
//!
//! Settings come from the built-in defaults, then `./xmlfmt.toml` if it exists, then
//! `--config FILE`, then the indent flags.
//!
//! Exit status: 0 on success, 1 when `--check` finds unformatted input, 2 on errors.

mod format;

use std::io;
use std::process::ExitCode;

use clap::builder::RangedU64ValueParser;
use clap::{Arg, ArgAction, ArgMatches, Command};
use format::{CliError, Formatter, Input, LineSpan, Mode};
use tracing_subscriber::EnvFilter;
use xml_config::{ConfigError, Loader, XmlConfig};

const LOG_ENV: &str = "XMLFMT_LOG";
/// Picked up from the working directory when present, below `--config`.
const PROJECT_CONFIG: &str = "xmlfmt.toml";

fn main() -> ExitCode {
    let matches = Command::new("xmlfmt")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Re-indent XML documents")
        .arg(
            Arg::new("paths")
                .help("Files to format; `-` or nothing reads stdin")
                .num_args(0..)
                .index(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("TOML file layered over the defaults and ./xmlfmt.toml"),
        )
        .arg(
            Arg::new("indent-width")
                .long("indent-width")
                .value_name("N")
                .value_parser(RangedU64ValueParser::<usize>::new().range(1..))
                .help("Spaces per indent level (at least 1)"),
        )
        .arg(
            Arg::new("use-tabs")
                .long("use-tabs")
                .help("Indent with one tab per level")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Print a diff instead of the output and exit 1 if any input would change")
                .action(ArgAction::SetTrue)
                .conflicts_with("write"),
        )
        .arg(
            Arg::new("write")
                .long("write")
                .short('w')
                .help("Rewrite files in place")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("lines")
                .long("lines")
                .value_name("START:END")
                .help("Only format this 1-based inclusive line range"),
        )
        .get_matches();

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Configuration error: {err}");
            return ExitCode::from(2);
        }
    };
    init_tracing(&config.logging.level);

    match run(&matches, &config) {
        Ok(false) => ExitCode::SUCCESS,
        Ok(true) => ExitCode::from(1),
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::from(2)
        }
    }
}

fn load_config(matches: &ArgMatches) -> Result<XmlConfig, ConfigError> {
    let mut loader = Loader::new().with_optional_file(PROJECT_CONFIG);
    if let Some(path) = matches.get_one::<String>("config") {
        loader = loader.with_file(path);
    }
    if let Some(width) = matches.get_one::<usize>("indent-width") {
        loader = loader
            .set_override("indent.width", *width as i64)?
            .set_override("indent.use_spaces", true)?;
    }
    if matches.get_flag("use-tabs") {
        loader = loader.set_override("indent.use_spaces", false)?;
    }
    loader.build()
}

/// Format every input. Returns true when `--check` found something to change.
fn run(matches: &ArgMatches, config: &XmlConfig) -> Result<bool, CliError> {
    let mode = if matches.get_flag("check") {
        Mode::Check
    } else if matches.get_flag("write") {
        Mode::Write
    } else {
        Mode::Print
    };
    let lines = matches
        .get_one::<String>("lines")
        .map(|value| LineSpan::parse(value))
        .transpose()?;
    let formatter = Formatter {
        indent: config.indent_options(),
        settings: config.format_settings(),
        lines,
        mode,
    };

    let inputs: Vec<Input> = match matches.get_many::<String>("paths") {
        Some(paths) => paths.map(|path| Input::from_arg(path)).collect(),
        None => vec![Input::Stdin],
    };

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut changed = false;
    for input in &inputs {
        changed |= formatter.run(input, &mut out)?;
    }
    Ok(mode == Mode::Check && changed)
}

/// Diagnostics go to stderr so formatted output can be piped.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
