//! Command-line interface for mx
//! Expands macros in a file (or stdin) and writes the result to stdout.
//!
//! Usage:
//!   mx [OPTIONS] [FILE]
//!   mx -I include/ -I shared/ page.mx > page.txt

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use mx::expansion::Diagnostic;
use mx::settings::{ConfigError, EngineConfig, Loader};
use mx::stream::{ReaderSource, WriterSink};
use mx::Engine;
use std::fs::File;
use std::io;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const FAILURE: u8 = 2;

fn cli() -> Command {
    Command::new("mx")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Processes and expands macros in FILE and writes the result to stdout.\nIf no FILE is given, it reads from stdin.")
        .arg(
            Arg::new("path")
                .help("Input file")
                .index(1)
                .value_hint(ValueHint::FilePath),
        )
        .arg(
            Arg::new("include")
                .long("include")
                .short('I')
                .value_name("DIR")
                .help("Adds a directory to the list of include paths (searched in order)")
                .action(ArgAction::Append)
                .value_hint(ValueHint::DirPath),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .value_name("FILE")
                .help("TOML configuration file layered over the built-in defaults")
                .value_hint(ValueHint::FilePath),
        )
        .arg(char_arg("escape", "Escape character (default: \\)"))
        .arg(char_arg("quote", "Quote character (default: `)"))
        .arg(char_arg("group-open", "Group opening character (default: {)"))
        .arg(char_arg("group-close", "Group closing character (default: })"))
        .arg(
            Arg::new("max-depth")
                .long("max-depth")
                .value_name("N")
                .help("Maximum nesting of macro and include expansion")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("macro-buffer")
                .long("macro-buffer")
                .value_name("CHARS")
                .help("Capacity of the macro body buffer")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("expansion-buffer")
                .long("expansion-buffer")
                .value_name("CHARS")
                .help("Capacity of the expansion buffer")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("diagnostics")
                .long("diagnostics")
                .value_name("FORMAT")
                .help("Format of the diagnostics report written to stderr")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
}

fn char_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name).long(name).value_name("CHAR").help(help)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("MX_LOG").unwrap_or_else(|_| EnvFilter::new("off")),
        )
        .with_writer(io::stderr)
        .init();

    let matches = cli().get_matches();

    let config = match load_config(&matches) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            eprintln!("! {}", e);
            return ExitCode::from(FAILURE);
        }
    };

    let format = matches
        .get_one::<String>("diagnostics")
        .map(String::as_str)
        .unwrap_or("text");
    let path = matches.get_one::<String>("path");

    match run(config, path.map(String::as_str), format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "expansion failed");
            eprintln!("! {}", e);
            ExitCode::from(FAILURE)
        }
    }
}

/// Layer the config file and command-line flags over the defaults.
fn load_config(matches: &ArgMatches) -> Result<EngineConfig, ConfigError> {
    let mut loader = Loader::new();
    if let Some(file) = matches.get_one::<String>("config") {
        loader = loader.with_file(file);
    }

    for (flag, key) in [
        ("escape", "characters.escape"),
        ("quote", "characters.quote"),
        ("group-open", "characters.group_open"),
        ("group-close", "characters.group_close"),
    ] {
        if let Some(value) = matches.get_one::<String>(flag) {
            loader = loader.set_override(key, value.as_str())?;
        }
    }

    for (flag, key) in [
        ("max-depth", "limits.max_depth"),
        ("macro-buffer", "limits.macro_buffer_capacity"),
        ("expansion-buffer", "limits.expansion_buffer_capacity"),
    ] {
        if let Some(value) = matches.get_one::<u32>(flag) {
            loader = loader.set_override(key, i64::from(*value))?;
        }
    }

    if let Some(dirs) = matches.get_many::<String>("include") {
        let dirs: Vec<String> = dirs.cloned().collect();
        loader = loader.set_override("include.paths", dirs)?;
    }

    loader.build()
}

fn run(config: EngineConfig, path: Option<&str>, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = Engine::new(config)?;
    let stdout = io::stdout();
    let sink = WriterSink::new(stdout.lock());

    let result = match path {
        Some(path) => {
            let file = File::open(path).map_err(|e| format!("{}: {}", path, e))?;
            engine.execute_named(path, ReaderSource::new(file), sink)
        }
        None => engine.execute_named("<stdin>", ReaderSource::new(io::stdin().lock()), sink),
    };

    report(&engine.take_diagnostics(), format)?;
    result.map_err(Into::into)
}

fn report(diagnostics: &[Diagnostic], format: &str) -> Result<(), serde_json::Error> {
    if format == "json" {
        eprintln!("{}", serde_json::to_string_pretty(diagnostics)?);
        return Ok(());
    }
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic);
    }
    Ok(())
}
