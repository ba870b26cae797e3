//! Declaration Schema CLI
//!
//! Command-line interface for resolving declaration documents, converting
//! types to external schemas, and validating values.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use decl_schema::{
    deserialize, lint, load_document, load_type_info, regex_alternatives, serialize,
    validate_json, FileStatus, Format, ResolveOptions, SchemaError, Severity, TypeInfo,
    ValidateError,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "decl-schema")]
#[command(about = "Resolve declaration documents, emit schemas and validate values")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Where a type comes from: a descriptor file, or a declaration in a document.
#[derive(Args)]
struct TypeSource {
    /// Type descriptor JSON, or a declaration document when --key is given
    source: PathBuf,

    /// Dotted key of the declaration to use from the document
    #[arg(long, short)]
    key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a declaration document and list its declarations
    Resolve {
        /// Declaration document (JSON)
        document: PathBuf,

        /// Fail on unresolved references instead of leaving placeholders
        #[arg(long)]
        strict: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Convert a type to JSON Schema, XML Schema or the source notation
    Convert {
        #[command(flatten)]
        source: TypeSource,

        /// Output format: json, xml or dsl
        #[arg(long, short, default_value = "json")]
        format: Format,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Parse text as a value of the type and print its canonical form
    Parse {
        #[command(flatten)]
        source: TypeSource,

        /// Text to parse
        text: String,
    },

    /// Print the regular expressions a type accepts, in match order
    Regex {
        #[command(flatten)]
        source: TypeSource,
    },

    /// Validate a JSON payload against a type
    Validate {
        /// Payload file to validate
        payload: PathBuf,

        #[command(flatten)]
        source: TypeSource,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Lint declaration documents (unresolved references, unused definitions)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,

        /// Suppress progress output, only show errors
        #[arg(long, short)]
        quiet: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Resolve {
            document,
            strict,
            pretty,
        } => run_resolve(&document, strict, pretty),
        Commands::Convert {
            source,
            format,
            output,
        } => run_convert(&source, format, output),
        Commands::Parse { source, text } => run_parse(&source, &text),
        Commands::Regex { source } => run_regex(&source),
        Commands::Validate {
            payload,
            source,
            json,
        } => run_validate(&payload, &source, json),
        Commands::Lint {
            path,
            format,
            strict,
            quiet,
        } => run_lint(&path, &format, strict, quiet),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn fail(e: &SchemaError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

fn load_type(source: &TypeSource) -> Result<TypeInfo, SchemaError> {
    match &source.key {
        Some(key) => load_document(&source.source, &ResolveOptions::new().strict(true))?
            .type_info_for(key),
        None => load_type_info(&source.source),
    }
}

fn run_resolve(document: &Path, strict: bool, pretty: bool) -> Result<(), u8> {
    let options = ResolveOptions::new().strict(strict);
    let doc = load_document(document, &options).map_err(|e| fail(&e))?;

    let declarations: Vec<serde_json::Value> = doc
        .keys()
        .map(|(key, id)| {
            let node = &doc[id];
            serde_json::json!({
                "key": key,
                "subtype": node.subtype().map(|s| format!("{:?}", s).to_lowercase()),
                "arity": node.arity().to_string(),
                "new_type": node.is_new_type(),
                "external": node.is_external(),
                "location": node.location().to_string(),
            })
        })
        .collect();
    let output = serde_json::json!({
        "sources": doc
            .sources()
            .iter()
            .map(|s| s.path.display().to_string())
            .collect::<Vec<_>>(),
        "declarations": declarations,
    });

    let text = if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;
    println!("{}", text);
    Ok(())
}

fn run_convert(source: &TypeSource, format: Format, output: Option<PathBuf>) -> Result<(), u8> {
    let ti = load_type(source).map_err(|e| fail(&e))?;
    let text = format.render(&ti).map_err(|e| fail(&e))?;

    match output {
        Some(path) => {
            std::fs::write(&path, &text).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", text);
        }
    }
    Ok(())
}

fn run_parse(source: &TypeSource, text: &str) -> Result<(), u8> {
    let ti = load_type(source).map_err(|e| fail(&e))?;
    let value = deserialize(&ti, text).map_err(|e| fail(&e))?;
    let canonical = serialize(&ti, &value).map_err(|e| fail(&e))?;
    println!("{}", canonical);
    Ok(())
}

fn run_regex(source: &TypeSource) -> Result<(), u8> {
    let ti = load_type(source).map_err(|e| fail(&e))?;
    for alternative in regex_alternatives(&ti).map_err(|e| fail(&e))? {
        println!("{}", alternative);
    }
    Ok(())
}

fn run_validate(payload_path: &Path, source: &TypeSource, json_output: bool) -> Result<(), u8> {
    let payload = decl_schema::read_source(payload_path)
        .and_then(|text| {
            serde_json::from_str::<serde_json::Value>(&text)
                .map_err(|source| SchemaError::InvalidJson { source })
        })
        .map_err(|e| {
            report_error(json_output, &format!("loading payload: {}", e));
            e.exit_code() as u8
        })?;

    let ti = load_type(source).map_err(|e| {
        report_error(json_output, &format!("loading type: {}", e));
        e.exit_code() as u8
    })?;

    match validate_json(&ti, &payload) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { errors }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": errors
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for error in errors {
                    eprintln!("  {}", error);
                }
            }
            Err(1)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(e.exit_code() as u8)
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({"valid": false, "error": msg}));
    } else {
        eprintln!("Error: {}", msg);
    }
}

fn run_lint(path: &Path, format: &str, strict: bool, quiet: bool) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict);

    if format == "json" {
        let text = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", text);
    } else {
        if !quiet {
            println!("Linting {} ...\n", path.display());
        }

        for file_result in &result.results {
            let status_icon = match file_result.status {
                FileStatus::Ok => "\x1b[32m✓\x1b[0m",
                FileStatus::Warning => "\x1b[33m⚠\x1b[0m",
                FileStatus::Error => "\x1b[31m✗\x1b[0m",
            };

            if !quiet || file_result.status != FileStatus::Ok {
                println!("  {} {}", status_icon, file_result.file.display());
            }

            for diag in &file_result.diagnostics {
                let (color, label) = match diag.severity {
                    Severity::Error => ("\x1b[31m", "error"),
                    Severity::Warning => ("\x1b[33m", "warning"),
                };
                if !quiet || diag.severity == Severity::Error {
                    println!(
                        "    {}{}[{}]\x1b[0m: {} - {}",
                        color, label, diag.code, diag.path, diag.message
                    );
                }
            }
        }

        println!();
        if result.is_ok() && (!strict || result.warnings == 0) {
            println!(
                "\x1b[32m✓ {} files checked, all passed\x1b[0m",
                result.files_checked
            );
        } else {
            println!(
                "\x1b[31m✗ {} files checked: {} passed, {} failed ({} errors, {} warnings)\x1b[0m",
                result.files_checked, result.passed, result.failed, result.errors, result.warnings
            );
        }
    }

    if result.is_ok() && (!strict || result.warnings == 0) {
        Ok(())
    } else {
        Err(1)
    }
}
