//! Schema Rules CLI
//!
//! Command-line interface for compiling JSON Schemas into rule maps,
//! resolving their external references, and validating payloads.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use schema_rules::{
    is_url, load_schema, validate_payload, HttpFetcher, ResolveError, SchemaResolver,
    SchemaSource, ValidateError, HTTP_TIMEOUT,
};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "schema-rules")]
#[command(about = "Compile JSON Schemas into flat validation rules")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a schema into a rule map keyed by dotted path
    Compile(SourceArgs),

    /// Resolve every external $ref and print the resulting schema
    Resolve(SourceArgs),

    /// Validate a payload against a schema
    Validate {
        /// Payload file to validate
        payload: PathBuf,

        /// Schema source: file path or URL (http:// or https://)
        #[arg(long)]
        schema: String,

        /// Base URL for relative references in a local schema
        #[arg(long)]
        base_url: Option<String>,

        /// HTTP timeout in seconds
        #[arg(long, default_value_t = HTTP_TIMEOUT.as_secs())]
        timeout: u64,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Args)]
struct SourceArgs {
    /// Schema source: file path or URL (http:// or https://)
    source: String,

    /// Output file (stdout if not specified)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Base URL for relative references in a local schema
    #[arg(long)]
    base_url: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = HTTP_TIMEOUT.as_secs())]
    timeout: u64,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compile(args) => run_compile(args).await,
        Commands::Resolve(args) => run_resolve(args).await,
        Commands::Validate {
            payload,
            schema,
            base_url,
            timeout,
            json,
        } => run_validate(&payload, &schema, base_url, timeout, json).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("schema_rules={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn build_resolver(timeout: u64) -> Result<SchemaResolver<HttpFetcher>, u8> {
    let fetcher = HttpFetcher::with_timeout(Duration::from_secs(timeout)).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;
    Ok(SchemaResolver::new(fetcher))
}

/// URLs are fetched by the resolver; files are read here and resolved
/// against `--base-url` when one is given.
fn schema_source(source: &str, base_url: Option<String>) -> Result<SchemaSource, ResolveError> {
    if is_url(source) {
        return Ok(SchemaSource::from_url(source));
    }
    let document = load_schema(Path::new(source))?;
    let source = SchemaSource::from_document(document);
    Ok(match base_url {
        Some(url) => source.with_url(url),
        None => source,
    })
}

async fn run_compile(args: SourceArgs) -> Result<(), u8> {
    let resolver = build_resolver(args.timeout)?;
    let source = schema_source(&args.source, args.base_url).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let rules = resolver.compile(source).await.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&rules, args.output.as_deref(), args.pretty)
}

async fn run_resolve(args: SourceArgs) -> Result<(), u8> {
    let resolver = build_resolver(args.timeout)?;
    let source = schema_source(&args.source, args.base_url).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let resolved = resolver.resolve(source).await.map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    write_output(&resolved, args.output.as_deref(), args.pretty)
}

fn write_output<T: Serialize>(value: &T, output: Option<&Path>, pretty: bool) -> Result<(), u8> {
    let json_output = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

async fn run_validate(
    payload_path: &Path,
    schema: &str,
    base_url: Option<String>,
    timeout: u64,
    json_output: bool,
) -> Result<(), u8> {
    let payload = load_schema(payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;

    let resolver = build_resolver(timeout)?;
    let source = schema_source(schema, base_url).map_err(|e| {
        report_error(json_output, &format!("loading schema: {}", e));
        e.exit_code() as u8
    })?;
    let resolved = resolver.resolve(source).await.map_err(|e| {
        report_error(json_output, &e.to_string());
        e.exit_code() as u8
    })?;

    match validate_payload(&resolved, &payload) {
        Ok(()) => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Err(ValidateError::Invalid { violations }) => {
            if json_output {
                let output = serde_json::json!({
                    "valid": false,
                    "errors": violations
                });
                println!("{}", output);
            } else {
                eprintln!("Validation failed:");
                for violation in violations {
                    eprintln!("  {}", violation);
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
        println!("{}", serde_json::json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
