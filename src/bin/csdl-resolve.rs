//! CSDL Resolver CLI
//!
//! Command-line interface for resolving and linting CSDL documents.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use csdl_resolver::{lint, FileStatus, Resolution, Resolver, ResolverConfig, Severity};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "csdl-resolve")]
#[command(about = "Resolve and merge interlinked OData CSDL documents")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options controlling how references are located.
#[derive(clap::Args)]
struct LocateArgs {
    /// Directory searched for references not found next to the referring file
    #[arg(long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,

    /// Map reference URIs with PREFIX onto local directory DIR
    #[arg(long = "map", value_name = "PREFIX=DIR", value_parser = parse_mapping)]
    mappings: Vec<(String, PathBuf)>,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve an entry document and every document it references
    Resolve {
        /// Entry CSDL document
        entry: PathBuf,

        /// Record circular references as findings instead of failing
        #[arg(long)]
        allow_cycles: bool,

        /// Do not check for circular references
        #[arg(long)]
        no_detect_cycles: bool,

        /// Parse every document afresh instead of reusing cached parses
        #[arg(long)]
        no_cache: bool,

        /// Maximum reference depth below the entry document
        #[arg(long)]
        max_depth: Option<usize>,

        #[command(flatten)]
        locate: LocateArgs,

        /// JSON configuration file; flags override its values
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Exit with status 1 if any error-level finding is recorded
        #[arg(long)]
        strict: bool,
    },

    /// Lint CSDL files for errors (syntax, broken references, include hints)
    Lint {
        /// File or directory to lint
        path: PathBuf,

        #[command(flatten)]
        locate: LocateArgs,

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
            entry,
            allow_cycles,
            no_detect_cycles,
            no_cache,
            max_depth,
            locate,
            config,
            format,
            output,
            strict,
        } => build_config(config.as_deref(), locate).and_then(|base| {
            let mut config = base;
            if allow_cycles {
                config = config.allow_cycles(true);
            }
            if no_detect_cycles {
                config = config.detect_cycles(false);
            }
            if no_cache {
                config = config.caching(false);
            }
            if let Some(depth) = max_depth {
                config = config.max_depth(depth);
            }
            run_resolve(&entry, config, &format, output, strict)
        }),

        Commands::Lint {
            path,
            locate,
            format,
            strict,
            quiet,
        } => build_config(None, locate)
            .and_then(|config| run_lint(&path, &config, &format, strict, quiet)),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Log to stderr. Default level is `warn`, raised by each `-v`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_mapping(s: &str) -> Result<(String, PathBuf), String> {
    match s.split_once('=') {
        Some((prefix, dir)) if !prefix.is_empty() && !dir.is_empty() => {
            Ok((prefix.to_string(), PathBuf::from(dir)))
        }
        _ => Err(format!("expected PREFIX=DIR, got \"{}\"", s)),
    }
}

fn build_config(file: Option<&Path>, locate: LocateArgs) -> Result<ResolverConfig, u8> {
    let mut config = match file {
        Some(path) => ResolverConfig::from_json_file(path).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })?,
        None => ResolverConfig::default(),
    };

    for dir in locate.search_paths {
        config = config.search_path(dir);
    }
    for (prefix, dir) in locate.mappings {
        config = config.uri_mapping(prefix, dir);
    }
    Ok(config)
}

fn run_resolve(
    entry: &Path,
    config: ResolverConfig,
    format: &str,
    output: Option<PathBuf>,
    strict: bool,
) -> Result<(), u8> {
    let mut resolver = Resolver::new(config);
    let resolution = resolver.resolve(entry).map_err(|e| {
        eprintln!("Error: {}", e);
        e.exit_code() as u8
    })?;

    let rendered = if format == "json" {
        serde_json::to_string_pretty(&resolution).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?
    } else {
        render_text(entry, &resolution)
    };

    match output {
        Some(path) => {
            std::fs::write(&path, &rendered).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered);
        }
    }

    if strict && resolution.has_errors() {
        Err(1)
    } else {
        Ok(())
    }
}

fn render_text(entry: &Path, resolution: &Resolution) -> String {
    let mut out = String::new();
    let stats = &resolution.stats;

    // Writing to a String cannot fail
    let _ = writeln!(out, "Resolved {}\n", entry.display());
    let _ = writeln!(out, "Namespaces:");
    for schema in resolution.model.schemas.values() {
        let _ = writeln!(
            out,
            "  {} ({} elements, {} documents)",
            schema.namespace,
            schema.len(),
            schema.sources.len()
        );
    }

    let _ = writeln!(out, "\nStatistics:");
    let _ = writeln!(out, "  documents processed:   {}", stats.documents_processed);
    let _ = writeln!(out, "  cache hits:            {}", stats.cached_reuse_count);
    let _ = writeln!(out, "  max depth reached:     {}", stats.max_depth_reached);
    let _ = writeln!(
        out,
        "  circular dependencies: {}",
        stats.circular_dependencies_detected
    );
    let _ = writeln!(
        out,
        "  elapsed:               {:.2} ms",
        stats.elapsed.as_secs_f64() * 1000.0
    );

    if resolution.findings.is_empty() {
        let _ = write!(out, "\nNo findings");
    } else {
        let _ = writeln!(out, "\nFindings ({}):", resolution.findings.len());
        for finding in &resolution.findings {
            let label = match finding.severity() {
                Severity::Error => "\x1b[31merror\x1b[0m",
                Severity::Warning => "\x1b[33mwarning\x1b[0m",
            };
            let _ = writeln!(out, "  {} {}", label, finding);
        }
    }

    out.trim_end().to_string()
}

fn run_lint(
    path: &Path,
    config: &ResolverConfig,
    format: &str,
    strict: bool,
    quiet: bool,
) -> Result<(), u8> {
    if !path.exists() {
        eprintln!("Error: path not found: {}", path.display());
        return Err(2);
    }

    let result = lint(path, strict, config);

    if format == "json" {
        let rendered = serde_json::to_string_pretty(&result).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", rendered);
    } else {
        // Text output
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
