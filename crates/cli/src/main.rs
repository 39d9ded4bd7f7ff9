use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use courgette_codegen::Options;
use courgette_validate::Severity;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Courgette rule language toolchain.
#[derive(Parser)]
#[command(name = "courgette", version, about = "Courgette rule language toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a Courgette file to OpenFisca-style Python
    Compile {
        /// Path to the Courgette source file
        file: PathBuf,
        /// Write generated code to this file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Variable used as the deduction base of income-tested reductions
        #[arg(long, default_value = "income")]
        income_variable: String,
    },

    /// Validate a Courgette file and report findings
    Validate {
        /// Path to the Courgette source file
        file: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compile {
            file,
            out,
            income_variable,
        } => {
            cmd_compile(&file, out.as_deref(), income_variable, cli.output, cli.quiet);
        }
        Commands::Validate { file } => {
            cmd_validate(&file, cli.output, cli.quiet);
        }
    }
}

fn cmd_compile(
    file: &Path,
    out: Option<&Path>,
    income_variable: String,
    output: OutputFormat,
    quiet: bool,
) {
    let text = read_source(file, output, quiet);
    let options = Options { income_variable };

    match courgette_codegen::compile_with(&text, &options) {
        Ok(code) => match out {
            Some(path) => {
                if let Err(e) = std::fs::write(path, &code) {
                    report_error(
                        &format!("error writing '{}': {}", path.display(), e),
                        output,
                        quiet,
                    );
                    process::exit(1);
                }
                if !quiet {
                    println!("wrote {}", path.display());
                }
            }
            None => match output {
                OutputFormat::Text => print!("{code}"),
                OutputFormat::Json => {
                    println!("{}", serde_json::json!({ "code": code }));
                }
            },
        },
        Err(e) => {
            report_error(&e.to_string(), output, quiet);
            process::exit(1);
        }
    }
}

fn cmd_validate(file: &Path, output: OutputFormat, quiet: bool) {
    let text = read_source(file, output, quiet);
    let diagnostics = courgette_validate::validate(&text);

    match output {
        OutputFormat::Json => {
            let pretty = serde_json::to_string_pretty(&diagnostics)
                .unwrap_or_else(|e| format!("{{\"error\": \"serialization: {e}\"}}"));
            println!("{pretty}");
        }
        OutputFormat::Text => {
            for d in &diagnostics {
                println!(
                    "{}:{}:{}: {}: {}",
                    file.display(),
                    d.line,
                    d.column,
                    d.severity.as_str(),
                    d.message
                );
            }
            if !quiet {
                let errors = count(&diagnostics, Severity::Error);
                let warnings = count(&diagnostics, Severity::Warning);
                if diagnostics.is_empty() {
                    println!("no findings");
                } else {
                    println!("{errors} error(s), {warnings} warning(s)");
                }
            }
        }
    }

    if diagnostics.iter().any(|d| d.severity == Severity::Error) {
        process::exit(1);
    }
}

fn count(diagnostics: &[courgette_validate::Diagnostic], severity: Severity) -> usize {
    diagnostics.iter().filter(|d| d.severity == severity).count()
}

fn read_source(file: &Path, output: OutputFormat, quiet: bool) -> String {
    match std::fs::read_to_string(file) {
        Ok(text) => text,
        Err(e) => {
            report_error(
                &format!("error reading file '{}': {}", file.display(), e),
                output,
                quiet,
            );
            process::exit(1);
        }
    }
}

fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    match output {
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
        OutputFormat::Text => {
            if !quiet {
                eprintln!("error: {msg}");
            }
        }
    }
}
