use clap::{Parser, Subcommand};
use redmark_core::validation::{DocxValidator, RedliningValidator};
use redmark_core::wml::generate_rsid;
use redmark_core::package;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "redmark")]
#[command(about = "OOXML tracked-change mutation and validation tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an Office file and pretty-print its XML parts
    Unpack {
        /// Office file (.docx/.pptx/.xlsx)
        office_file: PathBuf,

        /// Directory to extract into
        output_dir: PathBuf,
    },
    /// Zip an unpacked directory back into an Office file
    Pack {
        /// Directory holding the unpacked document
        input_directory: PathBuf,

        /// Output Office file (.docx/.pptx/.xlsx)
        output_file: PathBuf,

        /// Skip render-probe validation
        #[arg(long)]
        force: bool,
    },
    /// Validate an unpacked directory against the original archive
    Validate {
        /// Directory holding the unpacked document
        unpacked_dir: PathBuf,

        /// The original file (.docx/.pptx/.xlsx) used as baseline
        #[arg(long)]
        original: PathBuf,

        /// Author whose tracked changes the redlining check verifies
        #[arg(long, default_value = "Redmark")]
        author: String,

        /// Directory holding the XSD schema set
        #[arg(long, default_value = "schemas")]
        schemas: PathBuf,

        #[arg(short, long)]
        verbose: bool,

        /// Emit the check reports as JSON on stdout
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> redmark_core::Result<ExitCode> {
    match cli.command {
        Commands::Unpack {
            office_file,
            output_dir,
        } => {
            package::unpack(&office_file, &output_dir)?;
            if office_file.extension().and_then(|e| e.to_str()) == Some("docx") {
                println!("Suggested RSID for edit session: {}", generate_rsid());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Pack {
            input_directory,
            output_file,
            force,
        } => {
            let ok = package::pack(&input_directory, &output_file, !force)?;
            if force {
                eprintln!("Warning: skipped validation, file may be corrupt");
            }
            if ok {
                Ok(ExitCode::SUCCESS)
            } else {
                eprintln!("Contents would produce a corrupt file.");
                eprintln!("Please validate XML before repacking.");
                eprintln!("Use --force to skip validation and pack anyway.");
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Validate {
            unpacked_dir,
            original,
            author,
            schemas,
            verbose,
            json,
        } => {
            let extension = original
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_ascii_lowercase())
                .unwrap_or_default();

            match extension.as_str() {
                "docx" => {}
                "pptx" | "xlsx" => {
                    eprintln!(
                        "Error: validation for .{} packages is not supported yet",
                        extension
                    );
                    return Ok(ExitCode::FAILURE);
                }
                _ => {
                    eprintln!("Error: {} must be a .docx, .pptx, or .xlsx file", original.display());
                    return Ok(ExitCode::FAILURE);
                }
            }

            let schema_outcome = DocxValidator::new(&unpacked_dir, &original)
                .with_schemas_dir(schemas)
                .verbose(verbose)
                .validate()?;

            let redlining_outcome = RedliningValidator::new(&unpacked_dir, &original, &author)
                .verbose(verbose)
                .validate()?;

            if json {
                match serde_json::to_string_pretty(&schema_outcome.reports) {
                    Ok(rendered) => println!("{}", rendered),
                    Err(e) => eprintln!("Error: cannot serialize report: {}", e),
                }
            }

            if schema_outcome.passed() && redlining_outcome.passed {
                println!("All validation checks passed!");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
    }
}
