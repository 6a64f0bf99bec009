use crate::artifacts::ArtifactStore;
use crate::selector::{FlowFilter, StatusClass};
use crate::service::{GenerationOutcome, Generator};
use crate::serializer::{serialize_json, OutputFormat};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// flowspec - Generate OpenAPI documents and Postman collections from recorded HTTP traffic
#[derive(Parser, Debug)]
#[command(name = "flowspec")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the captured flows JSON document
    #[arg(
        long = "flows",
        value_name = "FILE",
        env = "FLOWSPEC_FLOWS",
        default_value = "flows.json",
        global = true
    )]
    pub flows_path: PathBuf,

    /// Directory where generated artifacts are stored
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        env = "FLOWSPEC_OUTPUT_DIR",
        default_value = "output",
        global = true
    )]
    pub output_dir: PathBuf,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List captured flows with their stable IDs
    Flows {
        /// Only list flows with this HTTP method
        #[arg(short = 'm', long = "method", value_name = "METHOD")]
        method: Option<String>,

        /// Only list flows in this status class
        #[arg(long = "status", value_enum)]
        status: Option<StatusClass>,

        /// Only list flows whose URL contains this text (case-insensitive)
        #[arg(short = 'q', long = "search", value_name = "TEXT")]
        search: Option<String>,
    },
    /// Generate an OpenAPI document from captured flows
    Openapi {
        /// Only use flows with these IDs (repeat or separate with commas)
        #[arg(short = 's', long = "select", value_name = "ID", value_delimiter = ',')]
        select: Vec<String>,

        /// Output format (json or yaml)
        #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
        format: OutputFormat,

        /// Title of the generated document
        #[arg(long = "title")]
        title: Option<String>,
    },
    /// Generate a Postman collection from captured flows
    Postman {
        /// Only use flows with these IDs (repeat or separate with commas)
        #[arg(short = 's', long = "select", value_name = "ID", value_delimiter = ',')]
        select: Vec<String>,
    },
    /// Convert an OpenAPI document (JSON or YAML) into a Postman collection
    Convert {
        /// Path to the OpenAPI document
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },
    /// Copy a stored artifact to a file or stdout
    Download {
        /// Artifact file name, e.g. openapi_latest.json
        #[arg(value_name = "NAME")]
        name: String,

        /// Output file path (if not specified, outputs to stdout)
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output_path: Option<PathBuf>,
    },
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if let Command::Convert { input } = &args.command {
        if !input.is_file() {
            anyhow::bail!("OpenAPI document does not exist: {}", input.display());
        }
    }

    if args.output_dir.exists() && !args.output_dir.is_dir() {
        anyhow::bail!(
            "Output path is not a directory: {}",
            args.output_dir.display()
        );
    }

    info!("Flow source: {}", args.flows_path.display());
    info!("Output directory: {}", args.output_dir.display());

    Ok(args)
}

fn selection(ids: &[String]) -> HashSet<String> {
    ids.iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Print an outcome and turn a failed one into an error exit
fn report(outcome: GenerationOutcome) -> Result<()> {
    println!("{}", serialize_json(&outcome)?);
    if !outcome.success {
        anyhow::bail!("{}", outcome.message);
    }
    Ok(())
}

/// Run the selected command
pub fn run(args: CliArgs) -> Result<()> {
    let store = ArtifactStore::new(args.output_dir.clone());
    let generator = Generator::new(args.flows_path.clone(), store);

    match args.command {
        Command::Flows {
            method,
            status,
            search,
        } => {
            let filter = FlowFilter {
                method,
                status,
                search,
            };
            let listing = generator
                .list_matching(&filter)
                .with_context(|| format!("Failed to read flows from {}", args.flows_path.display()))?;
            println!("{}", serialize_json(&listing)?);
        }
        Command::Openapi {
            select,
            format,
            title,
        } => {
            let ids = selection(&select);
            info!("Generating OpenAPI ({:?}) from {} selected IDs", format, ids.len());
            let generator = match title {
                Some(title) => generator.with_title(title),
                None => generator,
            };
            report(generator.generate_openapi(&ids, format))?;
        }
        Command::Postman { select } => {
            let ids = selection(&select);
            info!("Generating Postman collection from {} selected IDs", ids.len());
            report(generator.generate_postman(&ids))?;
        }
        Command::Convert { input } => {
            info!("Converting {}", input.display());
            let document = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            report(generator.convert(&document))?;
        }
        Command::Download { name, output_path } => {
            let bytes = generator.download(&name)?;
            match output_path {
                Some(path) => {
                    fs::write(&path, &bytes)
                        .with_context(|| format!("Failed to write to file: {}", path.display()))?;
                    info!("Wrote {} bytes to {}", bytes.len(), path.display());
                }
                None => {
                    std::io::stdout()
                        .write_all(&bytes)
                        .context("Failed to write to stdout")?;
                }
            }
        }
    }

    Ok(())
}
