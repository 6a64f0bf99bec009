//! flowspec - Command-line tool for turning recorded HTTP traffic into API documents.
//!
//! The tool reads the JSON flow array written by the capture job and produces an
//! OpenAPI 3.0 document or a Postman Collection v2.1, stored under a timestamped
//! name and a `latest` alias in the output directory.
//!
//! # Usage
//!
//! ```bash
//! flowspec [OPTIONS] <COMMAND>
//! ```
//!
//! # Examples
//!
//! List captured flows and their IDs:
//! ```bash
//! flowspec --flows /data/flows.json flows
//! ```
//!
//! Generate an OpenAPI document from two selected flows:
//! ```bash
//! flowspec openapi -s 3f2a9c01b7de,9e8d7c6b5a41
//! ```
//!
//! Convert an existing OpenAPI document into a Postman collection:
//! ```bash
//! flowspec convert petstore.yaml
//! ```
//!
//! Enable verbose logging:
//! ```bash
//! flowspec postman -v
//! ```

use anyhow::Result;
use clap::Parser;
use flowspec::cli;
use log::info;

fn main() -> Result<()> {
    let args = cli::CliArgs::parse();

    // Initialize logger based on verbose flag
    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("flowspec starting...");

    let args = cli::parse_args_from_parsed(args)?;
    cli::run(args)?;

    Ok(())
}
