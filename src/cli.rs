//! Command-line glue over the utilities facade.
//!
//! Every subcommand maps onto one facade operation; no behaviour lives here
//! beyond reading inputs from disk and printing results. Call [`run`] with a
//! parsed [`Cli`] from `main()` or from integration tests.
use crate::config::Config;
use crate::contract::UploadMetadata;
use crate::csv::DEFAULT_DELIMITER;
use crate::load_config::load_config;
use crate::record::Record;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

/// CLI for cloud-utilities: CSV conversion, file uploads and user document updates.
#[derive(Parser)]
#[clap(
    name = "cloud-utilities",
    version,
    about = "Convert CSV <-> JSON records, upload files to Firebase Storage, update Firestore user documents"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Parse a CSV file and print its records as JSON
    CsvToJson {
        /// CSV file to read
        #[clap(long)]
        input: PathBuf,
        /// Field separator
        #[clap(long, default_value = DEFAULT_DELIMITER)]
        delimiter: String,
    },
    /// Convert a JSON array of records to CSV, write it to --output and print it
    JsonToCsv {
        /// JSON file holding an array of objects
        #[clap(long)]
        input: PathBuf,
        /// Destination CSV file (overwritten)
        #[clap(long)]
        output: PathBuf,
    },
    /// Upload a local file to cloud storage and print its download URL
    Upload {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Destination path in the bucket
        #[clap(long)]
        path: String,
        /// Local file to upload
        #[clap(long)]
        file: PathBuf,
        /// Content type stored with the object
        #[clap(long)]
        content_type: Option<String>,
    },
    /// Apply a partial update to a user document
    UpdateUser {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// User id (document id)
        #[clap(long)]
        uid: String,
        /// JSON file holding the fields to update
        #[clap(long)]
        data: PathBuf,
        /// Collection holding the user documents
        #[clap(long)]
        collection: Option<String>,
    },
}

fn read_records(path: &Path) -> Result<Vec<Record>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON input {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("{} must hold a JSON array of objects", path.display()))
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::CsvToJson { input, delimiter } => {
            let data = std::fs::read_to_string(&input)
                .with_context(|| format!("Failed to read CSV input {}", input.display()))?;
            let records = Config::default()
                .build_utilities()
                .csv_to_json(&data, &delimiter);
            tracing::info!(command = "csv-to-json", records = records.len(), "Parsed CSV");
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::JsonToCsv { input, output } => {
            let records = read_records(&input)?;
            let csv = Config::default()
                .build_utilities()
                .json_to_csv(&records, &output.to_string_lossy(), true)
                .await?;
            tracing::info!(command = "json-to-csv", output = %output.display(), "Wrote CSV");
            println!("{csv}");
        }
        Commands::Upload {
            config,
            path,
            file,
            content_type,
        } => {
            let utilities = load_config(config)?.build_utilities();
            let bytes = std::fs::read(&file)
                .with_context(|| format!("Failed to read upload source {}", file.display()))?;
            let metadata = content_type.map(UploadMetadata::with_content_type);
            let url = utilities.upload_file(&path, bytes, metadata).await?;
            tracing::info!(command = "upload", %path, "Upload complete");
            println!("{url}");
        }
        Commands::UpdateUser {
            config,
            uid,
            data,
            collection,
        } => {
            let utilities = load_config(config)?.build_utilities();
            let content = std::fs::read_to_string(&data)
                .with_context(|| format!("Failed to read update data {}", data.display()))?;
            let fields: Record = serde_json::from_str(&content)
                .with_context(|| format!("{} must hold a JSON object", data.display()))?;
            utilities
                .update_user(&uid, fields, collection.as_deref())
                .await?;
            tracing::info!(command = "update-user", %uid, "User document updated");
            println!("Updated user {uid}");
        }
    }

    Ok(())
}
