//! Fabricator CLI - validate and convert metadata spreadsheets
//!
//! ```bash
//! fabricator serve                          # Start HTTP server (port 8080)
//! fabricator check batch.csv                # Print the per-cell error report
//! fabricator transform batch.csv -o out/    # Write target.csv (+ linked_agents.csv)
//! fabricator resolve-person --name "Smith, Sam" --email sam@example.edu
//! ```
//!
//! Settings are read from the environment; a `.env` file in the working
//! directory is loaded first. `RUST_LOG` controls log verbosity.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use fabricator::api::logs::log_success;
use fabricator::{parse_csv_file, Settings, TermResolver, Transformer, Validator};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fabricator")]
#[command(about = "Validate and convert metadata spreadsheets for batch ingest", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Validate a CSV file and print the error report as JSON
    Check {
        /// Input CSV file (first row is the header)
        input: PathBuf,
    },

    /// Convert a CSV file into the canonical export files
    Transform {
        /// Input CSV file
        input: PathBuf,

        /// Directory the generated files are written to
        #[arg(short, long, default_value = ".")]
        out_dir: PathBuf,
    },

    /// Find or create the taxonomy term for a person and print its id
    ResolvePerson {
        /// Display name, e.g. "Smith, Sam"
        #[arg(long)]
        name: String,

        #[arg(long)]
        institution: Option<String>,

        #[arg(long)]
        orcid: Option<String>,

        #[arg(long)]
        email: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match Settings::from_env() {
        Ok(settings) => run(cli.command, settings).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}

async fn run(command: Commands, settings: Settings) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve { port } => fabricator::server::start_server(settings, port).await,
        Commands::Check { input } => cmd_check(&input, &settings).await,
        Commands::Transform { input, out_dir } => cmd_transform(&input, &out_dir, &settings).await,
        Commands::ResolvePerson { name, institution, orcid, email } => {
            let mut resolver = TermResolver::new(&settings, settings.http_client()?);
            let tid = resolver
                .resolve_person(&name, institution.as_deref(), orcid.as_deref(), email.as_deref())
                .await?;
            println!("{tid}");
            Ok(())
        }
    }
}

async fn cmd_check(input: &Path, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let sheet = parse_csv_file(input)?;
    let validator = Validator::new(settings, settings.http_client()?);
    let report = validator.validate(&sheet).await;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}

async fn cmd_transform(
    input: &Path,
    out_dir: &Path,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut transformer = Transformer::new(settings, settings.http_client()?);
    let output = transformer.transform_file(input).await?;

    fs::create_dir_all(out_dir)?;
    for file in output.files()? {
        let path = out_dir.join(&file.name);
        fs::write(&path, file.content)?;
        log_success(format!("Wrote {}", path.display()));
    }
    Ok(())
}
