use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};

use filekeep::file::{FileFilter, StagedFile};
use filekeep::{Config, Database, FileService, FileStorage, FilekeepError, Result};

#[derive(Parser)]
#[command(author, version, about = "File storage with a SQLite index", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config.toml", env = "FILEKEEP_CONFIG")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store a file
    Save {
        file: PathBuf,
        /// Name to store under (defaults to the file name without extension)
        #[arg(short, long)]
        name: Option<String>,
        /// Sub directory below the file directory
        #[arg(short, long)]
        path: Option<String>,
        /// MIME type (guessed from the extension when omitted)
        #[arg(short, long)]
        mime: Option<String>,
    },
    /// Print a record
    Show { id: i64 },
    /// Delete a file and its record
    Delete { id: i64 },
    /// Search records
    Search {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        extension: Option<String>,
        #[arg(short, long)]
        path: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = filekeep::file::DEFAULT_PER_PAGE)]
        per_page: u32,
    },
    /// Check a file against its recorded checksum
    Verify { id: i64 },
    /// Compare all records against the storage tree
    Audit,
    /// Write a file's contents to stdout
    Cat { id: i64 },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Load configuration
    let config = match Config::load_with_env(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {}: {e}", cli.config.display());
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = filekeep::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        filekeep::logging::init_console_only(&config.logging.level);
    }

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &Config) -> Result<ExitCode> {
    config.validate()?;

    let db = Database::open(&config.database.path).await?;
    let storage = FileStorage::new(&config.storage)?;
    let service = FileService::new(db.pool(), &storage);
    info!(root = %storage.location().root().display(), "storage ready");

    let code = match command {
        Commands::Save {
            file,
            name,
            path,
            mime,
        } => {
            let mut staged = StagedFile::open(file)?;
            if let Some(mime) = mime {
                staged = staged.with_mime_type(mime);
            }
            let record = service
                .save(&staged, name.as_deref(), path.as_deref())
                .await?;
            print_json(&record)?;
            ExitCode::SUCCESS
        }
        Commands::Show { id } => {
            let record = service
                .load(id)
                .await?
                .ok_or(FilekeepError::RecordNotFound(id))?;
            print_json(&record)?;
            ExitCode::SUCCESS
        }
        Commands::Delete { id } => {
            service.delete(id).await?;
            ExitCode::SUCCESS
        }
        Commands::Search {
            name,
            extension,
            path,
            page,
            per_page,
        } => {
            let mut filter = FileFilter::new().page(page, per_page);
            if let Some(name) = name {
                filter = filter.name(name);
            }
            if let Some(extension) = extension {
                filter = filter.extension(extension);
            }
            if let Some(path) = path {
                filter = filter.sub_path(path);
            }
            print_json(&service.search(&filter).await?)?;
            ExitCode::SUCCESS
        }
        Commands::Verify { id } => {
            let ok = service.verify(id).await?;
            println!("{}", if ok { "ok" } else { "mismatch" });
            if ok {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Audit => {
            let report = service.audit().await?;
            for issue in &report.issues {
                eprintln!("{issue}");
            }
            print_json(&report)?;
            if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Commands::Cat { id } => {
            let delivery = service.deliver(id).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&delivery.content)?;
            stdout.flush()?;
            ExitCode::SUCCESS
        }
    };

    db.close().await;
    Ok(code)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).map_err(|e| FilekeepError::Io(e.into()))?;
    println!("{json}");
    Ok(())
}
