//! geefetch CLI - Earth Engine composites to local GeoTIFFs

mod fetch;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use geefetch_cloud::auth::{ServiceAccountAuth, ServiceAccountKey};
use geefetch_cloud::blocking::Session;
use geefetch_cloud::{DriveFile, DriveOptions, EarthEngineOptions, HttpOptions};
use geefetch_core::imagery::Sensor;
use geefetch_core::{DateRange, EndMode, PeriodGenerator, PeriodSpec};

use fetch::FetchArgs;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "geefetch")]
#[command(author, version, about = "Fetch spectral index composites from Google Earth Engine", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute composites per period, export them through Drive and download them
    Fetch(FetchArgs),
    /// Print the periods generated for a date range
    Periods {
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// End date (YYYY-MM-DD or "now")
        #[arg(long, default_value = "now")]
        end: String,
        /// Period length, e.g. 1M, 2w, 10d, Y
        #[arg(long, default_value = "1M")]
        period_size: PeriodSpec,
        /// Interval between period starts (default: the period size)
        #[arg(long)]
        period_frequency: Option<PeriodSpec>,
        /// Period ends are the last covered day
        #[arg(long)]
        inclusive_end: bool,
    },
    /// List the spectral indices available for a sensor
    Indices {
        /// Sensor: sentinel2 or landsat8
        #[arg(long, default_value = "sentinel2")]
        sensor: Sensor,
    },
    /// Inspect and clean the service account's Drive
    Drive {
        /// Service-account credentials (JSON key file)
        #[arg(long, env = "GEEFETCH_CREDENTIALS")]
        ee_credentials: PathBuf,

        #[command(subcommand)]
        action: DriveCommands,
    },
}

// ─── Drive subcommands ──────────────────────────────────────────────────

#[derive(Subcommand)]
enum DriveCommands {
    /// List a folder (default: the root)
    Ls {
        /// Folder name
        folder: Option<String>,
    },
    /// Find files whose name contains TEXT
    Search {
        text: String,
        /// Only look inside this folder
        #[arg(long)]
        folder: Option<String>,
    },
    /// Create a folder at the Drive root
    Mkdir {
        name: String,
    },
    /// Delete an export folder and everything in it
    Clean {
        /// Folder name
        #[arg(default_value = "GEE")]
        folder: String,
    },
    /// List trashed files
    Trash,
    /// Permanently delete trashed files
    EmptyTrash,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:30.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("=> "));
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn done(name: &str, path: &Path, elapsed: Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Authenticate with a service-account key and open a blocking session.
///
/// The Earth Engine project defaults to the key's `project_id`.
fn open_session(
    credentials: &Path,
    project: Option<String>,
    http: HttpOptions,
    poll_interval: Duration,
) -> Result<Session> {
    let key = ServiceAccountKey::from_file(credentials)
        .with_context(|| format!("Failed to load credentials {}", credentials.display()))?;
    let project = match project.or_else(|| key.project_id.clone()) {
        Some(p) => p,
        None => bail!("No Earth Engine project: pass --ee-project or use a key with project_id"),
    };
    info!("Authenticating as {} (project {})", key.client_email, project);
    let auth = Arc::new(ServiceAccountAuth::new(key).context("Failed to load private key")?);

    let earth_engine = EarthEngineOptions {
        poll_interval,
        http: http.clone(),
        ..EarthEngineOptions::new(project)
    };
    let drive = DriveOptions {
        http,
        ..DriveOptions::default()
    };
    Session::new(earth_engine, drive, auth).context("Failed to open session")
}

fn print_files(files: &[DriveFile]) {
    if files.is_empty() {
        println!("(empty)");
    }
    for f in files {
        let kind = if f.is_folder() { "dir " } else { "file" };
        match f.size_bytes() {
            Some(size) => println!("{}  {}  {}  ({} bytes)", kind, f.id, f.name, size),
            None => println!("{}  {}  {}", kind, f.id, f.name),
        }
    }
}

/// First Drive folder named `name`.
fn find_folder(session: &Session, name: &str) -> Result<DriveFile> {
    match session.find_folders(name)?.into_iter().next() {
        Some(folder) => Ok(folder),
        None => bail!("No Drive folder named {}", name),
    }
}

fn run_drive(credentials: &Path, action: DriveCommands) -> Result<()> {
    if !credentials.exists() {
        bail!("Credentials {} does not exist", credentials.display());
    }
    // Drive calls ignore the project; fall back to a placeholder.
    let project = ServiceAccountKey::from_file(credentials)
        .ok()
        .and_then(|k| k.project_id)
        .or_else(|| Some("-".to_string()));
    let session = open_session(
        credentials,
        project,
        HttpOptions::default(),
        Duration::from_secs(10),
    )?;

    match action {
        DriveCommands::Ls { folder } => {
            let files = match folder {
                None => session.list_directory(None)?,
                Some(name) => session.list_directory(Some(&find_folder(&session, &name)?))?,
            };
            print_files(&files);
        }
        DriveCommands::Search { text, folder } => {
            let files = match folder {
                None => session.search(&text)?,
                Some(name) => session.search_in_folder(&find_folder(&session, &name)?, &text)?,
            };
            print_files(&files);
        }
        DriveCommands::Mkdir { name } => {
            let folder = session.create_directory(&name)?;
            println!("Created folder {} ({})", folder.name, folder.id);
        }
        DriveCommands::Clean { folder } => {
            let pb = spinner(&format!("Removing Drive folder {folder}..."));
            let n = session.clean_drive_folder(&folder)?;
            pb.finish_and_clear();
            println!("Removed {} folder(s) named {}", n, folder);
        }
        DriveCommands::Trash => print_files(&session.list_trash()?),
        DriveCommands::EmptyTrash => {
            let pb = spinner("Emptying trash...");
            session.empty_trash()?;
            pb.finish_and_clear();
            println!("Trash emptied");
        }
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        // ── Fetch ────────────────────────────────────────────────────
        Commands::Fetch(args) => fetch::run(args)?,

        // ── Periods ──────────────────────────────────────────────────
        Commands::Periods {
            start,
            end,
            period_size,
            period_frequency,
            inclusive_end,
        } => {
            let range = DateRange::parse(&start, &end).context("Invalid date range")?;
            let mode = if inclusive_end {
                EndMode::Inclusive
            } else {
                EndMode::Exclusive
            };
            let generator =
                PeriodGenerator::new(range, period_size, period_frequency).with_end_mode(mode);
            for period in &generator {
                println!("{period}");
            }
        }

        // ── Indices ──────────────────────────────────────────────────
        Commands::Indices { sensor } => {
            for name in sensor.indices().names() {
                println!("{name}");
            }
        }

        // ── Drive ────────────────────────────────────────────────────
        Commands::Drive {
            ee_credentials,
            action,
        } => run_drive(&ee_credentials, action)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logging_is_installed_once() {
        assert!(setup_logging(false).is_ok());
        let err = setup_logging(true).unwrap_err();
        assert!(err.to_string().contains("tracing subscriber"));
    }
}
