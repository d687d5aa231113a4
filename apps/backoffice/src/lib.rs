//! # Pharmadesk Back Office Library
//!
//! State, commands and startup for the pharmacy back office.
//!
//! ## Module Organization
//! ```text
//! pharmadesk_backoffice/
//! ├── lib.rs              ◄─── You are here (startup & run)
//! ├── cli.rs              ◄─── clap subcommands and dispatch
//! ├── state/
//! │   ├── mod.rs          ◄─── State type exports
//! │   ├── db.rs           ◄─── Database state wrapper
//! │   ├── workspace.rs    ◄─── Loaded account + persistence lock
//! │   ├── notifications.rs◄─── Timed notification queue
//! │   └── config.rs       ◄─── Configuration state
//! ├── commands/           ◄─── One module per screen
//! └── error.rs            ◄─── API error type for commands
//! ```

pub mod cli;
pub mod commands;
pub mod error;
pub mod state;

use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;
use pharmadesk_core::{Namespace, SharedClock, SystemClock, UuidIds};
use pharmadesk_db::{Database, DbConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{App, AppError, Cli};
use state::{ConfigState, DbState, NotificationState, WorkspaceState};

/// Runs one back-office invocation.
///
/// ## Startup Sequence
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                       Application Startup                               │
/// │                                                                         │
/// │  1. Initialize Logging ───────────────────────────────────────────────► │
/// │     • tracing-subscriber with env filter                                │
/// │     • Default: INFO, can be overridden with RUST_LOG                    │
/// │                                                                         │
/// │  2. Load Configuration ───────────────────────────────────────────────► │
/// │     • PHARMADESK_* environment variables over defaults                  │
/// │                                                                         │
/// │  3. Connect to Database ──────────────────────────────────────────────► │
/// │     • SQLite with WAL mode, pending migrations applied                  │
/// │                                                                         │
/// │  4. Open the Workspace ───────────────────────────────────────────────► │
/// │     • Legacy catalog migration, then first-run seeding                  │
/// │                                                                         │
/// │  5. Dispatch the Command ─────────────────────────────────────────────► │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub async fn run(cli: Cli) -> Result<(), AppError> {
    init_tracing();
    info!("Starting Pharmadesk back office");

    let config = ConfigState::from_env();
    let db_path = get_database_path(&config)?;
    info!(?db_path, account = %config.account_id, "Database path determined");

    let db = Database::new(DbConfig::new(db_path)).await?;
    info!("Database connected and migrations applied");

    let clock: SharedClock = Arc::new(SystemClock);
    let (workspace, report) = WorkspaceState::open(
        &db,
        Namespace::new(config.account_id.clone()),
        Arc::new(UuidIds),
        clock.clone(),
    )
    .await?;
    info!(?report, "Workspace ready");

    let app = App {
        notifications: NotificationState::new(config.notification_ttl(), clock),
        db: DbState::new(db.clone()),
        workspace,
        config,
    };
    let outcome = cli::execute(&app, cli.into_command()).await;

    db.close().await;
    outcome
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=pharmadesk=trace` - Show trace for pharmadesk crates only
/// - Default: INFO level
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pharmadesk=debug,sqlx=warn"));

    // Logs go to stderr so stdout stays machine-readable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Determines the database file path.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.pharmadesk.backoffice/pharmadesk.db`
/// - **Windows**: `%APPDATA%\pharmadesk\backoffice\data\pharmadesk.db`
/// - **Linux**: `~/.local/share/backoffice/pharmadesk.db`
///
/// `PHARMADESK_DB_PATH` overrides all of these.
fn get_database_path(config: &ConfigState) -> Result<PathBuf, AppError> {
    if let Some(path) = &config.database_path {
        return Ok(path.clone());
    }

    let proj_dirs = ProjectDirs::from("com", "pharmadesk", "backoffice")
        .ok_or_else(|| std::io::Error::other("Could not determine app data directory"))?;

    let data_dir = proj_dirs.data_dir();
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("pharmadesk.db"))
}
