mod prefs;
mod simulate;
mod utils;

pub use crate::prefs::{PrefsCommand, handle_prefs_command};
pub use crate::simulate::{SimulateArgs, handle_simulate_command};

use clap::{Parser, Subcommand};
use color_eyre::Result;
use std::path::PathBuf;
use std::sync::Once;
use tracing_subscriber::EnvFilter;
use warden_session::{ActivityKind, SessionConfig};

static TRACING_INIT: Once = Once::new();

#[derive(Parser, Debug)]
#[command(
    name = "warden",
    about = "Inactivity-based session timeout monitor",
    long_about = "Warden signs idle sessions out. After sign-in it watches user activity \
                  and, once nothing has happened for longer than the inactivity timeout, \
                  signs the session out and sends the user back to the sign-in page.\n\n\
                  Choosing \"keep me logged in\" at sign-in switches the timeout off; the \
                  choice is remembered across restarts.\n\n\
                  Quick start:\n\
                  1. warden simulate --ephemeral --password Secret1           # idle session times out\n\
                  2. warden simulate --ephemeral --password Secret1 --activity-at 30 --activity-at 70\n\
                  3. warden prefs set-keep-logged-in true                     # disable the timeout\n\
                  4. warden config                                            # effective settings"
)]
pub struct Cli {
    /// JSON configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Preference file (overrides `store_path` from the configuration)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Inactivity timeout in milliseconds
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Interval between inactivity checks in milliseconds
    #[arg(long, global = true)]
    pub interval_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and simulate a dashboard session against the inactivity watchdog
    Simulate {
        /// Tick "Keep me logged in" on the sign-in form
        #[arg(long)]
        keep_logged_in: bool,
        /// Account email (defaults to the configured demo account)
        #[arg(long)]
        email: Option<String>,
        /// Account password (prompted for when omitted)
        #[arg(long)]
        password: Option<String>,
        /// Seconds after sign-in at which to simulate user activity (repeatable)
        #[arg(long = "activity-at", value_name = "SECS")]
        activity_at: Vec<u64>,
        /// Kind of activity to simulate: mousemove, mousedown, click, keypress, scroll, touchstart
        #[arg(long, default_value = "mousemove")]
        activity_kind: ActivityKind,
        /// Stop the simulation after this many seconds
        #[arg(long, default_value_t = 90)]
        duration: u64,
        /// Keep preferences in memory instead of the preference file
        #[arg(long)]
        ephemeral: bool,
    },

    /// Inspect or change persisted session preferences
    #[command(subcommand)]
    Prefs(PrefsCommand),

    /// Print the effective configuration as JSON
    Config,
}

/// Installs the fmt subscriber once, honouring `RUST_LOG` (default `info`).
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    });
}

/// Loads the configuration file and applies command-line overrides.
///
/// # Errors
///
/// Returns an error if the configuration file cannot be read or parsed, or if
/// the resulting settings are invalid.
pub fn resolve_config(cli: &Cli) -> Result<SessionConfig> {
    let mut config = SessionConfig::load(cli.config.as_deref())?;

    if let Some(store) = &cli.store {
        config.store_path.clone_from(store);
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.inactivity_timeout_ms = timeout_ms;
    }
    if let Some(interval_ms) = cli.interval_ms {
        config.check_interval_ms = interval_ms;
    }

    config.validate()?;
    Ok(config)
}

/// # Errors
///
/// Returns an error if the configuration is invalid or the command fails.
pub async fn handle_command(cli: Cli) -> Result<()> {
    init_tracing();
    let config = resolve_config(&cli)?;

    match cli.command {
        Commands::Simulate {
            keep_logged_in,
            email,
            password,
            activity_at,
            activity_kind,
            duration,
            ephemeral,
        } => {
            let args = SimulateArgs {
                keep_logged_in,
                email,
                password,
                activity_at,
                activity_kind,
                duration,
                ephemeral,
            };
            handle_simulate_command(config, args).await?;
        }
        Commands::Prefs(cmd) => handle_prefs_command(&config, cmd)?,
        Commands::Config => println!("{}", serde_json::to_string_pretty(&config)?),
    }

    Ok(())
}

fn prompt_secret(prompt: &str) -> Result<String> {
    use std::io::{Write, stdout};
    print!("{prompt}");
    stdout().flush()?;
    // Read without echo on Windows/Linux/macOS
    let pass = rpassword::prompt_password("")?;
    Ok(pass)
}
