use crate::utils::format_relative_time;
use chrono::Utc;
use clap::Subcommand;
use color_eyre::Result;
use warden_session::store::{KEEP_LOGGED_IN_KEY, load_last_activity};
use warden_session::{FileStore, PreferenceStore, SessionConfig, SessionPreference};

#[derive(Subcommand, Debug)]
pub enum PrefsCommand {
    /// Show the persisted session preferences
    Show,
    /// Persist the "keep me logged in" choice without signing in
    SetKeepLoggedIn {
        /// true disables the inactivity timeout for the next session
        #[arg(action = clap::ArgAction::Set)]
        value: bool,
    },
    /// Remove every persisted preference
    Clear,
}

/// # Errors
///
/// Returns an error if the preference file cannot be written.
pub fn handle_prefs_command(config: &SessionConfig, cmd: PrefsCommand) -> Result<()> {
    let store = FileStore::open(&config.store_path);

    match cmd {
        PrefsCommand::Show => {
            for line in describe_preferences(&store) {
                println!("{line}");
            }
        }
        PrefsCommand::SetKeepLoggedIn { value } => {
            SessionPreference { keep_logged_in: value }.save(&store)?;
            if value {
                println!("Keep logged in enabled; the next session will not time out");
            } else {
                println!("Keep logged in disabled; sessions time out after inactivity");
            }
        }
        PrefsCommand::Clear => {
            store.clear()?;
            println!("Cleared preferences at {}", store.path().display());
        }
    }
    Ok(())
}

fn describe_preferences(store: &FileStore) -> Vec<String> {
    let mut lines = vec![format!("Preference file: {}", store.path().display())];

    let raw = store.get(KEEP_LOGGED_IN_KEY);
    let effective = SessionPreference::load(store).keep_logged_in;
    lines.push(format!(
        "  {KEEP_LOGGED_IN_KEY}: {} (effective: {effective})",
        raw.as_deref().unwrap_or("<unset>")
    ));

    // Stamped when a timed session signs in; not refreshed by later activity.
    match load_last_activity(store) {
        Some(at) => lines.push(format!(
            "  lastActivity: {} (signed in {})",
            at.to_rfc3339(),
            format_relative_time(at, Utc::now())
        )),
        None => lines.push("  lastActivity: <unset>".to_string()),
    }
    lines
}
