use crate::utils::format_millis;
use color_eyre::Result;
use color_eyre::eyre::eyre;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;
use warden_session::{
    ActivityKind, AuthGuard, EventSurface, FileStore, GuardDecision, MemoryStore, MockAuthClient, MonitorStatus,
    PolicyOutcome, PreferenceStore, RecordingNavigator, SessionCollaborators, SessionConfig, SessionMonitor,
    SignInRequest, SystemClock, sign_in,
};

#[derive(Debug, Clone)]
pub struct SimulateArgs {
    pub keep_logged_in: bool,
    pub email: Option<String>,
    pub password: Option<String>,
    pub activity_at: Vec<u64>,
    pub activity_kind: ActivityKind,
    pub duration: u64,
    pub ephemeral: bool,
}

/// Signs in, mounts the dashboard's session monitor and feeds it synthetic
/// activity until the watchdog signs the session out or the simulation ends.
///
/// # Errors
///
/// Returns an error if the password prompt fails or the sign-in is rejected.
pub async fn handle_simulate_command(config: SessionConfig, args: SimulateArgs) -> Result<()> {
    let store: Arc<dyn PreferenceStore> = if args.ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::open(&config.store_path))
    };
    let surface = Arc::new(EventSurface::new());
    let navigator = Arc::new(RecordingNavigator::new());
    let auth = Arc::new(MockAuthClient::new(&config.demo_email, &config.demo_password));

    let monitor = SessionMonitor::new(
        config.clone(),
        SessionCollaborators {
            store,
            auth,
            navigator: navigator.clone(),
            surface: surface.clone(),
            clock: Arc::new(SystemClock::new()),
        },
    );

    let email = args.email.unwrap_or_else(|| config.demo_email.clone());
    let password = match args.password {
        Some(password) => password,
        None => crate::prompt_secret(&format!("Password for {email}: "))?,
    };

    let request = SignInRequest {
        email,
        password,
        keep_logged_in: args.keep_logged_in,
    };
    let outcome = sign_in(&monitor, &request)
        .await
        .map_err(|e| eyre!("Sign-in failed: {e}"))?;

    println!("✅ Signed in as {}", outcome.session.user.email);
    match outcome.policy {
        PolicyOutcome::KeptLoggedIn { .. } => println!("🔓 Keep logged in: inactivity timeout disabled"),
        PolicyOutcome::Armed | PolicyOutcome::AlreadyArmed => println!(
            "⏳ Signing out after {} of inactivity (checked every {})",
            format_millis(i64::try_from(config.inactivity_timeout_ms).unwrap_or(i64::MAX)),
            format_millis(i64::try_from(config.check_interval_ms).unwrap_or(i64::MAX)),
        ),
        PolicyOutcome::MonitorStopped => return Err(eyre!("Session monitor stopped before sign-in completed")),
        PolicyOutcome::NotArmed => return Err(eyre!("Inactivity timeout could not be armed")),
    }

    // Dashboard mount: the guard admits the user and the layout starts the monitor.
    if let GuardDecision::Allow(user) = AuthGuard::for_monitor(&monitor).check().await {
        info!("Dashboard opened for {}", user.email);
    }
    let status = monitor.start();
    match status {
        MonitorStatus::Stopped => {
            return Err(eyre!("Session monitor was torn down before the dashboard mounted"));
        }
        MonitorStatus::NoRuntime => return Err(eyre!("Session monitor needs a tokio runtime")),
        MonitorStatus::Armed | MonitorStatus::Disarmed | MonitorStatus::AlreadyRunning => {}
    }
    info!("Session monitor on mount: {status:?}");

    let started = Instant::now();
    let activity = spawn_activity(Arc::clone(&surface), started, args.activity_at, args.activity_kind);

    tokio::select! {
        url = navigator.wait_for_hard_redirect() => {
            println!(
                "🔒 Session timed out {} after sign-in; redirected to {url}",
                format_millis(i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)),
            );
        }
        () = tokio::time::sleep(Duration::from_secs(args.duration)) => {
            print!("⏱️  Simulation ended after {}s with the session still active", args.duration);
            match monitor.time_until_logout() {
                Some(remaining) => println!(" ({} until timeout)", format_millis(remaining.num_milliseconds())),
                None => println!(),
            }
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Shutdown signal received");
            println!("👋 Simulation interrupted");
        }
    }

    activity.abort();
    // Leaving the page tears the monitor down.
    monitor.stop();
    Ok(())
}

fn spawn_activity(
    surface: Arc<EventSurface>,
    started: Instant,
    mut offsets: Vec<u64>,
    kind: ActivityKind,
) -> tokio::task::JoinHandle<()> {
    offsets.sort_unstable();
    tokio::spawn(async move {
        for secs in offsets {
            tokio::time::sleep_until(started + Duration::from_secs(secs)).await;
            let delivered = surface.dispatch(kind);
            println!("🖱️  {kind} at {secs}s ({delivered} listener{})", if delivered == 1 { "" } else { "s" });
        }
    })
}
