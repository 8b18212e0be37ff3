use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use gnotify::config::{Config, NotifySettings};
use gnotify::error::Error as NotifyError;
use gnotify::telemetry::init_tracing;
use gnotify::{ClosedReason, Notification, Notifier, Timeout};
use tokio::signal;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::TryRecvError, unbounded_channel};
use tokio::time::{Instant, interval};
use tracing::{debug, info, warn};

use super::cli::{Cli, Command, SendArgs};

const DEFAULT_CONFIG: &str = "gnotify.toml";
const DISPATCH_INTERVAL: Duration = Duration::from_millis(50);
const DEFAULT_WAIT: Duration = Duration::from_secs(30);
const EXPIRY_GRACE: Duration = Duration::from_secs(1);

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = Config::from_env_and_file(&config_path)
        .with_context(|| format!("loading configuration from {}", config_path.display()))?;
    if let Some(library) = cli.library {
        config.library = library;
    }

    let notifier = Notifier::load_from(&config.library)?;
    if !notifier.init(&config.notify.app_name)? {
        return Err(NotifyError::Init {
            app_name: config.notify.app_name,
        }
        .into());
    }

    let outcome = match cli.command {
        Command::Send(args) => send(&notifier, &config.notify, args).await,
        Command::Caps { json } => print_caps(&notifier, json),
        Command::Info { json } => print_info(&notifier, json),
    };

    notifier.uninit();
    outcome
}

#[derive(Debug)]
enum WaitOutcome {
    Action(String),
    Closed(ClosedReason),
    TimedOut,
    Interrupted,
}

async fn send(notifier: &Notifier, settings: &NotifySettings, args: SendArgs) -> Result<()> {
    let icon = args.icon.clone().or_else(|| {
        settings
            .icon
            .as_ref()
            .map(|path| path.to_string_lossy().into_owned())
    });
    let notification = notifier
        .new_notification(&args.summary, args.body.as_deref(), icon.as_deref())
        .context("failed to create notification")?;

    let timeout = if args.sticky {
        Timeout::Never
    } else {
        args.timeout.map_or_else(|| settings.timeout(), Timeout::from)
    };
    notification.set_timeout(timeout);
    notification.set_urgency(args.urgency.unwrap_or(settings.urgency));
    if let Some(category) = args.category.as_deref().or(settings.category.as_deref()) {
        notification.set_category(category)?;
    }
    for (key, value) in settings.hints.iter().chain(args.hints.iter().map(|(k, v)| (k, v))) {
        notification.set_hint(key, value)?;
    }

    let (tx, mut rx) = unbounded_channel();
    for (id, label) in &args.actions {
        notification.add_action(id, label, forward_action, tx.clone())?;
    }
    // Seules les actions enregistrées gardent le canal ouvert.
    drop(tx);

    notification
        .show()
        .context("notification server rejected the notification")?;
    info!(summary = %args.summary, ?timeout, actions = args.actions.len(), "notification shown");

    if !args.wait {
        return Ok(());
    }

    let limit = args.wait_limit.or_else(|| wait_limit(timeout));
    match wait_for_outcome(notifier, &notification, &mut rx, limit).await {
        WaitOutcome::Action(action) => {
            println!("{action}");
            close_quietly(&notification);
        }
        WaitOutcome::Closed(reason) => {
            debug!(?reason, "notification closed by the server");
        }
        outcome @ (WaitOutcome::TimedOut | WaitOutcome::Interrupted) => {
            info!(?outcome, "no interaction, closing notification");
            close_quietly(&notification);
        }
    }
    Ok(())
}

fn forward_action(_: &Notification, action: &str, tx: &mut UnboundedSender<String>) {
    if tx.send(action.to_string()).is_err() {
        debug!(action, "action reported after the sender stopped listening");
    }
}

fn close_quietly(notification: &Notification) {
    if let Err(err) = notification.close() {
        warn!(error = %err, "failed to close notification");
    }
}

fn wait_limit(timeout: Timeout) -> Option<Duration> {
    match timeout {
        Timeout::Default => Some(DEFAULT_WAIT),
        Timeout::Never => None,
        Timeout::Milliseconds(ms) => Some(Duration::from_millis(u64::from(ms)) + EXPIRY_GRACE),
    }
}

async fn wait_for_outcome(
    notifier: &Notifier,
    notification: &Notification,
    rx: &mut UnboundedReceiver<String>,
    limit: Option<Duration>,
) -> WaitOutcome {
    let deadline = limit.map(|limit| Instant::now() + limit);
    let mut ticker = interval(DISPATCH_INTERVAL);

    loop {
        tokio::select! {
            biased;
            _ = signal::ctrl_c() => return WaitOutcome::Interrupted,
            _ = ticker.tick() => {
                while notifier.dispatch_pending() {}

                // Un clic ferme souvent la notification dans le même
                // dispatch : on regarde d'abord l'action.
                match rx.try_recv() {
                    Ok(action) => return WaitOutcome::Action(action),
                    Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
                }
                let reason = notification.closed_reason();
                if reason.is_closed() {
                    return WaitOutcome::Closed(reason);
                }
                if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                    return WaitOutcome::TimedOut;
                }
            }
        }
    }
}

fn print_caps(notifier: &Notifier, json: bool) -> Result<()> {
    let caps = notifier.server_caps();
    if json {
        println!("{}", serde_json::to_string_pretty(&caps)?);
    } else if caps.is_empty() {
        warn!("notification server advertised no capabilities");
    } else {
        for cap in caps {
            println!("{cap}");
        }
    }
    Ok(())
}

fn print_info(notifier: &Notifier, json: bool) -> Result<()> {
    let Some(info) = notifier.server_info() else {
        anyhow::bail!("notification server did not report its identity");
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Name:         {}", info.name);
        println!("Vendor:       {}", info.vendor);
        println!("Version:      {}", info.version);
        println!("Spec version: {}", info.spec_version);
    }
    Ok(())
}
