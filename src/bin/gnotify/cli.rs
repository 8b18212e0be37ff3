use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use gnotify::HintValue;
use gnotify::Urgency;
use gnotify::hint::parse_assignment;
use humantime::parse_duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Notifications de bureau via libnotify", long_about = None)]
pub struct Cli {
    /// Chemin du fichier de configuration TOML.
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Bibliothèque native à charger à la place de celle configurée.
    #[arg(long, value_name = "PATH", global = true)]
    pub library: Option<PathBuf>,

    /// Utilise un layer JSON pour les logs (`--features json-logs`).
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    pub json_logs: bool,

    /// Filtre de logs explicite (ex. "gnotify=debug").
    #[arg(long, value_name = "FILTER", global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Affiche une notification.
    Send(SendArgs),
    /// Liste les capacités du serveur de notifications.
    Caps {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Affiche l'identité du serveur de notifications.
    Info {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct SendArgs {
    pub summary: String,

    pub body: Option<String>,

    /// Nom ou chemin de l'icône.
    #[arg(short, long)]
    pub icon: Option<String>,

    /// low, normal ou critical.
    #[arg(short, long, value_parser = parse_urgency)]
    pub urgency: Option<Urgency>,

    /// Expiration (ex. "3s"), prioritaire sur la configuration.
    #[arg(short = 't', long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Garde la notification jusqu'à sa fermeture.
    #[arg(long, action = ArgAction::SetTrue)]
    pub sticky: bool,

    /// Catégorie de la notification (ex. "email.arrived").
    #[arg(short, long)]
    pub category: Option<String>,

    /// Hint typé, répétable.
    #[arg(long = "hint", value_name = "KEY=KIND:VALUE", value_parser = parse_hint)]
    pub hints: Vec<(String, HintValue)>,

    /// Bouton d'action, répétable. L'id choisi est affiché avec --wait.
    #[arg(short = 'A', long = "action", value_name = "ID=LABEL", value_parser = parse_action)]
    pub actions: Vec<(String, String)>,

    /// Attend une action, l'expiration ou Ctrl-C, puis ferme.
    #[arg(short, long, action = ArgAction::SetTrue)]
    pub wait: bool,

    /// Borne de --wait (par défaut : le timeout plus une marge).
    #[arg(long, value_parser = parse_duration, requires = "wait")]
    pub wait_limit: Option<Duration>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_urgency(raw: &str) -> Result<Urgency, String> {
    raw.parse()
}

fn parse_hint(raw: &str) -> Result<(String, HintValue), String> {
    let (key, value) = parse_assignment(raw)?;
    if !value.is_supported() {
        return Err(format!("unsupported hint kind {:?}", value.kind()));
    }
    Ok((key, value))
}

fn parse_action(raw: &str) -> Result<(String, String), String> {
    let (id, label) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=LABEL, got {raw:?}"))?;
    if id.trim().is_empty() {
        return Err("action id cannot be empty".to_string());
    }
    Ok((id.trim().to_string(), label.to_string()))
}
