#[path = "gnotify/app.rs"]
mod app;
#[path = "gnotify/cli.rs"]
mod cli;

use std::process::ExitCode;

// Les handles restent sur le thread qui les a créés ; le contexte GLib est
// pompé depuis ce même thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = cli::Cli::parse_args();
    match app::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_error(&err);
            ExitCode::from(1)
        }
    }
}

fn report_error(err: &anyhow::Error) {
    eprintln!("Error: {err}");
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {cause}");
    }
}
