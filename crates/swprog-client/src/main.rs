//! swprog -- follow SWUpdate progress from the command line.
//!
//! Usage:
//!   swprog                      # Attach to the default progress socket
//!   swprog --socket path        # Attach to a specific daemon instance
//!   swprog --wait --json        # Retry quietly, print events as JSON lines
//!
//! The monitor outlives daemon restarts: after a close or a failed connect it
//! builds a fresh session. Only Ctrl-C ends it.

use std::io::Write;

use clap::Parser;
use swprog_client::config::ClientConfig;
use swprog_client::monitor::{Monitor, MonitorOptions};
use swprog_client::{
    channel_subscriber, expand_tilde, resolve_socket_path, Session, SessionConfig, SessionEvent,
};
use swprog_protocol::{FrameLayout, RecoveryStatus};

#[derive(Parser)]
#[command(name = "swprog", about = "Show SWUpdate progress")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "~/.config/swprog/config.toml")]
    config: String,

    /// Path to the progress IPC socket
    #[arg(short, long, env = "SWPROG_SOCKET")]
    socket: Option<String>,

    /// Wait for the daemon without reporting failed connection attempts
    #[arg(short, long)]
    wait: bool,

    /// Do not print the progress bar
    #[arg(short, long)]
    quiet: bool,

    /// Use colors to show results
    #[arg(long)]
    color: bool,

    /// Print every event as one JSON line
    #[arg(long)]
    json: bool,

    /// Shell command run with SUCCESS or FAILURE appended when an update ends
    #[arg(short, long)]
    exec: Option<String>,
}

/// How one session ended.
#[derive(Debug)]
enum Ended {
    PeerClosed,
    Failed(String),
    Interrupted,
}

#[derive(Debug, PartialEq, Eq)]
enum Next {
    Exit,
    /// Build a new session after the reconnect delay. `report` asks for the
    /// failure to be logged as a warning.
    Reconnect { report: bool },
}

/// Every ending but Ctrl-C leads to a new session; `wait` only silences
/// failed attempts.
fn next_after(ended: &Ended, wait: bool) -> Next {
    match ended {
        Ended::Interrupted => Next::Exit,
        Ended::PeerClosed => Next::Reconnect { report: false },
        Ended::Failed(_) => Next::Reconnect { report: !wait },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs on stderr; stdout carries progress output.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "swprog_client=info,swprog_protocol=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let mut cfg = ClientConfig::load_or_default(&expand_tilde(&cli.config))?;
    if cli.socket.is_some() {
        cfg.endpoint.socket = cli.socket.clone();
    }
    cfg.monitor.wait |= cli.wait;
    cfg.monitor.quiet |= cli.quiet;
    cfg.monitor.color |= cli.color;

    let layout = cfg.layout()?;
    let socket = resolve_socket_path(cfg.endpoint.socket.as_deref());
    tracing::info!(
        socket = %socket.display(),
        width = layout.width(),
        byte_order = ?layout.byte_order(),
        "starting swprog"
    );

    let mut monitor = Monitor::new(MonitorOptions {
        quiet: cfg.monitor.quiet,
        color: cfg.monitor.color,
        byte_order: layout.byte_order(),
    });

    loop {
        let ended = follow(&cli, &socket, layout, &mut monitor).await?;
        let report = match next_after(&ended, cfg.monitor.wait) {
            Next::Exit => return Ok(()),
            Next::Reconnect { report } => report,
        };
        match &ended {
            Ended::Failed(message) if report => {
                tracing::warn!(socket = %socket.display(), error = %message, "cannot communicate with SWUpdate");
            }
            Ended::Failed(message) => {
                tracing::debug!(socket = %socket.display(), error = %message, "SWUpdate not reachable yet");
            }
            _ => {}
        }
        tracing::debug!(delay_ms = cfg.monitor.reconnect_delay_ms, "reconnecting");
        tokio::select! {
            _ = tokio::time::sleep(cfg.reconnect_delay()) => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                return Ok(());
            }
        }
    }
}

/// Run one session until it ends.
async fn follow(
    cli: &Cli,
    socket: &std::path::Path,
    layout: FrameLayout,
    monitor: &mut Monitor,
) -> anyhow::Result<Ended> {
    let (subscriber, mut events) = channel_subscriber();
    let mut session = Session::with_subscriber(
        SessionConfig::new(socket).with_layout(layout),
        subscriber,
    );
    session.connect()?;

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                session.close();
                return Ok(Ended::Interrupted);
            }
        };
        let Some(event) = event else {
            return Ok(Ended::PeerClosed);
        };

        if cli.json {
            println!("{}", serde_json::to_string(&event)?);
        }

        match event {
            SessionEvent::Connected => {}
            SessionEvent::Progress(progress) => {
                let rendered = monitor.on_progress(&progress);
                if !cli.json && !rendered.text.is_empty() {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(rendered.text.as_bytes())?;
                    stdout.flush()?;
                }
                if let (Some(status), Some(script)) = (rendered.finished, cli.exec.as_deref()) {
                    run_script(script, status).await;
                }
            }
            SessionEvent::PeerClosed => return Ok(Ended::PeerClosed),
            SessionEvent::ConnectionError { message, .. } => return Ok(Ended::Failed(message)),
        }
    }
}

/// `<script> <STATUS>` through `sh -c`, so the option may carry arguments.
fn script_command(script: &str, status: RecoveryStatus) -> tokio::process::Command {
    let mut cmd = tokio::process::Command::new("sh");
    cmd.arg("-c").arg(format!("{script} {}", status.as_str()));
    cmd
}

async fn run_script(script: &str, status: RecoveryStatus) {
    match script_command(script, status).status().await {
        Ok(exit) if exit.success() => {
            tracing::debug!(script, result = status.as_str(), "post-update script done");
        }
        Ok(exit) => {
            tracing::warn!(script, code = ?exit.code(), "post-update script failed");
        }
        Err(e) => {
            tracing::error!(script, error = %e, "cannot run post-update script");
        }
    }
}
