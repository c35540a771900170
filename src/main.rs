//! gsmon - terminal console for a self-hosted game server manager.
//!
//! This is the binary entry point. All protocol logic lives in the
//! library crates; the binary wires configuration, the API client, and a
//! session registry to a handful of subcommands.

mod render;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use gsmon_app::{SessionRegistry, Settings};
use gsmon_client::{ApiClient, ProcessStreamClient};
use gsmon_core::{OutputEvent, ProcessKind};

use render::OutputPrinter;

/// Terminal console for a self-hosted game server manager
#[derive(Parser, Debug)]
#[command(name = "gsmon")]
#[command(about = "Stream installs and game server consoles from a game server manager backend", long_about = None)]
struct Args {
    /// Backend API base URL (overrides config file and environment)
    #[arg(long, value_name = "URL")]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start installing a game and stream the install console
    Install {
        /// Game identifier known to the backend
        game_id: String,
    },

    /// Attach to a game server's live console
    Attach {
        game_id: String,

        /// Ask the backend to restart the server before attaching
        #[arg(long)]
        restart: bool,
    },

    /// Stop a game server (graceful stop sequence unless --force)
    Stop {
        game_id: String,

        /// Kill immediately, skipping the graceful stop sequence
        #[arg(long)]
        force: bool,
    },

    /// Send one line of input to a running process
    Send {
        game_id: String,
        value: String,

        /// Target the install process instead of the game server
        #[arg(long)]
        install: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    gsmon_core::logging::init()?;

    let args = Args::parse();

    let mut settings = Settings::load()?;
    if let Some(url) = args.backend {
        settings.backend_url = url;
    }

    let api = ApiClient::new(&settings.backend_url, settings.auth_token.clone())?;
    let stream = ProcessStreamClient::new(api.clone()).with_retry_policy(
        settings.stream.max_retries,
        settings.stream.retry_base_delay(),
    );

    match args.command {
        Command::Install { game_id } => {
            let message = api.start_install(&game_id).await?;
            if !message.is_empty() {
                println!("{message}");
            }
            monitor(api, stream, &game_id, ProcessKind::Install, false).await
        }
        Command::Attach { game_id, restart } => {
            monitor(api, stream, &game_id, ProcessKind::Server, restart).await
        }
        Command::Stop { game_id, force } => {
            let stopped =
                gsmon_client::terminate(&api, ProcessKind::Server, &game_id, force).await?;
            if stopped {
                println!("server '{game_id}' stopped");
                Ok(())
            } else {
                Err(eyre!("backend could not stop '{game_id}'"))
            }
        }
        Command::Send {
            game_id,
            value,
            install,
        } => {
            let kind = if install {
                ProcessKind::Install
            } else {
                ProcessKind::Server
            };
            let sent = gsmon_client::send_input(&api, kind, &game_id, &value).await?;
            if sent {
                Ok(())
            } else {
                Err(eyre!("backend refused the input"))
            }
        }
    }
}

/// Attach a session to `(game_id, kind)` and pump it until completion.
///
/// Stdin lines are forwarded to the process (answering a pending prompt
/// when one is displayed); Ctrl-C detaches without touching the process.
async fn monitor(
    api: ApiClient,
    stream: ProcessStreamClient,
    game_id: &str,
    kind: ProcessKind,
    restart: bool,
) -> Result<()> {
    info!("attaching to '{}' ({})", game_id, kind);

    let (mut registry, mut events) = SessionRegistry::new(api, stream);
    registry.create(game_id, kind)?;
    registry.connect(game_id, restart)?;

    let printer = OutputPrinter::stdout();
    let mut printed = 0;
    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some((session_id, event)) = event else { break };
                registry.apply_event(&session_id, event);
                if pump(&registry, &printer, game_id, &mut printed) {
                    break;
                }
            }
            line = stdin.next_line(), if stdin_open => {
                match line {
                    Ok(Some(value)) if !value.trim().is_empty() => {
                        if !registry.send_input(game_id, value.trim()).await {
                            eprintln!("input was not delivered");
                        }
                        pump(&registry, &printer, game_id, &mut printed);
                    }
                    Ok(Some(_)) => {}
                    Ok(None) | Err(_) => {
                        // stdin closed (piped invocation): keep streaming
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                // Detach: close the connection (cancelling any pending
                // reconnect) but leave the backend process alone.
                registry.disconnect(game_id);
                eprintln!("detached from '{game_id}'");
                return Ok(());
            }
        }
    }

    let succeeded = registry
        .get(game_id)
        .map(|session| {
            session.output.iter().rev().any(|event| {
                matches!(event, OutputEvent::Complete { succeeded: true, .. })
            })
        })
        .unwrap_or(false);

    if succeeded {
        Ok(())
    } else {
        Err(eyre!("process '{game_id}' did not complete successfully"))
    }
}

/// Render anything new on the session; returns true once nothing more can
/// arrive (completed, or dropped back to idle after a stream error).
fn pump(
    registry: &SessionRegistry,
    printer: &OutputPrinter,
    game_id: &str,
    printed: &mut usize,
) -> bool {
    let Some(session) = registry.get(game_id) else {
        return true;
    };
    printer.print_new(&session.output, printed);
    session.complete || session.is_idle()
}
