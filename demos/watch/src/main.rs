//! Follows a razchess room from the terminal.
//!
//! Prints the opening and status line for every update and exits when the
//! game is over (or on Ctrl-C).
//!
//! ```text
//! cargo run -p watch -- https://chess.example.com/room/abc123
//! ```

use std::time::Duration;

use clap::Parser;
use razchess::prelude::*;
use tokio::sync::broadcast::error::RecvError;

/// Watch a razchess game live
#[derive(Parser, Debug)]
#[command(name = "watch")]
#[command(version)]
struct Cli {
    /// Session link, e.g. https://host/room/{id}
    session_url: String,

    /// Milliseconds to wait before redialing a lost connection
    #[arg(long, default_value = "1000")]
    reconnect_ms: u64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "watch=info,razchess=warn")]
    log: String,
}

/// One line per update, shaped like the in-browser status bar.
fn status_line(update: &GameUpdate) -> String {
    match &update.opening {
        Some(opening) => format!("{opening} - {}", update.status),
        None => update.status.clone(),
    }
}

#[tokio::main]
async fn main() -> Result<(), RazchessError> {
    let cli = Cli::parse();
    razchess::init_tracing(&cli.log);

    let session = ClientBuilder::new()
        .session_url(&cli.session_url)
        .reconnect_delay(Duration::from_millis(cli.reconnect_ms))
        .connect()?;
    let mut events = session.subscribe();
    tracing::info!(room = %session.room(), "watching");

    loop {
        let event = tokio::select! {
            event = events.recv() => event,
            _ = tokio::signal::ctrl_c() => break,
        };

        match event {
            Ok(SessionEvent::Updated(transition)) => {
                let update = &transition.current;
                println!("{}", status_line(update));
                if let Some((from, to)) = update.last_move {
                    tracing::debug!(%from, %to, sound = ?transition.sound, "last move");
                }
                if update.is_game_over {
                    println!("{}", update.pgn);
                    break;
                }
            }
            Ok(SessionEvent::Disconnected) => println!("Disconnected"),
            Ok(SessionEvent::ViewersChanged(count)) => {
                tracing::info!(count, "viewers changed");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "fell behind, some updates were skipped");
            }
            Err(RecvError::Closed) => break,
        }
    }

    session.close().await;
    Ok(())
}
