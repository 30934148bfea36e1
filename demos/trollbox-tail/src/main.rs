//! Tails a trollbox room in the terminal.
//!
//! ```text
//! trollbox-tail [nick] [server]
//! ```
//!
//! Every line typed on stdin is sent to the room; `/nick <name>` renames.
//! Set `RUST_LOG=trollbox=debug` to see the connection underneath.

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;
use trollbox::prelude::*;

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render_message(message: &ChatMessage) -> String {
    let nick = message
        .author
        .as_ref()
        .map_or(Profile::ANONYMOUS, |author| author.nick.as_str());
    match message.timestamp {
        Some(at) => format!("[{}] <{nick}> {message}", at.format("%H:%M:%S")),
        None => format!("<{nick}> {message}"),
    }
}

fn render_users(users: &[Profile]) -> String {
    let nicks: Vec<&str> = users.iter().map(|u| u.nick.as_str()).collect();
    format!("*** {} online: {}", users.len(), nicks.join(", "))
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Say(&'a str),
    Nick(&'a str),
    Nothing,
}

fn parse_line(line: &str) -> Command<'_> {
    let line = line.trim();
    if let Some(nick) = line.strip_prefix("/nick ") {
        let nick = nick.trim();
        if !nick.is_empty() {
            return Command::Nick(nick);
        }
    }
    if line.is_empty() {
        Command::Nothing
    } else {
        Command::Say(line)
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let nick = args.next().unwrap_or_else(|| Profile::ANONYMOUS.to_owned());
    let server = args.next().unwrap_or_else(|| DEFAULT_SERVER.to_owned());

    let mut trollbox = TrollboxBuilder::new()
        .server(&server)
        .nick(nick)
        .build()?;

    trollbox.on_message(|m| println!("{}", render_message(m)));
    trollbox.on_user_joined(|p| println!("*** {p} joined"));
    trollbox.on_user_left(|p| println!("*** {p} left"));
    trollbox.on_user_changed_nick(|before, after| println!("*** {before} is now {after}"));
    trollbox.on_users_updated(|users| println!("{}", render_users(users)));
    trollbox.on_error(|e| tracing::warn!(error = %e, "dropped event"));

    trollbox.open().await?;
    trollbox.connect()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let result = match parse_line(&line) {
                    Command::Say(text) => trollbox.send(text),
                    Command::Nick(nick) => trollbox.update_profile(nick),
                    Command::Nothing => Ok(()),
                };
                if let Err(e) = result {
                    tracing::warn!(error = %e, "could not send");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    trollbox.close().await?;
    Ok(())
}
