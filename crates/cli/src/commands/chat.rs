//! `ridedesk chat`: talk to the agent by typing.

use std::io::BufRead;
use std::path::Path;
use tokio::sync::mpsc;

use super::{OutputArgs, Utterance};

pub async fn run(
    config_path: Option<&Path>,
    speak: bool,
    output: OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let (session, event_bus) = super::build_session(&config, false, speak, &output)?;
    super::watch_events(&event_bus);

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          RideDesk — Text Booking Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Model:     {}", config.generation.model);
    println!("  Actions:   geocode, create_new_reservation");
    println!("  Voice:     {}", if session.speaks() { "on" } else { "off" });
    println!();
    println!("  Type what the passenger says and press Enter.");
    println!("  Type 'exit' or Ctrl+D to hang up.");
    println!();

    let (tx, rx) = mpsc::channel(32);

    // Plain thread so a pending stdin read never holds up shutdown.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim().to_string();
            if line.is_empty() {
                super::prompt_user();
                continue;
            }
            if matches!(line.as_str(), "exit" | "quit" | "/exit" | "/quit" | ":q") {
                break;
            }
            if tx.blocking_send(Utterance::Text(line)).is_err() {
                break;
            }
        }
    });

    super::prompt_user();
    let session = super::spawn_session(session, rx, true).await?;

    println!();
    if session.is_ended() {
        println!("  The agent ended the call.");
    }
    println!("  Goodbye!");
    println!();

    if let Some(path) = &output.transcript {
        super::write_transcript(&session, path)?;
    }
    Ok(())
}
