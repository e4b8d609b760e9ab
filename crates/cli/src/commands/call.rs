//! `ridedesk call`: play a recorded call through the agent.

use ridedesk_core::voice::{AudioClip, is_supported_audio};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::warn;

use super::{OutputArgs, Utterance};

pub async fn run(
    config_path: Option<&Path>,
    clips: Vec<PathBuf>,
    output: OutputArgs,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;

    let mut playable = Vec::with_capacity(clips.len());
    for clip in clips {
        if !clip.is_file() {
            return Err(format!("No such audio file: {}", clip.display()).into());
        }
        if !is_supported_audio(&clip) {
            warn!(file = %clip.display(), "Skipping file with unsupported audio extension");
            continue;
        }
        playable.push(clip);
    }
    if playable.is_empty() {
        return Err("No playable audio clips given".into());
    }

    let (session, event_bus) = super::build_session(&config, true, true, &output)?;
    super::watch_events(&event_bus);

    let (tx, rx) = mpsc::channel(8);
    let worker = super::spawn_session(session, rx, false);

    for clip in playable {
        if tx.send(Utterance::Audio(AudioClip::from_path(clip))).await.is_err() {
            // The session ended early.
            break;
        }
    }
    drop(tx);

    let session = worker.await?;
    if session.is_ended() {
        println!("  Call ended by the agent.");
    }
    if let Some(path) = &output.transcript {
        super::write_transcript(&session, path)?;
    }
    Ok(())
}
