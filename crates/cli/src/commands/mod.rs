//! Subcommands and the wiring they share.

pub mod call;
pub mod chat;
pub mod doctor;
pub mod onboard;

use clap::Args;
use ridedesk_agent::{DisengagementPolicy, Reply, Session};
use ridedesk_config::AppConfig;
use ridedesk_core::error::Error;
use ridedesk_core::event::EventBus;
use ridedesk_core::identity::Identity;
use ridedesk_core::voice::AudioClip;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Output flags shared by `call` and `chat`.
#[derive(Debug, Args)]
pub struct OutputArgs {
    /// Do not play synthesized replies
    #[arg(long)]
    pub mute: bool,

    /// Write replies as numbered mp3 files into this directory
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Dump the conversation as JSON to this file when the call ends
    #[arg(long, value_name = "FILE")]
    pub transcript: Option<PathBuf>,
}

/// One passenger utterance for the session task.
pub enum Utterance {
    Audio(AudioClip),
    Text(String),
}

pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config = match path {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load()?,
    };
    if path.is_some() {
        config.apply_process_env()?;
    }
    Ok(config)
}

/// Build a session from configuration.
///
/// `voice` adds synthesis and playback unless `--mute` is set; `transcribe`
/// adds the transcriber.
pub fn build_session(
    config: &AppConfig,
    transcribe: bool,
    voice: bool,
    output: &OutputArgs,
) -> Result<(Session, Arc<EventBus>), Box<dyn std::error::Error>> {
    let provider = Arc::new(ridedesk_providers::from_config(config)?);
    let registry = Arc::new(ridedesk_actions::default_registry());
    let event_bus = Arc::new(EventBus::default());

    let identity = Identity::load(
        config.identity.system_prompt_override.as_deref(),
        Some(&config.instructions_path()),
    );
    debug!(source = %identity.source, tokens = identity.estimated_tokens(), "Identity loaded");

    let dialogue =
        ridedesk_agent::dialogue_from_config(config, provider, registry, event_bus.clone());
    let mut session = Session::new(
        &identity,
        dialogue,
        DisengagementPolicy::new(config.dialogue.max_idle_utterances),
    );

    if transcribe {
        session = session.with_transcriber(Arc::new(ridedesk_voice::transcriber_from_config(config)?));
    }
    if voice && output.mute {
        info!("Muted: replies will not be synthesized");
    } else if voice {
        let mut voice_config = config.clone();
        if let Some(dir) = &output.out_dir {
            voice_config.voice.output_dir = Some(dir.clone());
        }
        let synthesizer = Arc::new(ridedesk_voice::synthesizer_from_config(&voice_config)?);
        let sink = ridedesk_voice::sink_from_config(&voice_config);
        info!(sink = %sink.name(), voice = %config.voice.voice_id, "Voice output ready");
        session = session.with_voice(synthesizer, sink);
    }

    Ok((session, event_bus))
}

/// Log domain events at debug level.
pub fn watch_events(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            debug!(event = ?event, "Domain event");
        }
    });
}

/// Run the session on its own task, one utterance at a time.
///
/// The task ends when the input channel closes or the session ends, and
/// hands the session back for the transcript.
pub fn spawn_session(
    mut session: Session,
    mut inputs: mpsc::Receiver<Utterance>,
    prompt: bool,
) -> JoinHandle<Session> {
    tokio::spawn(async move {
        while let Some(utterance) = inputs.recv().await {
            let result = match &utterance {
                Utterance::Audio(clip) => session.handle_utterance(clip).await,
                Utterance::Text(text) => session.handle_text(text).await,
            };

            match result {
                Ok(reply) => print_reply(&reply),
                Err(Error::SessionEnded) => break,
                Err(e @ (Error::SynthesisFailed(_) | Error::Playback(_))) => {
                    warn!(error = %e, "Reply could not be spoken");
                    if let Some(text) = session.conversation().last().and_then(|t| t.text()) {
                        println!("  Agent > {text}");
                    }
                }
                Err(e) => eprintln!("  [Error] {e}"),
            }

            if session.is_ended() {
                break;
            }
            if prompt {
                prompt_user();
            }
        }
        session
    })
}

pub fn prompt_user() {
    use std::io::Write;
    print!("  You > ");
    let _ = std::io::stdout().flush();
}

fn print_reply(reply: &Reply) {
    println!("  Heard > {}", reply.heard);
    match reply.text() {
        Some(text) => {
            for line in text.lines() {
                println!("  Agent > {line}");
            }
        }
        None => println!("  Agent > (no reply)"),
    }
    println!();
}

/// Write the conversation as pretty JSON.
pub fn write_transcript(session: &Session, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let json = serde_json::to_string_pretty(session.conversation())?;
    std::fs::write(path, json)?;
    info!(path = %path.display(), turns = session.conversation().len(), "Transcript written");
    Ok(())
}
