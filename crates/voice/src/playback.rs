//! Audio sinks: play synthesized replies or keep them on disk.

use async_trait::async_trait;
use ridedesk_core::error::VoiceError;
use ridedesk_core::voice::{AudioSink, SpokenAudio};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::process::Command;
use tracing::{debug, warn};

/// Writes each reply to `<dir>/reply-NNN.<ext>`.
pub struct FileSink {
    dir: PathBuf,
    counter: AtomicUsize,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl AudioSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    async fn play(&self, audio: &SpokenAudio) -> Result<(), VoiceError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        let path = self.dir.join(format!("reply-{n:03}.{}", audio.extension));
        tokio::fs::write(&path, &audio.data).await?;
        debug!(path = %path.display(), bytes = audio.data.len(), "Reply written");
        Ok(())
    }
}

/// Plays each reply through an external player (e.g. `ffplay -nodisp -autoexit`).
///
/// The audio goes to a temporary file whose path is appended to the command.
pub struct CommandSink {
    program: String,
    args: Vec<String>,
}

impl CommandSink {
    /// Returns `None` for an empty command line.
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl AudioSink for CommandSink {
    fn name(&self) -> &str {
        &self.program
    }

    async fn play(&self, audio: &SpokenAudio) -> Result<(), VoiceError> {
        let file = tempfile::Builder::new()
            .prefix("ridedesk-reply-")
            .suffix(&format!(".{}", audio.extension))
            .tempfile()?;
        tokio::fs::write(file.path(), &audio.data).await?;

        debug!(player = %self.program, "Playing reply");
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(file.path())
            .output()
            .await?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(player = %self.program, exit_code = code, "Player failed");
            return Err(VoiceError::Request {
                service: self.program.clone(),
                reason: format!("exit code {code}: {stderr}"),
            });
        }
        Ok(())
    }
}
