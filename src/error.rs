// Error taxonomy for the whole crate
// Every failure is terminal for one invocation - the CLI prints it and exits non-zero

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T, E = SoundError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum SoundError {
    #[error("File/directory not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("No playable audio files found in {}", .0.display())]
    EmptyDirectory(PathBuf),

    #[error("Can't play because {} is not supported", display_name(.0))]
    UnsupportedFormat(PathBuf),

    #[error(
        "Audio file {} is too long ({:.1}s). Maximum duration is {} seconds",
        display_name(.path),
        .duration.as_secs_f64(),
        .ceiling_secs
    )]
    DurationExceeded {
        path: PathBuf,
        duration: Duration,
        ceiling_secs: u64,
    },

    #[error("Invalid device index {index} ({available} devices available), use --list-device to see them")]
    DeviceNotFound { index: i32, available: usize },

    #[error("Failed to read audio metadata from {}: {reason}", .path.display())]
    Probe { path: PathBuf, reason: String },

    #[error("Playback failed: {0}")]
    Playback(String),

    #[error("Playback interrupted")]
    Interrupted,

    #[error("Config error: {0}")]
    Config(String),

    #[error("Failed to write launcher scripts: {0}")]
    Script(String),
}

impl SoundError {
    pub fn probe(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SoundError::Probe {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn playback(reason: impl ToString) -> Self {
        SoundError::Playback(reason.to_string())
    }
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
