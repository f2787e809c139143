pub mod classifier;
pub mod device;
pub mod player;
#[cfg(feature = "audio")]
pub mod rodio_backend;
pub mod selection;
#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{DurationProbe, FileClassifier, SymphoniaProbe};
pub use device::{DeviceProvider, DeviceRef, DEFAULT_DEVICE_INDEX};
pub use player::{
    Advisory, AudioBackend, DecodeStream, OutputBinding, PlaybackEngine, PlaybackReport,
    PlaybackRequest, PlaybackState, PlayerEvent, Volume,
};
#[cfg(feature = "audio")]
pub use rodio_backend::RodioBackend;
pub use selection::Selector;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Extensions the generic decoder handles
pub const STANDARD_EXTENSIONS: &[&str] = &[
    "mp3",  // MPEG-1 Audio Layer 3
    "mp2",  // MPEG-1 Audio Layer 2
    "aac",  // Advanced Audio Coding
    "m4a",  // AAC in MP4 container
    "flac", // Free Lossless Audio Codec
    "alac", // Apple Lossless Audio Codec
    "wav",  // Waveform Audio File Format
    "wma",  // Windows Media Audio
    "3gp",  // 3GPP multimedia file
    "3g2",  // 3GPP2 multimedia file
    "amr",  // Adaptive Multi-Rate audio
];

/// The one extension only the alternate decoder handles
pub const ALTERNATE_EXTENSION: &str = "ogg";

/// Which decoder a file goes through. Only the standard family has a gain stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecFamily {
    Standard,
    Alternate,
}

impl CodecFamily {
    pub fn from_path(path: &Path) -> Self {
        match lowercase_extension(path) {
            Some(ext) if ext == ALTERNATE_EXTENSION => CodecFamily::Alternate,
            _ => CodecFamily::Standard,
        }
    }

    pub fn supports_volume(&self) -> bool {
        matches!(self, CodecFamily::Standard)
    }
}

/// What probing a file tells us before anything is played
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSource {
    pub path: PathBuf,
    pub family: CodecFamily,
    pub duration: Duration,
}

pub(crate) fn lowercase_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// File name without extension, for "Playing ..." messages and launcher names
pub fn display_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_family_from_extension() {
        assert_eq!(CodecFamily::from_path(Path::new("a/b.OGG")), CodecFamily::Alternate);
        assert_eq!(CodecFamily::from_path(Path::new("clip.mp3")), CodecFamily::Standard);
        assert_eq!(CodecFamily::from_path(Path::new("no_extension")), CodecFamily::Standard);
        assert!(!CodecFamily::Alternate.supports_volume());
    }

    #[test]
    fn test_display_stem() {
        assert_eq!(display_stem(Path::new("/x/airhorn.wav")), "airhorn");
    }
}
