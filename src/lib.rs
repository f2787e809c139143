// Soundmand Library - core pieces of the command-line soundboard
// The binary is just argument parsing wrapped around these

pub mod audio;   // devices, format checks, clip selection, playback
pub mod config;  // settings file
pub mod error;   // one error type for everything
pub mod scripts; // .bat/.vbs launcher generation

// Export the stuff the binary actually uses
pub use audio::{FileClassifier, PlaybackEngine, PlaybackRequest, Selector, Volume};
pub use config::Config;
pub use error::{Result, SoundError};
