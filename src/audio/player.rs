use super::classifier::within_ceiling;
use super::device::{DeviceProvider, DeviceRef};
use super::{display_stem, AudioSource, CodecFamily};
use crate::error::{Result, SoundError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// How often the render loop checks whether output has drained
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Validating,
    DeviceBound,
    Rendering,
    Stopped,
    Failed,
}

impl PlaybackState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PlaybackState::Stopped | PlaybackState::Failed)
    }
}

/// A volume scalar (0.0-1.0) and whether the user asked for it explicitly
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Volume {
    /// Came from the config, counts as "unset"
    Default(f32),
    Explicit(f32),
}

impl Volume {
    pub fn scalar(&self) -> f32 {
        match self {
            Volume::Default(v) | Volume::Explicit(v) => v.clamp(0.0, 1.0),
        }
    }

    pub fn is_explicit(&self) -> bool {
        matches!(self, Volume::Explicit(_))
    }
}

/// Everything one playback needs. Built once, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackRequest {
    pub path: PathBuf,
    pub device: i32,
    pub volume: Volume,
    pub max_duration: u64,
}

/// Non-fatal notes produced while playing
#[derive(Debug, Clone, PartialEq)]
pub enum Advisory {
    VolumeIgnored { requested: f32 },
}

impl std::fmt::Display for Advisory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Advisory::VolumeIgnored { requested } => write!(
                f,
                "Warning: volume {:.0}% is ignored because ogg does not support volume",
                requested * 100.0
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Advisory(Advisory),
    Started { path: PathBuf, device_name: String },
    Finished(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackReport {
    /// What validation found out about the file before it was played
    pub source: AudioSource,
    pub device_name: String,
    /// Gain actually applied to the stream, `None` for the alternate family
    pub applied_volume: Option<f32>,
    pub advisories: Vec<Advisory>,
    pub state: PlaybackState,
}

/// A live decode handle over one file. Dropping it releases the file.
pub trait DecodeStream {
    fn total_duration(&self) -> Duration;
    fn set_volume(&mut self, volume: f32);
}

/// A bound output device. Dropping it releases the device.
pub trait OutputBinding {
    type Stream: DecodeStream;

    fn start(&mut self, stream: Self::Stream) -> Result<()>;
    fn is_stopped(&self) -> bool;
}

/// Platform plumbing the engine drives: devices, decoding, output.
pub trait AudioBackend: DeviceProvider {
    type Stream: DecodeStream;
    type Output: OutputBinding<Stream = Self::Stream>;

    fn open_stream(&self, path: &Path, family: CodecFamily) -> Result<Self::Stream>;
    fn bind_output(&self, device: &DeviceRef<Self::Device>) -> Result<Self::Output>;
}

/// Plays exactly one file to completion on a chosen device.
pub struct PlaybackEngine<B> {
    backend: B,
    poll_interval: Duration,
    cancel: Arc<AtomicBool>,
    event_sender: Option<mpsc::UnboundedSender<PlayerEvent>>,
}

impl<B: AudioBackend> PlaybackEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: Arc::new(AtomicBool::new(false)),
            event_sender: None,
        }
    }

    pub fn set_event_sender(&mut self, sender: mpsc::UnboundedSender<PlayerEvent>) {
        self.event_sender = Some(sender);
    }

    fn emit(&self, event: PlayerEvent) {
        if let Some(sender) = &self.event_sender {
            let _ = sender.send(event);
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Share a cancellation flag owned elsewhere (e.g. a ctrl-c handler)
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Flag checked by the render loop; set it from a signal handler to stop early
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Validate, bind, render and block until output stops.
    ///
    /// Duration is checked before any device output is created, so an
    /// over-long clip never makes a sound. Every resource opened along the
    /// way is owned by this frame and dropped on every return path.
    pub fn play(&self, request: &PlaybackRequest) -> Result<PlaybackReport> {
        let mut state = StateTrace::new(&request.path);

        let result = self.run(request, &mut state);
        match &result {
            Ok(_) => state.enter(PlaybackState::Stopped),
            Err(e) => {
                warn!("Playback of {} failed: {}", request.path.display(), e);
                state.enter(PlaybackState::Failed);
            }
        }
        result
    }

    fn run(&self, request: &PlaybackRequest, state: &mut StateTrace) -> Result<PlaybackReport> {
        state.enter(PlaybackState::Validating);

        let device = self.backend.resolve(request.device)?;
        debug!("Resolved device {} ({})", device.index, device.name);

        let family = CodecFamily::from_path(&request.path);
        let mut stream = self.backend.open_stream(&request.path, family)?;

        let source = AudioSource {
            path: request.path.clone(),
            family,
            duration: stream.total_duration(),
        };
        if !within_ceiling(source.duration, request.max_duration) {
            return Err(SoundError::DurationExceeded {
                path: source.path,
                duration: source.duration,
                ceiling_secs: request.max_duration,
            });
        }

        let mut advisories = Vec::new();
        let applied_volume = if source.family.supports_volume() {
            let scalar = request.volume.scalar();
            stream.set_volume(scalar);
            Some(scalar)
        } else {
            if request.volume.is_explicit() {
                let advisory = Advisory::VolumeIgnored {
                    requested: request.volume.scalar(),
                };
                warn!("{}", advisory);
                self.emit(PlayerEvent::Advisory(advisory.clone()));
                advisories.push(advisory);
            }
            None
        };

        let mut output = self.backend.bind_output(&device)?;
        state.enter(PlaybackState::DeviceBound);

        output.start(stream)?;
        state.enter(PlaybackState::Rendering);
        info!(
            "Playing audio \"{}\" on {}",
            display_stem(&request.path),
            device.name
        );
        self.emit(PlayerEvent::Started {
            path: request.path.clone(),
            device_name: device.name.clone(),
        });

        self.await_stopped(&output)?;
        self.emit(PlayerEvent::Finished(request.path.clone()));

        Ok(PlaybackReport {
            source,
            device_name: device.name,
            applied_volume,
            advisories,
            state: PlaybackState::Stopped,
        })
    }

    fn await_stopped(&self, output: &B::Output) -> Result<()> {
        while !output.is_stopped() {
            if self.cancel.load(Ordering::SeqCst) {
                return Err(SoundError::Interrupted);
            }
            std::thread::sleep(self.poll_interval);
        }
        Ok(())
    }
}

/// Logs state machine transitions for one playback
struct StateTrace {
    path: PathBuf,
    current: PlaybackState,
}

impl StateTrace {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            current: PlaybackState::Idle,
        }
    }

    fn enter(&mut self, next: PlaybackState) {
        if self.current.is_terminal() {
            return;
        }
        debug!("{}: {:?} -> {:?}", self.path.display(), self.current, next);
        self.current = next;
    }
}
