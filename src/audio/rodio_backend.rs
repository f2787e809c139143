// Real audio backend - cpal (through rodio's re-export) for output endpoints
// rodio decodes the file and renders it into a sink on the chosen device

use super::classifier::{DurationProbe, SymphoniaProbe};
use super::device::{DeviceProvider, DeviceRef, DEFAULT_DEVICE_INDEX};
use super::player::{AudioBackend, DecodeStream, OutputBinding};
use super::CodecFamily;
use crate::error::{Result, SoundError};
use rodio::cpal::traits::{DeviceTrait, HostTrait};
use rodio::{cpal, Decoder, OutputStream, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub struct RodioBackend {
    host: cpal::Host,
}

impl RodioBackend {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }
}

impl Default for RodioBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn device_name(device: &cpal::Device) -> String {
    device.name().unwrap_or_else(|_| "Unknown device".to_string())
}

impl DeviceProvider for RodioBackend {
    type Device = cpal::Device;

    fn list_devices(&self) -> Result<Vec<DeviceRef<cpal::Device>>> {
        let devices = self
            .host
            .output_devices()
            .map_err(|e| SoundError::playback(format!("No output devices: {}", e)))?;

        Ok(devices
            .enumerate()
            .map(|(i, device)| DeviceRef {
                index: i as i32,
                name: device_name(&device),
                handle: device,
            })
            .collect())
    }

    fn default_device(&self) -> Result<DeviceRef<cpal::Device>> {
        let device = self
            .host
            .default_output_device()
            .ok_or_else(|| SoundError::playback("No default output device"))?;

        Ok(DeviceRef {
            index: DEFAULT_DEVICE_INDEX,
            name: device_name(&device),
            handle: device,
        })
    }
}

pub struct RodioStream {
    source: Decoder<BufReader<File>>,
    duration: Duration,
    volume: Option<f32>,
}

impl DecodeStream for RodioStream {
    fn total_duration(&self) -> Duration {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = Some(volume);
    }
}

pub struct RodioOutput {
    // sink before stream: stop rendering, then close the device
    sink: Sink,
    _stream: OutputStream,
}

impl OutputBinding for RodioOutput {
    type Stream = RodioStream;

    fn start(&mut self, stream: RodioStream) -> Result<()> {
        let source: Box<dyn Source<Item = i16> + Send> = match stream.volume {
            Some(volume) => Box::new(stream.source.amplify(volume)),
            None => Box::new(stream.source),
        };

        self.sink.append(source);
        self.sink.play();
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        self.sink.empty()
    }
}

impl AudioBackend for RodioBackend {
    type Stream = RodioStream;
    type Output = RodioOutput;

    fn open_stream(&self, path: &Path, family: CodecFamily) -> Result<RodioStream> {
        debug!("Opening {:?} stream for {}", family, path.display());

        let file = File::open(path)
            .map_err(|e| SoundError::playback(format!("Failed to open audio file: {}", e)))?;

        let source = Decoder::new(BufReader::new(file)).map_err(|e| {
            SoundError::playback(format!(
                "Failed to decode audio file '{}': {}",
                path.display(),
                e
            ))
        })?;

        // Not every decoder knows its length up front - fall back to the container
        let duration = match source.total_duration() {
            Some(duration) => duration,
            None => SymphoniaProbe.probe_duration(path)?,
        };

        Ok(RodioStream {
            source,
            duration,
            volume: None,
        })
    }

    fn bind_output(&self, device: &DeviceRef<cpal::Device>) -> Result<RodioOutput> {
        let (stream, handle) = OutputStream::try_from_device(&device.handle).map_err(|e| {
            SoundError::playback(format!("Failed to open output '{}': {}", device.name, e))
        })?;

        let sink = Sink::try_new(&handle)
            .map_err(|e| SoundError::playback(format!("Failed to create sink: {}", e)))?;
        sink.pause();

        Ok(RodioOutput {
            sink,
            _stream: stream,
        })
    }
}
