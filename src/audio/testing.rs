// Test doubles for the audio seams: a fixed device list, fixed-length clips,
// and an output that records what happened to it

use super::classifier::DurationProbe;
use super::device::{DeviceProvider, DeviceRef, DEFAULT_DEVICE_INDEX};
use super::player::{AudioBackend, DecodeStream, OutputBinding};
use super::CodecFamily;
use crate::error::{Result, SoundError};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::time::Duration;

/// Durations keyed by file name
#[derive(Debug, Clone, Default)]
pub struct FakeProbe {
    durations: HashMap<String, Duration>,
}

impl FakeProbe {
    pub fn with(mut self, file_name: &str, duration: Duration) -> Self {
        self.durations.insert(file_name.to_string(), duration);
        self
    }
}

impl DurationProbe for FakeProbe {
    fn probe_duration(&self, path: &Path) -> Result<Duration> {
        path.file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| self.durations.get(n))
            .copied()
            .ok_or_else(|| SoundError::probe(path, "unreadable container"))
    }
}

#[derive(Debug, Clone, Default)]
pub struct FakeLog {
    pub streams_opened: usize,
    pub released_streams: usize,
    pub binds: usize,
    pub released_outputs: usize,
    pub started_volume: Option<f32>,
    pub polls: usize,
}

#[derive(Debug, Clone)]
pub struct FakeDevice;

pub struct FakeBackend {
    devices: Vec<String>,
    clips: HashMap<String, Duration>,
    fail_bind: bool,
    polls_until_stopped: Option<usize>,
    log: Rc<RefCell<FakeLog>>,
}

impl FakeBackend {
    pub fn with_devices(names: &[&str]) -> Self {
        Self {
            devices: names.iter().map(|n| n.to_string()).collect(),
            clips: HashMap::new(),
            fail_bind: false,
            polls_until_stopped: Some(3),
            log: Rc::new(RefCell::new(FakeLog::default())),
        }
    }

    pub fn with_clip(mut self, name: &str, duration: Duration) -> Self {
        self.clips.insert(name.to_string(), duration);
        self
    }

    pub fn failing_bind(mut self) -> Self {
        self.fail_bind = true;
        self
    }

    pub fn never_stopping(mut self) -> Self {
        self.polls_until_stopped = None;
        self
    }

    pub fn log(&self) -> FakeLog {
        self.log.borrow().clone()
    }
}

impl DeviceProvider for FakeBackend {
    type Device = FakeDevice;

    fn list_devices(&self) -> Result<Vec<DeviceRef<FakeDevice>>> {
        Ok(self
            .devices
            .iter()
            .enumerate()
            .map(|(i, name)| DeviceRef {
                index: i as i32,
                name: name.clone(),
                handle: FakeDevice,
            })
            .collect())
    }

    fn default_device(&self) -> Result<DeviceRef<FakeDevice>> {
        Ok(DeviceRef {
            index: DEFAULT_DEVICE_INDEX,
            name: "Fake Default".to_string(),
            handle: FakeDevice,
        })
    }
}

pub struct FakeStream {
    duration: Duration,
    volume: Option<f32>,
    log: Rc<RefCell<FakeLog>>,
}

impl DecodeStream for FakeStream {
    fn total_duration(&self) -> Duration {
        self.duration
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = Some(volume);
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        self.log.borrow_mut().released_streams += 1;
    }
}

pub struct FakeOutput {
    // held until drop, like a real sink holds its source
    _stream: Option<FakeStream>,
    polls_until_stopped: Option<usize>,
    log: Rc<RefCell<FakeLog>>,
}

impl OutputBinding for FakeOutput {
    type Stream = FakeStream;

    fn start(&mut self, stream: FakeStream) -> Result<()> {
        self.log.borrow_mut().started_volume = stream.volume;
        self._stream = Some(stream);
        Ok(())
    }

    fn is_stopped(&self) -> bool {
        let mut log = self.log.borrow_mut();
        log.polls += 1;
        match self.polls_until_stopped {
            Some(limit) => log.polls >= limit,
            None => false,
        }
    }
}

impl Drop for FakeOutput {
    fn drop(&mut self) {
        self.log.borrow_mut().released_outputs += 1;
    }
}

impl AudioBackend for FakeBackend {
    type Stream = FakeStream;
    type Output = FakeOutput;

    fn open_stream(&self, path: &Path, _family: CodecFamily) -> Result<FakeStream> {
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let duration = *self
            .clips
            .get(name)
            .ok_or_else(|| SoundError::probe(path, "unreadable container"))?;

        self.log.borrow_mut().streams_opened += 1;
        Ok(FakeStream {
            duration,
            volume: None,
            log: Rc::clone(&self.log),
        })
    }

    fn bind_output(&self, _device: &DeviceRef<FakeDevice>) -> Result<FakeOutput> {
        self.log.borrow_mut().binds += 1;
        if self.fail_bind {
            return Err(SoundError::playback("device busy"));
        }
        Ok(FakeOutput {
            _stream: None,
            polls_until_stopped: self.polls_until_stopped,
            log: Rc::clone(&self.log),
        })
    }
}

/// Write a silent 8 kHz mono 16-bit PCM WAV of the given length
pub fn write_wav(path: &Path, seconds: u32) {
    let sample_rate: u32 = 8000;
    let data_len = sample_rate * seconds * 2;

    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);

    fs::write(path, bytes).unwrap();
}
