use super::{lowercase_extension, ALTERNATE_EXTENSION, STANDARD_EXTENSIONS};
use crate::config::Config;
use crate::error::{Result, SoundError};
use std::fs::File;
use std::path::Path;
use std::time::Duration;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;
use tracing::{debug, warn};

/// Reads total duration from a file's container without decoding it.
pub trait DurationProbe {
    fn probe_duration(&self, path: &Path) -> Result<Duration>;

    /// Like `probe_duration`, but may stop early once the file is known to
    /// reach `ceiling_secs`. The result is then only a lower bound.
    fn probe_duration_capped(&self, path: &Path, _ceiling_secs: u64) -> Result<Duration> {
        self.probe_duration(path)
    }
}

/// Duration probing using the symphonia demuxers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn probe_duration(&self, path: &Path) -> Result<Duration> {
        symphonia_duration(path, None)
    }

    fn probe_duration_capped(&self, path: &Path, ceiling_secs: u64) -> Result<Duration> {
        symphonia_duration(path, Some(ceiling_secs))
    }
}

fn symphonia_duration(path: &Path, ceiling_secs: Option<u64>) -> Result<Duration> {
    let file = File::open(path).map_err(|e| SoundError::probe(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|ext| ext.to_str()) {
        hint.with_extension(extension);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| SoundError::probe(path, e))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| SoundError::probe(path, "no supported audio tracks found"))?;

    let track_id = track.id;
    let params = track.codec_params.clone();

    if let Some(n_frames) = params.n_frames {
        if let Some(time_base) = params.time_base {
            let time = time_base.calc_time(n_frames);
            return Ok(Duration::from_secs_f64(time.seconds as f64 + time.frac));
        }
        if let Some(rate) = params.sample_rate.filter(|r| *r > 0) {
            return Ok(Duration::from_secs_f64(n_frames as f64 / rate as f64));
        }
    }

    // No frame count in the header - walk the packets (demux only, nothing is decoded)
    let time_base = params
        .time_base
        .ok_or_else(|| SoundError::probe(path, "could not determine duration"))?;

    let stop_at = ceiling_secs.and_then(|secs| ceiling_timestamp(secs, time_base));
    let packets = std::iter::from_fn(|| format.next_packet().ok())
        .filter(|packet| packet.track_id() == track_id)
        .map(|packet| packet.dur);
    let total_ts = sum_packet_durations(packets, stop_at);

    if total_ts == 0 {
        return Err(SoundError::probe(path, "could not determine duration"));
    }

    let time = time_base.calc_time(total_ts);
    Ok(Duration::from_secs_f64(time.seconds as f64 + time.frac))
}

/// First timestamp at or past `secs`, rounded up so a capped walk never lands under the ceiling
fn ceiling_timestamp(secs: u64, time_base: TimeBase) -> Option<u64> {
    let numer = u64::from(time_base.numer);
    if numer == 0 {
        return None;
    }
    secs.checked_mul(u64::from(time_base.denom))
        .and_then(|ts| ts.checked_add(numer - 1))
        .map(|ts| ts / numer)
}

/// Sum packet durations, stopping as soon as the total reaches `stop_at`
fn sum_packet_durations<I: Iterator<Item = u64>>(durations: I, stop_at: Option<u64>) -> u64 {
    let mut total: u64 = 0;
    for dur in durations {
        total = total.saturating_add(dur);
        if stop_at.map_or(false, |limit| total >= limit) {
            break;
        }
    }
    total
}

/// Decides whether a file can be played at all, and whether it is short enough.
#[derive(Debug, Clone)]
pub struct FileClassifier<P = SymphoniaProbe> {
    alternate_enabled: bool,
    probe: P,
}

impl FileClassifier<SymphoniaProbe> {
    pub fn new(config: &Config) -> Self {
        Self::with_probe(config.ogg_support, SymphoniaProbe)
    }
}

impl<P: DurationProbe> FileClassifier<P> {
    pub fn with_probe(alternate_enabled: bool, probe: P) -> Self {
        Self {
            alternate_enabled,
            probe,
        }
    }

    /// Case-insensitive extension check against the active format set
    pub fn is_supported(&self, path: &Path) -> bool {
        match lowercase_extension(path) {
            Some(ext) if ext == ALTERNATE_EXTENSION => self.alternate_enabled,
            Some(ext) => STANDARD_EXTENSIONS.contains(&ext.as_str()),
            None => false,
        }
    }

    pub fn probe_duration(&self, path: &Path) -> Result<Duration> {
        self.probe.probe_duration(path)
    }

    /// True only when the file is strictly shorter than the ceiling.
    /// Unreadable files never pass.
    pub fn passes_duration_ceiling(&self, path: &Path, ceiling_secs: u64) -> bool {
        match self.probe.probe_duration_capped(path, ceiling_secs) {
            Ok(duration) => {
                let passes = within_ceiling(duration, ceiling_secs);
                debug!(
                    "{} is {:.2}s (ceiling {}s, passes: {})",
                    path.display(),
                    duration.as_secs_f64(),
                    ceiling_secs,
                    passes
                );
                passes
            }
            Err(e) => {
                warn!("Error checking audio duration: {}", e);
                false
            }
        }
    }
}

pub fn within_ceiling(duration: Duration, ceiling_secs: u64) -> bool {
    duration < Duration::from_secs(ceiling_secs)
}
