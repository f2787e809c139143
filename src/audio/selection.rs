// Turns a file-or-directory argument into exactly one playable file
// Directories get a uniform random pick among their qualifying clips (no recursion)

use super::classifier::{DurationProbe, FileClassifier};
use crate::error::{Result, SoundError};
use rand::rngs::ThreadRng;
use rand::seq::SliceRandom;
use rand::{thread_rng, Rng};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

pub struct Selector<R = ThreadRng> {
    max_duration: u64,
    rng: R,
}

impl Selector<ThreadRng> {
    pub fn new(max_duration: u64) -> Self {
        Self::with_rng(max_duration, thread_rng())
    }
}

impl<R: Rng> Selector<R> {
    /// Inject the random source - tests use a seeded one
    pub fn with_rng(max_duration: u64, rng: R) -> Self {
        Self { max_duration, rng }
    }

    pub fn resolve<P: DurationProbe>(
        &mut self,
        input: &Path,
        classifier: &FileClassifier<P>,
    ) -> Result<PathBuf> {
        if input.is_dir() {
            return self.pick_from_directory(input, classifier);
        }

        if !input.is_file() {
            return Err(SoundError::NotFound(input.to_path_buf()));
        }

        // Direct files skip the duration check here, the engine re-checks before rendering
        if !classifier.is_supported(input) {
            return Err(SoundError::UnsupportedFormat(input.to_path_buf()));
        }

        Ok(input.to_path_buf())
    }

    /// Immediate children that are supported and under the ceiling
    pub fn qualifying_files<P: DurationProbe>(
        &self,
        dir: &Path,
        classifier: &FileClassifier<P>,
    ) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| classifier.is_supported(path))
            .collect();

        files.retain(|path| classifier.passes_duration_ceiling(path, self.max_duration));
        files
    }

    fn pick_from_directory<P: DurationProbe>(
        &mut self,
        dir: &Path,
        classifier: &FileClassifier<P>,
    ) -> Result<PathBuf> {
        let files = self.qualifying_files(dir, classifier);
        debug!("{} qualifying files in {}", files.len(), dir.display());

        let picked = files
            .choose(&mut self.rng)
            .cloned()
            .ok_or_else(|| SoundError::EmptyDirectory(dir.to_path_buf()))?;

        info!("Picked {} from {}", picked.display(), dir.display());
        Ok(picked)
    }
}
