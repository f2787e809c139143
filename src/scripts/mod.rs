// Launcher scripts - a .bat that replays a clip and a .vbs that runs the .bat without a console window
// Bind the .vbs to a hotkey or stream deck button and you have a soundboard

use crate::audio::classifier::{within_ceiling, DurationProbe, FileClassifier};
use crate::audio::{display_stem, DEFAULT_DEVICE_INDEX};
use crate::config::{exe_dir, Config};
use crate::error::{Result, SoundError};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// What launchers call when the executable is expected on PATH
pub const LAUNCHER_EXE: &str = "soundmand.exe";

#[derive(Debug, Clone, PartialEq)]
pub struct LauncherScripts {
    pub bat: String,
    pub vbs: String,
}

impl LauncherScripts {
    pub fn build(target: &Path, exe: &str, device: i32, volume: f32) -> Self {
        let mut bat = format!("\"{}\" play", exe);
        if device > DEFAULT_DEVICE_INDEX {
            bat.push_str(&format!(" --device {}", device));
        }
        if volume < 1.0 {
            bat.push_str(&format!(" --volume {}", (volume.clamp(0.0, 1.0) * 100.0).round() as u32));
        }
        bat.push_str(&format!(" \"{}\"", target.display()));

        let vbs = vbs_wrapper(&bat);
        Self { bat, vbs }
    }

    /// Write `<stem>.bat` and `<stem>.vbs` into `dir`, creating it if needed
    pub fn write(&self, dir: &Path, stem: &str) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(dir).map_err(|e| SoundError::Script(format!("{}: {}", dir.display(), e)))?;

        let bat_path = dir.join(format!("{}.bat", stem));
        let vbs_path = dir.join(format!("{}.vbs", stem));
        write_script(&bat_path, &self.bat)?;
        write_script(&vbs_path, &self.vbs)?;

        Ok((bat_path, vbs_path))
    }
}

fn vbs_wrapper(bat: &str) -> String {
    format!(
        "CreateObject(\"WScript.Shell\").Run \"{}\", 0",
        bat.replace('"', "\"\"")
    )
}

fn write_script(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content).map_err(|e| SoundError::Script(format!("{}: {}", path.display(), e)))
}

/// Executable reference baked into launchers
pub fn launcher_exe(config: &Config) -> String {
    if config.portable_mode {
        if let Ok(exe) = std::env::current_exe() {
            return exe.display().to_string();
        }
    }
    LAUNCHER_EXE.to_string()
}

/// Where launchers go when no output directory was given
pub fn default_save_dir(config: &Config) -> PathBuf {
    if config.portable_mode {
        exe_dir()
            .map(|dir| dir.join("..").join("save"))
            .unwrap_or_else(|| PathBuf::from("save"))
    } else {
        config.save_path.clone()
    }
}

/// A launcher target must exist; a single file must also be playable right now.
/// Directories are resolved at replay time, so they are taken as-is.
pub fn check_target<P: DurationProbe>(
    target: &Path,
    classifier: &FileClassifier<P>,
    max_duration: u64,
) -> Result<()> {
    if target.is_dir() {
        return Ok(());
    }
    if !target.is_file() {
        return Err(SoundError::NotFound(target.to_path_buf()));
    }
    if !classifier.is_supported(target) {
        return Err(SoundError::UnsupportedFormat(target.to_path_buf()));
    }

    let duration = classifier.probe_duration(target)?;
    if !within_ceiling(duration, max_duration) {
        return Err(SoundError::DurationExceeded {
            path: target.to_path_buf(),
            duration,
            ceiling_secs: max_duration,
        });
    }
    Ok(())
}

/// Generate and write the launcher pair for `target`.
///
/// Returns the directory the scripts landed in.
pub fn save_launchers(
    target: &Path,
    output_dir: Option<&Path>,
    exe: &str,
    device: i32,
    volume: f32,
    config: &Config,
) -> Result<PathBuf> {
    let dir = output_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_save_dir(config));

    let scripts = LauncherScripts::build(target, exe, device, volume);
    let (bat_path, vbs_path) = scripts.write(&dir, &launcher_stem(target)?)?;
    info!("Wrote {} and {}", bat_path.display(), vbs_path.display());

    Ok(dir)
}

/// Launchers are named after the clip, or after the folder for random picks.
/// `.` and `..` have no name of their own, so directories are resolved first.
fn launcher_stem(target: &Path) -> Result<String> {
    if target.is_dir() {
        let resolved = fs::canonicalize(target)
            .map_err(|e| SoundError::Script(format!("{}: {}", target.display(), e)))?;
        return Ok(display_stem(&resolved));
    }
    Ok(display_stem(target))
}

/// Point every executable reference in a launcher at `exe`
pub fn rewrite_exe_reference(script: &str, exe: &str) -> Result<String> {
    // drive, then any directory prefix, then the executable name
    let pattern = Regex::new(r#"(?i)(?:[a-z]:\\)?(?:[^"]*?[\\/])?soundmand\.exe"#)
        .map_err(|e| SoundError::Script(e.to_string()))?;

    Ok(pattern.replace_all(script, regex::NoExpand(exe)).into_owned())
}

/// Repair a launcher pair after the executable moved.
///
/// `bat_path` must be an existing `.bat` with a `.vbs` next to it.
pub fn fix_launchers(bat_path: &Path, exe: &str) -> Result<()> {
    let is_bat = bat_path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("bat"))
        .unwrap_or(false);
    if !is_bat || !bat_path.is_file() {
        return Err(SoundError::Script(format!(
            "Invalid path: {} is not a launcher .bat file",
            bat_path.display()
        )));
    }

    let vbs_path = bat_path.with_extension("vbs");
    let read = |path: &Path| {
        fs::read_to_string(path).map_err(|e| SoundError::Script(format!("{}: {}", path.display(), e)))
    };
    let old_bat = read(bat_path)?;
    let old_vbs = read(&vbs_path)?;

    write_script(bat_path, &rewrite_exe_reference(&old_bat, exe)?)?;
    write_script(&vbs_path, &rewrite_exe_reference(&old_vbs, exe)?)?;

    info!("Fixed launchers {} / {}", bat_path.display(), vbs_path.display());
    Ok(())
}
