use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::clip::SILENCE_THRESHOLD;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub trim: TrimConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    #[serde(default = "default_time_step")]
    pub time_step: f32,
    #[serde(default = "default_workers")]
    pub workers: usize,
}

#[derive(Debug, Deserialize)]
pub struct TrimConfig {
    #[serde(default = "default_trim_threshold")]
    pub threshold: f32,
}

/// Live stream estimator settings.
#[derive(Clone, Debug, Deserialize)]
pub struct StreamConfig {
    /// Samples per pushed block, a power of two.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
    /// Seconds between blocks when replaying a file.
    #[serde(default = "default_update_interval")]
    pub update_interval: f32,
    /// Peak level that marks a block as speech.
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: f32,
    /// Seconds of quiet that close an utterance.
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,
    #[serde(default = "default_noise_threshold")]
    pub noise_threshold: f32,
    #[serde(default = "default_moving_average")]
    pub moving_average: usize,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_size: default_sample_size(),
            time_step: default_time_step(),
            workers: default_workers(),
        }
    }
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            threshold: default_trim_threshold(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
            update_interval: default_update_interval(),
            volume_threshold: default_volume_threshold(),
            silence_threshold: default_silence_threshold(),
            noise_threshold: default_noise_threshold(),
            moving_average: default_moving_average(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
        }
    }
}

fn default_sample_size() -> usize { 1024 }
fn default_time_step() -> f32 { 0.01 }
fn default_workers() -> usize { 0 }
fn default_trim_threshold() -> f32 { SILENCE_THRESHOLD }
fn default_block_size() -> usize { 4096 }
fn default_update_interval() -> f32 { 0.1 }
fn default_volume_threshold() -> f32 { 0.01 }
fn default_silence_threshold() -> f32 { 0.5 }
fn default_noise_threshold() -> f32 { 0.01 }
fn default_moving_average() -> usize { 5 }
fn default_directory() -> PathBuf { PathBuf::from("Audio") }

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(cfg) => Some(cfg),
        Err(e) => {
            log::warn!("Invalid config {}: {}", path.display(), e);
            None
        }
    }
}

/// Explicit path, else `echomatch.toml` in the working directory, else the
/// per-user config locations.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("echomatch.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("echomatch").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("echomatch").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.analysis.sample_size, 1024);
        assert_eq!(cfg.analysis.time_step, 0.01);
        assert_eq!(cfg.stream.moving_average, 5);
        assert_eq!(cfg.trim.threshold, SILENCE_THRESHOLD);
        assert_eq!(cfg.output.directory, PathBuf::from("Audio"));
    }

    #[test]
    fn partial_sections_merge_with_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [analysis]
            sample_size = 512

            [stream]
            silence_threshold = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(cfg.analysis.sample_size, 512);
        assert_eq!(cfg.analysis.time_step, 0.01);
        assert_eq!(cfg.stream.silence_threshold, 0.25);
        assert_eq!(cfg.stream.block_size, 4096);
    }
}
