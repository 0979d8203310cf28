use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

const CONFIG_FILE_NAME: &str = "config.toml";
const ENV_CONFIG_PATH: &str = "SYNTHLAB_CONFIG_PATH";
const ENV_GENERATION_DELAY: &str = "SYNTHLAB_GENERATION_DELAY_MS";
const ENV_DEMO_MEDIA_URL: &str = "SYNTHLAB_DEMO_MEDIA_URL";
const ENV_MEDIA_DIR: &str = "SYNTHLAB_MEDIA_DIR";
const ENV_DOWNLOAD_DIR: &str = "SYNTHLAB_DOWNLOAD_DIR";
const ENV_FRAME_INTERVAL: &str = "SYNTHLAB_FRAME_INTERVAL_MS";

pub const DEFAULT_DEMO_MEDIA_URL: &str =
    "https://www.soundhelix.com/examples/mp3/SoundHelix-Song-1.mp3";

#[derive(Debug, Clone)]
pub struct AppConfig {
    generation_delay_ms: u64,
    demo_media_url: String,
    media_dir: PathBuf,
    download_dir: PathBuf,
    frame_interval_ms: u64,
    notice_lifetime_ms: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = config_file_override()? {
            if path.exists() {
                let partial = read_partial(&path)?;
                config.apply_partial(partial);
            }
        } else if let Ok(path) = Self::default_config_path() {
            if path.exists() {
                let partial = read_partial(&path)?;
                config.apply_partial(partial);
            }
        }

        config.apply_env()?;
        Ok(config)
    }

    pub fn generation_delay(&self) -> Duration {
        Duration::from_millis(self.generation_delay_ms)
    }

    pub fn demo_media_url(&self) -> &str {
        &self.demo_media_url
    }

    pub fn media_dir(&self) -> &PathBuf {
        &self.media_dir
    }

    pub fn download_dir(&self) -> &PathBuf {
        &self.download_dir
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn notice_lifetime(&self) -> Duration {
        Duration::from_millis(self.notice_lifetime_ms)
    }

    pub fn log_path(&self) -> PathBuf {
        self.media_dir.join("synthlab.log")
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let dirs = project_dirs()?;
        Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    fn apply_partial(&mut self, partial: PartialConfig) {
        if let Some(delay) = partial.generation_delay_ms {
            self.generation_delay_ms = delay;
        }
        if let Some(url) = partial.demo_media_url {
            self.demo_media_url = url;
        }
        if let Some(dir) = partial.media_dir {
            self.media_dir = dir;
        }
        if let Some(dir) = partial.download_dir {
            self.download_dir = dir;
        }
        if let Some(interval) = partial.frame_interval_ms {
            self.frame_interval_ms = interval;
        }
        if let Some(lifetime) = partial.notice_lifetime_ms {
            self.notice_lifetime_ms = lifetime;
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(value) = env::var(ENV_GENERATION_DELAY) {
            if !value.trim().is_empty() {
                self.generation_delay_ms = value
                    .trim()
                    .parse::<u64>()
                    .context("SYNTHLAB_GENERATION_DELAY_MS must be a whole number of milliseconds")?;
            }
        }
        if let Ok(value) = env::var(ENV_DEMO_MEDIA_URL) {
            if !value.trim().is_empty() {
                self.demo_media_url = value;
            }
        }
        if let Ok(value) = env::var(ENV_MEDIA_DIR) {
            if !value.trim().is_empty() {
                self.media_dir = PathBuf::from(value);
            }
        }
        if let Ok(value) = env::var(ENV_DOWNLOAD_DIR) {
            if !value.trim().is_empty() {
                self.download_dir = PathBuf::from(value);
            }
        }
        if let Ok(value) = env::var(ENV_FRAME_INTERVAL) {
            if !value.trim().is_empty() {
                self.frame_interval_ms = value
                    .trim()
                    .parse::<u64>()
                    .context("SYNTHLAB_FRAME_INTERVAL_MS must be a whole number of milliseconds")?;
            }
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            generation_delay_ms: 3000,
            demo_media_url: DEFAULT_DEMO_MEDIA_URL.into(),
            media_dir: default_media_dir(),
            download_dir: default_download_dir(),
            frame_interval_ms: 33,
            notice_lifetime_ms: 4000,
        }
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "Synthlab", "Synthlab")
        .ok_or_else(|| anyhow!("unable to determine config directory"))
}

fn config_file_override() -> Result<Option<PathBuf>> {
    if let Some(value) = env::var_os(ENV_CONFIG_PATH) {
        if value.is_empty() {
            return Ok(None);
        }
        let path = PathBuf::from(value);
        if path.is_dir() {
            return Ok(Some(path.join(CONFIG_FILE_NAME)));
        }
        return Ok(Some(path));
    }
    Ok(None)
}

fn read_partial(path: &Path) -> Result<PartialConfig> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    parse_partial(&contents).with_context(|| format!("failed to parse {}", path.display()))
}

fn parse_partial(contents: &str) -> Result<PartialConfig> {
    Ok(toml::from_str(contents)?)
}

fn default_media_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|_| PathBuf::from("./media"))
}

fn default_download_dir() -> PathBuf {
    env::var_os("HOME")
        .map(PathBuf::from)
        .map(|home| home.join("Music").join("Synthlab"))
        .unwrap_or_else(|| PathBuf::from("./downloads"))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartialConfig {
    generation_delay_ms: Option<u64>,
    demo_media_url: Option<String>,
    media_dir: Option<PathBuf>,
    download_dir: Option<PathBuf>,
    frame_interval_ms: Option<u64>,
    notice_lifetime_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_simulated_console() {
        let config = AppConfig::default();
        assert_eq!(config.generation_delay(), Duration::from_millis(3000));
        assert_eq!(config.demo_media_url(), DEFAULT_DEMO_MEDIA_URL);
        assert_eq!(config.notice_lifetime(), Duration::from_secs(4));
    }

    #[test]
    fn partial_file_overrides_only_present_keys() {
        let partial = parse_partial(
            r#"
            generation_delay_ms = 500
            media_dir = "/tmp/synthlab-media"
            "#,
        )
        .unwrap();
        let mut config = AppConfig::default();
        config.apply_partial(partial);
        assert_eq!(config.generation_delay(), Duration::from_millis(500));
        assert_eq!(config.media_dir(), &PathBuf::from("/tmp/synthlab-media"));
        assert_eq!(config.demo_media_url(), DEFAULT_DEMO_MEDIA_URL);
        assert_eq!(config.frame_interval(), Duration::from_millis(33));
    }

    #[test]
    fn rejects_malformed_config() {
        assert!(parse_partial("generation_delay_ms = \"soon\"").is_err());
    }
}
