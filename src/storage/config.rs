use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;

const DEFAULT_VLC_HTTP_BASE: &str = "http://127.0.0.1:8080";
const DEFAULT_VLC_HTTP_POLL_MS: u64 = 250;
const DEFAULT_VLC_HTTP_TIMEOUT_MS: u64 = 2_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    Simulated,
    VlcHttp,
}

impl Backend {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "simulated" | "sim" => Ok(Self::Simulated),
            "vlc-http" | "vlc_http" | "vlc" => Ok(Self::VlcHttp),
            _ => Err(anyhow!(
                "invalid playback backend '{value}' (expected simulated or vlc-http)"
            )),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Simulated => "simulated",
            Self::VlcHttp => "vlc-http",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    pub backend: Backend,
    pub initial_volume: f64,
    pub skip_seconds: f64,
    pub volume_step: f64,
    pub tick_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            backend: Backend::Simulated,
            initial_volume: 1.0,
            skip_seconds: 10.0,
            volume_step: 0.05,
            tick_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SimulatedConfig {
    pub duration_secs: f64,
    pub metadata_delay_ms: u64,
    pub buffer_ahead_secs: f64,
    pub block_autoplay: bool,
    pub deny_fullscreen: bool,
}

impl Default for SimulatedConfig {
    fn default() -> Self {
        Self {
            duration_secs: 180.0,
            metadata_delay_ms: 750,
            buffer_ahead_secs: 30.0,
            block_autoplay: false,
            deny_fullscreen: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct VlcHttpConfig {
    pub base_url: String,
    pub password: String,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
}

impl Default for VlcHttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_VLC_HTTP_BASE.to_string(),
            password: String::new(),
            poll_interval_ms: DEFAULT_VLC_HTTP_POLL_MS,
            timeout_ms: DEFAULT_VLC_HTTP_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub playback: PlaybackConfig,
    pub simulated: SimulatedConfig,
    pub vlc_http: VlcHttpConfig,
}

impl RuntimeConfig {
    pub fn default_path() -> PathBuf {
        env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(".config/playdeck/config.toml")
    }

    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::default_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.merge_env()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("failed parsing config TOML")
    }

    fn read_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading config file: {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    fn merge_env(&mut self) -> Result<()> {
        if let Ok(backend) = env::var("PLAYDECK_BACKEND") {
            self.playback.backend =
                Backend::parse(&backend).context("invalid PLAYDECK_BACKEND")?;
        }
        env_parse("PLAYDECK_INITIAL_VOLUME", &mut self.playback.initial_volume)?;
        env_parse("PLAYDECK_SKIP_SECONDS", &mut self.playback.skip_seconds)?;

        env_parse("PLAYDECK_SIM_DURATION_SECS", &mut self.simulated.duration_secs)?;
        env_parse(
            "PLAYDECK_SIM_BLOCK_AUTOPLAY",
            &mut self.simulated.block_autoplay,
        )?;

        if let Ok(base_url) = env::var("PLAYDECK_VLC_HTTP_BASE") {
            self.vlc_http.base_url = base_url;
        }
        if let Ok(password) = env::var("PLAYDECK_VLC_HTTP_PASSWORD") {
            self.vlc_http.password = password;
        }
        env_parse("PLAYDECK_VLC_HTTP_POLL_MS", &mut self.vlc_http.poll_interval_ms)?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let playback = &self.playback;
        if !(0.0..=1.0).contains(&playback.initial_volume) {
            return Err(anyhow!(
                "playback.initial_volume must be between 0 and 1 (got {})",
                playback.initial_volume
            ));
        }
        if !(playback.skip_seconds.is_finite() && playback.skip_seconds > 0.0) {
            return Err(anyhow!("playback.skip_seconds must be a positive number"));
        }
        if !(playback.volume_step > 0.0 && playback.volume_step <= 1.0) {
            return Err(anyhow!("playback.volume_step must be in (0, 1]"));
        }
        if playback.tick_ms == 0 {
            return Err(anyhow!("playback.tick_ms must be greater than zero"));
        }
        if self.simulated.duration_secs < 0.0 || self.simulated.buffer_ahead_secs < 0.0 {
            return Err(anyhow!(
                "simulated.duration_secs and simulated.buffer_ahead_secs cannot be negative"
            ));
        }
        if self.vlc_http.poll_interval_ms == 0 {
            return Err(anyhow!("vlc_http.poll_interval_ms must be greater than zero"));
        }
        Ok(())
    }
}

fn env_parse<T>(key: &str, target: &mut T) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Ok(value) = env::var(key) {
        *target = value
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid {key}"))?;
    }
    Ok(())
}
