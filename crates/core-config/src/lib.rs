//! Configuration loading and parsing.
//!
//! Reads `kakiato.toml` (or an override path provided by the binary):
//!
//! ```toml
//! [playback]
//! speed = 1.0
//! tick_ms = 16
//! auto_play = true
//!
//! [replay]
//! pair_beforeinput = true
//! [replay.delete_units]
//! deleteWordBackward = "grapheme"
//!
//! [viewer]
//! show_selection = true
//! show_composition = true
//! ```
//!
//! Every field is optional. A missing file or a file that fails to parse yields
//! the defaults. Values outside their valid range are clamped after parsing and
//! the clamp is logged under the `config` target. Unknown fields are ignored.

use anyhow::Result;
use core_player::PlayerOptions;
use core_state::EditPolicy;
use core_text::DeleteUnit;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct PlaybackConfig {
    #[serde(default = "PlaybackConfig::default_speed")]
    pub speed: f64,
    #[serde(default = "PlaybackConfig::default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "PlaybackConfig::default_auto_play")]
    pub auto_play: bool,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            speed: Self::default_speed(),
            tick_ms: Self::default_tick_ms(),
            auto_play: Self::default_auto_play(),
        }
    }
}

impl PlaybackConfig {
    const fn default_speed() -> f64 {
        1.0
    }
    const fn default_tick_ms() -> u64 {
        16 // ~60 fps
    }
    const fn default_auto_play() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReplayConfig {
    #[serde(default = "ReplayConfig::default_pair_beforeinput")]
    pub pair_beforeinput: bool,
    /// Delete unit overrides keyed by `inputType`.
    #[serde(default)]
    pub delete_units: HashMap<String, DeleteUnit>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            pair_beforeinput: Self::default_pair_beforeinput(),
            delete_units: HashMap::new(),
        }
    }
}

impl ReplayConfig {
    const fn default_pair_beforeinput() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ViewerConfig {
    #[serde(default = "ViewerConfig::default_show")]
    pub show_selection: bool,
    #[serde(default = "ViewerConfig::default_show")]
    pub show_composition: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            show_selection: true,
            show_composition: true,
        }
    }
}

impl ViewerConfig {
    const fn default_show() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub replay: ReplayConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    /// Path the config was read from, if any.
    pub source: Option<PathBuf>,
}

/// Best-effort config path: `./kakiato.toml`, then the platform config dir.
pub fn discover() -> PathBuf {
    let local = PathBuf::from("kakiato.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("kakiato").join("kakiato.toml");
    }
    PathBuf::from("kakiato.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        return Ok(Config::default());
    };
    let mut cfg = match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => Config {
            raw: Some(content),
            file,
            source: Some(path),
        },
        Err(e) => {
            warn!(
                target: "config",
                path = %path.display(),
                error = %e,
                "config_parse_failed_using_defaults"
            );
            return Ok(Config::default());
        }
    };
    cfg.apply_limits();
    Ok(cfg)
}

impl Config {
    /// Clamp out-of-range values in place. Returns true when anything changed.
    pub fn apply_limits(&mut self) -> bool {
        let mut changed = false;
        let playback = &mut self.file.playback;
        if !playback.speed.is_finite() || playback.speed <= 0.0 {
            info!(
                target: "config",
                raw = playback.speed,
                clamped = PlaybackConfig::default_speed(),
                "playback_speed_clamped"
            );
            playback.speed = PlaybackConfig::default_speed();
            changed = true;
        }
        if playback.tick_ms == 0 {
            info!(target: "config", raw = 0, clamped = 1, "tick_ms_clamped");
            playback.tick_ms = 1;
            changed = true;
        }
        changed
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.file.playback.tick_ms.max(1))
    }

    pub fn edit_policy(&self) -> EditPolicy {
        let replay = &self.file.replay;
        let mut policy = EditPolicy::new(replay.pair_beforeinput);
        for (input_type, unit) in &replay.delete_units {
            policy.set_unit(input_type.clone(), *unit);
        }
        policy
    }

    pub fn player_options(&self) -> PlayerOptions {
        PlayerOptions {
            speed: self.file.playback.speed,
            auto_play: self.file.playback.auto_play,
            policy: self.edit_policy(),
        }
    }
}
