use std::{env, path::PathBuf};

use super::schema::Settings;

const APP_DIR: &str = "penguin-tunes";

impl Settings {
    /// Load settings from environment and optional config file.
    pub fn load() -> Result<Self, ::config::ConfigError> {
        let config_path = resolve_config_path();

        let mut builder = ::config::Config::builder();

        if let Some(path) = &config_path {
            builder = builder.add_source(::config::File::from(path.as_path()).required(false));
        }

        builder = builder.add_source(
            ::config::Environment::with_prefix("PENGUIN_TUNES")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("library.source_dirs")
                .try_parsing(true),
        );

        let cfg = builder.build()?;
        let settings: Settings = cfg.try_deserialize()?;
        Ok(settings)
    }

    /// Perform basic validation checks on loaded settings.
    pub fn validate(&self) -> Result<(), String> {
        if self.index.debounce_ms == 0 {
            return Err("index.debounce_ms must be >= 1".to_string());
        }
        if self.index.queue_capacity == 0 {
            return Err("index.queue_capacity must be >= 1".to_string());
        }
        if self.index.dir.as_os_str().is_empty() {
            return Err("index.dir must not be empty".to_string());
        }
        Ok(())
    }
}

/// Resolve the config path from `PENGUIN_TUNES_CONFIG_PATH` or XDG defaults.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Some(p) = env::var_os("PENGUIN_TUNES_CONFIG_PATH") {
        return Some(PathBuf::from(p));
    }
    default_config_path()
}

/// `$XDG_CONFIG_HOME/penguin-tunes/config.toml`, or under `~/.config` when
/// `XDG_CONFIG_HOME` is not set.
pub fn default_config_path() -> Option<PathBuf> {
    xdg_home("XDG_CONFIG_HOME", ".config").map(|d| d.join(APP_DIR).join("config.toml"))
}

/// `$XDG_DATA_HOME/penguin-tunes`, `~/.local/share/penguin-tunes`, or a
/// relative `penguin-tunes` directory when neither is available.
pub fn default_index_dir() -> PathBuf {
    xdg_home("XDG_DATA_HOME", ".local/share")
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(APP_DIR))
}

fn xdg_home(var: &str, fallback: &str) -> Option<PathBuf> {
    if let Some(dir) = env::var_os(var) {
        Some(PathBuf::from(dir))
    } else {
        env::var_os("HOME").map(|home| PathBuf::from(home).join(fallback))
    }
}
