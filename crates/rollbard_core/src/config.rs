use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::{
    env,
    path::{Path, PathBuf},
};

/// Playlist loaded by `!luta` when nothing else is configured
pub const DEFAULT_PLAYLIST_URL: &str =
    "https://music.youtube.com/playlist?list=PLIEibbGcfrARrAaNARQmPHAT-HwUa8-d8";

/// Main configuration for Rollbard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Discord bot configuration
    #[serde(default)]
    pub discord: DiscordConfig,
    /// Voice playback and media resolution
    #[serde(default)]
    pub audio: AudioConfig,
    /// Initial contents of the admin and ban lists
    #[serde(default)]
    pub access: AccessConfig,
    /// Fixed media links posted alongside roll results
    #[serde(default)]
    pub media: MediaConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscordConfig {
    /// Discord bot token
    #[serde(default)]
    pub token: String,
    /// Discord application ID
    pub application_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Playlist expanded by the `!luta` command
    pub playlist_url: String,
    /// Local file played on an attacking `++++`
    pub special_cue: PathBuf,
    /// yt-dlp executable used to resolve links
    pub ytdlp_path: String,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            playlist_url: DEFAULT_PLAYLIST_URL.to_string(),
            special_cue: PathBuf::from("kokusen.ogg"),
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    #[serde(default)]
    pub admins: Vec<u64>,
    #[serde(default)]
    pub banned: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Posted with a celebratory `++++` attack
    pub flourish_url: String,
    /// Posted after a `----` roll
    pub failure_url: String,
    /// Posted as the last line of the banned-user reply
    pub decoy_url: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            flourish_url: "https://tenor.com/view/jjk-jjk-s2-jjk-season-2-jujutsu-kaisen-jujutsu-kaisen-s2-gif-7964484372484357392".to_string(),
            failure_url: "https://cdn.discordapp.com/attachments/1264409229150785609/1451361408028639316/a5z6jq.gif".to_string(),
            decoy_url: "https://media.discordapp.net/attachments/1190477143763853393/1471694458629128266/image.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for the daily rolling log file
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: "logs".to_string(),
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.discord.token.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "discord.token".to_string(),
                reason: "Discord token cannot be empty".to_string(),
            }
            .into());
        }

        if self.audio.playlist_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "audio.playlist_url".to_string(),
                reason: "Playlist URL cannot be empty".to_string(),
            }
            .into());
        }

        if self.audio.ytdlp_path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "audio.ytdlp_path".to_string(),
                reason: "yt-dlp path cannot be empty".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Load configuration from `ROLLBARD_CONFIG` (or `rollbard.toml`) and the environment
    pub fn load() -> Result<Self> {
        let config_path =
            env::var("ROLLBARD_CONFIG").unwrap_or_else(|_| "rollbard.toml".to_string());
        Self::load_from(Path::new(&config_path))
    }

    /// Load configuration from an explicit file, falling back to the environment
    /// when the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|_e| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;
            let config: Config =
                toml::from_str(&contents).map_err(|e| ConfigError::ParseFailed { source: e })?;

            Ok(config.override_from_env())
        } else {
            tracing::debug!("no config file at {}, using environment", path.display());
            Ok(Self::from_env())
        }
    }

    /// Create config from environment variables
    pub fn from_env() -> Self {
        Self::default().override_from_env()
    }

    fn override_from_env(self) -> Self {
        self.override_with(|key| env::var(key).ok())
    }

    /// Apply overrides from a variable lookup
    fn override_with(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        // Discord
        if let Some(token) = lookup("DISCORD_TOKEN") {
            self.discord.token = token;
        }
        if let Some(app_id) = lookup("APP_ID") {
            if let Ok(id) = app_id.parse() {
                self.discord.application_id = Some(id);
            }
        }

        // Audio
        if let Some(url) = lookup("ROLLBARD_PLAYLIST_URL") {
            self.audio.playlist_url = url;
        }
        if let Some(path) = lookup("ROLLBARD_SPECIAL_CUE") {
            self.audio.special_cue = PathBuf::from(path);
        }
        if let Some(path) = lookup("ROLLBARD_YTDLP") {
            self.audio.ytdlp_path = path;
        }

        self
    }

    /// Location of the special cue; relative paths sit next to the executable
    pub fn special_cue_path(&self) -> PathBuf {
        let cue = &self.audio.special_cue;
        if cue.is_absolute() {
            return cue.clone();
        }

        env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(cue)))
            .unwrap_or_else(|| cue.clone())
    }
}

/// Helper to load dotenv file if it exists
pub fn load_dotenv() {
    if let Ok(path) = env::var("DOTENV_PATH") {
        dotenvy::from_path(&path).ok();
    } else {
        dotenvy::dotenv().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use pretty_assertions::assert_eq;
    use std::{collections::HashMap, io::Write};

    fn valid() -> Config {
        let mut config = Config::default();
        config.discord.token = "token".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.audio.playlist_url, DEFAULT_PLAYLIST_URL);
        assert_eq!(config.audio.special_cue, PathBuf::from("kokusen.ogg"));
        assert_eq!(config.audio.ytdlp_path, "yt-dlp");
        assert_eq!(config.logging.directory, "logs");
        assert!(config.access.admins.is_empty());
    }

    #[test]
    fn test_validate_rejects_missing_token() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::Invalid { ref field, .. }) if field == "discord.token"
        ));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_audio_fields() {
        let mut config = valid();
        config.audio.playlist_url = " ".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.audio.ytdlp_path = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[discord]
token = "from-file"
application_id = 42

[audio]
playlist_url = "https://example.com/list"
special_cue = "/srv/cue.ogg"
ytdlp_path = "/usr/bin/yt-dlp"

[access]
admins = [316323635470270475]
banned = [190954369917779968]
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.discord.application_id, Some(42));
        assert_eq!(config.audio.playlist_url, "https://example.com/list");
        assert_eq!(config.access.admins, vec![316323635470270475]);
        assert_eq!(config.access.banned, vec![190954369917779968]);
        assert_eq!(config.special_cue_path(), PathBuf::from("/srv/cue.ogg"));
        // sections left out keep their defaults
        assert_eq!(config.logging.directory, "logs");
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[discord]
token = "from-file"

[audio]
ytdlp_path = "/usr/local/bin/yt-dlp"

[media]
failure_url = "https://example.com/fail.gif"

[logging]
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        let defaults = Config::default();
        assert_eq!(config.audio.ytdlp_path, "/usr/local/bin/yt-dlp");
        assert_eq!(config.audio.playlist_url, DEFAULT_PLAYLIST_URL);
        assert_eq!(config.audio.special_cue, PathBuf::from("kokusen.ogg"));
        assert_eq!(config.media.failure_url, "https://example.com/fail.gif");
        assert_eq!(config.media.flourish_url, defaults.media.flourish_url);
        assert_eq!(config.media.decoy_url, defaults.media.decoy_url);
        assert_eq!(config.logging.directory, "logs");
    }

    #[test]
    fn test_load_from_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[discord\ntoken = ").unwrap();

        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn test_environment_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            ("DISCORD_TOKEN", "from-env"),
            ("APP_ID", "not-a-number"),
            ("ROLLBARD_YTDLP", "/opt/yt-dlp"),
        ]
        .into_iter()
        .collect();

        let mut config = valid();
        config.discord.application_id = Some(7);
        let config = config.override_with(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.discord.token, "from-env");
        // unparseable ids are ignored
        assert_eq!(config.discord.application_id, Some(7));
        assert_eq!(config.audio.ytdlp_path, "/opt/yt-dlp");
        assert_eq!(config.audio.playlist_url, DEFAULT_PLAYLIST_URL);
    }

    #[test]
    fn test_relative_cue_resolves_next_to_executable() {
        let path = Config::default().special_cue_path();
        assert!(path.ends_with("kokusen.ogg"));
        assert!(path.is_absolute());
    }
}
