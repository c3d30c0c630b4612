use miette::Diagnostic;
use thiserror::Error;

/// Main error type for Rollbard core operations
#[derive(Error, Debug, Diagnostic)]
pub enum CoreError {
    #[error("Expression error")]
    #[diagnostic(help("Check the expression syntax"))]
    Expr(#[from] ExprError),

    #[error("Audio error")]
    #[diagnostic(help("Check the voice connection and the yt-dlp installation"))]
    Audio(#[from] AudioError),

    #[error("Configuration error")]
    #[diagnostic(help("Check your configuration file"))]
    Config(#[from] ConfigError),
}

/// Errors raised by the arithmetic evaluator
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum ExprError {
    #[error("invalid expression '{expression}': {reason}")]
    #[diagnostic(
        code(rollbard::expr::invalid),
        help("Only numbers, parentheses and + - * / // % ** are accepted")
    )]
    InvalidExpression { expression: String, reason: String },

    #[error("division by zero")]
    #[diagnostic(code(rollbard::expr::division_by_zero))]
    DivisionByZero,

    #[error("number too large")]
    #[diagnostic(
        code(rollbard::expr::too_large),
        help("The result does not fit in a 64-bit number")
    )]
    NumberTooLarge,
}

impl ExprError {
    pub fn invalid(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidExpression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised while resolving or playing audio
#[derive(Error, Debug, Diagnostic)]
pub enum AudioError {
    #[error("could not start the audio resolver '{binary}'")]
    #[diagnostic(
        code(rollbard::audio::resolver_unavailable),
        help("Install yt-dlp or point audio.ytdlp_path at it")
    )]
    ResolverUnavailable {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("audio resolver failed for {url}: {stderr}")]
    #[diagnostic(code(rollbard::audio::resolver_failed))]
    ResolverFailed { url: String, stderr: String },

    #[error("audio resolver returned malformed output")]
    #[diagnostic(code(rollbard::audio::malformed_output))]
    MalformedResolverOutput {
        #[source]
        source: serde_json::Error,
    },

    #[error("no playable stream for {url}")]
    #[diagnostic(code(rollbard::audio::no_stream))]
    NoStream { url: String },

    #[error("Arquivo `{path}` não encontrado.")]
    #[diagnostic(
        code(rollbard::audio::asset_missing),
        help("Place the file next to the executable or set audio.special_cue")
    )]
    AssetMissing { path: String },

    #[error("failed to join voice channel {channel_id}: {reason}")]
    #[diagnostic(code(rollbard::audio::join_failed))]
    JoinFailed { channel_id: u64, reason: String },

    #[error("not connected to voice in session {session}")]
    #[diagnostic(code(rollbard::audio::not_connected))]
    NotConnected { session: u64 },

    #[error("playback failed: {reason}")]
    #[diagnostic(code(rollbard::audio::playback_failed))]
    PlaybackFailed { reason: String },
}

/// Configuration errors
#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Configuration file not found at {path}")]
    #[diagnostic(
        code(rollbard::config::not_found),
        help("Create a config file or use environment variables")
    )]
    NotFound { path: String },

    #[error("Invalid configuration: {field}: {reason}")]
    #[diagnostic(
        code(rollbard::config::invalid),
        help("Check configuration format and required fields")
    )]
    Invalid { field: String, reason: String },

    #[error("Failed to parse configuration")]
    #[diagnostic(
        code(rollbard::config::parse_failed),
        help("Check TOML syntax and field types")
    )]
    ParseFailed {
        #[source]
        source: toml::de::Error,
    },
}

/// Type alias for Results in Rollbard
pub type Result<T> = std::result::Result<T, CoreError>;
