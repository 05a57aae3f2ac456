//! Error Types.
//!
//! Construction-time failures are unrecoverable: an unknown traffic
//! pattern, a missing parameter, or a node count that breaks a pattern's
//! structural requirement terminates the run with a diagnostic naming
//! the offender. Runtime invariant violations are not represented here;
//! they panic at the point of detection.

use thiserror::Error;

/// Fatal configuration and construction errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The pattern spec named a pattern this build does not know.
    #[error("unknown traffic pattern: {0}")]
    UnknownPattern(String),

    /// A pattern required a parameter that was neither inline nor
    /// available as a configuration fallback.
    #[error("missing parameter `{param}` for traffic pattern: {pattern}")]
    MissingParameter { pattern: String, param: &'static str },

    /// A parameter was present but not an integer.
    #[error("bad parameter `{param}` for traffic pattern {pattern}: {value}")]
    BadParameter {
        pattern: String,
        param: &'static str,
        value: String,
    },

    /// The node count violates a pattern's structural requirement.
    #[error("traffic pattern {pattern}: {reason}")]
    BadNodeCount { pattern: &'static str, reason: String },

    /// The injection-process spec named an unknown process.
    #[error("unknown injection process: {0}")]
    UnknownInjectionProcess(String),

    /// A config value failed a sanity check.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The config file could not be read.
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The config file could not be parsed as TOML.
    #[error("could not parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
