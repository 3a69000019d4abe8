//! Configuration error types.

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file `{0}`")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("invalid config file `{path}`")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config syntax")]
    Toml(#[from] toml::de::Error),

    #[error("config validation error: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        error::Error as _,
        io::{Error, ErrorKind},
    };

    #[test]
    fn test_config_error_display() {
        let io_err = ConfigError::Io(
            PathBuf::from("sniplicity.toml"),
            Error::new(ErrorKind::NotFound, "file not found"),
        );
        assert!(io_err.to_string().contains("sniplicity.toml"));
        assert!(io_err.source().is_some());

        let validation_err = ConfigError::Validation("[build.input] not found".into());
        assert!(validation_err.to_string().contains("[build.input] not found"));
    }

    #[test]
    fn test_parse_error_keeps_source() {
        let source = toml::from_str::<toml::Value>("a = ").unwrap_err();
        let err = ConfigError::Parse {
            path: PathBuf::from("site/sniplicity.toml"),
            source,
        };
        assert!(err.to_string().contains("site/sniplicity.toml"));
        assert!(err.source().is_some());
    }
}
