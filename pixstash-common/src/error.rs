//! Errors raised by configuration loading and the settings store

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[cfg(feature = "sqlx")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Creating the root folder or database directory failed
    #[error("filesystem error: {0}")]
    Io(#[from] std::io::Error),

    /// A config file or stored setting is unreadable or malformed
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot encode setting `{key}`: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}
