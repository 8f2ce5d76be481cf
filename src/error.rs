use thiserror::Error;
use thiserror_ext::Construct;

/// Errors returned by the notifyg library.
#[derive(Error, Debug, Construct)]
pub enum Error {
    /// A required credential or setting is missing or invalid.
    #[error("Invalid Configuration: {0}")]
    Configuration(String),

    /// The service rejected the creation of a new source.
    #[error("Source registration failed with status {status}: {body}")]
    Registration {
        /// HTTP status code returned by the service.
        status: u16,
        /// Response body returned by the service.
        body: String,
    },

    /// The service rejected a message delivered to a source.
    #[error("Message delivery failed with status {status}: {body}")]
    Delivery {
        /// HTTP status code returned by the service.
        status: u16,
        /// Response body returned by the service.
        body: String,
    },

    /// An argument does not have a usable shape or content.
    #[error("Invalid Argument: {0}")]
    InvalidArgument(String),

    // ### Converting from other error types ###
    /// Pass-thru `reqwest::Error` for network level failures.
    #[construct(skip)]
    #[error("Transport Error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Pass-thru [`std::io::Error`].
    #[construct(skip)]
    #[error("std::io Error: {0}")]
    IOError(#[from] std::io::Error),

    /// Pass-thru `serde_json::Error`.
    #[construct(skip)]
    #[error("Serde_json Error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),

    /// Pass-thru `url::ParseError`.
    #[construct(skip)]
    #[error("Url Parse Error: {0}")]
    UrlParseError(#[from] url::ParseError),

    #[cfg(feature = "parse-cfg")]
    /// Pass-thru `toml::de::Error`.
    #[construct(skip)]
    #[error("Serde Toml Error: {0}")]
    SerdeTomlError(#[from] toml::de::Error),
}

impl Error {
    /// Return the HTTP status carried by a [`Error::Registration`] or [`Error::Delivery`].
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Registration { status, .. } | Error::Delivery { status, .. } => Some(*status),
            _ => None,
        }
    }
}
