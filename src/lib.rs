#![warn(missing_docs)]
//! # notifyg
//! A client for [notify.guru](https://notify.guru) that registers notification sources and pushes
//! text or image messages to them using HMAC signed requests.
//!
//!
//! ## Client Example
//! Register a new source once and keep its id and secret, or attach to a source registered
//! earlier, then send messages through it.
//!
//! ```
//! use notifyg::{Error, Source, SourceConfiguration};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let config = SourceConfiguration::new();
//!
//!     let source = Source::register(Some("build server"), None, &config).await?;
//!     println!("Configure the source at {}", source.register_url().unwrap_or_default());
//!
//!     let secret = source.secret().cloned();
//!     let attached = Source::attach(source.id(), secret, &config)?;
//!     attached.send("Build finished").await?;
//!
//!     Ok(())
//! }
//! ```

mod configuration;
pub mod content_type;
mod error;
pub mod payload;
pub mod signer;
mod source;

pub use self::configuration::{ClientConfiguration, ProtocolVariant, SourceConfiguration};
#[cfg(feature = "parse-cfg")]
pub use self::configuration::client_configuration_file::ClientConfigFileParser;
pub use self::error::Error;
pub use self::source::Source;

/// Logging target value used for the library.
pub const LIB_LOG_TARGET: &str = "notifyg";

/// Service base URL used when none is configured.
pub const DEFAULT_SERVICE_URL: &str = "https://notify.guru/v1/sources/";
