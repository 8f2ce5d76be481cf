#[cfg(feature = "parse-cfg")]
pub mod client_configuration_file;

use crate::content_type::{ContentClassifier, default_classifier};
use crate::signer::Secret;
use crate::source::Source;
use crate::{DEFAULT_SERVICE_URL, Error};
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use tracing::Dispatch;
use url::Url;

/// Wire protocol spoken with the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVariant {
    /// Messages carry the notify.guru HMAC signature headers. Requires a secret.
    #[default]
    Signed,
    /// Legacy protocol: plain requests without any signature headers.
    Unsigned,
}

impl ProtocolVariant {
    /// Return true when sources using this variant must hold a secret.
    pub fn requires_secret(&self) -> bool {
        matches!(self, ProtocolVariant::Signed)
    }
}

/// Settings shared by every [`Source`] created from it.
#[derive(Debug, Clone)]
pub struct SourceConfiguration {
    service_url: String,
    variant: ProtocolVariant,
    classifier: Arc<dyn ContentClassifier>,
    log_sink: Option<Dispatch>,
    http_client: Option<Client>,
}

impl SourceConfiguration {
    /// Create a new `SourceConfiguration` pointing at [`DEFAULT_SERVICE_URL`].
    pub fn new() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.to_string(),
            variant: ProtocolVariant::default(),
            classifier: default_classifier(),
            log_sink: None,
            http_client: None,
        }
    }

    /// Use a different service base URL.
    ///
    /// The URL must be absolute; a trailing `/` is added when missing.
    pub fn with_service_url<S: AsRef<str>>(mut self, service_url: S) -> Result<Self, Error> {
        let url = Url::parse(service_url.as_ref())?;
        if url.cannot_be_a_base() {
            return Err(Error::configuration(format!("{} can not be used as a service URL", url)));
        }
        let mut service_url = url.to_string();
        if !service_url.ends_with('/') {
            service_url.push('/');
        }
        self.service_url = service_url;
        Ok(self)
    }

    /// Select the [`ProtocolVariant`].
    pub fn with_variant(mut self, variant: ProtocolVariant) -> Self {
        self.variant = variant;
        self
    }

    /// Use a different [`ContentClassifier`] for images sent without a MIME type.
    pub fn with_classifier<C: ContentClassifier + 'static>(mut self, classifier: C) -> Self {
        self.classifier = Arc::new(classifier);
        self
    }

    /// Send log events of every [`Source`] operation to `log_sink` instead of the global subscriber.
    pub fn with_log_sink<D: Into<Dispatch>>(mut self, log_sink: D) -> Self {
        self.log_sink = Some(log_sink.into());
        self
    }

    /// Use a pre-built HTTP client, e.g. one with a request timeout.
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Return the service base URL.
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Return the [`ProtocolVariant`].
    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    /// Return the [`ContentClassifier`].
    pub fn classifier(&self) -> &Arc<dyn ContentClassifier> {
        &self.classifier
    }

    /// Return the log sink if one was configured.
    pub fn log_sink(&self) -> Option<&Dispatch> {
        self.log_sink.as_ref()
    }

    pub(crate) fn http_client(&self) -> Result<Client, Error> {
        match &self.http_client {
            Some(client) => Ok(client.clone()),
            None => Ok(Client::builder().use_rustls_tls().build()?),
        }
    }
}

impl Default for SourceConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

/// Client configuration: [`SourceConfiguration`] plus any stored source credentials.
#[derive(Debug, Clone, Default)]
pub struct ClientConfiguration {
    source: SourceConfiguration,
    id: Option<String>,
    secret: Option<Secret>,
    name: Option<String>,
}

impl ClientConfiguration {
    /// Create a new `ClientConfiguration` without credentials.
    pub fn new(source: SourceConfiguration) -> Self {
        Self { source, id: None, secret: None, name: None }
    }

    /// Set the id of an existing source.
    pub fn with_id<S: AsRef<str>>(mut self, id: S) -> Self {
        self.id = Some(id.as_ref().to_string());
        self
    }

    /// Set the source secret.
    pub fn with_secret<S: Into<Secret>>(mut self, secret: S) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// Set the name used when registering a new source.
    pub fn with_name<S: AsRef<str>>(mut self, name: S) -> Self {
        self.name = Some(name.as_ref().to_string());
        self
    }

    /// Use a different service base URL, see [`SourceConfiguration::with_service_url`].
    pub fn with_service_url<S: AsRef<str>>(mut self, service_url: S) -> Result<Self, Error> {
        self.source = self.source.with_service_url(service_url)?;
        Ok(self)
    }

    /// Return the inner [`SourceConfiguration`].
    pub fn source(&self) -> &SourceConfiguration {
        &self.source
    }

    /// Return the stored source id.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Return the stored source secret.
    pub fn secret(&self) -> Option<&Secret> {
        self.secret.as_ref()
    }

    /// Return the name used for registration.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Attach to the source identified by the stored id and secret.
    pub fn attach(&self) -> Result<Source, Error> {
        let id = self.id().ok_or_else(|| Error::configuration("source id is not set"))?;
        Source::attach(id, self.secret.clone(), &self.source)
    }

    /// Register a new source with the stored name and secret.
    pub async fn register(&self) -> Result<Source, Error> {
        Source::register(self.name(), self.secret.clone(), &self.source).await
    }
}

#[cfg(feature = "parse-cfg")]
impl TryFrom<&str> for ClientConfiguration {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        client_configuration_file::ClientConfigFileParser::from(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_service_url() {
        assert_eq!(SourceConfiguration::new().service_url(), "https://notify.guru/v1/sources/");
        assert_eq!(SourceConfiguration::new().variant(), ProtocolVariant::Signed);
    }

    #[test]
    fn service_url_gets_trailing_slash() {
        let config = SourceConfiguration::new().with_service_url("http://127.0.0.1:8080/v1/sources").unwrap();
        assert_eq!(config.service_url(), "http://127.0.0.1:8080/v1/sources/");
    }

    #[test]
    fn relative_service_url_is_rejected() {
        let result = SourceConfiguration::new().with_service_url("v1/sources/");
        assert!(matches!(result, Err(Error::UrlParseError(_))));
    }

    #[test]
    fn opaque_service_url_is_rejected() {
        let result = SourceConfiguration::new().with_service_url("mailto:someone@example.com");
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn attach_requires_id() {
        let config = ClientConfiguration::default().with_secret("sek1");
        assert_eq!(config.attach().unwrap_err().to_string(), "Invalid Configuration: source id is not set");
    }

    #[test]
    fn secret_requirement() {
        assert!(ProtocolVariant::Signed.requires_secret());
        assert!(!ProtocolVariant::Unsigned.requires_secret());
    }
}
