//! Registered notification sources and message delivery.

use crate::configuration::{ProtocolVariant, SourceConfiguration};
use crate::content_type::ContentClassifier;
use crate::payload::{ImageSource, MessageSource};
use crate::signer::{Secret, SignedRequest, Signer};
use crate::{Error, LIB_LOG_TARGET};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, debug, info};

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A notification source on the service.
///
/// A source created by [`Source::register`] carries the registration URL the operator uses to
/// bind it to a delivery channel. A source created by [`Source::attach`] does not.
#[derive(Debug, Clone)]
pub struct Source {
    id: String,
    secret: Option<Secret>,
    register_url: Option<String>,
    service_url: String,
    variant: ProtocolVariant,
    classifier: Arc<dyn ContentClassifier>,
    log_sink: Option<Dispatch>,
    client: Client,
}

#[derive(Debug, Serialize)]
struct RegistrationRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    id: String,
    secret: Option<String>,
    #[serde(rename = "registerurl")]
    register_url: String,
}

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    text: &'a str,
}

impl Source {
    /// Create a new source on the service.
    ///
    /// `name` and `secret` are sent to the service when given. The returned `Source` holds the
    /// id, secret and registration URL from the response.
    pub async fn register(
        name: Option<&str>,
        secret: Option<Secret>,
        config: &SourceConfiguration,
    ) -> Result<Source, Error> {
        with_log_sink(config.log_sink(), Self::create(name, secret, config)).await
    }

    async fn create(
        name: Option<&str>,
        secret: Option<Secret>,
        config: &SourceConfiguration,
    ) -> Result<Source, Error> {
        let client = config.http_client()?;
        let request = RegistrationRequest { name, secret: secret.as_ref().map(Secret::expose) };

        info!(target: LIB_LOG_TARGET, "Creating new source at {}", config.service_url());
        let response = client.put(config.service_url()).json(&request).send().await?;
        let status = response.status();
        debug!(target: LIB_LOG_TARGET, "Registration Response - status: {} url: {}", status, response.url());
        if !status.is_success() {
            return Err(Error::registration(status.as_u16(), response_body(response).await));
        }

        let registration: RegistrationResponse = serde_json::from_slice(&response.bytes().await?)?;
        let secret = registration.secret.map(Secret::from).or(secret);
        if config.variant().requires_secret() && secret.is_none() {
            return Err(Error::configuration("service did not return a secret for the new source"));
        }
        info!(target: LIB_LOG_TARGET, "Created source {}", registration.id);

        Ok(Source {
            id: registration.id,
            secret,
            register_url: Some(registration.register_url),
            service_url: config.service_url().to_string(),
            variant: config.variant(),
            classifier: config.classifier().clone(),
            log_sink: config.log_sink().cloned(),
            client,
        })
    }

    /// Attach to an existing source. No request is made.
    ///
    /// Fails when the configured [`ProtocolVariant`] requires a secret and none is given.
    pub fn attach<S: AsRef<str>>(id: S, secret: Option<Secret>, config: &SourceConfiguration) -> Result<Source, Error> {
        let id = id.as_ref();
        if id.is_empty() {
            return Err(Error::configuration("source id is empty"));
        }
        if config.variant().requires_secret() && secret.is_none() {
            return Err(Error::configuration("secret is not set"));
        }

        Ok(Source {
            id: id.to_string(),
            secret,
            register_url: None,
            service_url: config.service_url().to_string(),
            variant: config.variant(),
            classifier: config.classifier().clone(),
            log_sink: config.log_sink().cloned(),
            client: config.http_client()?,
        })
    }

    /// Return the source id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Return the source secret.
    pub fn secret(&self) -> Option<&Secret> {
        self.secret.as_ref()
    }

    /// Return the registration URL. Only present on a freshly registered source.
    pub fn register_url(&self) -> Option<&str> {
        self.register_url.as_deref()
    }

    /// Return the service base URL.
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Return the [`ProtocolVariant`] used for delivery.
    pub fn variant(&self) -> ProtocolVariant {
        self.variant
    }

    /// Return the URL messages for this source are delivered to.
    pub fn messages_url(&self) -> String {
        format!("{}{}/messages/", self.service_url, self.id)
    }

    /// Send a text message.
    pub async fn send<M: Into<MessageSource>>(&self, message: M) -> Result<(), Error> {
        with_log_sink(self.log_sink.as_ref(), self.send_text(message.into())).await
    }

    /// Send an image as raw bytes.
    ///
    /// Without `mime_type` the content type is detected by the configured
    /// [`ContentClassifier`].
    pub async fn send_image<I: Into<ImageSource>>(&self, image: I, mime_type: Option<&str>) -> Result<(), Error> {
        with_log_sink(self.log_sink.as_ref(), self.send_bytes(image.into(), mime_type)).await
    }

    async fn send_text(&self, message: MessageSource) -> Result<(), Error> {
        let text = message.read_text().await?;
        debug!(target: LIB_LOG_TARGET, "Message: {}", text);
        let body = serde_json::to_vec(&TextMessage { text: &text })?;
        self.deliver(JSON_CONTENT_TYPE, body).await
    }

    async fn send_bytes(&self, image: ImageSource, mime_type: Option<&str>) -> Result<(), Error> {
        let data = image.read_bytes().await?;
        let content_type = match mime_type.map(str::trim) {
            Some("") => return Err(Error::invalid_argument("MIME type is empty")),
            Some(mime_type) => mime_type.to_string(),
            None => self.classifier.classify_or_default(&data),
        };
        if HeaderValue::from_str(&content_type).is_err() {
            return Err(Error::invalid_argument(format!("MIME type {:?} is not a valid header value", content_type)));
        }
        debug!(target: LIB_LOG_TARGET, "Image: {} bytes of {}", data.len(), content_type);
        self.deliver(&content_type, data).await
    }

    async fn deliver(&self, content_type: &str, body: Vec<u8>) -> Result<(), Error> {
        let url = self.messages_url();
        let request = match self.variant {
            ProtocolVariant::Signed => {
                let secret = self.secret.as_ref().ok_or_else(|| Error::configuration("secret is not set"))?;
                let signed = SignedRequest::put(&url, content_type, body, epoch_millis());
                let signature = Signer::new(secret)?.sign(&signed)?;

                let mut request = self.client.put(&url);
                for (name, value) in signed.headers() {
                    request = request.header(name.as_str(), value.as_str());
                }
                request.header(AUTHORIZATION, signature).body(signed.into_body())
            }
            ProtocolVariant::Unsigned => self.client.put(&url).header(CONTENT_TYPE, content_type).body(body),
        };

        let response = request.send().await?;
        let status = response.status();
        debug!(target: LIB_LOG_TARGET, "Delivery Response - status: {} url: {}", status, response.url());
        if !status.is_success() {
            return Err(Error::delivery(status.as_u16(), response_body(response).await));
        }
        Ok(())
    }
}

async fn with_log_sink<F: Future>(log_sink: Option<&Dispatch>, future: F) -> F::Output {
    match log_sink {
        Some(dispatch) => future.with_subscriber(dispatch.clone()).await,
        None => future.await,
    }
}

async fn response_body(response: Response) -> String {
    response.text().await.unwrap_or_default()
}

fn epoch_millis() -> u128 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_without_secret_fails_when_signed() {
        let result = Source::attach("abc", None, &SourceConfiguration::new());
        assert_eq!(result.unwrap_err().to_string(), "Invalid Configuration: secret is not set");
    }

    #[test]
    fn attach_without_secret_allowed_when_unsigned() {
        let config = SourceConfiguration::new().with_variant(ProtocolVariant::Unsigned);
        let source = Source::attach("abc", None, &config).unwrap();

        assert_eq!(source.id(), "abc");
        assert!(source.secret().is_none());
        assert!(source.register_url().is_none());
    }

    #[test]
    fn attach_with_empty_id_fails() {
        let result = Source::attach("", Some(Secret::new("sek1")), &SourceConfiguration::new());
        assert!(matches!(result, Err(Error::Configuration(_))));
    }

    #[test]
    fn attached_source_messages_url() {
        let source = Source::attach("src1", Some(Secret::new("sek1")), &SourceConfiguration::new()).unwrap();
        assert_eq!(source.messages_url(), "https://notify.guru/v1/sources/src1/messages/");
        assert!(source.register_url().is_none());
    }

    #[test]
    fn source_debug_hides_secret() {
        let source = Source::attach("src1", Some(Secret::new("sek1")), &SourceConfiguration::new()).unwrap();
        assert!(!format!("{:?}", source).contains("sek1"));
    }

    #[test]
    fn registration_request_omits_missing_fields() {
        let empty = serde_json::to_string(&RegistrationRequest { name: None, secret: None }).unwrap();
        let named = serde_json::to_string(&RegistrationRequest { name: Some("test"), secret: None }).unwrap();

        assert_eq!(empty, "{}");
        assert_eq!(named, r#"{"name":"test"}"#);
    }

    #[test]
    fn registration_response_without_secret() {
        let response: RegistrationResponse =
            serde_json::from_str(r#"{"id":"src1","registerurl":"https://notify.guru/configure/src1"}"#).unwrap();

        assert_eq!(response.id, "src1");
        assert!(response.secret.is_none());
    }
}
