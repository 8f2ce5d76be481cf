use crate::Error;
use crate::configuration::{ClientConfiguration, ProtocolVariant, SourceConfiguration};
use serde::Deserialize;

/// Client configuration parsed from TOML.
#[derive(Deserialize, Debug)]
pub struct ClientConfigFileParser {
    #[serde(default)]
    source: ClientConfigFile,
}

/// Serde compatible representation of [`ClientConfiguration`]
#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct ClientConfigFile {
    service_url: Option<String>,
    variant: Option<ProtocolVariant>,
    id: Option<String>,
    secret: Option<String>,
    name: Option<String>,
}

impl ClientConfigFileParser {
    /// Parse [`ClientConfiguration`] from provided TOML.
    pub fn from(string: &str) -> Result<ClientConfiguration, Error> {
        let parsed: ClientConfigFileParser = toml::from_str(string)?;
        parsed.source.try_into()
    }
}

impl TryFrom<ClientConfigFile> for ClientConfiguration {
    type Error = Error;

    fn try_from(value: ClientConfigFile) -> Result<Self, Self::Error> {
        let mut source = SourceConfiguration::new().with_variant(value.variant.unwrap_or_default());
        if let Some(service_url) = value.service_url {
            source = source.with_service_url(service_url)?;
        }

        let mut config = ClientConfiguration::new(source);
        if let Some(id) = value.id.filter(|id| !id.is_empty()) {
            config = config.with_id(id);
        }
        if let Some(secret) = value.secret.filter(|secret| !secret.is_empty()) {
            config = config.with_secret(secret);
        }
        if let Some(name) = value.name {
            config = config.with_name(name);
        }
        Ok(config)
    }
}
