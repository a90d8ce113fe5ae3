//! Signing credentials as they appear in a caller's configuration file.
//!
//! Requires the `config` feature (enabled by default).

use serde::{Deserialize, Deserializer};

use crate::request::{Method, PrivateKey, SigningRequest};
use crate::signature::SignError;
use crate::signer::RequestSigner;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid credentials file")]
    Toml(#[from] toml::de::Error),

    #[error("credentials are missing `{0}`")]
    Missing(&'static str),
}

/// The consumer id, private key and optional channel type issued by the API provider.
///
/// ```toml
/// consumer_id = "b68d2a72-1f6e-4c5a-9d2e-7a1c0f0b9e11"
/// private_key = "MIIEvQIBADANBgkqhkiG9w0BAQEFAASC..."
/// channel_type = "0f3e4dd4-0514-4346-b39d-af0e00ea066d"
/// ```
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    pub consumer_id: String,
    pub private_key: PrivateKey,
    #[serde(default)]
    pub channel_type: Option<String>,
}

impl<'de> Deserialize<'de> for PrivateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(PrivateKey::from)
    }
}

impl Credentials {
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        let credentials: Self = toml::from_str(toml_str)?;
        if credentials.consumer_id.is_empty() {
            return Err(ConfigError::Missing("consumer_id"));
        }
        if credentials.private_key.is_empty() {
            return Err(ConfigError::Missing("private_key"));
        }
        Ok(credentials)
    }

    /// A signer carrying these credentials, still waiting for its target.
    pub fn signer(&self) -> RequestSigner {
        let signer = RequestSigner::with_identity(self.consumer_id.clone(), self.private_key.clone());
        match &self.channel_type {
            Some(channel_type) => signer.channel_type(channel_type.clone()),
            None => signer,
        }
    }

    /// A complete request for one call made with these credentials.
    pub fn request(&self, base_url: impl Into<String>, method: Method) -> Result<SigningRequest, SignError> {
        let builder = SigningRequest::builder()
            .consumer_id(self.consumer_id.clone())
            .private_key(self.private_key.clone())
            .base_url(base_url)
            .method(method);
        let builder = match &self.channel_type {
            Some(channel_type) => builder.channel_type(channel_type.clone()),
            None => builder,
        };
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        consumer_id = "WM123"
        private_key = "MIIEvQIBADANBgkqhkiG9w0BAQEFAASC"
        channel_type = "partner"
    "#;

    #[test]
    fn loads_credentials() {
        let credentials = Credentials::from_toml_str(FULL).unwrap();
        assert_eq!(credentials.consumer_id, "WM123");
        assert_eq!(credentials.private_key.as_str(), "MIIEvQIBADANBgkqhkiG9w0BAQEFAASC");
        assert_eq!(credentials.channel_type.as_deref(), Some("partner"));
    }

    #[test]
    fn channel_type_defaults_to_none() {
        let credentials = Credentials::from_toml_str("consumer_id = \"WM123\"\nprivate_key = \"MIIE\"").unwrap();
        assert_eq!(credentials.channel_type, None);
    }

    #[test]
    fn rejects_missing_and_empty_fields() {
        assert!(matches!(
            Credentials::from_toml_str("consumer_id = \"WM123\""),
            Err(ConfigError::Toml(_))
        ));
        assert!(matches!(
            Credentials::from_toml_str("consumer_id = \"\"\nprivate_key = \"MIIE\""),
            Err(ConfigError::Missing("consumer_id"))
        ));
        assert!(matches!(
            Credentials::from_toml_str("consumer_id = \"WM123\"\nprivate_key = \"\""),
            Err(ConfigError::Missing("private_key"))
        ));
        assert!(matches!(
            Credentials::from_toml_str("consumer_id = \"WM123\"\nprivate_key = \"MIIE\"\nsecret = 1"),
            Err(ConfigError::Toml(_))
        ));
    }

    #[test]
    fn debug_redacts_private_key() {
        let credentials = Credentials::from_toml_str(FULL).unwrap();
        assert!(!format!("{:?}", credentials).contains("MIIEvQ"));
    }

    #[test]
    fn builds_requests_and_signers() {
        let credentials = Credentials::from_toml_str(FULL).unwrap();
        let request = credentials
            .request("https://marketplace.walmartapis.com/v3/items", Method::Get)
            .unwrap();
        assert_eq!(request.consumer_id(), "WM123");
        assert_eq!(request.channel_type(), Some("partner"));

        let signer = credentials.signer();
        assert!(!signer.is_signed());
    }
}
