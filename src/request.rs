use std::fmt;
use std::str::FromStr;

use ring::rand::SystemRandom;
use url::Url;

use crate::algorithm::RsaSha256;
use crate::clock::{self, Clock, SystemClock};
use crate::signature::{self, SignError, SigningResult};

/// Names of the headers that carry the signature and its metadata. The verifying server
/// reads the signed fields back out of these.
pub mod header {
    /// The consumer id issued by the API provider.
    pub const CONSUMER_ID: &str = "WM_CONSUMER.ID";
    /// The Unix timestamp, in milliseconds, that was signed.
    pub const TIMESTAMP: &str = "WM_SEC.TIMESTAMP";
    /// The base64 encoded signature.
    pub const AUTH_SIGNATURE: &str = "WM_SEC.AUTH_SIGNATURE";
    /// The partner channel type, only sent when one is configured.
    pub const CHANNEL_TYPE: &str = "WM_CONSUMER.CHANNEL.TYPE";
    /// The per-request correlation id.
    pub const CORRELATION_ID: &str = "WM_QOS.CORRELATION_ID";
}

/// An HTTP method such as GET, POST, etc.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Method {
    Options,
    Get,
    Post,
    Put,
    Delete,
    Head,
    Trace,
    Connect,
    Patch,
}

impl Method {
    /// Returns the uppercase verb, exactly as it appears in the signed string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
            Self::Head => "HEAD",
            Self::Options => "OPTIONS",
            Self::Connect => "CONNECT",
            Self::Patch => "PATCH",
            Self::Trace => "TRACE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses an uppercase verb. Lowercase verbs are rejected because the verifying server
/// compares the signed string byte for byte.
impl FromStr for Method {
    type Err = SignError;

    fn from_str(verb: &str) -> Result<Self, Self::Err> {
        Ok(match verb {
            "GET" => Self::Get,
            "POST" => Self::Post,
            "PUT" => Self::Put,
            "DELETE" => Self::Delete,
            "HEAD" => Self::Head,
            "OPTIONS" => Self::Options,
            "CONNECT" => Self::Connect,
            "PATCH" => Self::Patch,
            "TRACE" => Self::Trace,
            other => return Err(SignError::InvalidMethod(other.to_string())),
        })
    }
}

/// Base64 text of a PKCS#8 encoded RSA private key. The key is only decoded when a
/// request is signed.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl From<String> for PrivateKey {
    fn from(encoded: String) -> Self {
        Self(encoded)
    }
}

impl From<&str> for PrivateKey {
    fn from(encoded: &str) -> Self {
        Self(encoded.to_string())
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// Everything needed to sign one outbound call. Built with [SigningRequestBuilder], which
/// refuses to produce a request with a missing field.
#[derive(Clone, Debug)]
pub struct SigningRequest {
    consumer_id: String,
    base_url: Url,
    http_method: Method,
    private_key: PrivateKey,
    channel_type: Option<String>,
}

impl SigningRequest {
    pub fn builder() -> SigningRequestBuilder {
        SigningRequestBuilder::default()
    }

    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    /// The absolute URL, normalized by the URL parser. This exact string is signed.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    pub fn http_method(&self) -> Method {
        self.http_method
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    pub fn channel_type(&self) -> Option<&str> {
        self.channel_type.as_deref()
    }

    /// Decode the key and sign the request against the system clock with a fresh
    /// correlation id. Every call samples a new timestamp.
    pub fn sign(&self) -> Result<SigningResult, SignError> {
        let algorithm = RsaSha256::from_base64_pkcs8(self.private_key.as_str(), SystemRandom::new())?;
        let timestamp = SystemClock.now_millis()?;
        signature::sign(&algorithm, self, timestamp, clock::correlation_id())
    }
}

/// Accumulates the fields of a [SigningRequest].
#[derive(Clone, Debug, Default)]
pub struct SigningRequestBuilder {
    consumer_id: Option<String>,
    base_url: Option<String>,
    http_method: Option<Method>,
    private_key: Option<PrivateKey>,
    channel_type: Option<String>,
}

impl SigningRequestBuilder {
    pub fn consumer_id(mut self, consumer_id: impl Into<String>) -> Self {
        self.consumer_id = Some(consumer_id.into());
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.http_method = Some(method);
        self
    }

    pub fn private_key(mut self, private_key: impl Into<PrivateKey>) -> Self {
        self.private_key = Some(private_key.into());
        self
    }

    pub fn channel_type(mut self, channel_type: impl Into<String>) -> Self {
        self.channel_type = Some(channel_type.into());
        self
    }

    pub(crate) fn pending_base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn build(self) -> Result<SigningRequest, SignError> {
        let consumer_id = self
            .consumer_id
            .filter(|id| !id.is_empty())
            .ok_or(SignError::InvalidInput("consumer_id"))?;
        let base_url = self
            .base_url
            .filter(|url| !url.is_empty())
            .ok_or(SignError::InvalidInput("base_url"))?;
        let base_url = Url::parse(&base_url).map_err(SignError::InvalidUrl)?;
        let http_method = self.http_method.ok_or(SignError::InvalidInput("http_method"))?;
        let private_key = self
            .private_key
            .filter(|key| !key.is_empty())
            .ok_or(SignError::InvalidInput("private_key"))?;
        Ok(SigningRequest {
            consumer_id,
            base_url,
            http_method,
            private_key,
            channel_type: self.channel_type,
        })
    }
}

impl From<SigningRequest> for SigningRequestBuilder {
    fn from(request: SigningRequest) -> Self {
        Self {
            consumer_id: Some(request.consumer_id),
            base_url: Some(request.base_url.into()),
            http_method: Some(request.http_method),
            private_key: Some(request.private_key),
            channel_type: request.channel_type,
        }
    }
}

/// Write access to the headers of an outgoing HTTP request, used to attach the signature
/// and its metadata.
///
/// Implementations are provided for `HashMap<String, String>` and
/// `BTreeMap<String, String>`. Enabling the `http` **feature** adds support for the
/// [http](https://crates.io/crates/http) crate's `HeaderMap`.
pub trait Headers {
    /// Inserts a header, replacing any previous value with the same `name`.
    fn insert_header(&mut self, name: &str, value: &str) -> Result<(), SignError>;
}

/// Support for representing [Headers] as a [HashMap](std::collections::HashMap).
mod hash_map {
    use crate::signature::SignError;

    impl super::Headers for std::collections::HashMap<String, String> {
        fn insert_header(&mut self, name: &str, value: &str) -> Result<(), SignError> {
            self.insert(name.into(), value.into());
            Ok(())
        }
    }
}

/// Support for representing [Headers] as a [BTreeMap](std::collections::BTreeMap).
mod btree_map {
    use crate::signature::SignError;

    impl super::Headers for std::collections::BTreeMap<String, String> {
        fn insert_header(&mut self, name: &str, value: &str) -> Result<(), SignError> {
            self.insert(name.into(), value.into());
            Ok(())
        }
    }
}

/// Adds support for using types from the [http](https://crates.io/crates/http) crate
/// as [Headers] and as a source of [Method].
///
/// Requires the `http` feature to be enabled.
#[cfg(feature = "http")]
mod http {
    use ::http::{header::HeaderName, HeaderMap, HeaderValue};

    use super::Method;
    use crate::signature::SignError;

    impl super::Headers for HeaderMap<HeaderValue> {
        fn insert_header(&mut self, name: &str, value: &str) -> Result<(), SignError> {
            let header_name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_err| SignError::InvalidHeader(name.to_string()))?;
            let header_value = HeaderValue::from_str(value)
                .map_err(|_err| SignError::InvalidHeader(name.to_string()))?;
            self.insert(header_name, header_value);
            Ok(())
        }
    }

    impl TryFrom<&::http::Method> for Method {
        type Error = SignError;

        fn try_from(method: &::http::Method) -> Result<Self, Self::Error> {
            method.as_str().parse()
        }
    }
}
