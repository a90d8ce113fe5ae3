use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::BytesMut;

use crate::algorithm::SignatureAlgorithm;
use crate::request::SigningRequest;

/// The signature and metadata produced for one outgoing call.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningResult {
    timestamp: String,
    correlation_id: String,
    signature: String,
}

impl SigningResult {
    /// Unix epoch milliseconds, as the decimal string that was signed.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Per-request correlation id. Not covered by the signature.
    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// The base64 encoded signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SignError {
    /// The private key is not valid base64 or not a PKCS#8 RSA key.
    #[error("failed to decode the private key")]
    KeyDecoding(#[source] KeyDecodingError),

    /// The signing primitive rejected the operation.
    #[error("failed to compute the RSA-SHA256 signature")]
    Signing(#[source] ring::error::Unspecified),

    /// A required field was missing or empty when the request was signed.
    #[error("missing required field `{0}`")]
    InvalidInput(&'static str),

    /// The base URL could not be parsed as an absolute URL.
    #[error("base URL is not a valid absolute URL")]
    InvalidUrl(#[source] url::ParseError),

    /// The HTTP method is not an uppercase standard verb.
    #[error("unsupported HTTP method `{0}`")]
    InvalidMethod(String),

    /// Headers were requested from a signer that holds no signature.
    #[error("request has not been signed")]
    Unsigned,

    /// The header sink rejected the value of the named header.
    #[error("invalid value for header `{0}`")]
    InvalidHeader(String),

    /// The system clock reports a time before the Unix epoch.
    #[error("unable to determine the Unix timestamp")]
    Clock,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyDecodingError {
    #[error("private key is not valid base64")]
    Base64(#[source] base64::DecodeError),

    #[error("private key is not a PKCS#8 encoded RSA key")]
    Pkcs8(#[source] ring::error::KeyRejected),
}

/// Writes the string to sign into `temporary_buffer` and splits it off. Each field is
/// followed by a single `\n`, in the order consumer id, URL, method, timestamp. Values
/// are copied verbatim as UTF-8.
pub fn canonical_string(
        temporary_buffer: &mut BytesMut,
        consumer_id: &str,
        base_url: &str,
        http_method: &str,
        timestamp: &str,
    ) -> BytesMut {
    temporary_buffer.clear();
    for field in [consumer_id, base_url, http_method, timestamp] {
        temporary_buffer.extend_from_slice(field.as_bytes());
        temporary_buffer.extend_from_slice(b"\n");
    }
    temporary_buffer.split()
}

/// Signs `request` at the given instant. This is a pure function of its inputs: it
/// neither reads the clock nor logs, and the returned timestamp is exactly the one that
/// was signed.
pub fn sign<SigAlg: SignatureAlgorithm>(
        sig_alg: &SigAlg,
        request: &SigningRequest,
        timestamp_millis: u64,
        correlation_id: String,
    ) -> Result<SigningResult, SignError> {
    let mut temporary_buffer = BytesMut::with_capacity(1024);
    sign_with_buffer(&mut temporary_buffer, sig_alg, request, timestamp_millis, correlation_id)
}

/// Same as [sign], reusing a caller owned scratch buffer.
pub fn sign_with_buffer<SigAlg: SignatureAlgorithm>(
        temporary_buffer: &mut BytesMut,
        sig_alg: &SigAlg,
        request: &SigningRequest,
        timestamp_millis: u64,
        correlation_id: String,
    ) -> Result<SigningResult, SignError> {
    let timestamp = timestamp_millis.to_string();
    let signature_input = canonical_string(
        temporary_buffer,
        request.consumer_id(),
        request.base_url(),
        request.http_method().as_str(),
        &timestamp,
    );
    sig_alg.sign(&signature_input, temporary_buffer)?;
    let signature = temporary_buffer.split();
    Ok(SigningResult {
        timestamp,
        correlation_id,
        signature: STANDARD.encode(&signature),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Method;

    /// Echoes the input back, so the base64 signature decodes to the canonical string.
    struct Echo;

    impl SignatureAlgorithm for Echo {
        fn name(&self) -> &str {
            "echo"
        }

        fn sign(&self, data: &[u8], output: &mut BytesMut) -> Result<(), SignError> {
            output.extend_from_slice(data);
            Ok(())
        }
    }

    struct Broken;

    impl SignatureAlgorithm for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn sign(&self, _data: &[u8], _output: &mut BytesMut) -> Result<(), SignError> {
            Err(SignError::Signing(ring::error::Unspecified))
        }
    }

    fn request(channel_type: Option<&str>) -> SigningRequest {
        let builder = SigningRequest::builder()
            .consumer_id("abc123")
            .base_url("https://api.example.com/v3/items")
            .method(Method::Get)
            .private_key("unused");
        let builder = match channel_type {
            Some(channel_type) => builder.channel_type(channel_type),
            None => builder,
        };
        builder.build().unwrap()
    }

    #[test]
    fn canonical_string_is_newline_terminated_fields() {
        let mut buffer = BytesMut::new();
        let canonical = canonical_string(
            &mut buffer,
            "abc123",
            "https://api.example.com/v3/items",
            "GET",
            "1700000000000",
        );
        assert_eq!(
            &canonical[..],
            b"abc123\nhttps://api.example.com/v3/items\nGET\n1700000000000\n"
        );
        assert!(buffer.is_empty());
    }

    #[test]
    fn canonical_string_copies_values_verbatim() {
        let mut buffer = BytesMut::from(&b"leftover"[..]);
        let canonical = canonical_string(&mut buffer, " id ", "https://h/ä?q=a b", "POST", "0");
        assert_eq!(&canonical[..], " id \nhttps://h/ä?q=a b\nPOST\n0\n".as_bytes());
    }

    #[test]
    fn signs_canonical_string_with_given_timestamp() {
        let result = sign(&Echo, &request(None), 1_700_000_000_000, "cid".to_string()).unwrap();
        assert_eq!(result.timestamp(), "1700000000000");
        assert_eq!(result.correlation_id(), "cid");
        assert_eq!(
            STANDARD.decode(result.signature()).unwrap(),
            b"abc123\nhttps://api.example.com/v3/items\nGET\n1700000000000\n"
        );
    }

    #[test]
    fn channel_type_and_correlation_id_are_not_signed() {
        let plain = sign(&Echo, &request(None), 42, "one".to_string()).unwrap();
        let channel = sign(&Echo, &request(Some("partner")), 42, "two".to_string()).unwrap();
        assert_eq!(plain.signature(), channel.signature());
    }

    #[test]
    fn reused_buffer_does_not_leak_between_signatures() {
        let mut buffer = BytesMut::new();
        let first = sign_with_buffer(&mut buffer, &Echo, &request(None), 1, "a".to_string()).unwrap();
        let second = sign_with_buffer(&mut buffer, &Echo, &request(None), 1, "b".to_string()).unwrap();
        assert_eq!(first.signature(), second.signature());
    }

    #[test]
    fn signing_failure_is_propagated() {
        let err = sign(&Broken, &request(None), 1, "cid".to_string()).unwrap_err();
        assert!(matches!(err, SignError::Signing(_)));
    }

    #[test]
    fn errors_keep_their_cause() {
        use std::error::Error;

        let err = SignError::KeyDecoding(KeyDecodingError::Base64(base64::DecodeError::InvalidByte(0, b'*')));
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "private key is not valid base64");
        assert!(cause.source().is_some());
    }
}
