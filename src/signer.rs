use bytes::BytesMut;
use log::{debug, trace, warn};
use ring::rand::SystemRandom;

use crate::algorithm::{RsaSha256, SignatureAlgorithm};
use crate::clock::{correlation_id, Clock, SystemClock};
use crate::request::{header, Headers, Method, PrivateKey, SigningRequest, SigningRequestBuilder};
use crate::signature::{self, SignError, SigningResult};

/// The request and result of the last successful sign.
#[derive(Clone, Debug)]
struct Signed {
    request: SigningRequest,
    result: SigningResult,
}

/// Signs a single outbound call.
///
/// A signer is filled in stages: [RequestSigner::new] only stamps a timestamp and a
/// correlation id, [RequestSigner::with_identity] (or [RequestSigner::identity] on a bare
/// signer) adds the consumer id and key, and
/// [RequestSigner::target] supplies the URL and method once they are known. Nothing is
/// signed until [RequestSigner::sign_data] is called.
///
/// Create one signer per call: the correlation id is fixed for the lifetime of the
/// signer, while every call to `sign_data` takes a new timestamp.
#[derive(Debug)]
pub struct RequestSigner<C = SystemClock> {
    fields: SigningRequestBuilder,
    clock: C,
    timestamp: String,
    last_signed_millis: Option<u64>,
    correlation_id: String,
    signed: Option<Signed>,
    temporary_buffer: BytesMut,
}

impl RequestSigner<SystemClock> {
    /// A signer with a timestamp and correlation id but nothing to sign yet.
    pub fn new() -> Self {
        Self::with_fields(SigningRequestBuilder::default(), SystemClock)
    }

    /// A signer that knows who is calling but not yet which endpoint.
    pub fn with_identity(consumer_id: impl Into<String>, private_key: impl Into<PrivateKey>) -> Self {
        let fields = SigningRequestBuilder::default()
            .consumer_id(consumer_id)
            .private_key(private_key);
        Self::with_fields(fields, SystemClock)
    }

    /// A signer with every field already present. Call [RequestSigner::sign_data] to sign.
    pub fn from_request(request: SigningRequest) -> Self {
        Self::with_fields(request.into(), SystemClock)
    }
}

impl Default for RequestSigner<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RequestSigner<C> {
    fn with_fields(fields: SigningRequestBuilder, clock: C) -> Self {
        // A clock before the epoch only surfaces as an error once signing is attempted.
        let timestamp_millis = clock.now_millis().unwrap_or_default();
        Self {
            fields,
            clock,
            timestamp: timestamp_millis.to_string(),
            last_signed_millis: None,
            correlation_id: correlation_id(),
            signed: None,
            temporary_buffer: BytesMut::with_capacity(1024),
        }
    }

    /// Replace the clock, re-sampling the timestamp from it. The correlation id is kept.
    pub fn with_clock<D: Clock>(self, clock: D) -> RequestSigner<D> {
        let timestamp_millis = clock.now_millis().unwrap_or_default();
        RequestSigner {
            fields: self.fields,
            clock,
            timestamp: timestamp_millis.to_string(),
            last_signed_millis: None,
            correlation_id: self.correlation_id,
            signed: None,
            temporary_buffer: self.temporary_buffer,
        }
    }

    /// Set the consumer id and private key, for signers created bare with
    /// [RequestSigner::new].
    pub fn identity(mut self, consumer_id: impl Into<String>, private_key: impl Into<PrivateKey>) -> Self {
        self.fields = self.fields.consumer_id(consumer_id).private_key(private_key);
        self.signed = None;
        self
    }

    pub fn channel_type(mut self, channel_type: impl Into<String>) -> Self {
        self.fields = self.fields.channel_type(channel_type);
        self.signed = None;
        self
    }

    /// Set the absolute URL and method of the call about to be made.
    pub fn target(mut self, base_url: impl Into<String>, method: Method) -> Self {
        self.fields = self.fields.base_url(base_url).method(method);
        self.signed = None;
        self
    }

    /// Unix epoch milliseconds of the last sign attempt, or of construction.
    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// The base64 signature, if the last call to [RequestSigner::sign_data] succeeded.
    pub fn signature(&self) -> Option<&str> {
        self.result().map(SigningResult::signature)
    }

    pub fn result(&self) -> Option<&SigningResult> {
        self.signed.as_ref().map(|signed| &signed.result)
    }

    pub fn is_signed(&self) -> bool {
        self.signed.is_some()
    }

    /// Sign the request with a freshly sampled timestamp.
    ///
    /// The timestamp always moves forward: if the clock has not advanced since the
    /// previous signature, the previous timestamp plus one millisecond is used, so two
    /// signatures from the same signer never share a timestamp. On failure the signer is
    /// left without a signature and the failure is logged before it is returned.
    pub fn sign_data(&mut self) -> Result<&SigningResult, SignError> {
        self.signed = None;
        match self.try_sign() {
            Ok((timestamp_millis, request, result)) => {
                debug!(
                    "Signed {} {} at {} (correlation id {})",
                    request.http_method(),
                    request.base_url(),
                    result.timestamp(),
                    result.correlation_id()
                );
                self.last_signed_millis = Some(timestamp_millis);
                Ok(&self.signed.insert(Signed { request, result }).result)
            }
            Err(err) => {
                warn!(
                    "Failed to sign request for {} at {}: {}",
                    self.fields.pending_base_url().unwrap_or("<no url>"),
                    self.timestamp,
                    err
                );
                Err(err)
            }
        }
    }

    fn try_sign(&mut self) -> Result<(u64, SigningRequest, SigningResult), SignError> {
        let now = self.clock.now_millis()?;
        let timestamp_millis = match self.last_signed_millis {
            Some(previous) if now <= previous => previous.checked_add(1).ok_or(SignError::Clock)?,
            _ => now,
        };
        self.timestamp = timestamp_millis.to_string();

        let request = self.fields.clone().build()?;
        let algorithm = RsaSha256::from_base64_pkcs8(request.private_key().as_str(), SystemRandom::new())?;
        trace!(
            "Signing {} {} for consumer {} at {} with {}",
            request.http_method(),
            request.base_url(),
            request.consumer_id(),
            timestamp_millis,
            algorithm.name()
        );
        let result = signature::sign_with_buffer(
            &mut self.temporary_buffer,
            &algorithm,
            &request,
            timestamp_millis,
            self.correlation_id.clone(),
        )?;
        Ok((timestamp_millis, request, result))
    }

    /// Attach the consumer id, timestamp, signature, correlation id and, when present,
    /// channel type headers. Fails with [SignError::Unsigned] if there is no signature,
    /// so a request can never go out with missing or stale authentication.
    pub fn apply_headers<H: Headers + ?Sized>(&self, headers: &mut H) -> Result<(), SignError> {
        let Signed { request, result } = self.signed.as_ref().ok_or(SignError::Unsigned)?;
        headers.insert_header(header::CONSUMER_ID, request.consumer_id())?;
        headers.insert_header(header::TIMESTAMP, result.timestamp())?;
        headers.insert_header(header::AUTH_SIGNATURE, result.signature())?;
        headers.insert_header(header::CORRELATION_ID, result.correlation_id())?;
        if let Some(channel_type) = request.channel_type() {
            headers.insert_header(header::CHANNEL_TYPE, channel_type)?;
        }
        Ok(())
    }
}
